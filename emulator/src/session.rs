use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use alert_core::config::WristConfig;
use alert_core::contact::{ContactRegistry, EmergencyContact};
use alert_core::delivery::{DeliveryChannel, DeliveryReceipt};
use alert_core::message::LocalTime;
use alert_core::orchestrator::{
    AlertNotice, AlertOrchestrator, AlertSources, DetectorCommand, OrchestratorUpdate,
};
use alert_core::receiver::TextRoute;
use alert_core::signal::{Sample, SignalProcessor};
use alert_core::time::ClockSync;
use alert_core::wire::{AlertEvent, GeoPoint};
use embassy_futures::block_on;

use crate::clock::VirtualInstant;
use crate::link::{LinkMode, Phone, PhoneActivity, SimLink};
use crate::sinks::{ConsoleNotifier, ConsoleTexts};
use crate::store::FileStore;

/// Period of the countdown and cooldown evaluation loop.
const POLL_PERIOD: Duration = Duration::from_millis(100);

/// Longest stretch a single `rest`, `shake`, or `advance` may simulate.
const MAX_STEP_SECONDS: f64 = 3_600.0;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "contact",
        "contact <name> <phone>        - set the emergency contact on the wrist",
    ),
    (
        "wearer",
        "wearer <name>                 - set the wearer name used in messages",
    ),
    ("start", "start                         - begin monitoring motion"),
    ("stop", "stop                          - stop monitoring"),
    (
        "rest",
        "rest <secs>                   - feed resting samples (1 g)",
    ),
    (
        "shake",
        "shake <secs>                  - feed sustained high-energy samples",
    ),
    (
        "advance",
        "advance <secs>                - let time pass with no samples",
    ),
    (
        "location",
        "location <lat> <lon>          - push a location fix to the wrist",
    ),
    ("cancel", "cancel                        - cancel the active countdown"),
    ("test", "test                          - send a test alert now"),
    ("retry", "retry                         - resend the last failed alert"),
    (
        "link",
        "link <reachable|unreachable|unpaired> - change phone connectivity",
    ),
    (
        "history",
        "history [clear]               - list or clear alerts on the phone",
    ),
    ("status", "status                        - show wrist and phone state"),
    ("help", "help [topic]                  - show help for a command"),
];

/// Which side of the simulation produced a line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Host,
    Wrist,
    Phone,
    Emulator,
}

impl Role {
    fn prefix(self) -> &'static str {
        match self {
            Role::Host => "HOST> ",
            Role::Wrist => "WRIST<",
            Role::Phone => "PHONE<",
            Role::Emulator => "EMU  <",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Line {
    pub role: Role,
    pub text: String,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.role.prefix(), self.text)
    }
}

/// Motion fed to the wrist while time advances.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Motion {
    Still,
    Rest,
    Shake,
}

impl Motion {
    fn sample(self, index: u64, at: VirtualInstant) -> Option<Sample<VirtualInstant>> {
        match self {
            Motion::Still => None,
            Motion::Rest => Some(Sample::new(0.0, 0.0, 1.0, at)),
            Motion::Shake => {
                let swing = if index % 2 == 0 { 3.0 } else { -3.0 };
                Some(Sample::new(swing, 0.0, 1.0, at))
            }
        }
    }
}

pub struct SessionOptions {
    pub transcript: PathBuf,
    pub state_dir: PathBuf,
    pub config: WristConfig,
    /// Wall clock at session start, seconds since the Unix epoch.
    pub epoch: f64,
    pub header: String,
    /// Whether the phone offers an interactive text composer.
    pub composer: bool,
}

impl SessionOptions {
    pub fn new(transcript: impl Into<PathBuf>, state_dir: impl Into<PathBuf>, epoch: f64) -> Self {
        Self {
            transcript: transcript.into(),
            state_dir: state_dir.into(),
            config: WristConfig::DEFAULT,
            epoch,
            header: "Wristguard emulator transcript".to_string(),
            composer: false,
        }
    }
}

/// What the orchestrator reads when it builds an alert.
struct AlertContext {
    contacts: ContactRegistry,
    clock: ClockSync<VirtualInstant>,
    location: Option<GeoPoint>,
}

impl AlertContext {
    fn sources(&self, now: VirtualInstant) -> AlertSources<'_> {
        AlertSources {
            contacts: &self.contacts,
            location: self.location,
            unix_time: self.clock.unix_seconds(now),
        }
    }
}

/// Wrist-side state: detector, orchestrator, settings, and the radio link.
struct Wrist {
    processor: SignalProcessor<VirtualInstant>,
    orchestrator: AlertOrchestrator<VirtualInstant>,
    context: AlertContext,
    store: FileStore,
    channel: DeliveryChannel<SimLink>,
    sample_period: Duration,
    samples: u64,
}

pub struct Session {
    wrist: Wrist,
    transcript: TranscriptLogger,
    now: VirtualInstant,
    next_poll: VirtualInstant,
}

impl Session {
    pub fn new(options: &SessionOptions) -> io::Result<Self> {
        options
            .config
            .validate()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;

        let store = FileStore::open(options.state_dir.join("wrist"))?;
        let contacts = ContactRegistry::load(&store).map_err(store_error)?;
        let phone = Phone::load(
            FileStore::open(options.state_dir.join("phone"))?,
            ConsoleNotifier::default(),
            ConsoleTexts {
                composer: options.composer,
                ..ConsoleTexts::default()
            },
        )
        .map_err(store_error)?;

        let mut clock = ClockSync::new();
        clock.record(VirtualInstant::ZERO, options.epoch);

        let wrist = Wrist {
            processor: SignalProcessor::new(options.config.signal),
            orchestrator: AlertOrchestrator::new(options.config.countdown),
            context: AlertContext {
                contacts,
                clock,
                location: None,
            },
            store,
            channel: DeliveryChannel::new(SimLink::new(phone, LinkMode::Reachable)),
            sample_period: options.config.signal.sample_period(),
            samples: 0,
        };

        Ok(Self {
            wrist,
            transcript: TranscriptLogger::new(&options.transcript, &options.header)?,
            now: VirtualInstant::ZERO,
            next_poll: VirtualInstant::ZERO + POLL_PERIOD,
        })
    }

    pub fn phone(&self) -> &Phone {
        self.wrist.channel.link().phone()
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<Line>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.now.as_duration();
        self.transcript.append_line(elapsed, Role::Host, trimmed)?;

        let (command, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (trimmed, ""),
        };

        let mut out = Output::default();
        match command.to_ascii_lowercase().as_str() {
            "help" => handle_help(rest, &mut out),
            "contact" => self.handle_contact(rest, &mut out),
            "wearer" => self.handle_wearer(rest, &mut out),
            "start" => self.handle_start(&mut out),
            "stop" => {
                let update = self.wrist.orchestrator.stop();
                self.apply(update, &mut out);
                out.wrist("OK monitoring stopped");
            }
            "rest" => self.handle_motion(rest, Motion::Rest, &mut out),
            "shake" => self.handle_motion(rest, Motion::Shake, &mut out),
            "advance" => self.handle_motion(rest, Motion::Still, &mut out),
            "location" => self.handle_location(rest, &mut out),
            "cancel" => match self.wrist.orchestrator.cancel(self.now) {
                Ok(update) => {
                    self.apply(update, &mut out);
                    out.wrist("OK countdown cancelled; no alert sent");
                }
                Err(err) => out.emulator(format!("ERR cancel {err}")),
            },
            "test" => {
                let result = self.wrist.orchestrator.test_alert(&self.wrist.context.sources(self.now));
                match result {
                    Ok(event) => {
                        out.wrist("OK test alert built");
                        self.deliver(&event, &mut out);
                    }
                    Err(err) => out.emulator(format!("ERR test {err}")),
                }
            }
            "retry" => match self.wrist.orchestrator.retry_failed() {
                Ok(event) => {
                    out.wrist("OK retrying failed alert");
                    self.deliver(&event, &mut out);
                }
                Err(err) => out.emulator(format!("ERR retry {err}")),
            },
            "link" => self.handle_link(rest, &mut out),
            "history" => self.handle_history(rest, &mut out),
            "status" => self.handle_status(&mut out),
            other => out.emulator(format!("ERR unknown command `{other}`; type `help`")),
        }

        for line in &out.lines {
            self.transcript.append_line(elapsed, line.role, &line.text)?;
        }
        Ok(out.lines)
    }

    fn handle_contact(&mut self, rest: &str, out: &mut Output) {
        let Some((name, phone)) = rest.rsplit_once(char::is_whitespace) else {
            out.emulator("ERR usage: contact <name> <phone>");
            return;
        };

        match EmergencyContact::new(name, phone) {
            Ok(contact) => {
                let valid = contact.is_valid();
                out.wrist(format!(
                    "OK contact {} {}",
                    contact.name(),
                    contact.phone_number()
                ));
                self.wrist.context.contacts.set_contact(contact);
                self.persist_contacts(out);
                if !valid {
                    out.wrist("WARN contact has no phone digits; alerts cannot be sent");
                }
            }
            Err(err) => out.emulator(format!("ERR contact {err}")),
        }
    }

    fn handle_wearer(&mut self, rest: &str, out: &mut Output) {
        match self.wrist.context.contacts.set_wearer_name(rest) {
            Ok(()) => {
                out.wrist(format!("OK wearer {}", self.wrist.context.contacts.wearer_name()));
                self.persist_contacts(out);
            }
            Err(err) => out.emulator(format!("ERR wearer {err}")),
        }
    }

    fn persist_contacts(&mut self, out: &mut Output) {
        if let Err(err) = self.wrist.context.contacts.persist(&mut self.wrist.store) {
            out.wrist(format!("WARN settings not saved: {err}"));
        }
    }

    fn handle_start(&mut self, out: &mut Output) {
        match self.wrist.orchestrator.begin_monitoring(&true) {
            Ok(update) if update.is_empty() => out.wrist("OK already monitoring"),
            Ok(update) => {
                self.apply(update, out);
                out.wrist("OK monitoring started");
            }
            Err(err) => out.emulator(format!("ERR start {err}")),
        }
    }

    fn handle_motion(&mut self, rest: &str, motion: Motion, out: &mut Output) {
        let seconds = match rest.parse::<f64>() {
            Ok(value) if value.is_finite() && (0.0..=MAX_STEP_SECONDS).contains(&value) => value,
            _ => {
                out.emulator(format!(
                    "ERR expected seconds between 0 and {MAX_STEP_SECONDS}"
                ));
                return;
            }
        };

        let until = self.now + Duration::from_secs_f64(seconds);
        while self.now < until {
            self.now = self.now + self.wrist.sample_period;
            self.wrist.samples += 1;
            if let Some(sample) = motion.sample(self.wrist.samples, self.now) {
                self.ingest(&sample, out);
            }
            while self.next_poll <= self.now {
                let at = self.next_poll;
                self.next_poll = self.next_poll + POLL_PERIOD;
                let update = self.wrist.orchestrator.poll(at, &self.wrist.context.sources(at));
                self.apply(update, out);
            }
        }

        out.emulator(format!(
            "t=+{:.2}s magnitude={:.3}g state={}",
            self.now.as_duration().as_secs_f64(),
            self.wrist.processor.magnitude(),
            self.wrist.orchestrator.state()
        ));
    }

    fn ingest(&mut self, sample: &Sample<VirtualInstant>, out: &mut Output) {
        let Some(update) = self.wrist.processor.ingest(sample) else {
            return;
        };
        if update.triggered {
            out.wrist(format!(
                "sustained motion detected (magnitude {:.2}g)",
                update.magnitude
            ));
            let update = self
                .wrist
                .orchestrator
                .on_trigger(sample.timestamp, &self.wrist.context.contacts);
            self.apply(update, out);
        }
    }

    fn handle_location(&mut self, rest: &str, out: &mut Output) {
        let mut parts = rest.split_whitespace().map(str::parse::<f64>);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(Ok(latitude)), Some(Ok(longitude)), None)
                if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) =>
            {
                self.wrist.context.location = Some(GeoPoint::new(latitude, longitude));
                out.wrist(format!("OK location {latitude:.6}, {longitude:.6}"));
            }
            _ => out.emulator("ERR usage: location <lat> <lon>"),
        }
    }

    fn handle_link(&mut self, rest: &str, out: &mut Output) {
        let Some(mode) = LinkMode::from_tag(rest) else {
            out.emulator("ERR usage: link <reachable|unreachable|unpaired>");
            return;
        };

        let link = self.wrist.channel.link_mut();
        let pending = link.queued();
        link.set_mode(mode);
        out.emulator(format!("OK link {}", mode.label()));
        if mode == LinkMode::Reachable && pending > 0 {
            out.phone(format!("flushing {pending} queued transfer(s)"));
        }
        self.report_phone(out);
    }

    fn handle_history(&mut self, rest: &str, out: &mut Output) {
        if rest.eq_ignore_ascii_case("clear") {
            match self.wrist.channel.link_mut().clear_history() {
                Ok(()) => out.phone("OK history cleared"),
                Err(err) => out.phone(format!("ERR history clear failed: {err}")),
            }
            return;
        }
        if !rest.is_empty() {
            out.emulator("ERR usage: history [clear]");
            return;
        }

        let history = self.phone().history();
        if history.is_empty() {
            out.phone("history empty");
            return;
        }

        let mut lines = vec![format!("history ({} of {})", history.len(), history.capacity())];
        for (index, event) in history.iter().enumerate() {
            lines.push(format!("  {}. {}", index + 1, describe_event(event)));
        }
        for line in lines {
            out.phone(line);
        }
    }

    fn handle_status(&mut self, out: &mut Output) {
        let wrist = &self.wrist;
        let stats = wrist.channel.stats();
        let link = wrist.channel.link();
        let contact = match wrist.context.contacts.contact() {
            Some(contact) => format!("{} {}", contact.name(), contact.phone_number()),
            None => "unset".to_string(),
        };
        let location = match wrist.context.location {
            Some(point) => format!("{:.6}, {:.6}", point.latitude, point.longitude),
            None => "unknown".to_string(),
        };

        let mut lines = vec![
            format!(
                "state={} detector={} magnitude={:.3}g",
                wrist.orchestrator.state(),
                if wrist.processor.is_running() { "running" } else { "stopped" },
                wrist.processor.magnitude()
            ),
            format!(
                "contact={contact} wearer={} location={location}",
                wrist.context.contacts.wearer_name()
            ),
            format!(
                "link={} queued={} delivered-direct={} delivered-queued={} failed={}",
                link.mode().label(),
                link.queued(),
                stats.direct,
                stats.queued,
                stats.failed
            ),
        ];
        if let Some(remaining) = wrist.orchestrator.countdown_remaining(self.now) {
            lines.push(format!("countdown remaining={:.1}s", remaining.as_secs_f64()));
        }
        if wrist.orchestrator.has_failed_delivery() {
            lines.push("retry available".to_string());
        }
        if wrist.orchestrator.contact_missing() {
            lines.push("last trigger found no emergency contact".to_string());
        }
        for line in lines {
            out.wrist(line);
        }

        let history = self.phone().history().len();
        out.phone(format!("history entries={history}"));
    }

    fn apply(&mut self, update: OrchestratorUpdate, out: &mut Output) {
        for notice in &update.notices {
            out.wrist(describe_notice(notice));
        }

        match update.detector {
            Some(DetectorCommand::Start) => {
                if let Err(err) = self.wrist.processor.start(&true) {
                    out.wrist(format!("WARN detector start failed: {err}"));
                }
            }
            Some(DetectorCommand::Stop) => self.wrist.processor.stop(),
            Some(DetectorCommand::Reset) => self.wrist.processor.reset(),
            None => {}
        }

        if let Some(event) = update.dispatch {
            self.deliver(&event, out);
        }
    }

    fn deliver(&mut self, event: &AlertEvent, out: &mut Output) {
        let receipt = block_on(self.wrist.channel.send(event));
        describe_receipt(&receipt, out);
        self.report_phone(out);

        let update = self.wrist.orchestrator.delivery_finished(&receipt, self.now);
        self.apply(update, out);
    }

    fn report_phone(&mut self, out: &mut Output) {
        let activity = self.wrist.channel.link_mut().take_activity();
        for item in activity {
            match item {
                PhoneActivity::Received(report) => {
                    let phone = self.phone();
                    let mut lines = Vec::new();
                    if let Some(event) = phone.history().latest() {
                        lines.push(format!("alert received: {}", describe_event(event)));
                    }
                    if report.evicted {
                        lines.push("oldest alert evicted from history".to_string());
                    }
                    if let Err(err) = report.persisted {
                        lines.push(format!("WARN history not saved: {err}"));
                    }
                    if report.contact_synced {
                        lines.push("contact synced from alert".to_string());
                    }
                    match report.notified {
                        Ok(()) => {
                            if let Some((title, body)) = phone.notifications().delivered.last() {
                                lines.push(format!("notification: {title}: {body}"));
                            }
                        }
                        Err(err) => lines.push(format!("WARN notification failed: {err}")),
                    }
                    match report.texted {
                        Ok(TextRoute::Url) => {
                            if let Some(url) = phone.texts().opened.last() {
                                lines.push(format!("text via url: {url}"));
                            }
                        }
                        Ok(TextRoute::Composer) => {
                            if let Some((to, _)) = phone.texts().composed.last() {
                                lines.push(format!("text composed to {to}"));
                            }
                        }
                        Err(err) => lines.push(format!("WARN text failed: {err}")),
                    }
                    for line in lines {
                        out.phone(line);
                    }
                }
                PhoneActivity::Dropped(err) => out.phone(format!("WARN payload dropped: {err}")),
            }
        }
    }
}

#[derive(Default)]
struct Output {
    lines: Vec<Line>,
}

impl Output {
    fn push(&mut self, role: Role, text: impl Into<String>) {
        self.lines.push(Line {
            role,
            text: text.into(),
        });
    }

    fn wrist(&mut self, text: impl Into<String>) {
        self.push(Role::Wrist, text);
    }

    fn phone(&mut self, text: impl Into<String>) {
        self.push(Role::Phone, text);
    }

    fn emulator(&mut self, text: impl Into<String>) {
        self.push(Role::Emulator, text);
    }
}

fn handle_help(topic: &str, out: &mut Output) {
    if topic.is_empty() {
        out.emulator("Available commands:");
        for (_, detail) in HELP_TOPICS {
            out.emulator(format!("  {detail}"));
        }
        out.emulator("Type `help <topic>` for a specific command.");
        return;
    }

    match HELP_TOPICS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(topic))
    {
        Some((_, detail)) => out.emulator(*detail),
        None => {
            out.emulator(format!("No help available for `{topic}`."));
            out.emulator(format!("Available topics: {}", help_topic_list()));
        }
    }
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_notice(notice: &AlertNotice) -> String {
    match notice {
        AlertNotice::StateChanged { from, to } => format!("state {from} -> {to}"),
        AlertNotice::CountdownStarted { seconds } => {
            format!("countdown started: {seconds}s to cancel")
        }
        AlertNotice::CountdownTick {
            seconds_left,
            crossed,
        } if *crossed > 1 => format!("countdown {seconds_left}s ({crossed} pulses)"),
        AlertNotice::CountdownTick { seconds_left, .. } => format!("countdown {seconds_left}s"),
        AlertNotice::NoValidContact => {
            "no emergency contact set; use `contact <name> <phone>`".to_string()
        }
        AlertNotice::LocationUnavailable => {
            "location unavailable; alert carries 0.000000, 0.000000".to_string()
        }
        AlertNotice::TriggerIgnored(state) => format!("trigger ignored while {state}"),
        AlertNotice::DeliverySucceeded(route) => format!("alert delivered via {route}"),
        AlertNotice::DeliveryFailed {
            error,
            retry_available: true,
        } => format!("alert delivery failed: {error} (type `retry`)"),
        AlertNotice::DeliveryFailed { error, .. } => format!("alert delivery failed: {error}"),
    }
}

fn describe_receipt(receipt: &DeliveryReceipt, out: &mut Output) {
    if let Some(failure) = receipt.direct_failure {
        out.wrist(format!("direct send failed ({failure}); falling back"));
    }
}

fn describe_event(event: &AlertEvent) -> String {
    format!(
        "{} {} at {:.6}, {:.6} contact {} {}",
        LocalTime::new(event.timestamp(), 0),
        event.wearer_name(),
        event.latitude(),
        event.longitude(),
        event.contact_name(),
        event.contact_phone()
    )
}

fn store_error(err: alert_core::store::StoreError) -> io::Error {
    io::Error::other(err.to_string())
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path, header: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        writeln!(logger.writer, "# {header}")?;
        writeln!(
            logger.writer,
            "# Timestamps are virtual milliseconds since session start"
        )?;
        writeln!(logger.writer)?;
        logger.writer.flush()?;
        Ok(logger)
    }

    fn append_line(&mut self, elapsed: Duration, role: Role, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scratch(PathBuf);

    impl Scratch {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "wristguard-session-{name}-{}",
                std::process::id()
            ));
            let _ = fs::remove_dir_all(&dir);
            Self(dir)
        }

        fn session(&self) -> Session {
            let options = SessionOptions::new(
                self.0.join("transcript.log"),
                self.0.join("state"),
                1_700_000_000.0,
            );
            Session::new(&options).expect("session")
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn run(session: &mut Session, command: &str) -> Vec<String> {
        session
            .handle_command(command)
            .expect("command")
            .into_iter()
            .map(|line| line.text)
            .collect()
    }

    fn mentions(lines: &[String], needle: &str) -> bool {
        lines.iter().any(|line| line.contains(needle))
    }

    #[test]
    fn fall_is_delivered_directly_after_countdown() {
        let scratch = Scratch::new("fall");
        let mut session = scratch.session();
        run(&mut session, "contact Sam Lee 555-0100");
        run(&mut session, "wearer Ada");
        run(&mut session, "location 47.6 -122.3");
        run(&mut session, "start");

        let lines = run(&mut session, "shake 11");
        assert!(mentions(&lines, "countdown started: 10s to cancel"));
        assert!(!mentions(&lines, "alert delivered"));

        let lines = run(&mut session, "rest 11");
        assert!(mentions(&lines, "alert delivered via direct"));
        assert!(mentions(&lines, "text via url: sms:5550100&body=Ada%20may%20need%20help."));
        assert_eq!(session.phone().history().len(), 1);
    }

    #[test]
    fn cancelled_countdown_sends_nothing() {
        let scratch = Scratch::new("cancel");
        let mut session = scratch.session();
        run(&mut session, "contact Sam 5550100");
        run(&mut session, "start");
        run(&mut session, "shake 11");

        let lines = run(&mut session, "cancel");
        assert!(mentions(&lines, "OK countdown cancelled"));
        run(&mut session, "rest 15");
        assert!(session.phone().history().is_empty());
    }

    #[test]
    fn unreachable_phone_receives_queued_alert_later() {
        let scratch = Scratch::new("queued");
        let mut session = scratch.session();
        run(&mut session, "contact Sam 5550100");
        run(&mut session, "link unreachable");

        let lines = run(&mut session, "test");
        assert!(mentions(&lines, "alert delivered via store-and-forward"));
        assert!(session.phone().history().is_empty());

        let lines = run(&mut session, "link reachable");
        assert!(mentions(&lines, "flushing 1 queued transfer(s)"));
        assert_eq!(session.phone().history().len(), 1);
    }

    #[test]
    fn unpaired_failure_can_be_retried() {
        let scratch = Scratch::new("retry");
        let mut session = scratch.session();
        run(&mut session, "contact Sam 5550100");
        run(&mut session, "link unpaired");

        let lines = run(&mut session, "test");
        assert!(mentions(&lines, "(type `retry`)"));

        run(&mut session, "link reachable");
        let lines = run(&mut session, "retry");
        assert!(mentions(&lines, "alert delivered via direct"));
    }

    #[test]
    fn trigger_without_contact_prompts() {
        let scratch = Scratch::new("nocontact");
        let mut session = scratch.session();
        run(&mut session, "start");

        let lines = run(&mut session, "shake 11");
        assert!(mentions(&lines, "no emergency contact set"));
        assert!(!mentions(&lines, "countdown started"));
    }

    #[test]
    fn settings_survive_restart() {
        let scratch = Scratch::new("restart");
        {
            let mut session = scratch.session();
            run(&mut session, "contact Sam 5550100");
            run(&mut session, "test");
        }

        let mut session = scratch.session();
        let lines = run(&mut session, "status");
        assert!(mentions(&lines, "contact=Sam 5550100"));
        assert_eq!(session.phone().history().len(), 1);
    }

    #[test]
    fn bad_arguments_are_reported() {
        let scratch = Scratch::new("usage");
        let mut session = scratch.session();

        assert!(mentions(&run(&mut session, "shake soon"), "ERR expected seconds"));
        assert!(mentions(&run(&mut session, "link sideways"), "ERR usage: link"));
        assert!(mentions(&run(&mut session, "fly"), "ERR unknown command `fly`"));
        assert!(mentions(&run(&mut session, "cancel"), "ERR cancel"));
    }
}
