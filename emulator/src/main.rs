mod clock;
mod link;
mod session;
mod sinks;
mod store;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use session::{Line, Role, Session, SessionOptions};

const USAGE: &str = "Usage: wristguard-emulator [--transcript <path>] [--state-dir <dir>] \
                     [--countdown <secs>] [--threshold <g>] [--composer]";

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let color = stdout.is_tty();
    let mut writer = stdout.lock();
    let mut session = Session::new(&options)?;
    let mut line = String::new();

    writeln!(
        writer,
        "Wristguard emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let responses = session.handle_command(trimmed)?;
        for response in responses {
            write_line(&mut writer, &response, color)?;
        }
    }

    Ok(())
}

fn write_line(writer: &mut impl Write, line: &Line, color: bool) -> io::Result<()> {
    if !color {
        return writeln!(writer, "{line}");
    }

    let text = line.to_string();
    match line.role {
        Role::Wrist if line.text.starts_with("WARN") => writeln!(writer, "{}", text.yellow()),
        Role::Wrist => writeln!(writer, "{}", text.cyan()),
        Role::Phone => writeln!(writer, "{}", text.green()),
        Role::Emulator if line.text.starts_with("ERR") => writeln!(writer, "{}", text.red()),
        Role::Emulator | Role::Host => writeln!(writer, "{}", text.dim()),
    }
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<SessionOptions, String> {
    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| format!("system clock before 1970: {err}"))?
        .as_secs_f64();
    let mut options = SessionOptions::new("transcripts/session.log", "state", epoch);
    options.header = "Interactive wristguard emulator session".to_string();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = |name: &str| {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {name}"))
        };

        match flag.as_str() {
            "--transcript" => options.transcript = PathBuf::from(value("--transcript")?),
            "--state-dir" => options.state_dir = PathBuf::from(value("--state-dir")?),
            "--countdown" => {
                let seconds = parse_number(&value("--countdown")?, "--countdown")?;
                options.config.countdown.duration = Duration::try_from_secs_f64(seconds)
                    .map_err(|err| format!("Invalid --countdown: {err}"))?;
            }
            "--threshold" => {
                options.config.signal.threshold_g =
                    parse_number(&value("--threshold")?, "--threshold")?;
            }
            "--composer" => options.composer = true,
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    options
        .config
        .validate()
        .map_err(|err| format!("Invalid configuration: {err}"))?;
    Ok(options)
}

fn parse_number(raw: &str, name: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("Invalid {name} `{raw}`: expected a number"))
}
