use std::fs;
use std::io;
use std::path::Path;

#[path = "../clock.rs"]
mod clock;
#[path = "../link.rs"]
mod link;
#[allow(dead_code)]
#[path = "../session.rs"]
mod session;
#[path = "../sinks.rs"]
mod sinks;
#[path = "../store.rs"]
mod store;

use session::{Session, SessionOptions};

/// Fixed wall clock so captured transcripts are reproducible.
const EPOCH: f64 = 1_700_000_000.0;

const SCENARIOS: &[(&str, &[&str])] = &[
    (
        "fall-delivered",
        &[
            "contact Sam Lee 555-0100",
            "wearer Ada",
            "location 47.620500 -122.349300",
            "start",
            "rest 2",
            "shake 11",
            "rest 11",
            "history",
            "status",
        ],
    ),
    (
        "fall-cancelled",
        &[
            "contact Sam Lee 555-0100",
            "start",
            "shake 12",
            "cancel",
            "rest 3",
            "history",
            "status",
        ],
    ),
    (
        "unreachable-fallback",
        &[
            "contact Sam Lee 555-0100",
            "link unreachable",
            "start",
            "shake 11",
            "rest 11",
            "history",
            "link reachable",
            "history",
        ],
    ),
    (
        "unpaired-retry",
        &[
            "contact Sam Lee 555-0100",
            "link unpaired",
            "test",
            "status",
            "link reachable",
            "retry",
            "history",
        ],
    ),
    (
        "missing-contact",
        &["start", "shake 11", "status", "contact Sam 5550100", "shake 11", "cancel"],
    ),
];

fn main() -> io::Result<()> {
    for (name, commands) in SCENARIOS {
        record(name, commands)?;
    }
    Ok(())
}

fn record(name: &str, commands: &[&str]) -> io::Result<()> {
    let state_dir = Path::new("target").join("transcript-state").join(name);
    match fs::remove_dir_all(&state_dir) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    let mut options = SessionOptions::new(
        Path::new("transcripts").join(format!("{name}.log")),
        state_dir,
        EPOCH,
    );
    options.header = format!("Scenario: {name}");

    let mut session = Session::new(&options)?;
    for command in commands {
        let _ = session.handle_command(command)?;
    }
    Ok(())
}
