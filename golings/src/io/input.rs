//! Terminal commands typed while the watch loop runs.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::Sender;
use std::thread;

use tracing::{debug, warn};

use crate::core::machine::Input;

pub const HELP: &str = "\
commands:
  hint, h   show the hint for the current exercise
  run, r    verify the current exercise now
  list, l   list all exercises and their status
  quit, q   stop watching
  help      show this message";

/// A single line of user input, parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalCommand {
    Hint,
    Run,
    List,
    Quit,
    Help,
}

impl TerminalCommand {
    /// Input for the state machine; `Help` is answered locally.
    pub fn to_input(self) -> Option<Input> {
        match self {
            Self::Hint => Some(Input::Hint),
            Self::Run => Some(Input::RunNow),
            Self::List => Some(Input::List),
            Self::Quit => Some(Input::Quit),
            Self::Help => None,
        }
    }
}

pub fn parse_command(line: &str) -> Option<TerminalCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "h" | "hint" => Some(TerminalCommand::Hint),
        "r" | "run" => Some(TerminalCommand::Run),
        "l" | "list" => Some(TerminalCommand::List),
        "q" | "quit" | "exit" => Some(TerminalCommand::Quit),
        "?" | "help" => Some(TerminalCommand::Help),
        _ => None,
    }
}

/// Read commands from stdin on a background thread.
///
/// End of input counts as `quit` so a closed terminal never leaves the loop
/// running unattended.
pub fn spawn_stdin_reader(tx: Sender<Input>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        forward_commands(stdin.lock(), io::stdout(), &tx);
    })
}

/// Forward parsed commands from `reader` until EOF, `quit`, or the loop exits.
pub fn forward_commands<R: BufRead, W: Write>(reader: R, mut out: W, tx: &Sender<Input>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(%err, "reading terminal input failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = parse_command(&line) else {
            let _ = writeln!(out, "unknown command: {}\n{HELP}", line.trim());
            continue;
        };
        debug!(?command, "terminal command");
        let Some(input) = command.to_input() else {
            let _ = writeln!(out, "{HELP}");
            continue;
        };
        if tx.send(input).is_err() || command == TerminalCommand::Quit {
            return;
        }
    }
    let _ = tx.send(Input::Quit);
}
