//! Operator console.
//!
//! A reader thread forwards input lines over a channel so the poll loop stays
//! the only code touching the endpoint.

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

/// An operator request parsed from one console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// Resource discovery on a remote mote: `search <mote> <resource>`.
    Search {
        /// Mote host name.
        mote: String,
        /// Resource name to look for.
        resource: String,
    },
    /// Mote directory listing: `motes`.
    Motes,
    /// Anything else goes to the peer as a console keyword.
    Command(String),
}

impl ConsoleInput {
    /// Parse one console line. Blank lines and a `search` missing its mote or
    /// resource yield `None`.
    pub fn parse(line: &str) -> Option<ConsoleInput> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let mut words = line.split_whitespace();
        match words.next() {
            Some("search") => {
                let mote = words.next()?.to_string();
                let resource = words.next()?.to_string();
                Some(ConsoleInput::Search { mote, resource })
            }
            Some("motes") if words.next().is_none() => Some(ConsoleInput::Motes),
            _ => Some(ConsoleInput::Command(line.to_string())),
        }
    }
}

/// Spawn a thread sending each non-blank line of `reader` to the returned
/// channel. The channel disconnects at end of input.
pub fn spawn<R>(reader: R) -> io::Result<(Receiver<ConsoleInput>, JoinHandle<()>)>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::unbounded();
    let thread = thread::Builder::new()
        .name("console".to_string())
        .spawn(move || forward_lines(reader, &tx))?;
    Ok((rx, thread))
}

fn forward_lines<R: BufRead>(reader: R, tx: &Sender<ConsoleInput>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!("console input failed: {}", e);
                break;
            }
        };
        let Some(input) = ConsoleInput::parse(&line) else {
            if !line.trim().is_empty() {
                debug!("ignoring incomplete console line {:?}", line);
            }
            continue;
        };
        if tx.send(input).is_err() {
            break;
        }
    }
    debug!("console input closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_console_lines() {
        assert_eq!(ConsoleInput::parse("   "), None);
        assert_eq!(ConsoleInput::parse("motes"), Some(ConsoleInput::Motes));
        assert_eq!(
            ConsoleInput::parse("search node1.local temp"),
            Some(ConsoleInput::Search {
                mote: "node1.local".to_string(),
                resource: "temp".to_string(),
            })
        );
        assert_eq!(
            ConsoleInput::parse(" chan=26 "),
            Some(ConsoleInput::Command("chan=26".to_string()))
        );
    }

    #[test]
    fn test_incomplete_search_is_dropped() {
        assert_eq!(ConsoleInput::parse("search"), None);
        assert_eq!(ConsoleInput::parse("search node1.local"), None);
    }

    #[test]
    fn test_spawn_forwards_until_end_of_input() {
        let input = Cursor::new(b"temp\n\nmotes\nwake\n".to_vec());
        let (rx, thread) = spawn(input).unwrap();
        thread.join().unwrap();

        let received: Vec<ConsoleInput> = rx.iter().collect();
        assert_eq!(
            received,
            vec![
                ConsoleInput::Command("temp".to_string()),
                ConsoleInput::Motes,
                ConsoleInput::Command("wake".to_string()),
            ]
        );
    }
}
