//! Commands understood by the sonar controller.

use std::fmt;

/// Line terminator the controller expects after every command.
pub const LINE_END: &[u8] = b"\r\n";

/// A command for the sonar controller. Rendered with [`fmt::Display`],
/// without the trailing [`LINE_END`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch power on to all transducers (`CP 0F`)
    PowerOn,
    /// Fire one channel and report its range (`RT 000n`)
    ReadRange(u8),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PowerOn => write!(f, "CP 0F"),
            Command::ReadRange(channel) => write!(f, "RT {:04}", channel),
        }
    }
}

impl Command {
    /// The bytes put on the wire for this command, terminator included.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut bytes = self.to_string().into_bytes();
        bytes.extend_from_slice(LINE_END);
        bytes
    }
}
