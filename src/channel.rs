//! The byte channel a [`SonarSession`](crate::session::SonarSession) talks
//! through. The session only needs three things from the wire: push bytes
//! out, ask how many bytes are waiting, and pull some of them in. Anything
//! that can do that (a real serial port, the [`DummySonar`](crate::dummy_sonar::DummySonar),
//! a scripted buffer in a test) can drive the protocol.

use log::debug;
use serde::{Deserialize, Serialize};
use serial2::{CharSize, FlowControl, Parity, SerialPort, StopBits};
use std::{collections::VecDeque, fmt, io, path::Path, time::Duration};

/// How long a single poll of the serial port may block while checking for
/// newly arrived bytes.
const PORT_POLL_TIMEOUT: Duration = Duration::from_millis(1);

/// A half-duplex byte pipe to the sonar controller.
pub trait ByteChannel {
    /// Write every byte of `bytes` to the device.
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Number of received bytes that can be read right now without blocking.
    fn available(&mut self) -> io::Result<usize>;

    /// Move up to `buf.len()` already-available bytes into `buf`, returning
    /// how many were moved.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Parity setting for the serial line. Mirrors [`serial2::Parity`] so that it
/// can live in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LineParity {
    /// No parity bit
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

/// Framing parameters for the serial line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LineSettings {
    /// Baud rate, 9600 for the sonar controller
    pub baud_rate: u32,
    /// Number of data bits per character, 5 through 8
    pub data_bits: u8,
    /// Number of stop bits, 1 or 2
    pub stop_bits: u8,
    /// Parity
    pub parity: LineParity,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: LineParity::None,
        }
    }
}

impl LineSettings {
    fn char_size(&self) -> io::Result<CharSize> {
        match self.data_bits {
            5 => Ok(CharSize::Bits5),
            6 => Ok(CharSize::Bits6),
            7 => Ok(CharSize::Bits7),
            8 => Ok(CharSize::Bits8),
            n => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported number of data bits: {n}"),
            )),
        }
    }

    fn stop_bits(&self) -> io::Result<StopBits> {
        match self.stop_bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            n => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported number of stop bits: {n}"),
            )),
        }
    }

    fn parity(&self) -> Parity {
        match self.parity {
            LineParity::None => Parity::None,
            LineParity::Odd => Parity::Odd,
            LineParity::Even => Parity::Even,
        }
    }
}

/// Conventional short form, e.g. `9600 8-N-1`.
impl fmt::Display for LineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            LineParity::None => 'N',
            LineParity::Odd => 'O',
            LineParity::Even => 'E',
        };
        write!(
            f,
            "{} {}-{}-{}",
            self.baud_rate, self.data_bits, parity, self.stop_bits
        )
    }
}

/// A [`ByteChannel`] backed by a real serial port.
///
/// serial2 has no way to ask the driver how many bytes are queued, so we
/// keep our own queue: every call to [`available`](ByteChannel::available)
/// does one short read and appends whatever arrived.
pub struct SerialChannel {
    port: SerialPort,
    pending: VecDeque<u8>,
    scratch: [u8; 256],
}

impl SerialChannel {
    /// Open the port at `path` with the given line settings. Raw mode, no
    /// flow control.
    pub fn open(path: impl AsRef<Path>, line: &LineSettings) -> io::Result<Self> {
        let char_size = line.char_size()?;
        let stop_bits = line.stop_bits()?;
        let parity = line.parity();
        let baud_rate = line.baud_rate;

        let mut port = SerialPort::open(path.as_ref(), |mut settings: serial2::Settings| {
            settings.set_raw();
            settings.set_baud_rate(baud_rate)?;
            settings.set_char_size(char_size);
            settings.set_stop_bits(stop_bits);
            settings.set_parity(parity);
            settings.set_flow_control(FlowControl::None);
            Ok(settings)
        })?;
        port.set_read_timeout(PORT_POLL_TIMEOUT)?;
        debug!("Opened {} with {:?}", path.as_ref().display(), line);

        Ok(Self {
            port,
            pending: VecDeque::new(),
            scratch: [0; 256],
        })
    }
}

impl ByteChannel for SerialChannel {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }

    fn available(&mut self) -> io::Result<usize> {
        match self.port.read(&mut self.scratch) {
            Ok(n) => self.pending.extend(&self.scratch[..n]),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {}
            Err(e) => return Err(e),
        }
        Ok(self.pending.len())
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(drain_into(&mut self.pending, buf))
    }
}

/// Move as many bytes as fit from the front of `queue` into `buf`.
pub(crate) fn drain_into(queue: &mut VecDeque<u8>, buf: &mut [u8]) -> usize {
    let n = buf.len().min(queue.len());
    for (slot, byte) in buf.iter_mut().zip(queue.drain(..n)) {
        *slot = byte;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_line_is_9600_8n1() {
        let line = LineSettings::default();
        assert_eq!(line.baud_rate, 9600);
        assert_eq!(line.char_size().unwrap(), CharSize::Bits8);
        assert_eq!(line.stop_bits().unwrap(), StopBits::One);
        assert_eq!(line.parity(), Parity::None);
    }

    #[test]
    fn line_settings_read_like_a_datasheet() {
        assert_eq!(LineSettings::default().to_string(), "9600 8-N-1");
        let line = LineSettings {
            baud_rate: 19200,
            data_bits: 7,
            parity: LineParity::Even,
            stop_bits: 2,
        };
        assert_eq!(line.to_string(), "19200 7-E-2");
    }

    #[test]
    fn rejects_odd_framing() {
        let line = LineSettings {
            data_bits: 9,
            stop_bits: 3,
            ..LineSettings::default()
        };
        assert!(line.char_size().is_err());
        assert!(line.stop_bits().is_err());
    }

    #[test]
    fn drain_stops_at_buffer_length() {
        let mut queue: VecDeque<u8> = b"RT 0001\r\n".iter().copied().collect();
        let mut buf = [0u8; 4];

        assert_eq!(drain_into(&mut queue, &mut buf), 4);
        assert_eq!(&buf, b"RT 0");
        assert_eq!(queue.len(), 5);

        let mut big = [0u8; 16];
        assert_eq!(drain_into(&mut queue, &mut big), 5);
        assert_eq!(&big[..5], b"001\r\n");
        assert!(queue.is_empty());
    }
}
