//! Where readings go once the session has produced them.
//!
//! A [`ReadingSink`] is the last stage of the harness: [`pump`] pulls
//! readings out of a [`SonarSession`] and hands each one to a sink, which
//! may log it, record it, or forward it to the display thread.

use crate::channel::ByteChannel;
use crate::reading::Reading;
use crate::session::{SonarError, SonarSession};

use log::{info, warn};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    sync::mpsc::Sender,
};

/// Consumes readings as they are produced.
pub trait ReadingSink {
    /// Handle one reading. Returning an error stops the pump.
    fn accept(&mut self, reading: Reading) -> io::Result<()>;

    /// Called once after the last reading.
    fn finalize(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes every reading to the log at info level.
#[derive(Debug, Default)]
pub struct LogSink;

impl ReadingSink for LogSink {
    fn accept(&mut self, reading: Reading) -> io::Result<()> {
        info!("Reading: {}", reading);
        Ok(())
    }
}

/// Appends every reading to a file, one [ron] value per line.
pub struct RecordSink<W: Write> {
    out: W,
    written: usize,
}

impl RecordSink<BufWriter<File>> {
    /// Create (or truncate) the file at `path` and record into it.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> RecordSink<W> {
    /// Record into any writer.
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Number of readings recorded so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl<W: Write> ReadingSink for RecordSink<W> {
    fn accept(&mut self, reading: Reading) -> io::Result<()> {
        let line = ron::ser::to_string(&reading)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(self.out, "{}", line)?;
        self.written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> io::Result<()> {
        info!("Recorded {} readings", self.written);
        self.out.flush()
    }
}

/// Forwards readings to another thread. Fails once the receiver hangs up.
impl ReadingSink for Sender<Reading> {
    fn accept(&mut self, reading: Reading) -> io::Result<()> {
        self.send(reading)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "reading receiver hung up"))
    }
}

/// Why [`pump`] stopped early.
#[derive(Debug)]
pub enum PumpError {
    /// The controller conversation failed.
    Sonar(SonarError),
    /// The sink refused a reading.
    Sink(io::Error),
}

impl std::fmt::Display for PumpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PumpError::Sonar(e) => write!(f, "sonar: {}", e),
            PumpError::Sink(e) => write!(f, "sink: {}", e),
        }
    }
}

impl std::error::Error for PumpError {}

/// Poll the session `cycles` times (forever if `None`), feeding each
/// reading to `sink`. The sink is finalized however the loop ends. Returns
/// the number of readings delivered.
pub fn pump<C, S>(
    session: &mut SonarSession<C>,
    sink: &mut S,
    cycles: Option<usize>,
) -> Result<usize, PumpError>
where
    C: ByteChannel,
    S: ReadingSink + ?Sized,
{
    let mut delivered = 0;
    let result = loop {
        if cycles.is_some_and(|n| delivered >= n) {
            break Ok(delivered);
        }
        let reading = match session.read_all() {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Polling stopped after {} readings: {}", delivered, e);
                break Err(PumpError::Sonar(e));
            }
        };
        if let Err(e) = sink.accept(reading) {
            warn!("Sink refused reading {}: {}", delivered + 1, e);
            break Err(PumpError::Sink(e));
        }
        delivered += 1;
    };

    if let Err(e) = sink.finalize() {
        warn!("Error while finalizing sink: {}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolSettings;
    use crate::dummy_sonar::DummySonar;
    use crate::session::tests::ScriptedChannel;
    use std::{fs, sync::mpsc::channel, time::Duration};

    fn dummy_session() -> SonarSession<DummySonar> {
        let mut session = SonarSession::new(
            DummySonar::builder()
                .seed(3)
                .latency(Duration::ZERO)
                .build(),
            ProtocolSettings {
                poll_interval_ms: 1,
                max_wait_ms: Some(100),
                ..ProtocolSettings::default()
            },
        );
        session.start().unwrap();
        session
    }

    #[test]
    fn pump_stops_after_requested_cycles() {
        let mut session = dummy_session();
        let (mut tx, rx) = channel::<Reading>();

        assert_eq!(pump(&mut session, &mut tx, Some(4)).unwrap(), 4);
        drop(tx);
        assert_eq!(rx.iter().count(), 4);
    }

    #[test]
    fn pump_reports_hung_up_receiver() {
        let mut session = dummy_session();
        let (mut tx, rx) = channel::<Reading>();
        drop(rx);

        assert!(matches!(
            pump(&mut session, &mut tx, None),
            Err(PumpError::Sink(_))
        ));
    }

    #[test]
    fn pump_ends_on_malformed_reply() {
        let mut session = SonarSession::new(
            ScriptedChannel::with_script(b"RT 0001\r\n0001*RT 0002\r\nnope*"),
            ProtocolSettings {
                poll_interval_ms: 1,
                max_wait_ms: Some(20),
                ..ProtocolSettings::default()
            },
        );
        let mut sink = LogSink;

        assert!(matches!(
            pump(&mut session, &mut sink, None),
            Err(PumpError::Sonar(SonarError::MalformedReply(_)))
        ));
    }

    #[test]
    fn record_sink_writes_one_line_per_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.ron");

        let mut session = dummy_session();
        let mut sink = RecordSink::create(&path).unwrap();
        pump(&mut session, &mut sink, Some(3)).unwrap();
        assert_eq!(sink.written(), 3);

        let text = fs::read_to_string(&path).unwrap();
        let readings: Vec<Reading> = text
            .lines()
            .map(|line| ron::de::from_str(line).unwrap())
            .collect();
        assert_eq!(readings.len(), 3);
        assert!(readings.iter().all(|r| r.samples.len() == 3));
    }
}
