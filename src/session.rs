//! The command/response exchange with the sonar controller.
//!
//! The controller is strictly half duplex. After every command it echoes
//! the command back, sends its answer (if any), and then sends a prompt
//! byte (`*`) when it is ready for the next one. A session therefore never
//! has more than one command in flight:
//!
//! ```text
//! host:   CR LF                    -> device: ... *
//! host:   CP 0F CR LF   (x2)       -> device: CP 0F CR LF ... *
//! host:   RT 0001 CR LF            -> device: RT 0001 CR LF  01F4 ... *
//! host:   RT 0002 CR LF            -> device: RT 0002 CR LF  0FA0 ... *
//! host:   RT 0003 CR LF            -> device: RT 0003 CR LF  0033 ... *
//! ```

use crate::channel::ByteChannel;
use crate::command::{Command, LINE_END};
use crate::config::ProtocolSettings;
use crate::reading::{ChannelSample, Reading};
use crate::reply_decoder::RangeReply;

use log::{debug, info, trace};
use std::{
    borrow::Cow,
    fmt, io,
    time::{Duration, Instant},
};

/// Everything that can go wrong while talking to the controller.
#[derive(Debug)]
pub enum SonarError {
    /// The channel failed underneath us.
    IoError(io::Error),

    /// A range reply was not four hex digits.
    MalformedReply(nom::error::Error<String>),

    /// The controller went quiet for longer than the configured maximum wait.
    Timeout {
        /// What we were waiting for
        waiting_for: Cow<'static, str>,
        /// How long we waited
        waited: Duration,
    },
}

impl fmt::Display for SonarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use SonarError as SE;
        let msg = match self {
            SE::IoError(error) => Cow::from(format!("io error: {}", error)),
            SE::MalformedReply(error) => {
                Cow::from(format!("malformed reply {:?}: {:?}", error.input, error.code))
            }
            SE::Timeout {
                waiting_for,
                waited,
            } => Cow::from(format!("gave up on {} after {:?}", waiting_for, waited)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for SonarError {}

impl From<io::Error> for SonarError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<nom::error::Error<String>> for SonarError {
    fn from(value: nom::error::Error<String>) -> Self {
        Self::MalformedReply(value)
    }
}

/// An open conversation with the controller over some [`ByteChannel`].
///
/// The session owns its channel outright; nothing else may touch the wire
/// while it is alive.
pub struct SonarSession<C: ByteChannel> {
    channel: C,
    settings: ProtocolSettings,
}

impl<C: ByteChannel> SonarSession<C> {
    /// Wrap an already opened channel. Nothing is sent until
    /// [`start`](Self::start) or a command method is called.
    pub fn new(channel: C, settings: ProtocolSettings) -> Self {
        Self { channel, settings }
    }

    /// The settings this session was created with.
    pub fn settings(&self) -> &ProtocolSettings {
        &self.settings
    }

    /// Give the channel back, e.g. to inspect what a test device received.
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Wake the controller up and power the transducers on. Must be called
    /// once before [`read_all`](Self::read_all).
    pub fn start(&mut self) -> Result<(), SonarError> {
        self.prime()?;
        info!("Turning power on.");
        for _ in 0..self.settings.power_on_repeats {
            self.send_command(Command::PowerOn)?;
            self.wait_for_prompt()?;
        }
        Ok(())
    }

    /// Send a bare line terminator and wait for the first prompt.
    pub fn prime(&mut self) -> Result<(), SonarError> {
        self.channel.send(LINE_END)?;
        self.wait_for_prompt()?;
        debug!("Controller is prompting");
        Ok(())
    }

    /// Write a command and its terminator.
    pub fn send_command(&mut self, command: Command) -> Result<(), SonarError> {
        trace!("-> {}", command);
        self.channel.send(&command.to_wire())?;
        Ok(())
    }

    /// Poll one channel and return its distance. Leaves the controller at a
    /// prompt, ready for the next command.
    pub fn read_channel(&mut self, channel: u8) -> Result<i32, SonarError> {
        let command = Command::ReadRange(channel);
        self.send_command(command)?;

        let echo = self.read_exact(self.settings.echo_len)?;
        if echo != command.to_wire() {
            debug!(
                "Unexpected echo for {}: {:?}",
                command,
                String::from_utf8_lossy(&echo)
            );
        }

        let raw = self.read_exact(self.settings.reply_len)?;
        let reply = RangeReply::from_bytes(&raw)?;
        trace!("<- {} = {:?}", command, reply);

        self.wait_for_prompt()?;
        Ok(reply.distance())
    }

    /// One full sweep over every configured channel.
    pub fn read_all(&mut self) -> Result<Reading, SonarError> {
        let channels = self.settings.channels.clone();
        let samples = channels
            .into_iter()
            .map(|channel| {
                self.read_channel(channel)
                    .map(|distance| ChannelSample { channel, distance })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Reading { samples })
    }

    /// Consume bytes one at a time until the prompt byte goes by.
    pub fn wait_for_prompt(&mut self) -> Result<(), SonarError> {
        let started = Instant::now();
        let mut byte = [0u8; 1];
        loop {
            self.wait_for_ready_since(1, started, "prompt")?;
            self.channel.receive(&mut byte)?;
            if byte[0] == self.settings.prompt {
                return Ok(());
            }
        }
    }

    /// Block until at least `n` bytes are buffered on the channel.
    pub fn wait_for_ready(&mut self, n: usize) -> Result<(), SonarError> {
        self.wait_for_ready_since(n, Instant::now(), "reply bytes")
    }

    fn wait_for_ready_since(
        &mut self,
        n: usize,
        started: Instant,
        waiting_for: &'static str,
    ) -> Result<(), SonarError> {
        while self.channel.available()? < n {
            if let Some(max_wait) = self.settings.max_wait() {
                let waited = started.elapsed();
                if waited >= max_wait {
                    return Err(SonarError::Timeout {
                        waiting_for: Cow::from(waiting_for),
                        waited,
                    });
                }
            }
            spin_sleep::sleep(self.settings.poll_interval());
        }
        Ok(())
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, SonarError> {
        self.wait_for_ready(n)?;
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            let got = self.channel.receive(&mut buf[filled..])?;
            if got == 0 {
                return Err(SonarError::IoError(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "channel reported bytes it could not deliver",
                )));
            }
            filled += got;
        }
        Ok(buf)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// A channel that plays back a fixed byte script and records what was
    /// sent to it.
    #[derive(Default)]
    pub(crate) struct ScriptedChannel {
        pub incoming: VecDeque<u8>,
        pub sent: Vec<u8>,
    }

    impl ScriptedChannel {
        pub fn with_script(script: &[u8]) -> Self {
            Self {
                incoming: script.iter().copied().collect(),
                sent: Vec::new(),
            }
        }
    }

    impl ByteChannel for ScriptedChannel {
        fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.sent.extend_from_slice(bytes);
            Ok(())
        }

        fn available(&mut self) -> io::Result<usize> {
            Ok(self.incoming.len())
        }

        fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            Ok(crate::channel::drain_into(&mut self.incoming, buf))
        }
    }

    fn quick_settings() -> ProtocolSettings {
        ProtocolSettings {
            poll_interval_ms: 1,
            max_wait_ms: Some(20),
            ..ProtocolSettings::default()
        }
    }

    const STARTUP: &[u8] = b"\r\n*CP 0F\r\n*CP 0F\r\n*";

    #[test]
    fn startup_and_one_sweep() {
        let mut script = STARTUP.to_vec();
        script.extend_from_slice(b"RT 0001\r\n01F4\r\n*");
        script.extend_from_slice(b"RT 0002\r\n0fa0\r\n*");
        script.extend_from_slice(b"RT 0003\r\n0033\r\n*");

        let mut session = SonarSession::new(ScriptedChannel::with_script(&script), quick_settings());
        session.start().unwrap();
        let reading = session.read_all().unwrap();

        assert_eq!(reading.distances(), vec![500, 4000, 51]);
        assert_eq!(
            reading.samples.iter().map(|s| s.channel).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let channel = session.into_channel();
        assert_eq!(
            channel.sent,
            b"\r\nCP 0F\r\nCP 0F\r\nRT 0001\r\nRT 0002\r\nRT 0003\r\n".to_vec()
        );
        assert!(channel.incoming.is_empty());
    }

    #[test]
    fn prompt_wait_skips_noise() {
        let mut session = SonarSession::new(
            ScriptedChannel::with_script(b"garbage\r\n>*left"),
            quick_settings(),
        );
        session.wait_for_prompt().unwrap();
        assert_eq!(session.into_channel().incoming, b"left".to_vec());
    }

    #[test]
    fn mismatched_echo_is_tolerated() {
        let mut session = SonarSession::new(
            ScriptedChannel::with_script(b"XX XXXX\r\n0010*"),
            quick_settings(),
        );
        assert_eq!(session.read_channel(1).unwrap(), 16);
    }

    #[test]
    fn malformed_reply_is_an_error() {
        let mut session = SonarSession::new(
            ScriptedChannel::with_script(b"RT 0001\r\nZZZZ\r\n*"),
            quick_settings(),
        );
        match session.read_channel(1) {
            Err(SonarError::MalformedReply(e)) => assert_eq!(e.input, "ZZZZ"),
            other => panic!("expected a malformed reply, got {:?}", other),
        }
    }

    #[test]
    fn silent_device_times_out() {
        let mut session = SonarSession::new(ScriptedChannel::default(), quick_settings());
        match session.prime() {
            Err(SonarError::Timeout { waited, .. }) => {
                assert!(waited >= Duration::from_millis(20))
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[test]
    fn short_reply_times_out_waiting_for_bytes() {
        let mut session = SonarSession::new(
            ScriptedChannel::with_script(b"RT 0001\r\n01"),
            quick_settings(),
        );
        assert!(matches!(
            session.read_channel(1),
            Err(SonarError::Timeout { .. })
        ));
    }

    #[test]
    fn power_on_repeat_count_is_honoured() {
        let settings = ProtocolSettings {
            power_on_repeats: 1,
            ..quick_settings()
        };
        let mut session =
            SonarSession::new(ScriptedChannel::with_script(b"*CP 0F\r\n*"), settings);
        session.start().unwrap();
        assert_eq!(session.into_channel().sent, b"\r\nCP 0F\r\n".to_vec());
    }
}
