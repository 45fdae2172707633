//! A pretend sonar controller, so the harness can be exercised without any
//! hardware on the bench.
//!
//! [`DummySonar`] speaks the same line protocol as the real controller: it
//! echoes every command, answers range requests with four hex digits, and
//! prompts with `*` when it is done. Distances wander around a configurable
//! range with a bit of noise, and every range request takes a while to
//! answer, like a real ping would.

use crate::channel::{drain_into, ByteChannel};

use log::trace;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    collections::VecDeque,
    io,
    time::{Duration, Instant},
};

/// Distances are clamped to what four hex digits can carry.
const MAX_DISTANCE: f64 = u16::MAX as f64;

/// A simulated sonar controller implementing [`ByteChannel`].
pub struct DummySonar {
    rng: StdRng,
    line: Vec<u8>,
    outgoing: VecDeque<u8>,
    powered: bool,
    distances: Vec<f64>,
    range: f64,
    noise: f64,
    latency: Duration,
    ready_at: Instant,
}

/// Configures a [`DummySonar`] before building it.
#[derive(Debug, Clone)]
pub struct DummySonarBuilder {
    num_channels: usize,
    range: f64,
    noise: f64,
    latency: Duration,
    seed: Option<u64>,
}

impl Default for DummySonarBuilder {
    fn default() -> Self {
        Self {
            num_channels: 3,
            range: 2000.0,
            noise: 50.0,
            latency: Duration::from_millis(50),
            seed: None,
        }
    }
}

impl DummySonarBuilder {
    /// How many channels the controller answers for. Channels are numbered
    /// from 1.
    pub fn num_channels(mut self, num_channels: usize) -> Self {
        self.num_channels = num_channels;
        self
    }

    /// Center of the distances reported, in raw controller units.
    pub fn range(mut self, range: f64) -> Self {
        self.range = range;
        self
    }

    /// Largest step a distance takes between two readings.
    pub fn noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    /// How long a range request takes to answer. Nothing the controller
    /// sends after a range request is readable before this has passed.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fix the random seed, for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the controller. It starts powered off, like the real one.
    pub fn build(self) -> DummySonar {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        DummySonar {
            rng,
            line: Vec::new(),
            outgoing: VecDeque::new(),
            powered: false,
            distances: vec![self.range; self.num_channels],
            range: self.range,
            noise: self.noise,
            latency: self.latency,
            ready_at: Instant::now(),
        }
    }
}

impl DummySonar {
    /// Start configuring a new controller.
    pub fn builder() -> DummySonarBuilder {
        DummySonarBuilder::default()
    }

    /// Whether a power-on command has been received.
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    fn respond(&mut self, line: &str) {
        trace!("dummy sonar got {:?}", line);
        if !line.is_empty() {
            self.outgoing.extend(line.as_bytes());
            self.outgoing.extend(b"\r\n");
        }

        match line.split_once(' ') {
            Some(("CP", _)) => self.powered = true,
            Some(("RT", arg)) => match arg.parse::<usize>() {
                Ok(channel) if self.powered && (1..=self.distances.len()).contains(&channel) => {
                    let distance = self.step(channel - 1);
                    self.ready_at = Instant::now() + self.latency;
                    self.outgoing.extend(format!("{:04X}\r\n", distance).as_bytes());
                }
                // unpowered or unknown channels read as zero
                Ok(_) => self.outgoing.extend(b"0000\r\n"),
                Err(_) => self.outgoing.extend(b"?\r\n"),
            },
            _ if line.is_empty() => {}
            _ => self.outgoing.extend(b"?\r\n"),
        }

        self.outgoing.push_back(b'*');
    }

    fn step(&mut self, idx: usize) -> u16 {
        let jitter = if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..self.noise)
        } else {
            0.0
        };
        // drift back toward the center so readings stay in a sane band
        let pulled = self.distances[idx] + jitter + (self.range - self.distances[idx]) * 0.1;
        self.distances[idx] = pulled.clamp(0.0, MAX_DISTANCE);
        self.distances[idx].round() as u16
    }
}

impl ByteChannel for DummySonar {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &b in bytes {
            match b {
                b'\r' => {}
                b'\n' => {
                    let line = String::from_utf8_lossy(&self.line).into_owned();
                    self.line.clear();
                    self.respond(line.trim());
                }
                _ => self.line.push(b),
            }
        }
        Ok(())
    }

    fn available(&mut self) -> io::Result<usize> {
        if Instant::now() < self.ready_at {
            return Ok(0);
        }
        Ok(self.outgoing.len())
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if Instant::now() < self.ready_at {
            return Ok(0);
        }
        Ok(drain_into(&mut self.outgoing, buf))
    }
}
