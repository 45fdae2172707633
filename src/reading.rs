//! One polling cycle's worth of range data.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// The range reported by a single sonar channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChannelSample {
    /// Channel number as addressed on the wire
    pub channel: u8,
    /// Raw distance value reported by the controller
    pub distance: i32,
}

/// A complete sweep over every configured channel. Each new [`Reading`]
/// replaces the previous one; nothing is accumulated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Reading {
    /// One sample per channel, in polling order
    pub samples: Vec<ChannelSample>,
}

impl Reading {
    /// Distances only, in polling order.
    pub fn distances(&self) -> Vec<i32> {
        self.samples.iter().map(|s| s.distance).collect()
    }
}

impl Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .samples
            .iter()
            .map(|s| format!("ch{}={}", s.channel, s.distance))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_channels() {
        let reading = Reading {
            samples: vec![
                ChannelSample {
                    channel: 1,
                    distance: 500,
                },
                ChannelSample {
                    channel: 2,
                    distance: 12,
                },
            ],
        };
        assert_eq!(reading.to_string(), "[ch1=500, ch2=12]");
        assert_eq!(reading.distances(), vec![500, 12]);
    }
}
