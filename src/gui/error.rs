use std::{error::Error, fmt::Display};

use crate::sink::PumpError;

/// Anything that can end a terminal screen early.
#[derive(Debug)]
pub enum SonarGuiError {
    /// The terminal could not be set up, drawn to, or restored.
    IOError(std::io::Error),
    /// The polling thread panicked.
    JoinError,
    /// The polling thread stopped on a sonar or sink failure.
    Pump(PumpError),
}

impl Display for SonarGuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pump(e) => write!(f, "{}", e),
            _ => write!(f, "{:#?}", self),
        }
    }
}

impl Error for SonarGuiError {}

impl From<std::io::Error> for SonarGuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<PumpError> for SonarGuiError {
    fn from(value: PumpError) -> Self {
        Self::Pump(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SonarError;
    use std::io;

    #[test]
    fn pump_failures_read_like_the_pump() {
        let err: SonarGuiError = PumpError::Sonar(SonarError::IoError(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "unplugged",
        )))
        .into();
        assert_eq!(err.to_string(), "sonar: io error: unplugged");
    }

    #[test]
    fn terminal_failures_convert() {
        let err: SonarGuiError = io::Error::new(io::ErrorKind::Other, "no tty").into();
        assert!(matches!(err, SonarGuiError::IOError(_)));
    }
}
