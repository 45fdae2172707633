//! Decodes the fixed-width ASCII-hex range replies sent by the sonar
//! controller.

use nom::{
    bytes::complete::take_while_m_n, combinator::map_res, error::Error, Finish, IResult,
};

use std::str::FromStr;

/// Width of a range reply, in characters.
pub const REPLY_DIGITS: usize = 4;

/// One range reply: four hex digits, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeReply(pub u16);

fn parse_hex_word(s: &str) -> IResult<&str, u16> {
    map_res(
        take_while_m_n(REPLY_DIGITS, REPLY_DIGITS, |c: char| c.is_ascii_hexdigit()),
        |digits: &str| u16::from_str_radix(digits, 16),
    )(s)
}

fn parse_range_reply(s: &str) -> IResult<&str, RangeReply> {
    let (rest, word) = parse_hex_word(s)?;
    Ok((rest, RangeReply(word)))
}

impl FromStr for RangeReply {
    type Err = Error<String>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_range_reply(s).finish() {
            Ok((_remaining, reply)) => Ok(reply),
            Err(Error { input, code }) => Err(Error {
                input: input.to_string(),
                code,
            }),
        }
    }
}

impl RangeReply {
    /// Decode a raw reply buffer straight off the wire. Anything that is not
    /// exactly [`REPLY_DIGITS`] hex characters is rejected.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, Error<String>> {
        let text = std::str::from_utf8(raw).map_err(|_| Error {
            input: String::from_utf8_lossy(raw).into_owned(),
            code: nom::error::ErrorKind::Char,
        })?;
        if text.len() != REPLY_DIGITS {
            return Err(Error {
                input: text.to_owned(),
                code: nom::error::ErrorKind::LengthValue,
            });
        }
        text.parse()
    }

    /// The decoded distance, widened for arithmetic.
    pub fn distance(&self) -> i32 {
        i32::from(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_upper_and_lower_case() {
        assert_eq!(RangeReply::from_bytes(b"01F4").unwrap(), RangeReply(500));
        assert_eq!(RangeReply::from_bytes(b"01f4").unwrap(), RangeReply(500));
        assert_eq!(RangeReply::from_bytes(b"FFFF").unwrap().distance(), 65535);
        assert_eq!(RangeReply::from_bytes(b"0000").unwrap().distance(), 0);
    }

    #[test]
    fn parser_leaves_trailing_input() {
        let (leftover, res) = parse_range_reply("0A0B\r\n*").unwrap();
        assert_eq!(leftover, "\r\n*");
        assert_eq!(res, RangeReply(0x0A0B));
    }

    #[test]
    fn rejects_non_hex() {
        let err = RangeReply::from_bytes(b"12G4").unwrap_err();
        assert_eq!(err.input, "12G4");
        assert!(RangeReply::from_bytes(b" 123").is_err());
    }

    #[test]
    fn rejects_wrong_width() {
        assert!(RangeReply::from_bytes(b"123").is_err());
        assert!(RangeReply::from_bytes(b"12345").is_err());
        assert!(RangeReply::from_bytes(&[0xFF, 0xFE, 0x30, 0x30]).is_err());
    }
}
