//! Unsolicited-result tokenizer.
//!
//! The modem frames unsolicited result codes with double quotes. Splitting a
//! received chunk on `"` yields a token sequence whose first token names the
//! message type. Anything that does not match a known shape is ignored.

use chrono::NaiveDateTime;

/// A recognized unsolicited message from the modem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unsolicited {
    /// Incoming SMS delivered via `+CMT:`
    Sms {
        sender: String,
        timestamp: NaiveDateTime,
        body: String,
    },
    /// USSD response delivered via `+CUSD:` (e.g., balance query result)
    Ussd { payload: String },
}

/// Decode a received chunk as single-byte text.
///
/// The modem link carries Latin-1; every byte maps to the code point of the
/// same value.
pub fn decode_chunk(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

/// Parse one received chunk into a recognized unsolicited message.
///
/// Returns `None` for empty chunks, unknown message types, and frames with
/// too few tokens for their shape.
pub fn parse_unsolicited(data: &[u8]) -> Option<Unsolicited> {
    let text = decode_chunk(data);
    let tokens: Vec<&str> = text.trim().split('"').map(str::trim).collect();

    match tokens.first() {
        Some(&"+CMT:") if tokens.len() >= 7 => {
            let timestamp = parse_sms_timestamp(tokens[5])?;
            Some(Unsolicited::Sms {
                sender: tokens[1].to_string(),
                timestamp,
                body: tokens[6].to_string(),
            })
        }
        Some(first) if first.starts_with("+CUSD:") && tokens.len() >= 2 => {
            Some(Unsolicited::Ussd {
                payload: tokens[1].to_string(),
            })
        }
        _ => None,
    }
}

/// Parse the modem's SMS timestamp: local `yy/MM/dd,HH:mm:ss` wall-clock
/// fields followed by a signed UTC-offset suffix, which is stripped and
/// discarded. The wall-clock fields themselves never contain `+` or `-`.
fn parse_sms_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let local = raw.split(['+', '-']).next()?;
    NaiveDateTime::parse_from_str(local, "%y/%m/%d,%H:%M:%S").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    const CMT_FRAME: &str =
        "+CMT: \"+351911234567\",\"\",\"24/03/15,18:30:45+00\"\r\nzone frontdoor bypass";

    #[test]
    fn test_parse_incoming_sms() {
        let parsed = parse_unsolicited(CMT_FRAME.as_bytes()).unwrap();
        match parsed {
            Unsolicited::Sms {
                sender,
                timestamp,
                body,
            } => {
                assert_eq!(sender, "+351911234567");
                assert_eq!(body, "zone frontdoor bypass");
                assert_eq!(
                    timestamp.date(),
                    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
                );
                assert_eq!(
                    timestamp.time(),
                    NaiveTime::from_hms_opt(18, 30, 45).unwrap()
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_ussd_response() {
        let frame = "+CUSD: 0,\"Your balance is 5.00 EUR\",15";
        let parsed = parse_unsolicited(frame.as_bytes()).unwrap();
        assert_eq!(
            parsed,
            Unsolicited::Ussd {
                payload: "Your balance is 5.00 EUR".to_string()
            }
        );
    }

    #[test]
    fn test_negative_offset_timestamp_accepted() {
        let frame =
            "+CMT: \"+351911234567\",\"\",\"24/03/15,18:30:45-08\"\r\nzone frontdoor bypass";
        match parse_unsolicited(frame.as_bytes()) {
            Some(Unsolicited::Sms { timestamp, .. }) => {
                assert_eq!(
                    timestamp.time(),
                    NaiveTime::from_hms_opt(18, 30, 45).unwrap()
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_stripped() {
        let frame = format!("\r\n{CMT_FRAME}\r\n");
        assert!(parse_unsolicited(frame.as_bytes()).is_some());
    }

    #[test]
    fn test_unknown_frames_ignored() {
        assert_eq!(parse_unsolicited(b""), None);
        assert_eq!(parse_unsolicited(b"OK"), None);
        assert_eq!(parse_unsolicited(b"+CREG: 0,1"), None);
        // Known type but too few tokens
        assert_eq!(parse_unsolicited(b"+CMT: \"+351911234567\""), None);
    }

    #[test]
    fn test_malformed_timestamp_rejects_frame() {
        let frame =
            "+CMT: \"+351911234567\",\"\",\"\",\"\",\"\",\"not-a-date\",\"zone frontdoor bypass\"";
        assert_eq!(parse_unsolicited(frame.as_bytes()), None);
    }

    #[test]
    fn test_latin1_decode() {
        assert_eq!(decode_chunk(&[0x41, 0xE9, 0x42]), "A\u{e9}B");
    }
}
