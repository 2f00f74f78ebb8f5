use chrono::{DateTime, NaiveDateTime, Utc};

/// FIX `SendingTime` (tag 52) format: `YYYYMMDD-HH:MM:SS.sss` (spec §4.3,
/// property 3).
pub fn format_sending_time(t: DateTime<Utc>) -> String {
    t.format("%Y%m%d-%H:%M:%S%.3f").to_string()
}

pub fn parse_sending_time(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y%m%d-%H:%M:%S%.3f").ok()?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round_trips_to_millisecond_precision() {
        let t = Utc.with_ymd_and_hms(2026, 8, 1, 13, 45, 9).unwrap() + chrono::Duration::milliseconds(123);
        let formatted = format_sending_time(t);
        assert!(regex_matches(&formatted));
        assert_eq!(parse_sending_time(&formatted).unwrap(), t);
    }

    fn regex_matches(s: &str) -> bool {
        let bytes = s.as_bytes();
        if bytes.len() != 21 {
            return false;
        }
        let digits = |r: std::ops::Range<usize>| bytes[r].iter().all(u8::is_ascii_digit);
        digits(0..8) && bytes[8] == b'-' && digits(9..11) && bytes[11] == b':' && digits(12..14) && bytes[14] == b':' && digits(15..17) && bytes[17] == b'.' && digits(18..21)
    }
}
