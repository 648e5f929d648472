use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{invalid_argument, FirestoreResult};

/// `0001-01-01T00:00:00Z`, the earliest instant Firestore stores.
pub const MIN_SECONDS: i64 = -62_135_596_800;
/// `9999-12-31T23:59:59Z`, the latest whole second Firestore stores.
pub const MAX_SECONDS: i64 = 253_402_300_799;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// A point in time with nanosecond resolution.
///
/// Always within the range Firestore accepts, so every value has an RFC 3339
/// rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    datetime: DateTime<Utc>,
}

impl Timestamp {
    /// Seconds and nanoseconds since the Unix epoch. `nanos` outside
    /// `0..1_000_000_000` carries into `seconds`.
    pub fn new(seconds: i64, nanos: i32) -> FirestoreResult<Self> {
        let nanos = i64::from(nanos);
        let seconds = seconds
            .checked_add(nanos.div_euclid(NANOS_PER_SECOND))
            .ok_or_else(|| out_of_range(seconds))?;
        let nanos = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
        if !(MIN_SECONDS..=MAX_SECONDS).contains(&seconds) {
            return Err(out_of_range(seconds));
        }
        Utc.timestamp_opt(seconds, nanos)
            .single()
            .map(|datetime| Self { datetime })
            .ok_or_else(|| out_of_range(seconds))
    }

    pub fn from_seconds(seconds: i64) -> FirestoreResult<Self> {
        Self::new(seconds, 0)
    }

    pub fn now() -> Self {
        Self {
            datetime: Utc::now(),
        }
    }

    pub fn from_datetime<Tz: TimeZone>(datetime: DateTime<Tz>) -> FirestoreResult<Self> {
        let utc = datetime.with_timezone(&Utc);
        Self::new(utc.timestamp(), utc.timestamp_subsec_nanos() as i32)
    }

    pub fn seconds(&self) -> i64 {
        self.datetime.timestamp()
    }

    pub fn nanos(&self) -> u32 {
        self.datetime.timestamp_subsec_nanos()
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        self.datetime
    }

    pub fn parse_rfc3339(value: &str) -> FirestoreResult<Self> {
        let datetime = DateTime::parse_from_rfc3339(value)
            .map_err(|err| invalid_argument(format!("Invalid timestamp '{value}': {err}")))?;
        Self::from_datetime(datetime)
    }

    /// RFC 3339 in UTC. Whole seconds render without a fraction.
    pub fn to_rfc3339(&self) -> String {
        self.datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

fn out_of_range(seconds: i64) -> crate::error::FirestoreError {
    invalid_argument(format!(
        "Timestamp {seconds}s is outside 0001-01-01T00:00:00Z..=9999-12-31T23:59:59.999999999Z"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_nanoseconds() {
        let timestamp = Timestamp::new(1, 1_500_000_000).unwrap();
        assert_eq!(timestamp.seconds(), 2);
        assert_eq!(timestamp.nanos(), 500_000_000);

        let negative = Timestamp::new(1, -1).unwrap();
        assert_eq!(negative.seconds(), 0);
        assert_eq!(negative.nanos(), 999_999_999);
    }

    #[test]
    fn ordering() {
        let earlier = Timestamp::from_seconds(1).unwrap();
        let later = Timestamp::new(1, 1).unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn whole_seconds_render_without_fraction() {
        let ts = Timestamp::from_seconds(1_704_164_645).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-02T03:04:05Z");
        assert_eq!(Timestamp::parse_rfc3339("2024-01-02T03:04:05Z").unwrap(), ts);
    }

    #[test]
    fn parses_offsets_and_fractions() {
        let ts = Timestamp::parse_rfc3339("2024-01-02T05:04:05.250+02:00").unwrap();
        assert_eq!(ts, Timestamp::new(1_704_164_645, 250_000_000).unwrap());
        assert_eq!(ts.to_rfc3339(), "2024-01-02T03:04:05.250Z");
        assert!(Timestamp::parse_rfc3339("yesterday").is_err());
    }

    #[test]
    fn range_limits() {
        assert_eq!(
            Timestamp::from_seconds(MIN_SECONDS).unwrap().to_rfc3339(),
            "0001-01-01T00:00:00Z"
        );
        let latest = Timestamp::new(MAX_SECONDS, 999_999_999).unwrap();
        assert_eq!(latest.to_rfc3339(), "9999-12-31T23:59:59.999999999Z");

        for (seconds, nanos) in [
            (i64::MAX / 2, 0),
            (MAX_SECONDS, 1_000_000_000),
            (MIN_SECONDS, -1),
            (i64::MAX, 1_000_000_000),
        ] {
            let err = Timestamp::new(seconds, nanos).unwrap_err();
            assert_eq!(err.code_str(), "firestore/invalid-argument");
        }
        assert!(Timestamp::parse_rfc3339("0000-12-31T23:59:59Z").is_err());
    }
}
