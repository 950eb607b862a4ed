//! Resolving wall-clock times in the organization's zone.

use crate::error::ScheduleError;
use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use duebell_core::Result;

/// How far past a skipped local time to look for the end of the gap.
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// Parses an IANA zone name such as `Asia/Tehran`.
pub fn parse_zone(name: &str) -> Result<Tz, ScheduleError> {
    name.parse::<Tz>().map_err(|_| {
        ScheduleError::InvalidTimezone {
            timezone: name.to_string(),
        }
        .into()
    })
}

/// Maps a local wall-clock time to an instant.
///
/// A time repeated by a backward shift resolves to its earlier occurrence. A
/// time skipped by a forward shift resolves to the first instant after the
/// gap.
pub fn resolve_local(zone: Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, ScheduleError> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(at) => Ok(at.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier.with_timezone(&Utc)),
        LocalResult::None => {
            // Zone transitions fall on whole minutes.
            let start = local
                .with_second(0)
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(local);
            (1..=MAX_GAP_MINUTES)
                .map(|minutes| start + Duration::minutes(minutes))
                .find_map(|probe| zone.from_local_datetime(&probe).earliest())
                .map(|at| at.with_timezone(&Utc))
                .ok_or_else(|| ScheduleError::UnresolvableLocalTime { local }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn parses_known_zones_and_rejects_others() {
        assert_eq!(parse_zone("Asia/Tehran").unwrap(), chrono_tz::Asia::Tehran);
        let err = parse_zone("Mars/Olympus").unwrap_err();
        assert!(matches!(
            err.current_context(),
            ScheduleError::InvalidTimezone { .. }
        ));
    }

    #[test]
    fn ordinary_time_uses_zone_offset() {
        let at = resolve_local(chrono_tz::Asia::Tehran, local(2025, 3, 10, 14, 30)).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 3, 10, 11, 0, 0).unwrap());
    }

    #[test]
    fn repeated_time_resolves_to_earlier_instant() {
        // 01:30 happens twice in New York on 2025-11-02.
        let at =
            resolve_local(chrono_tz::America::New_York, local(2025, 11, 2, 1, 30)).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap());
    }

    #[test]
    fn skipped_time_resolves_to_end_of_gap() {
        // New York jumps from 02:00 to 03:00 on 2025-03-09.
        let at = resolve_local(chrono_tz::America::New_York, local(2025, 3, 9, 2, 30)).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 3, 9, 7, 0, 0).unwrap());
    }
}
