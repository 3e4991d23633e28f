use chrono::NaiveTime;
use derive_more::Constructor;
use quantflow_frame::{DataFrame, FrameError};
use serde::{Deserialize, Serialize};

/// A UTC trading session window `[start, end)` over times-of-day.
///
/// Sessions may cross midnight (`start > end`), in which case the window wraps: a timestamp is
/// inside iff its time-of-day is `>= start` or `< end`.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct SessionRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionRange {
    /// True when the provided UTC time-of-day falls inside the session window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

/// Retain only the rows whose UTC time-of-day falls inside the session window.
pub fn slice_session_utc(frame: &DataFrame, range: &SessionRange) -> Result<DataFrame, FrameError> {
    let mask = frame
        .index()
        .iter()
        .map(|timestamp| range.contains(timestamp.time()))
        .collect::<Vec<_>>();
    frame.filter_rows(&mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use quantflow_frame::{DateTimeIndex, Series};

    fn hms(hour: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, min, 0).unwrap()
    }

    fn ts(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, min, 0).unwrap()
    }

    #[test]
    fn test_contains_regular_window() {
        let session = SessionRange::new(hms(9, 30), hms(16, 0));
        assert!(session.contains(hms(9, 30)));
        assert!(session.contains(hms(12, 0)));
        assert!(!session.contains(hms(16, 0)));
        assert!(!session.contains(hms(3, 0)));
    }

    #[test]
    fn test_contains_window_crossing_midnight() {
        let session = SessionRange::new(hms(22, 0), hms(2, 0));
        assert!(session.contains(hms(23, 0)));
        assert!(session.contains(hms(1, 59)));
        assert!(!session.contains(hms(2, 0)));
        assert!(!session.contains(hms(12, 0)));
    }

    #[test]
    fn test_slice_session_filters_rows() {
        let index = DateTimeIndex::new(vec![ts(8, 0), ts(10, 0), ts(15, 0), ts(17, 0)]).unwrap();
        let frame =
            DataFrame::single(index, Series::f64("c", [1.0, 2.0, 3.0, 4.0])).unwrap();

        let sliced =
            slice_session_utc(&frame, &SessionRange::new(hms(9, 30), hms(16, 0))).unwrap();

        assert_eq!(sliced.num_rows(), 2);
        assert_eq!(
            sliced.index().as_slice(),
            &[ts(10, 0), ts(15, 0)]
        );
    }
}
