use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Daily opening hours of the prediction log.
///
/// Inside the window (both ends inclusive) records go to the current
/// day's file. After the window closes they go to the next day's file, so
/// late-evening detections open tomorrow's log instead of reopening
/// today's. Before the window opens, the current day's file is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for ActiveWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
        }
    }
}

impl ActiveWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, String> {
        if start >= end {
            return Err(format!(
                "active window start {start} must be before end {end}"
            ));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.start && time <= self.end
    }

    /// Date of the log segment a record made at `now` belongs to.
    pub fn segment_date(&self, now: NaiveDateTime) -> NaiveDate {
        let today = now.date();
        if now.time() > self.end {
            today.checked_add_days(Days::new(1)).unwrap_or(today)
        } else {
            today
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, s).unwrap()
    }

    #[rstest]
    #[case::opening(at(10, 0, 0), true)]
    #[case::midday(at(15, 30, 0), true)]
    #[case::closing(at(22, 0, 0), true)]
    #[case::early(at(9, 59, 59), false)]
    #[case::late(at(22, 0, 1), false)]
    fn test_contains(#[case] now: NaiveDateTime, #[case] inside: bool) {
        assert_eq!(ActiveWindow::default().contains(now.time()), inside);
    }

    #[rstest]
    #[case::inside(at(12, 0, 0), 15)]
    #[case::closing_second(at(22, 0, 0), 15)]
    #[case::after_close(at(23, 0, 0), 16)]
    #[case::before_midnight(at(23, 59, 59), 16)]
    #[case::before_open(at(7, 0, 0), 15)]
    fn test_segment_date(#[case] now: NaiveDateTime, #[case] expected_day: u32) {
        let date = ActiveWindow::default().segment_date(now);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, expected_day).unwrap());
    }

    #[test]
    fn test_segment_rolls_over_month_end() {
        let now = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        assert_eq!(
            ActiveWindow::default().segment_date(now),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_new_rejects_inverted_window() {
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let eight = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert!(ActiveWindow::new(ten, eight).is_err());
        assert!(ActiveWindow::new(ten, ten).is_err());
        assert!(ActiveWindow::new(eight, ten).is_ok());
    }

    #[test]
    fn test_serde_roundtrip() {
        let json = serde_json::to_string(&ActiveWindow::default()).unwrap();
        assert_eq!(json, r#"{"start":"10:00:00","end":"22:00:00"}"#);
        let back: ActiveWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ActiveWindow::default());
    }
}
