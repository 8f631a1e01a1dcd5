//! Pure aggregate computations over review history.
//!
//! Nothing here touches storage; callers feed in counts and dates read from
//! the event log.

use std::collections::BTreeSet;

use chrono::NaiveDate;

/// Fraction of correct reviews, in `[0, 1]`.
///
/// An empty log yields exactly `0.0`.
#[must_use]
pub fn success_rate(correct: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = correct.min(total) as f64 / total as f64;
    rate.clamp(0.0, 1.0)
}

/// Length in days of the unbroken run of study days ending today.
///
/// `today` is exempt while it is in progress: when it has no reviews yet the
/// run may end yesterday instead. Any other missing day ends the run. Dates
/// after `today` are ignored.
#[must_use]
pub fn streak_days<I>(study_dates: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let dates: BTreeSet<NaiveDate> = study_dates
        .into_iter()
        .filter(|d| *d <= today)
        .collect();

    let start = if dates.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if dates.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0_u32;
    let mut expected = start;
    for date in dates.range(..=start).rev() {
        if *date != expected {
            break;
        }
        streak = streak.saturating_add(1);
        match expected.pred_opt() {
            Some(prev) => expected = prev,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap() + chrono::Duration::days(offset)
    }

    #[test]
    fn success_rate_handles_empty_log() {
        assert_eq!(success_rate(0, 0), 0.0);
    }

    #[test]
    fn success_rate_is_bounded() {
        assert_eq!(success_rate(3, 4), 0.75);
        assert_eq!(success_rate(4, 4), 1.0);
        assert_eq!(success_rate(0, 4), 0.0);
        assert_eq!(success_rate(9, 4), 1.0);
    }

    #[test]
    fn consecutive_days_ending_today() {
        let today = day(0);
        let dates = [day(-3), day(-2), day(-1), day(0), day(-1)];
        assert_eq!(streak_days(dates, today), 4);
    }

    #[test]
    fn today_in_progress_does_not_break_streak() {
        let today = day(0);
        assert_eq!(streak_days([day(-2), day(-1)], today), 2);
    }

    #[test]
    fn stale_history_yields_zero() {
        // Last study day was D-3: both today and yesterday are empty.
        let today = day(0);
        assert_eq!(streak_days([day(-5), day(-3)], today), 0);
    }

    #[test]
    fn gap_stops_the_walk() {
        let today = day(0);
        assert_eq!(streak_days([day(-4), day(-3), day(-1), day(0)], today), 2);
    }

    #[test]
    fn empty_history_and_future_dates() {
        let today = day(0);
        assert_eq!(streak_days(std::iter::empty(), today), 0);
        assert_eq!(streak_days([day(1), day(2)], today), 0);
        assert_eq!(streak_days([day(0), day(1)], today), 1);
    }
}
