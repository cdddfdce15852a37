/// Calendar arithmetic for the carousel
///
/// Every date that crosses the archive boundary is rendered as `YYYY-MM-DD`.
/// Random sampling is bounded: after `MAX_SAMPLE_ATTEMPTS` rejected draws we
/// walk the window deterministically from its newest day.

use chrono::{Duration, Months, NaiveDate};
use rand::Rng;
use std::collections::HashSet;

/// Canonical archive date format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Random draws before switching to the deterministic scan
const MAX_SAMPLE_ATTEMPTS: usize = 64;

/// First day the archive published a picture
pub fn archive_launch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1995, 6, 16).unwrap_or(NaiveDate::MIN)
}

/// Render a date in canonical `YYYY-MM-DD` form
pub fn format(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a canonical `YYYY-MM-DD` date
pub fn parse(input: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
}

/// Calendar-correct day offset, saturating at the representable range
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// `min(date, bound)`
pub fn clamp_to_upper_bound(date: NaiveDate, bound: NaiveDate) -> NaiveDate {
    date.min(bound)
}

/// Inclusive range of calendar days used for random sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Build a window, swapping the bounds if they arrive reversed
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// `[today - years, today]`, used for startup sampling
    pub fn trailing_years(today: NaiveDate, years: u32) -> Self {
        let start = today
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN);
        Self::new(start, today)
    }

    /// `[launch, today]`, used for substitute sampling
    pub fn since(launch: NaiveDate, today: NaiveDate) -> Self {
        Self::new(launch, today)
    }

    /// Number of days in the window (both ends included)
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    #[cfg(test)]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Draw a date uniformly from `window` that is not in `excluding`
///
/// Returns `None` only when every day of the window is excluded.
pub fn sample_uniform<R: Rng + ?Sized>(
    rng: &mut R,
    window: DateWindow,
    excluding: &HashSet<NaiveDate>,
) -> Option<NaiveDate> {
    let span = window.len_days() - 1;

    for _ in 0..MAX_SAMPLE_ATTEMPTS {
        let candidate = add_days(window.start, rng.random_range(0..=span));
        if !excluding.contains(&candidate) {
            return Some(candidate);
        }
    }

    log::warn!(
        "Random sampling exhausted {} attempts in {}..={}, scanning deterministically",
        MAX_SAMPLE_ATTEMPTS,
        format(window.start),
        format(window.end)
    );

    let mut candidate = window.end;
    loop {
        if !excluding.contains(&candidate) {
            return Some(candidate);
        }
        if candidate <= window.start {
            return None;
        }
        candidate = candidate.pred_opt()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_is_zero_padded() {
        assert_eq!(format(ymd(2024, 3, 9)), "2024-03-09");
        assert_eq!(parse("2024-03-09").unwrap(), ymd(2024, 3, 9));
        assert!(parse("03/09/2024").is_err());
    }

    #[test]
    fn test_add_days_rolls_over() {
        assert_eq!(add_days(ymd(2024, 2, 28), 1), ymd(2024, 2, 29));
        assert_eq!(add_days(ymd(2023, 2, 28), 1), ymd(2023, 3, 1));
        assert_eq!(add_days(ymd(2023, 12, 31), 1), ymd(2024, 1, 1));
        assert_eq!(add_days(ymd(2024, 1, 1), -1), ymd(2023, 12, 31));
    }

    #[test]
    fn test_clamp_to_upper_bound() {
        let today = ymd(2024, 3, 10);
        assert_eq!(clamp_to_upper_bound(ymd(2024, 3, 11), today), today);
        assert_eq!(clamp_to_upper_bound(ymd(2030, 1, 1), today), today);
        assert_eq!(clamp_to_upper_bound(ymd(2024, 3, 9), today), ymd(2024, 3, 9));
        assert_eq!(clamp_to_upper_bound(today, today), today);
    }

    #[test]
    fn test_trailing_window() {
        let window = DateWindow::trailing_years(ymd(2024, 3, 10), 5);
        assert_eq!(window.start, ymd(2019, 3, 10));
        assert_eq!(window.end, ymd(2024, 3, 10));
        assert!(window.contains(ymd(2020, 1, 1)));
        assert!(!window.contains(ymd(2024, 3, 11)));
    }

    #[test]
    fn test_sample_never_returns_excluded() {
        let mut rng = StdRng::seed_from_u64(7);
        let window = DateWindow::new(ymd(2024, 1, 1), ymd(2024, 1, 5));
        let excluding: HashSet<_> = [ymd(2024, 1, 1), ymd(2024, 1, 3), ymd(2024, 1, 5)]
            .into_iter()
            .collect();

        for _ in 0..500 {
            let date = sample_uniform(&mut rng, window, &excluding).unwrap();
            assert!(window.contains(date));
            assert!(!excluding.contains(&date));
        }
    }

    #[test]
    fn test_growing_exclusions_give_distinct_dates() {
        let mut rng = StdRng::seed_from_u64(42);
        let today = ymd(2024, 3, 10);
        let window = DateWindow::new(ymd(2024, 3, 8), today);

        for _ in 0..200 {
            let mut excluding: HashSet<_> = [today].into_iter().collect();
            let first = sample_uniform(&mut rng, window, &excluding).unwrap();
            excluding.insert(first);
            let second = sample_uniform(&mut rng, window, &excluding).unwrap();
            assert_ne!(first, second);
            assert_ne!(first, today);
            assert_ne!(second, today);
        }
    }

    #[test]
    fn test_exhausted_window_scans_then_gives_up() {
        let mut rng = StdRng::seed_from_u64(1);
        let window = DateWindow::new(ymd(2024, 1, 1), ymd(2024, 1, 3));

        let nearly: HashSet<_> = [ymd(2024, 1, 2), ymd(2024, 1, 3)].into_iter().collect();
        assert_eq!(sample_uniform(&mut rng, window, &nearly), Some(ymd(2024, 1, 1)));

        let all: HashSet<_> = [ymd(2024, 1, 1), ymd(2024, 1, 2), ymd(2024, 1, 3)]
            .into_iter()
            .collect();
        assert_eq!(sample_uniform(&mut rng, window, &all), None);
    }
}
