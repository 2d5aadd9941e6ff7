//! SuperMemo-2 review scheduling

use chrono::{Duration, NaiveDate};

const MIN_EASE_FACTOR: f64 = 1.3;
const QUICK_SOLVE_SECS: i64 = 30;

/// Review interval bounds in days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalBounds {
    pub min_days: i64,
    pub max_days: i64,
}

impl Default for IntervalBounds {
    fn default() -> Self {
        Self {
            min_days: 1,
            max_days: 365,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Review {
    pub next_review_date: NaiveDate,
    pub ease_factor: f64,
    pub interval: i64,
}

/// Grade an attempt from 0 (failed badly) to 5 (solved first try, quickly)
pub fn quality_from_performance(solved: bool, attempts: i64, time_taken: Option<i64>) -> u8 {
    if !solved {
        return (3 - attempts).clamp(0, 2) as u8;
    }

    let mut quality = 3;
    if attempts == 1 {
        quality += 1;
    }
    if time_taken.map_or(false, |secs| secs < QUICK_SOLVE_SECS) {
        quality += 1;
    }
    quality.min(5)
}

pub fn next_review(
    ease_factor: f64,
    interval: i64,
    quality: u8,
    today: NaiveDate,
    bounds: IntervalBounds,
) -> Review {
    let q = f64::from(quality.min(5));
    let lapse = 5.0 - q;
    let ease_factor = (ease_factor + 0.1 - lapse * (0.08 + lapse * 0.02)).max(MIN_EASE_FACTOR);

    let interval = if quality < 3 {
        bounds.min_days
    } else {
        let grown = match interval {
            1 => 6,
            6 => 15,
            days => (days as f64 * ease_factor).floor() as i64,
        };
        grown.min(bounds.max_days)
    };

    Review {
        next_review_date: today + Duration::days(interval),
        ease_factor,
        interval,
    }
}
