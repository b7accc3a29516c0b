//! Seasonal anomaly check for a live reading.

use crate::error::{DashboardError, Result};
use crate::structs::{Assessment, SeasonCalendar, SeasonalStats, Verdict};

/// Compares a reading against mean ± `threshold`·std of its season's history.
///
/// A season without records, or with too few to have a standard deviation,
/// gives `Verdict::Indeterminate`. Months outside 1..=12 are rejected.
pub fn compare(
    reading: f64,
    month: u32,
    stats: &SeasonalStats,
    calendar: &SeasonCalendar,
    threshold: f64,
) -> Result<Assessment> {
    let season = calendar
        .season_of(month)
        .ok_or_else(|| DashboardError::Data(format!("Month out of range: {}", month)))?;

    let band = stats
        .get(&season)
        .and_then(|s| s.std.map(|std| (s.mean - threshold * std, s.mean + threshold * std)));

    let (lower_bound, upper_bound, verdict) = match band {
        None => (None, None, Verdict::Indeterminate),
        Some((lower, upper)) => {
            let verdict = if reading < lower || reading > upper {
                Verdict::Anomalous
            } else {
                Verdict::Normal
            };
            (Some(lower), Some(upper), verdict)
        }
    };

    Ok(Assessment {
        season,
        reading,
        lower_bound,
        upper_bound,
        verdict,
    })
}
