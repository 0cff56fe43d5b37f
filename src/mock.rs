/// Synthetic readings for runs where every strategy failed.
///
/// Keeps the daily snapshot non-empty so downstream consumers see a file
/// with the usual shape. Values are uniform in `[0, max_level_ft]` and all
/// rows share one timestamp in the site's own `dd-mm-yyyy` format.

use chrono::NaiveDateTime;
use rand::Rng;
use tracing::warn;

use crate::config::MockConfig;
use crate::model::{Reading, MOCK_DATETIME_FORMAT};

/// Generates one reading per configured location using the thread RNG.
pub fn generate_mock(config: &MockConfig, now: NaiveDateTime) -> Vec<Reading> {
    generate_mock_with_rng(config, now, &mut rand::thread_rng())
}

/// Generates mock readings from a caller-supplied RNG.
pub fn generate_mock_with_rng<R: Rng + ?Sized>(
    config: &MockConfig,
    now: NaiveDateTime,
    rng: &mut R,
) -> Vec<Reading> {
    warn!(locations = config.locations.len(), "generating mock data as a fallback");

    let date_time = now.format(MOCK_DATETIME_FORMAT).to_string();
    // uniform sampling needs a finite, non-negative ceiling
    let max = if config.max_level_ft.is_finite() { config.max_level_ft.max(0.0) } else { 0.0 };

    config
        .locations
        .iter()
        .map(|location| {
            let level: f64 = rng.gen_range(0.0..=max);
            Reading::new(location.as_str(), format!("{:.2}", level), date_time.as_str())
        })
        .collect()
}
