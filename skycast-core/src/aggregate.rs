//! Grouping of the 3-hour forecast feed into daily summaries.

use chrono::NaiveDate;

use crate::model::{DailySummary, WeatherSample};

/// Upper bound on the number of days surfaced from one forecast feed.
pub const MAX_FORECAST_DAYS: usize = 5;

struct DayBucket {
    summary: DailySummary,
    // point temperature of the sample that set `summary.condition`
    representative_temp: f64,
}

/// Collapse samples into at most [`MAX_FORECAST_DAYS`] daily summaries.
///
/// Days appear in the order they are first seen in `samples`, not in date
/// order. A day's condition comes from its warmest sample; on equal
/// temperatures the earlier sample keeps it. Days are taken from the
/// timestamp as-is, with no timezone normalization.
pub fn aggregate(samples: &[WeatherSample]) -> Vec<DailySummary> {
    let mut days: Vec<DayBucket> = Vec::new();

    for sample in samples {
        let date: NaiveDate = sample.timestamp.date();

        match days.iter_mut().find(|b| b.summary.date == date) {
            Some(bucket) => {
                let summary = &mut bucket.summary;
                summary.temperature_min = summary.temperature_min.min(sample.temperature_min);
                summary.temperature_max = summary.temperature_max.max(sample.temperature_max);

                if sample.temperature > bucket.representative_temp {
                    summary.condition = sample.condition.clone();
                    bucket.representative_temp = sample.temperature;
                }
            }
            None => days.push(DayBucket {
                summary: DailySummary {
                    date,
                    temperature_min: sample.temperature_min,
                    temperature_max: sample.temperature_max,
                    condition: sample.condition.clone(),
                },
                representative_temp: sample.temperature,
            }),
        }
    }

    days.truncate(MAX_FORECAST_DAYS);
    days.into_iter().map(|b| b.summary).collect()
}
