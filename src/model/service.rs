//! Converts raw forest estimates into served predictions.

use chrono::{Days, NaiveDate};

use crate::common::error::{MaintError, MaintResult};
use crate::data::domain::FeatureVector;
use crate::inference::domain::Prediction;

use super::domain::ForestModel;

/// Risk lost per day of remaining service life.
const RISK_PER_DAY: f64 = 10.0;

/// Run the forest and derive the date and risk score.
///
/// `today` is an input so the same features always give the same prediction.
pub fn predict(
    model: &ForestModel,
    features: &FeatureVector,
    today: NaiveDate,
) -> MaintResult<Prediction> {
    let days = model.predict_days(features)?.max(0.0);
    Ok(Prediction {
        next_maintenance_date: next_date(today, days)?,
        risk_score: risk_score(days),
    })
}

/// `max(0, 100 - days * 10)` rounded to two decimals.
pub fn risk_score(days: f64) -> f64 {
    let raw = (100.0 - days.max(0.0) * RISK_PER_DAY).max(0.0);
    (raw * 100.0).round() / 100.0
}

/// `today` plus the whole number of days in the estimate.
pub fn next_date(today: NaiveDate, days: f64) -> MaintResult<NaiveDate> {
    let whole = days.max(0.0).floor() as u64;
    today
        .checked_add_days(Days::new(whole))
        .ok_or_else(|| MaintError::model(format!("{whole} days overflows the calendar")))
}
