//! Summary statistics over a series of prices
//!
//! Every function rejects an empty series with [`StatsError::EmptySeries`]
//! instead of dividing by zero.

use crate::error::StatsError;

fn non_empty(values: &[f64]) -> Result<&[f64], StatsError> {
    if values.is_empty() {
        Err(StatsError::EmptySeries)
    } else {
        Ok(values)
    }
}

/// Arithmetic mean
pub fn average(values: &[f64]) -> Result<f64, StatsError> {
    let values = non_empty(values)?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Middle value; mean of the two middle values for an even count
pub fn median(values: &[f64]) -> Result<f64, StatsError> {
    let mut sorted = non_empty(values)?.to_vec();
    sorted.sort_by(f64::total_cmp);

    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[middle - 1] + sorted[middle]) / 2.0)
    } else {
        Ok(sorted[middle])
    }
}

/// Population standard deviation (divides by N)
pub fn standard_deviation(values: &[f64]) -> Result<f64, StatsError> {
    let mean = average(values)?;
    let variance = values
        .iter()
        .map(|value| {
            let deviation = value - mean;
            deviation * deviation
        })
        .sum::<f64>()
        / values.len() as f64;
    Ok(variance.sqrt())
}

pub fn max(values: &[f64]) -> Result<f64, StatsError> {
    let values = non_empty(values)?;
    Ok(values[1..].iter().fold(values[0], |acc, v| acc.max(*v)))
}

pub fn min(values: &[f64]) -> Result<f64, StatsError> {
    let values = non_empty(values)?;
    Ok(values[1..].iter().fold(values[0], |acc, v| acc.min(*v)))
}
