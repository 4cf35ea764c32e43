//! Small technical-indicator helpers used by the autonomous-mode strategies
//! to turn raw bar history into entry/exit decisions: plain functions over
//! `&[f64]`, no indicator-object state.

/// Simple moving average of the trailing `period` values.
pub fn sma(period: usize, data: &[f64]) -> Option<f64> {
    if period == 0 || data.len() < period {
        return None;
    }
    let window = &data[data.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Standard deviation of the trailing `period` values (population, not
/// sample), used for Bollinger band width.
pub fn stdev(period: usize, data: &[f64]) -> Option<f64> {
    let mean = sma(period, data)?;
    let window = &data[data.len() - period..];
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
    Some(variance.sqrt())
}

/// `(lower, middle, upper)` Bollinger bands at `width` standard deviations.
pub fn bollinger_bands(period: usize, width: f64, data: &[f64]) -> Option<(f64, f64, f64)> {
    let middle = sma(period, data)?;
    let sigma = stdev(period, data)?;
    Some((middle - width * sigma, middle, middle + width * sigma))
}

/// Wilder's RSI over the trailing `period + 1` values; `None` if there is
/// not enough history.
pub fn rsi(period: usize, data: &[f64]) -> Option<f64> {
    if period == 0 || data.len() <= period {
        return None;
    }
    let start = data.len() - period - 1;
    let window = &data[start..];

    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in window.windows(2) {
        let diff = pair[1] - pair[0];
        if diff >= 0.0 {
            gains += diff;
        } else {
            losses -= diff;
        }
    }
    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}
