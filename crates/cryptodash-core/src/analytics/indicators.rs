//! Rolling-window indicators. A window that is not yet full, or that
//! contains a missing value, yields `None`.

/// Simple moving average over `window` values.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let values = values.iter().copied().map(Some).collect::<Vec<_>>();
    rolling(&values, window, |slice| slice.iter().sum::<f64>() / slice.len() as f64)
}

/// Relative strength index using simple rolling means of gains and losses.
pub fn rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    for (index, close) in closes.iter().enumerate() {
        let delta = if index == 0 { 0.0 } else { close - closes[index - 1] };
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    let avg_gain = rolling_mean(&gains, window);
    let avg_loss = rolling_mean(&losses, window);
    avg_gain
        .into_iter()
        .zip(avg_loss)
        .map(|(gain, loss)| match (gain, loss) {
            (Some(gain), Some(loss)) if loss > 0.0 => Some(100.0 - 100.0 / (1.0 + gain / loss)),
            (Some(gain), Some(_)) if gain > 0.0 => Some(100.0),
            _ => None,
        })
        .collect()
}

/// Position of each RSI value within its trailing `window` range, 0..=1.
pub fn stoch_rsi(rsi: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let lows = rolling(rsi, window, |slice| slice.iter().copied().fold(f64::INFINITY, f64::min));
    let highs = rolling(rsi, window, |slice| {
        slice.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    });

    rsi.iter()
        .zip(lows.into_iter().zip(highs))
        .map(|(value, (low, high))| match (value, low, high) {
            (Some(value), Some(low), Some(high)) if high > low => {
                Some((value - low) / (high - low))
            }
            _ => None,
        })
        .collect()
}

/// Last element of an indicator series, if it is defined.
pub fn latest(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

fn rolling<F>(values: &[Option<f64>], window: usize, reduce: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut buffer = Vec::with_capacity(window);
    (0..values.len())
        .map(|end| {
            if end + 1 < window {
                return None;
            }
            buffer.clear();
            for value in &values[end + 1 - window..=end] {
                buffer.push((*value)?);
            }
            Some(reduce(&buffer))
        })
        .collect()
}
