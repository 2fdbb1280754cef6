//! Tick placement and labelling.

const STEP_MULTIPLES: [f64; 5] = [1.0, 2.0, 2.5, 5.0, 10.0];
const MAX_DECIMALS: usize = 6;

/// Smallest 1/2/2.5/5 × 10^k step giving at most `max_ticks` ticks over `span`.
pub fn nice_step(span: f64, max_ticks: usize) -> f64 {
    let intervals = max_ticks.max(2) as f64 - 1.0;
    let raw = span / intervals;
    if !(raw.is_finite() && raw > 0.0) {
        return 1.0;
    }

    let magnitude = 10f64.powf(raw.log10().floor());
    STEP_MULTIPLES
        .iter()
        .map(|multiple| multiple * magnitude)
        .find(|step| *step >= raw * (1.0 - 1e-9))
        .unwrap_or(10.0 * magnitude)
}

/// Tick values at multiples of a nice step inside `[min, max]`.
pub fn nice_ticks(min: f64, max: f64, max_ticks: usize) -> Vec<f64> {
    if !(min.is_finite() && max.is_finite()) || max < min {
        return Vec::new();
    }
    if max == min {
        return vec![min];
    }

    let span = max - min;
    if !span.is_finite() {
        return vec![min, max];
    }

    let step = nice_step(span, max_ticks);
    let first = (min / step - 1e-9).ceil() as i64;
    let last = (max / step + 1e-9).floor() as i64;
    if last.saturating_sub(first) > max_ticks.max(2) as i64 {
        return vec![min, max];
    }
    (first..=last)
        .map(|index| {
            let value = index as f64 * step;
            if value.abs() < step * 1e-9 {
                0.0
            } else {
                value
            }
        })
        .collect()
}

/// Integer cell indices to label on an axis of `cells` cells.
pub fn axis_ticks(cells: usize, max_ticks: usize) -> Vec<usize> {
    if cells == 0 {
        return Vec::new();
    }

    let step = nice_step((cells - 1) as f64, max_ticks);
    let whole = step.round();
    let step = if step < 1.0 {
        1
    } else if (step - whole).abs() < 1e-9 {
        whole as usize
    } else {
        // 2.5 is not a whole cell count
        (step * 2.0).round() as usize
    };
    (0..cells).step_by(step).collect()
}

/// Formats a tick value with just enough decimals to tell neighbouring ticks apart.
pub fn format_tick(value: f64, step: f64) -> String {
    let magnitude = value.abs().max(step.abs());
    if magnitude >= 1e6 || (magnitude > 0.0 && magnitude < 1e-4) {
        return format!("{value:.2e}");
    }

    let decimals = (0..=MAX_DECIMALS)
        .find(|decimals| {
            let scaled = step.abs() * 10f64.powi(*decimals as i32);
            (scaled - scaled.round()).abs() < 1e-6 * scaled.max(1.0)
        })
        .unwrap_or(MAX_DECIMALS);

    let text = format!("{value:.decimals$}");
    if text.starts_with('-') && text.trim_start_matches(['-', '0', '.']).is_empty() {
        text[1..].to_string()
    } else {
        text
    }
}
