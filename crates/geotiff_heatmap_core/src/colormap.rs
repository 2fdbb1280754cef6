//! Viridis colour scale.

use image::Rgba;

/// Viridis sampled at nine evenly spaced positions, low to high.
pub const VIRIDIS_ANCHORS: [[u8; 3]; 9] = [
    [0x44, 0x01, 0x54],
    [0x47, 0x2c, 0x7a],
    [0x3b, 0x51, 0x8b],
    [0x2c, 0x71, 0x8e],
    [0x21, 0x90, 0x8d],
    [0x27, 0xad, 0x81],
    [0x5c, 0xc8, 0x63],
    [0xaa, 0xdc, 0x32],
    [0xfd, 0xe7, 0x25],
];

/// Maps a normalized position in `[0, 1]` to an opaque viridis colour.
pub fn viridis(position: f64) -> Rgba<u8> {
    let position = if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 1.0)
    };
    let segments = (VIRIDIS_ANCHORS.len() - 1) as f64;
    let scaled = position * segments;
    let index = (scaled.floor() as usize).min(VIRIDIS_ANCHORS.len() - 2);
    interpolate_color(
        VIRIDIS_ANCHORS[index],
        VIRIDIS_ANCHORS[index + 1],
        scaled - index as f64,
    )
}

fn interpolate_color(low: [u8; 3], high: [u8; 3], t: f64) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let channel = |index: usize| {
        let value = f64::from(low[index]) * (1.0 - t) + f64::from(high[index]) * t;
        value.round() as u8
    };
    Rgba([channel(0), channel(1), channel(2), 255])
}

/// Linear value-to-colour mapping between an observed minimum and maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    min: f64,
    max: f64,
}

impl ColorScale {
    /// A degenerate range `v..v` is widened to `v ± 0.1·|v|` (`±0.1` at zero).
    pub fn new(min: f64, max: f64) -> Self {
        if max > min {
            return Self { min, max };
        }
        let delta = if min == 0.0 { 0.1 } else { 0.1 * min.abs() };
        Self {
            min: min - delta,
            max: min + delta,
        }
    }

    /// Scale for an optional observed range; an all-masked grid falls back to `0..1`.
    pub fn from_range(range: Option<(f64, f64)>) -> Self {
        match range {
            Some((min, max)) => Self::new(min, max),
            None => Self { min: 0.0, max: 1.0 },
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn normalize(&self, value: f64) -> f64 {
        // Halved operands keep `max - min` finite for extremes near f64::MAX.
        let normalized = (0.5 * value - 0.5 * self.min) / (0.5 * self.max - 0.5 * self.min);
        if normalized.is_finite() {
            normalized.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn color_for(&self, value: f64) -> Rgba<u8> {
        viridis(self.normalize(value))
    }
}
