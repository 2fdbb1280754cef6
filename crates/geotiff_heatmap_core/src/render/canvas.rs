//! In-memory drawing surface for heatmap figures.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::imageops;
use image::{Rgba, RgbaImage};
use tracing::trace;

use crate::error::RenderError;

pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Edge length of a bitmap glyph before scaling.
pub const GLYPH_SIZE: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    Horizontal,
    /// Rotated a quarter turn counter-clockwise, reading bottom to top.
    Vertical,
}

/// Axis-aligned pixel region with its top-left corner at (`x`, `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// White RGBA drawing surface. Coordinates outside the surface are clipped.
pub struct Canvas {
    image: RgbaImage,
}

/// Runs `draw` against a fresh canvas and frees the canvas on every exit path.
pub fn with_canvas<T>(
    width: u32,
    height: u32,
    draw: impl FnOnce(&mut Canvas) -> Result<T, RenderError>,
) -> Result<T, RenderError> {
    let mut canvas = Canvas::new(width, height);
    let result = draw(&mut canvas);
    drop(canvas);
    result
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        trace!(width, height, "figure canvas allocated");
        Self {
            image: RgbaImage::from_pixel(width, height, BACKGROUND),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        (x < self.width() && y < self.height()).then(|| *self.image.get_pixel(x, y))
    }

    pub fn put(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x < 0 || y < 0 || x >= i64::from(self.width()) || y >= i64::from(self.height()) {
            return;
        }
        self.image.put_pixel(x as u32, y as u32, color);
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, width: i64, height: i64, color: Rgba<u8>) {
        let left = x.max(0);
        let top = y.max(0);
        let right = (x + width).min(i64::from(self.width()));
        let bottom = (y + height).min(i64::from(self.height()));
        for row in top..bottom {
            for column in left..right {
                self.image.put_pixel(column as u32, row as u32, color);
            }
        }
    }

    /// Draws a border of `thickness` pixels just inside the given rectangle.
    pub fn stroke_rect(
        &mut self,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        thickness: i64,
        color: Rgba<u8>,
    ) {
        self.fill_rect(x, y, width, thickness, color);
        self.fill_rect(x, y + height - thickness, width, thickness, color);
        self.fill_rect(x, y, thickness, height, color);
        self.fill_rect(x + width - thickness, y, thickness, height, color);
    }

    /// Draws `text` with its bounding box's top-left corner at (`x`, `y`).
    pub fn draw_text(
        &mut self,
        text: &str,
        x: i64,
        y: i64,
        scale: u32,
        color: Rgba<u8>,
        direction: TextDirection,
    ) {
        let scale = i64::from(scale.max(1));
        let run_length = text.chars().count() as i64 * GLYPH_SIZE * scale;

        for (index, character) in text.chars().enumerate() {
            for (glyph_row, bits) in glyph(character).iter().enumerate() {
                for glyph_column in 0..GLYPH_SIZE {
                    if bits & (1 << glyph_column) == 0 {
                        continue;
                    }
                    let along = (index as i64 * GLYPH_SIZE + glyph_column) * scale;
                    let across = glyph_row as i64 * scale;
                    let (left, top) = match direction {
                        TextDirection::Horizontal => (x + along, y + across),
                        TextDirection::Vertical => (x + across, y + run_length - along - scale),
                    };
                    self.fill_rect(left, top, scale, scale, color);
                }
            }
        }
    }

    /// Bounding box of every pixel that differs from the background.
    pub fn content_bounds(&self) -> Option<Region> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in self.image.enumerate_pixels() {
            if *pixel == BACKGROUND {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((left, top, right, bottom)) => {
                    (left.min(x), top.min(y), right.max(x), bottom.max(y))
                }
            });
        }

        bounds.map(|(left, top, right, bottom)| Region {
            x: left,
            y: top,
            width: right - left + 1,
            height: bottom - top + 1,
        })
    }

    pub fn crop(&self, region: Region) -> RgbaImage {
        imageops::crop_imm(&self.image, region.x, region.y, region.width, region.height)
            .to_image()
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        trace!(
            width = self.image.width(),
            height = self.image.height(),
            "figure canvas released"
        );
    }
}

/// Width and height of `text` as drawn by [`Canvas::draw_text`].
pub fn text_size(text: &str, scale: u32, direction: TextDirection) -> (i64, i64) {
    let scale = i64::from(scale.max(1));
    let run_length = text.chars().count() as i64 * GLYPH_SIZE * scale;
    let thickness = GLYPH_SIZE * scale;
    match direction {
        TextDirection::Horizontal => (run_length, thickness),
        TextDirection::Vertical => (thickness, run_length),
    }
}

fn glyph(character: char) -> [u8; 8] {
    BASIC_FONTS
        .get(character)
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}
