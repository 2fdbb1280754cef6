//! Heatmap figure rendering.
//!
//! A figure is a square canvas holding the colour-mapped grid with its axes,
//! a colour bar and a title. Row 0 is drawn at the top and column 0 at the
//! left; axes count grid cells and no georeferencing is applied. The canvas
//! is cropped to its content (plus padding) and encoded as PNG before it is
//! released.

mod canvas;
mod encode;
mod ticks;

pub use canvas::{text_size, with_canvas, Canvas, Region, TextDirection, BACKGROUND};
pub use encode::{encode_png, pixels_per_meter};
pub use ticks::{axis_ticks, format_tick, nice_step, nice_ticks};

use image::Rgba;
use tracing::debug;

use crate::colormap::{viridis, ColorScale};
use crate::error::RenderError;
use crate::raster::DecodedRaster;

pub const TITLE: &str = "GeoTIF Heatmap";
pub const X_AXIS_LABEL: &str = "Column #";
pub const Y_AXIS_LABEL: &str = "Row #";
pub const COLORBAR_LABEL: &str = "Value";

pub const DEFAULT_SIZE_INCHES: f64 = 10.0;
pub const DEFAULT_DPI: u32 = 150;
pub const DEFAULT_PAD_INCHES: f64 = 0.1;

/// Colour of masked cells: fully transparent.
pub const MASKED_COLOR: Rgba<u8> = Rgba([0, 0, 0, 0]);
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

const MIN_CANVAS_PX: f64 = 64.0;
const MAX_CANVAS_PX: f64 = 8192.0;

// Axes box as fractions of the figure, top-left origin.
const AXES_LEFT: f64 = 0.125;
const AXES_RIGHT: f64 = 0.9;
const AXES_TOP: f64 = 0.12;
const AXES_BOTTOM: f64 = 0.89;
// Share of the axes width handed to the colour bar and the gap before it.
const COLORBAR_FRACTION: f64 = 0.15;
const COLORBAR_PAD: f64 = 0.05;
const COLORBAR_ASPECT: f64 = 20.0;

const TITLE_POINTS: f64 = 12.0;
const LABEL_POINTS: f64 = 10.0;
const LINE_WIDTH_POINTS: f64 = 0.8;
const TICK_LENGTH_POINTS: f64 = 3.5;
const TICK_PAD_POINTS: f64 = 3.5;
const LABEL_PAD_POINTS: f64 = 4.0;
const TITLE_PAD_POINTS: f64 = 6.0;

const MAX_AXIS_TICKS: usize = 6;
const MAX_COLORBAR_TICKS: usize = 8;

/// Figure geometry. The defaults give a 10 in square figure at 150 dpi.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub size_inches: f64,
    pub dpi: u32,
    /// Blank margin kept around the cropped content.
    pub pad_inches: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            size_inches: DEFAULT_SIZE_INCHES,
            dpi: DEFAULT_DPI,
            pad_inches: DEFAULT_PAD_INCHES,
        }
    }
}

impl RenderOptions {
    /// Edge length of the square canvas in pixels.
    pub fn canvas_side(&self) -> Result<u32, RenderError> {
        let side = self.size_inches * f64::from(self.dpi);
        if !side.is_finite() || !(MIN_CANVAS_PX..=MAX_CANVAS_PX).contains(&side) {
            return Err(RenderError::InvalidFigure {
                size_inches: self.size_inches,
                dpi: self.dpi,
            });
        }
        Ok(side.round() as u32)
    }

    fn points_to_px(&self, points: f64) -> i64 {
        ((points * f64::from(self.dpi) / 72.0).round() as i64).max(1)
    }

    fn glyph_scale(&self, points: f64) -> u32 {
        let pixels = points * f64::from(self.dpi) / 72.0;
        ((pixels / canvas::GLYPH_SIZE as f64).round() as u32).max(1)
    }

    fn pad_px(&self) -> u32 {
        (self.pad_inches.max(0.0) * f64::from(self.dpi)).round() as u32
    }
}

#[derive(Debug, Clone)]
pub struct RenderedHeatmap {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Where the grid cells landed in the encoded image.
    pub plot_area: Region,
    pub color_scale: ColorScale,
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

impl Rect {
    fn right(&self) -> i64 {
        self.x + self.width
    }

    fn bottom(&self) -> i64 {
        self.y + self.height
    }

    fn center_x(&self) -> i64 {
        self.x + self.width / 2
    }

    fn center_y(&self) -> i64 {
        self.y + self.height / 2
    }
}

struct FigureLayout {
    plot: Rect,
    colorbar: Rect,
    line_width: i64,
    tick_length: i64,
    tick_pad: i64,
    label_pad: i64,
    title_pad: i64,
    title_scale: u32,
    label_scale: u32,
}

impl FigureLayout {
    fn new(side: u32, columns: usize, rows: usize, options: &RenderOptions) -> Self {
        let side = f64::from(side);
        let axes_left = AXES_LEFT * side;
        let axes_top = AXES_TOP * side;
        let axes_width = (AXES_RIGHT - AXES_LEFT) * side;
        let main_width = axes_width * (1.0 - COLORBAR_FRACTION - COLORBAR_PAD);
        let main_height = (AXES_BOTTOM - AXES_TOP) * side;

        // Square cells: the grid keeps its aspect ratio inside the axes box.
        let cell = (main_width / columns as f64).min(main_height / rows as f64);
        let plot_width = (cell * columns as f64).round().max(1.0);
        let plot_height = (cell * rows as f64).round().max(1.0);
        let plot = Rect {
            x: (axes_left + (main_width - plot_width) / 2.0).round() as i64,
            y: (axes_top + (main_height - plot_height) / 2.0).round() as i64,
            width: plot_width as i64,
            height: plot_height as i64,
        };

        let colorbar = Rect {
            x: plot.right() + (axes_width * COLORBAR_PAD).round() as i64,
            y: plot.y,
            width: ((plot_height / COLORBAR_ASPECT).round() as i64).max(4),
            height: plot.height,
        };

        Self {
            plot,
            colorbar,
            line_width: options.points_to_px(LINE_WIDTH_POINTS),
            tick_length: options.points_to_px(TICK_LENGTH_POINTS),
            tick_pad: options.points_to_px(TICK_PAD_POINTS),
            label_pad: options.points_to_px(LABEL_PAD_POINTS),
            title_pad: options.points_to_px(TITLE_PAD_POINTS),
            title_scale: options.glyph_scale(TITLE_POINTS),
            label_scale: options.glyph_scale(LABEL_POINTS),
        }
    }
}

/// Renders band values as a viridis heatmap figure and encodes it as PNG.
///
/// The colour scale spans the unmasked minimum and maximum; masked cells are
/// left transparent.
pub fn render_heatmap(
    raster: &DecodedRaster,
    options: &RenderOptions,
) -> Result<RenderedHeatmap, RenderError> {
    let side = options.canvas_side()?;
    let color_scale = ColorScale::from_range(raster.value_range());
    let layout = FigureLayout::new(side, raster.width(), raster.height(), options);

    with_canvas(side, side, |canvas| {
        draw_grid(canvas, raster, &color_scale, layout.plot);
        draw_axes(canvas, raster, &layout);
        draw_colorbar(canvas, &color_scale, &layout);
        draw_title(canvas, &layout);

        let crop = tight_region(canvas, options.pad_px());
        let png = encode_png(&canvas.crop(crop), options.dpi)?;
        debug!(
            width = crop.width,
            height = crop.height,
            bytes = png.len(),
            "heatmap encoded"
        );

        Ok(RenderedHeatmap {
            png,
            width: crop.width,
            height: crop.height,
            plot_area: Region {
                x: (layout.plot.x - i64::from(crop.x)).max(0) as u32,
                y: (layout.plot.y - i64::from(crop.y)).max(0) as u32,
                width: layout.plot.width as u32,
                height: layout.plot.height as u32,
            },
            color_scale,
        })
    })
}

fn draw_grid(canvas: &mut Canvas, raster: &DecodedRaster, scale: &ColorScale, plot: Rect) {
    let columns = raster.width() as i64;
    let rows = raster.height() as i64;
    for offset_y in 0..plot.height {
        let row = (offset_y * rows / plot.height) as usize;
        for offset_x in 0..plot.width {
            let column = (offset_x * columns / plot.width) as usize;
            let color = match raster.value_at(row, column) {
                Some(value) => scale.color_for(value),
                None => MASKED_COLOR,
            };
            canvas.put(plot.x + offset_x, plot.y + offset_y, color);
        }
    }
}

fn draw_frame(canvas: &mut Canvas, rect: Rect, line_width: i64) {
    canvas.stroke_rect(
        rect.x - line_width,
        rect.y - line_width,
        rect.width + 2 * line_width,
        rect.height + 2 * line_width,
        line_width,
        INK,
    );
}

fn draw_axes(canvas: &mut Canvas, raster: &DecodedRaster, layout: &FigureLayout) {
    let plot = layout.plot;
    let lw = layout.line_width;
    let scale = layout.label_scale;
    let (_, glyph_height) = text_size("0", scale, TextDirection::Horizontal);
    draw_frame(canvas, plot, lw);

    let columns = raster.width() as f64;
    let x_label_top = plot.bottom() + lw + layout.tick_length + layout.tick_pad;
    for column in axis_ticks(raster.width(), MAX_AXIS_TICKS) {
        let center =
            plot.x + ((column as f64 + 0.5) * plot.width as f64 / columns).round() as i64;
        canvas.fill_rect(center - lw / 2, plot.bottom() + lw, lw, layout.tick_length, INK);
        let text = column.to_string();
        let (text_width, _) = text_size(&text, scale, TextDirection::Horizontal);
        canvas.draw_text(
            &text,
            center - text_width / 2,
            x_label_top,
            scale,
            INK,
            TextDirection::Horizontal,
        );
    }

    let (x_label_width, _) = text_size(X_AXIS_LABEL, scale, TextDirection::Horizontal);
    canvas.draw_text(
        X_AXIS_LABEL,
        plot.center_x() - x_label_width / 2,
        x_label_top + glyph_height + layout.label_pad,
        scale,
        INK,
        TextDirection::Horizontal,
    );

    let rows = raster.height() as f64;
    let y_label_right = plot.x - lw - layout.tick_length - layout.tick_pad;
    let mut widest = 0;
    for row in axis_ticks(raster.height(), MAX_AXIS_TICKS) {
        let center = plot.y + ((row as f64 + 0.5) * plot.height as f64 / rows).round() as i64;
        canvas.fill_rect(
            plot.x - lw - layout.tick_length,
            center - lw / 2,
            layout.tick_length,
            lw,
            INK,
        );
        let text = row.to_string();
        let (text_width, _) = text_size(&text, scale, TextDirection::Horizontal);
        widest = widest.max(text_width);
        canvas.draw_text(
            &text,
            y_label_right - text_width,
            center - glyph_height / 2,
            scale,
            INK,
            TextDirection::Horizontal,
        );
    }

    let (y_label_width, y_label_height) = text_size(Y_AXIS_LABEL, scale, TextDirection::Vertical);
    canvas.draw_text(
        Y_AXIS_LABEL,
        y_label_right - widest - layout.label_pad - y_label_width,
        plot.center_y() - y_label_height / 2,
        scale,
        INK,
        TextDirection::Vertical,
    );
}

fn draw_colorbar(canvas: &mut Canvas, color_scale: &ColorScale, layout: &FigureLayout) {
    let bar = layout.colorbar;
    let lw = layout.line_width;
    let scale = layout.label_scale;
    let (_, glyph_height) = text_size("0", scale, TextDirection::Horizontal);

    for offset_y in 0..bar.height {
        // Top of the bar is the maximum.
        let position = 1.0 - (offset_y as f64 + 0.5) / bar.height as f64;
        canvas.fill_rect(bar.x, bar.y + offset_y, bar.width, 1, viridis(position));
    }
    draw_frame(canvas, bar, lw);

    let ticks = nice_ticks(color_scale.min(), color_scale.max(), MAX_COLORBAR_TICKS);
    let step = match ticks.as_slice() {
        [first, second, ..] => second - first,
        _ => color_scale.max() - color_scale.min(),
    };
    let label_left = bar.right() + lw + layout.tick_length + layout.tick_pad;
    let mut widest = 0;
    for value in ticks {
        let fraction = color_scale.normalize(value);
        let center = bar.bottom() - 1 - (fraction * (bar.height - 1) as f64).round() as i64;
        canvas.fill_rect(bar.right() + lw, center - lw / 2, layout.tick_length, lw, INK);
        let text = format_tick(value, step);
        let (text_width, _) = text_size(&text, scale, TextDirection::Horizontal);
        widest = widest.max(text_width);
        canvas.draw_text(
            &text,
            label_left,
            center - glyph_height / 2,
            scale,
            INK,
            TextDirection::Horizontal,
        );
    }

    let (_, label_height) = text_size(COLORBAR_LABEL, scale, TextDirection::Vertical);
    canvas.draw_text(
        COLORBAR_LABEL,
        label_left + widest + layout.label_pad,
        bar.center_y() - label_height / 2,
        scale,
        INK,
        TextDirection::Vertical,
    );
}

fn draw_title(canvas: &mut Canvas, layout: &FigureLayout) {
    let plot = layout.plot;
    let (width, height) = text_size(TITLE, layout.title_scale, TextDirection::Horizontal);
    canvas.draw_text(
        TITLE,
        plot.center_x() - width / 2,
        plot.y - layout.line_width - layout.title_pad - height,
        layout.title_scale,
        INK,
        TextDirection::Horizontal,
    );
}

/// Content bounds grown by `pad` pixels on each side, clamped to the canvas.
fn tight_region(canvas: &Canvas, pad: u32) -> Region {
    let full = Region {
        x: 0,
        y: 0,
        width: canvas.width(),
        height: canvas.height(),
    };
    let Some(content) = canvas.content_bounds() else {
        return full;
    };

    let left = content.x.saturating_sub(pad);
    let top = content.y.saturating_sub(pad);
    let right = (content.x + content.width + pad).min(canvas.width());
    let bottom = (content.y + content.height + pad).min(canvas.height());
    Region {
        x: left,
        y: top,
        width: right - left,
        height: bottom - top,
    }
}
