use image::RgbaImage;

use crate::error::RenderError;

const METERS_PER_INCH: f64 = 0.0254;

/// Physical resolution recorded in the PNG `pHYs` chunk.
pub fn pixels_per_meter(dpi: u32) -> u32 {
    (f64::from(dpi) / METERS_PER_INCH).round() as u32
}

/// Encodes an RGBA image as an 8-bit RGBA PNG tagged with `dpi`.
pub fn encode_png(image: &RgbaImage, dpi: u32) -> Result<Vec<u8>, RenderError> {
    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Default);
        let density = pixels_per_meter(dpi);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: density,
            yppu: density,
            unit: png::Unit::Meter,
        }));

        let mut writer = encoder.write_header()?;
        writer.write_image_data(image.as_raw())?;
        writer.finish()?;
    }
    Ok(buffer)
}
