//! Band-1 extraction from GeoTIFF payloads.

use std::io::{Cursor, Read, Seek};

use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::{SampleFormat, Tag};

use crate::error::RasterError;

/// GDAL's private tag holding the no-data sentinel as ASCII text.
pub const GDAL_NODATA_TAG: u16 = 42113;

const PLANAR_SEPARATE: u16 = 2;

/// Row-major grid of band-1 values plus the declared no-data sentinel.
///
/// Cells equal to the sentinel, and NaN cells, are masked: they are skipped
/// by [`DecodedRaster::value_range`] and yield `None` from
/// [`DecodedRaster::value_at`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRaster {
    width: usize,
    height: usize,
    values: Vec<f64>,
    nodata: Option<f64>,
}

impl DecodedRaster {
    pub fn new(
        width: usize,
        height: usize,
        values: Vec<f64>,
        nodata: Option<f64>,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Empty {
                width: u32::try_from(width).unwrap_or(u32::MAX),
                height: u32::try_from(height).unwrap_or(u32::MAX),
            });
        }
        let expected = width * height;
        if values.len() != expected {
            return Err(RasterError::SampleCount {
                expected,
                actual: values.len(),
            });
        }

        Ok(Self {
            width,
            height,
            values,
            nodata,
        })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn is_masked(&self, value: f64) -> bool {
        value.is_nan() || self.nodata.is_some_and(|nodata| value == nodata)
    }

    /// Unmasked value of a cell, `None` when masked or out of bounds.
    pub fn value_at(&self, row: usize, column: usize) -> Option<f64> {
        if row >= self.height || column >= self.width {
            return None;
        }
        let value = self.values[row * self.width + column];
        (!self.is_masked(value)).then_some(value)
    }

    pub fn masked_count(&self) -> usize {
        self.values
            .iter()
            .filter(|value| self.is_masked(**value))
            .count()
    }

    /// Minimum and maximum over unmasked cells, `None` when every cell is masked.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|value| !self.is_masked(*value))
            .fold(None, |range, value| match range {
                None => Some((value, value)),
                Some((min, max)) => Some((min.min(value), max.max(value))),
            })
    }
}

/// Decodes band 1 of an in-memory TIFF together with its `GDAL_NODATA` sentinel.
pub fn decode_first_band(bytes: &[u8]) -> Result<DecodedRaster, RasterError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;
    if width == 0 || height == 0 {
        return Err(RasterError::Empty { width, height });
    }

    let samples_per_pixel =
        usize::from(read_u16_tag(&mut decoder, Tag::SamplesPerPixel)?.unwrap_or(1));
    let planar_separate =
        read_u16_tag(&mut decoder, Tag::PlanarConfiguration)? == Some(PLANAR_SEPARATE);
    let single_precision = is_single_precision_float(&mut decoder)?;
    let nodata = read_nodata(&mut decoder)?.map(|nodata| {
        if single_precision {
            f64::from(nodata as f32)
        } else {
            nodata
        }
    });

    let samples = samples_as_f64(decoder.read_image()?)?;
    let cells = width as usize * height as usize;
    let band: Vec<f64> = if planar_separate || samples_per_pixel <= 1 {
        samples.into_iter().take(cells).collect()
    } else {
        samples.into_iter().step_by(samples_per_pixel).take(cells).collect()
    };

    DecodedRaster::new(width as usize, height as usize, band, nodata)
}

/// Parses GDAL's textual sentinel; surrounding whitespace and NULs are ignored.
pub fn parse_nodata(text: &str) -> Result<f64, RasterError> {
    text.trim_matches(char::from(0))
        .trim()
        .parse::<f64>()
        .map_err(|_| RasterError::InvalidNoData(text.to_string()))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>, RasterError> {
    let tag = Tag::from_u16_exhaustive(GDAL_NODATA_TAG);
    match decoder.find_tag(tag)? {
        None => Ok(None),
        Some(Value::Ascii(text)) => parse_nodata(&text).map(Some),
        Some(other) => Err(RasterError::InvalidNoData(format!("{other:?}"))),
    }
}

fn read_u16_tag<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
) -> Result<Option<u16>, RasterError> {
    match decoder.find_tag(tag)? {
        None => Ok(None),
        // Per-sample tags (BitsPerSample, SampleFormat) repeat one entry per band.
        Some(Value::List(entries)) => entries
            .into_iter()
            .next()
            .map(Value::into_u16)
            .transpose()
            .map_err(RasterError::from),
        Some(value) => Ok(Some(value.into_u16()?)),
    }
}

fn is_single_precision_float<R: Read + Seek>(
    decoder: &mut Decoder<R>,
) -> Result<bool, RasterError> {
    let format = read_u16_tag(decoder, Tag::SampleFormat)?;
    let bits = read_u16_tag(decoder, Tag::BitsPerSample)?;
    Ok(format == Some(SampleFormat::IEEEFP.to_u16()) && bits == Some(32))
}

fn samples_as_f64(result: DecodingResult) -> Result<Vec<f64>, RasterError> {
    let samples = match result {
        DecodingResult::U8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|value| value as f64).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|value| value as f64).collect(),
        DecodingResult::F32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::F64(data) => data,
        #[allow(unreachable_patterns)]
        _ => return Err(RasterError::UnsupportedSampleType),
    };
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use tiff::encoder::{colortype, TiffEncoder, TiffValue};

    use super::*;

    fn float_tiff(width: u32, height: u32, values: &[f32], nodata: Option<&str>) -> Vec<u8> {
        gray_tiff::<colortype::Gray32Float>(width, height, values, nodata)
    }

    fn gray_tiff<C>(width: u32, height: u32, values: &[C::Inner], nodata: Option<&str>) -> Vec<u8>
    where
        C: colortype::ColorType,
        [C::Inner]: TiffValue,
    {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor).expect("encoder should open");
            let mut image = encoder
                .new_image::<C>(width, height)
                .expect("image should start");
            if let Some(text) = nodata {
                image
                    .encoder()
                    .write_tag(Tag::Unknown(GDAL_NODATA_TAG), text)
                    .expect("nodata tag should write");
            }
            image.write_data(values).expect("pixels should write");
        }
        cursor.into_inner()
    }

    /// Uncompressed unsigned-integer MinIsBlack TIFF with `bands` samples per pixel,
    /// one strip per plane when `planar`.
    fn multiband_tiff(
        width: u32,
        height: u32,
        bits: u16,
        bands: u16,
        planar: bool,
        data: &[u8],
    ) -> Vec<u8> {
        let shorts = |values: &[u16]| -> Vec<u8> {
            values.iter().flat_map(|value| value.to_le_bytes()).collect()
        };
        let longs = |values: &[u32]| -> Vec<u8> {
            values.iter().flat_map(|value| value.to_le_bytes()).collect()
        };

        let strips = if planar { u32::from(bands) } else { 1 };
        let strip_len = data.len() as u32 / strips;
        let data_offset = 8_u32;
        let padded_len = data.len() as u32 + data.len() as u32 % 2;
        let ifd_offset = data_offset + padded_len;
        let offsets: Vec<u32> = (0..strips).map(|strip| data_offset + strip * strip_len).collect();
        let per_band = |value: u16| vec![value; usize::from(bands)];

        let entries: Vec<(u16, u16, u32, Vec<u8>)> = vec![
            (256, 4, 1, longs(&[width])),
            (257, 4, 1, longs(&[height])),
            (258, 3, u32::from(bands), shorts(&per_band(bits))),
            (259, 3, 1, shorts(&[1])),
            (262, 3, 1, shorts(&[1])),
            (273, 4, strips, longs(&offsets)),
            (277, 3, 1, shorts(&[bands])),
            (278, 4, 1, longs(&[height])),
            (279, 4, strips, longs(&vec![strip_len; strips as usize])),
            (284, 3, 1, shorts(&[if planar { 2 } else { 1 }])),
            (339, 3, u32::from(bands), shorts(&per_band(1))),
        ];

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"II");
        bytes.extend_from_slice(&42_u16.to_le_bytes());
        bytes.extend_from_slice(&ifd_offset.to_le_bytes());
        bytes.extend_from_slice(data);
        bytes.resize(ifd_offset as usize, 0);

        let extra_offset = ifd_offset + 2 + entries.len() as u32 * 12 + 4;
        let mut extra = Vec::new();
        bytes.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, kind, count, value) in &entries {
            bytes.extend_from_slice(&tag.to_le_bytes());
            bytes.extend_from_slice(&kind.to_le_bytes());
            bytes.extend_from_slice(&count.to_le_bytes());
            if value.len() <= 4 {
                let mut inline = value.clone();
                inline.resize(4, 0);
                bytes.extend_from_slice(&inline);
            } else {
                bytes.extend_from_slice(&(extra_offset + extra.len() as u32).to_le_bytes());
                extra.extend_from_slice(value);
            }
        }
        bytes.extend_from_slice(&0_u32.to_le_bytes());
        bytes.extend_from_slice(&extra);
        bytes
    }

    #[test]
    fn decodes_single_band_grid_in_row_major_order() {
        let bytes = float_tiff(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], None);

        let raster = decode_first_band(&bytes).expect("raster should decode");

        assert_eq!(raster.width(), 3);
        assert_eq!(raster.height(), 2);
        assert_eq!(raster.nodata(), None);
        assert_eq!(raster.value_at(1, 0), Some(4.0));
        assert_eq!(raster.value_range(), Some((1.0, 6.0)));
    }

    #[test]
    fn every_cell_participates_without_nodata() {
        let bytes = float_tiff(2, 2, &[-9999.0, 0.0, 5.0, 10.0], None);

        let raster = decode_first_band(&bytes).expect("raster should decode");

        assert_eq!(raster.masked_count(), 0);
        assert_eq!(raster.value_range(), Some((-9999.0, 10.0)));
    }

    #[test]
    fn nodata_cells_are_excluded_from_range() {
        let bytes = float_tiff(2, 2, &[-9999.0, 0.0, 5.0, -9999.0], Some("-9999"));

        let raster = decode_first_band(&bytes).expect("raster should decode");

        assert_eq!(raster.nodata(), Some(-9999.0));
        assert_eq!(raster.masked_count(), 2);
        assert_eq!(raster.value_at(0, 0), None);
        assert_eq!(raster.value_range(), Some((0.0, 5.0)));
    }

    #[test]
    fn single_precision_sentinel_matches_widened_cells() {
        let bytes = float_tiff(2, 1, &[0.1, 0.7], Some("0.1"));

        let raster = decode_first_band(&bytes).expect("raster should decode");

        assert_eq!(raster.masked_count(), 1);
        assert_eq!(raster.value_range(), Some((f64::from(0.7f32), f64::from(0.7f32))));
    }

    #[test]
    fn first_band_is_taken_from_interleaved_pixels() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor).expect("encoder should open");
            encoder
                .write_image::<colortype::RGB8>(2, 1, &[10, 20, 30, 40, 50, 60])
                .expect("rgb image should write");
        }

        let raster = decode_first_band(&cursor.into_inner()).expect("raster should decode");

        assert_eq!(raster.values(), &[10.0, 40.0]);
    }

    #[test]
    fn first_band_of_chunky_greyscale_stack() {
        let bytes = multiband_tiff(2, 1, 8, 2, false, &[10, 99, 20, 98]);

        let raster = decode_first_band(&bytes).expect("two-band raster should decode");

        assert_eq!(raster.values(), &[10.0, 20.0]);
    }

    #[test]
    fn first_band_of_planar_greyscale_stack() {
        let bytes = multiband_tiff(2, 1, 8, 2, true, &[10, 20, 99, 98]);

        let raster = decode_first_band(&bytes).expect("planar raster should decode");

        assert_eq!(raster.values(), &[10.0, 20.0]);
    }

    #[test]
    fn first_plane_of_sixteen_bit_three_band_stack() {
        let planes: [[u16; 4]; 3] = [[1, 2, 3, 4], [500, 600, 700, 800], [9000; 4]];
        let data: Vec<u8> = planes
            .iter()
            .flatten()
            .flat_map(|value| value.to_le_bytes())
            .collect();
        let bytes = multiband_tiff(2, 2, 16, 3, true, &data);

        let raster = decode_first_band(&bytes).expect("planar raster should decode");

        assert_eq!(raster.values(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(raster.value_at(1, 1), Some(4.0));
    }

    #[test]
    fn signed_integer_sentinel_is_masked() {
        let bytes = gray_tiff::<colortype::GrayI16>(
            3,
            1,
            &[-32768, -12, 340],
            Some("-32768"),
        );

        let raster = decode_first_band(&bytes).expect("i16 raster should decode");

        assert_eq!(raster.nodata(), Some(-32768.0));
        assert_eq!(raster.masked_count(), 1);
        assert_eq!(raster.value_range(), Some((-12.0, 340.0)));
    }

    #[test]
    fn unsigned_sixteen_bit_values_are_widened() {
        let bytes = gray_tiff::<colortype::Gray16>(2, 2, &[0, 1, 40_000, 65_535], None);

        let raster = decode_first_band(&bytes).expect("u16 raster should decode");

        assert_eq!(raster.values(), &[0.0, 1.0, 40_000.0, 65_535.0]);
        assert_eq!(raster.value_range(), Some((0.0, 65_535.0)));
    }

    #[test]
    fn nan_cells_are_always_masked() {
        let bytes = float_tiff(3, 1, &[f32::NAN, 2.0, 4.0], None);

        let raster = decode_first_band(&bytes).expect("raster should decode");

        assert_eq!(raster.masked_count(), 1);
        assert_eq!(raster.value_range(), Some((2.0, 4.0)));
    }

    #[test]
    fn fully_masked_grid_has_no_range() {
        let raster = DecodedRaster::new(2, 1, vec![7.0, 7.0], Some(7.0))
            .expect("raster should build");

        assert_eq!(raster.value_range(), None);
    }

    #[test]
    fn rejects_garbage_bytes() {
        let error = decode_first_band(b"definitely not a tiff").expect_err("garbage should fail");
        assert!(matches!(error, RasterError::Tiff(_)));
    }

    #[test]
    fn rejects_unparseable_sentinel() {
        let bytes = float_tiff(1, 1, &[1.0], Some("n/a"));

        let error = decode_first_band(&bytes).expect_err("bad sentinel should fail");

        assert!(matches!(error, RasterError::InvalidNoData(_)));
    }

    #[test]
    fn parses_gdal_sentinel_text() {
        assert_eq!(parse_nodata("-9999\0").expect("should parse"), -9999.0);
        assert_eq!(parse_nodata(" 3.5 ").expect("should parse"), 3.5);
        assert!(parse_nodata("nan").expect("should parse").is_nan());
    }

    #[test]
    fn rejects_mismatched_sample_count() {
        let error = DecodedRaster::new(2, 2, vec![1.0; 3], None).expect_err("should fail");
        assert!(matches!(
            error,
            RasterError::SampleCount {
                expected: 4,
                actual: 3
            }
        ));
    }
}
