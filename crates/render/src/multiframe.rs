//! Multi-frame TIFF, one frame per page.
//!
//! Frames the `tiff` decoder reads are mapped onto `DynamicImage` directly.
//! Bilevel and other sub-byte gray frames are widened to 8 bits and CMYK is
//! converted to RGB. Palette frames are not decoded by `tiff`, so their strips
//! are read and expanded through the color map here.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::ControlFlow;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageBuffer, RgbImage};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::{PageRenderer, RenderError, Result};

const PHOTOMETRIC_PALETTE: u16 = 3;

const COMPRESSION_NONE: u16 = 1;
const COMPRESSION_LZW: u16 = 5;
const COMPRESSION_PACKBITS: u16 = 32773;

/// Frames are stored as pixels already, so `dpi` is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffRenderer;

fn open(path: &Path) -> Result<Decoder<BufReader<File>>> {
    Ok(Decoder::new(BufReader::new(File::open(path)?))?)
}

impl PageRenderer for TiffRenderer {
    fn page_count(&self, path: &Path) -> Result<usize> {
        let mut decoder = open(path)?;
        let mut count = 1;
        while decoder.more_images() {
            decoder.next_image()?;
            count += 1;
        }
        Ok(count)
    }

    fn render_page(&self, path: &Path, page_index: usize, _dpi: u32) -> Result<DynamicImage> {
        let mut decoder = open(path)?;
        for _ in 0..page_index {
            if !decoder.more_images() {
                return Err(RenderError::Page {
                    page: page_index,
                    reason: "no such frame".to_string(),
                });
            }
            decoder.next_image()?;
        }

        decode_frame(&mut decoder, path, page_index)
    }

    /// Decodes the frames in order through one decoder.
    fn render_pages(
        &self,
        path: &Path,
        _dpi: u32,
        visit: &mut dyn FnMut(usize, DynamicImage) -> ControlFlow<()>,
    ) -> Result<()> {
        let mut decoder = open(path)?;
        let mut index = 0;
        loop {
            let frame = decode_frame(&mut decoder, path, index)?;
            if visit(index, frame).is_break() || !decoder.more_images() {
                return Ok(());
            }
            decoder.next_image()?;
            index += 1;
        }
    }
}

fn decode_frame(
    decoder: &mut Decoder<BufReader<File>>,
    path: &Path,
    page_index: usize,
) -> Result<DynamicImage> {
    let (width, height) = decoder.dimensions()?;
    let photometric = decoder.find_tag_unsigned::<u16>(Tag::PhotometricInterpretation)?;
    if photometric == Some(PHOTOMETRIC_PALETTE) {
        log::debug!("[Tiff] frame {}: {}x{} palette", page_index, width, height);
        return read_palette_frame(decoder, path, page_index, width, height);
    }

    let color = decoder.colortype()?;
    log::debug!("[Tiff] frame {}: {}x{} {:?}", page_index, width, height, color);

    let image = match (color, decoder.read_image()?) {
        (ColorType::Gray(8), DecodingResult::U8(buf)) => {
            ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageLuma8)
        }
        (ColorType::Gray(bits @ (1 | 2 | 4)), DecodingResult::U8(buf)) => {
            let max = (1u16 << bits) - 1;
            let widen = |v: u8| (v as u16 * 255 / max) as u8;
            unpack_samples(&buf, width, height, bits)
                .map(|samples| samples.into_iter().map(widen).collect())
                .and_then(|pixels| GrayImage::from_raw(width, height, pixels))
                .map(DynamicImage::ImageLuma8)
        }
        (ColorType::Gray(16), DecodingResult::U16(buf)) => {
            ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageLuma16)
        }
        (ColorType::GrayA(8), DecodingResult::U8(buf)) => {
            ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageLumaA8)
        }
        (ColorType::GrayA(16), DecodingResult::U16(buf)) => {
            ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageLumaA16)
        }
        (ColorType::RGB(8), DecodingResult::U8(buf)) => {
            ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageRgb8)
        }
        (ColorType::RGB(16), DecodingResult::U16(buf)) => {
            ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageRgb16)
        }
        (ColorType::RGBA(8), DecodingResult::U8(buf)) => {
            ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageRgba8)
        }
        (ColorType::RGBA(16), DecodingResult::U16(buf)) => {
            ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageRgba16)
        }
        (ColorType::CMYK(8), DecodingResult::U8(buf)) => {
            let rgb = buf.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        (other, _) => return Err(RenderError::UnsupportedColor(format!("{other:?}"))),
    };

    image.ok_or_else(|| size_mismatch(page_index))
}

fn size_mismatch(page: usize) -> RenderError {
    RenderError::Render {
        page,
        reason: "decoded buffer does not match frame size".to_string(),
    }
}

/// Same conversion as PIL's `CMYK` to `RGB`.
fn cmyk_to_rgb(pixel: &[u8]) -> [u8; 3] {
    let k = pixel[3] as u16;
    let channel = |v: u8| 255 - (v as u16 + k).min(255) as u8;
    [channel(pixel[0]), channel(pixel[1]), channel(pixel[2])]
}

/// Splits rows of `bits`-wide samples, each row padded to a whole byte, into
/// one byte per sample. `None` when `data` is too short.
fn unpack_samples(data: &[u8], width: u32, height: u32, bits: u8) -> Option<Vec<u8>> {
    let bits = bits as usize;
    let width = width as usize;
    let row_bytes = (width * bits).div_ceil(8);
    let mask = ((1u16 << bits) - 1) as u8;
    if row_bytes == 0 || height == 0 {
        return Some(Vec::new());
    }

    let mut out = Vec::with_capacity(width * height as usize);
    for row in data.chunks(row_bytes).take(height as usize) {
        for x in 0..width {
            let bit = x * bits;
            let byte = *row.get(bit / 8)?;
            let shift = 8 - bits - bit % 8;
            out.push((byte >> shift) & mask);
        }
    }
    (out.len() == width * height as usize).then_some(out)
}

/// Expands PackBits-compressed `data`.
fn unpack_bits(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let header = data[i] as i8;
        i += 1;
        match header {
            // no-op
            -128 => {}
            n if n >= 0 => {
                let end = (i + n as usize + 1).min(data.len());
                out.extend_from_slice(&data[i..end]);
                i = end;
            }
            n => {
                if let Some(&byte) = data.get(i) {
                    let count = (1 - n as i16) as usize;
                    out.extend(std::iter::repeat(byte).take(count));
                }
                i += 1;
            }
        }
    }
    out
}

fn read_palette_frame(
    decoder: &mut Decoder<BufReader<File>>,
    path: &Path,
    page: usize,
    width: u32,
    height: u32,
) -> Result<DynamicImage> {
    let bits = decoder.find_tag_unsigned::<u8>(Tag::BitsPerSample)?.unwrap_or(1);
    if !matches!(bits, 1 | 2 | 4 | 8) {
        return Err(RenderError::UnsupportedColor(format!("Palette({bits})")));
    }
    if decoder.find_tag(Tag::TileWidth)?.is_some() {
        return Err(RenderError::UnsupportedColor("tiled Palette".to_string()));
    }
    let compression = decoder
        .find_tag_unsigned::<u16>(Tag::Compression)?
        .unwrap_or(COMPRESSION_NONE);

    let colormap = decoder.get_tag_u16_vec(Tag::ColorMap)?;
    let entries = 1usize << bits;
    if colormap.len() < 3 * entries {
        return Err(RenderError::Render {
            page,
            reason: format!("color map has {} values, expected {}", colormap.len(), 3 * entries),
        });
    }

    let offsets = decoder.get_tag_u64_vec(Tag::StripOffsets)?;
    let counts = decoder.get_tag_u64_vec(Tag::StripByteCounts)?;

    let mut file = File::open(path)?;
    let mut data = Vec::new();
    for (&offset, &count) in offsets.iter().zip(&counts) {
        let mut strip = vec![0u8; count as usize];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut strip)?;
        match compression {
            COMPRESSION_NONE => data.extend_from_slice(&strip),
            COMPRESSION_PACKBITS => data.extend(unpack_bits(&strip)),
            COMPRESSION_LZW => {
                let decoded = weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
                    .decode(&strip)
                    .map_err(|e| RenderError::Render {
                        page,
                        reason: format!("lzw: {e}"),
                    })?;
                data.extend(decoded);
            }
            other => {
                return Err(RenderError::UnsupportedColor(format!(
                    "Palette with compression {other}"
                )))
            }
        }
    }

    let indices = unpack_samples(&data, width, height, bits).ok_or_else(|| size_mismatch(page))?;
    let rgb = indices
        .into_iter()
        .flat_map(|i| {
            let i = i as usize;
            [
                (colormap[i] >> 8) as u8,
                (colormap[entries + i] >> 8) as u8,
                (colormap[2 * entries + i] >> 8) as u8,
            ]
        })
        .collect();
    RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| size_mismatch(page))
}
