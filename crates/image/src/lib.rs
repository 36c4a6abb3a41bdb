//! Page image redaction.
//!
//! Each selected annotation's polygon is painted white, both interior and
//! edges. The image keeps its pixel format: formats with an alpha channel get
//! white at full opacity, the rest plain white.

use std::io::Cursor;
use std::path::Path;

use fott_core::{Annotation, BoundingBox, CoreError, LabelDocument, PageSizes};
use fott_rules::FieldSelector;
use image::{
    ColorType, DynamicImage, ImageBuffer, ImageDecoder, ImageError, ImageFormat, ImageReader, Pixel,
    Primitive,
};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageRedactError {
    #[error("unsupported pixel format: {0:?}")]
    UnsupportedColor(ColorType),

    #[error("image error: {0}")]
    Image(#[from] ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{fill:?} fill does not fit {model} pixels")]
    FillMismatch { fill: Fill, model: &'static str },
}

pub type Result<T> = std::result::Result<T, ImageRedactError>;

/// How the redaction color is expressed for a pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// `#FFFFFF`
    Opaque,
    /// `#FFFFFFFF`
    OpaqueWithAlpha,
}

impl Fill {
    /// White as a `P` pixel, with an opaque alpha channel for
    /// `OpaqueWithAlpha`. `None` when `P` does not have exactly the channels
    /// this fill describes.
    pub fn white<P: Pixel>(self) -> Option<P> {
        let max = <P::Subpixel as Primitive>::DEFAULT_MAX_VALUE;
        let mut channels = vec![max; P::CHANNEL_COUNT as usize];
        match (self, P::HAS_ALPHA) {
            (Fill::Opaque, false) => {}
            (Fill::OpaqueWithAlpha, true) => *channels.last_mut()? = max,
            _ => return None,
        }
        Some(*P::from_slice(&channels))
    }
}

pub fn fill_for(color: ColorType) -> Result<Fill> {
    match color {
        ColorType::La8
        | ColorType::La16
        | ColorType::Rgba8
        | ColorType::Rgba16
        | ColorType::Rgba32F => Ok(Fill::OpaqueWithAlpha),
        ColorType::L8 | ColorType::L16 | ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => {
            Ok(Fill::Opaque)
        }
        other => Err(ImageRedactError::UnsupportedColor(other)),
    }
}

/// Decodes an image and applies its EXIF orientation.
pub fn load_image(bytes: &[u8]) -> Result<DynamicImage> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Encodes in the format implied by `name`'s extension.
pub fn encode_image(image: &DynamicImage, name: &str) -> Result<Vec<u8>> {
    let format = ImageFormat::from_path(Path::new(name))?;
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    if format == ImageFormat::Jpeg && !matches!(image.color(), ColorType::L8 | ColorType::Rgb8) {
        // JPEG holds neither alpha nor 16-bit samples.
        log::warn!("[Image] converting {:?} to RGB8 for JPEG output", image.color());
        DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut cursor, format)?;
    } else {
        image.write_to(&mut cursor, format)?;
    }
    Ok(bytes)
}

/// A single image is page 1.
pub fn page_sizes(image: &DynamicImage) -> PageSizes {
    PageSizes::from([(1, (image.width() as f64, image.height() as f64))])
}

/// Paints every selected annotation white. Returns how many polygons were
/// painted.
pub fn redact_image(
    image: &mut DynamicImage,
    annotations: &[Annotation],
    fields: &FieldSelector,
) -> Result<usize> {
    let fill = fill_for(image.color())?;
    log::debug!("[Image] {:?} image, fill {:?}", image.color(), fill);

    let mut painted = 0;
    for annotation in annotations.iter().filter(|a| fields.is_selected(&a.field)) {
        let Some(polygon) = pixel_polygon(&annotation.bounding_box) else {
            log::debug!("[Image] skipping degenerate box for field {}", annotation.field);
            continue;
        };
        match image {
            DynamicImage::ImageLuma8(buf) => paint(buf, &polygon, fill)?,
            DynamicImage::ImageLumaA8(buf) => paint(buf, &polygon, fill)?,
            DynamicImage::ImageRgb8(buf) => paint(buf, &polygon, fill)?,
            DynamicImage::ImageRgba8(buf) => paint(buf, &polygon, fill)?,
            DynamicImage::ImageLuma16(buf) => paint(buf, &polygon, fill)?,
            DynamicImage::ImageLumaA16(buf) => paint(buf, &polygon, fill)?,
            DynamicImage::ImageRgb16(buf) => paint(buf, &polygon, fill)?,
            DynamicImage::ImageRgba16(buf) => paint(buf, &polygon, fill)?,
            DynamicImage::ImageRgb32F(buf) => paint(buf, &polygon, fill)?,
            DynamicImage::ImageRgba32F(buf) => paint(buf, &polygon, fill)?,
            other => return Err(ImageRedactError::UnsupportedColor(other.color())),
        }
        painted += 1;
    }
    Ok(painted)
}

/// Decodes `bytes`, redacts the label's selected fields and re-encodes in the
/// format of `output_name`.
pub fn redact_image_bytes(
    bytes: &[u8],
    label: &LabelDocument,
    output_name: &str,
    fields: &FieldSelector,
) -> Result<Vec<u8>> {
    let mut image = load_image(bytes)?;
    let annotations = label.to_annotations(&page_sizes(&image))?;
    let painted = redact_image(&mut image, &annotations, fields)?;
    log::info!("[Image] {}: painted {} regions", output_name, painted);
    encode_image(&image, output_name)
}

/// Rounded vertices with repeats removed. `None` when fewer than three
/// distinct vertices remain.
fn pixel_polygon(bounding_box: &BoundingBox) -> Option<Vec<Point<i32>>> {
    let mut points: Vec<Point<i32>> = bounding_box
        .points()
        .into_iter()
        .map(|(x, y)| Point::new(x.round() as i32, y.round() as i32))
        .collect();
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    (points.len() >= 3).then_some(points)
}

// draw_polygon_mut fills the interior and strokes the edges.
fn paint<P>(
    buf: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    polygon: &[Point<i32>],
    fill: Fill,
) -> Result<()>
where
    P: Pixel,
{
    let white = fill.white::<P>().ok_or(ImageRedactError::FillMismatch {
        fill,
        model: P::COLOR_MODEL,
    })?;
    draw_polygon_mut(buf, polygon, white);
    Ok(())
}
