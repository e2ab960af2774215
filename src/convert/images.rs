//! Image export.
//!
//! Embedded images are re-encoded to the configured format and sized so
//! their pixel dimensions do not exceed their on-page size at the
//! configured DPI. Images the encoder cannot read keep their native bytes.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage};

use crate::error::{Error, Result};
use crate::model::{ImageBlob, NativeImageFormat};
use crate::options::{ConversionOptions, ImageFormat};

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f32 = 72.0;

/// An exported image ready to be written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedImage {
    /// File name, e.g. `page2_img1.png`
    pub file_name: String,
    /// Path used in the Markdown reference
    pub path: String,
    /// 0-based page index
    pub page: usize,
    /// Encoded bytes
    pub data: Vec<u8>,
}

/// Deterministic file name for the `image_number`-th image of a page.
///
/// Both numbers are 1-based.
pub fn image_file_name(page_number: usize, image_number: usize, extension: &str) -> String {
    format!("page{page_number}_img{image_number}.{extension}")
}

/// Markdown reference path for a file name.
pub fn reference_path(file_name: &str, options: &ConversionOptions) -> String {
    match &options.image_output_dir {
        Some(dir) => Path::new(dir)
            .join(file_name)
            .to_string_lossy()
            .replace('\\', "/"),
        None => file_name.to_string(),
    }
}

/// Export one image blob.
///
/// `page` is the 0-based page index and `image_number` the 1-based
/// position of the image on that page.
pub fn export_image(
    blob: &ImageBlob,
    page: usize,
    image_number: usize,
    options: &ConversionOptions,
) -> ExtractedImage {
    let (data, extension) = match encode(blob, options) {
        Ok(data) => (data, options.image_format.extension()),
        Err(e) => {
            log::warn!(
                "page {} image {}: {}; keeping native {} data",
                page + 1,
                image_number,
                e,
                blob.format.extension()
            );
            (blob.data.clone(), blob.format.extension())
        }
    };

    let file_name = image_file_name(page + 1, image_number, extension);
    let path = reference_path(&file_name, options);
    ExtractedImage {
        file_name,
        path,
        page,
        data,
    }
}

/// Decode, downscale and re-encode a blob.
pub fn encode(blob: &ImageBlob, options: &ConversionOptions) -> Result<Vec<u8>> {
    let decoded = decode(blob)?;
    let resized = fit_to_dpi(decoded, blob, options.image_dpi);

    let mut buf = Vec::new();
    match options.image_format {
        ImageFormat::Png => resized.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?,
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8())
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)?,
    }
    Ok(buf)
}

fn decode(blob: &ImageBlob) -> Result<DynamicImage> {
    match blob.format {
        NativeImageFormat::Jpeg => Ok(image::load_from_memory_with_format(
            &blob.data,
            image::ImageFormat::Jpeg,
        )?),
        NativeImageFormat::Png => Ok(image::load_from_memory_with_format(
            &blob.data,
            image::ImageFormat::Png,
        )?),
        NativeImageFormat::Jpeg2000 => Err(Error::ImageExport(
            "JPEG 2000 images are not supported".to_string(),
        )),
        NativeImageFormat::Raw {
            width,
            height,
            bits_per_component,
            components,
        } => decode_raw(&blob.data, width, height, bits_per_component, components),
    }
}

/// Build an image from uncompressed samples.
fn decode_raw(
    data: &[u8],
    width: u32,
    height: u32,
    bits: u8,
    components: u8,
) -> Result<DynamicImage> {
    let too_short = || {
        Error::ImageExport(format!(
            "{width}x{height} image with {components} components has only {} bytes",
            data.len()
        ))
    };
    if width == 0 || height == 0 {
        return Err(Error::ImageExport("empty image".to_string()));
    }

    match (bits, components) {
        (8, 1) => GrayImage::from_raw(width, height, data.to_vec())
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(too_short),
        (8, 3) => RgbImage::from_raw(width, height, data.to_vec())
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(too_short),
        (8, 4) => {
            let pixels = (width as usize) * (height as usize);
            if data.len() < pixels * 4 {
                return Err(too_short());
            }
            let rgb: Vec<u8> = data[..pixels * 4]
                .chunks_exact(4)
                .flat_map(|cmyk| {
                    let k = 255 - u16::from(cmyk[3]);
                    let channel = |v: u8| ((255 - u16::from(v)) * k / 255) as u8;
                    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
                })
                .collect();
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(too_short)
        }
        (1, 1) => {
            let row_bytes = (width as usize).div_ceil(8);
            if data.len() < row_bytes * height as usize {
                return Err(too_short());
            }
            let mut gray = Vec::with_capacity(width as usize * height as usize);
            for row in data.chunks_exact(row_bytes).take(height as usize) {
                for x in 0..width as usize {
                    let bit = row[x / 8] >> (7 - x % 8) & 1;
                    gray.push(if bit == 1 { 255 } else { 0 });
                }
            }
            GrayImage::from_raw(width, height, gray)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(too_short)
        }
        _ => Err(Error::ImageExport(format!(
            "unsupported sample layout: {bits} bits x {components} components"
        ))),
    }
}

/// Downscale so the pixel size does not exceed the on-page size at `dpi`.
fn fit_to_dpi(img: DynamicImage, blob: &ImageBlob, dpi: u32) -> DynamicImage {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let max_width = (blob.bbox.width() * scale).round().max(1.0) as u32;
    let max_height = (blob.bbox.height() * scale).round().max(1.0) as u32;
    if blob.bbox.is_degenerate() || (img.width() <= max_width && img.height() <= max_height) {
        return img;
    }
    log::debug!(
        "downscaling {}x{} image to fit {}x{}",
        img.width(),
        img.height(),
        max_width,
        max_height
    );
    img.resize(max_width, max_height, FilterType::Triangle)
}
