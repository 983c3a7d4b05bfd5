// Image codec conversion: source format -> JPEG bytes.
//
// HEIC containers are decoded through libheif when the `heic` feature is
// enabled; everything else goes through the `image` crate.

use crate::error::PipelineError;
use std::io::Cursor;
use tracing::debug;

/// JPEG encoder quality, matching the 0.8 quality the service has always used.
pub const JPEG_QUALITY: u8 = 80;

/// JPEG SOI marker. Everything a JPEG decoder accepts starts with these bytes.
const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];

/// Brands that phone cameras put in the `ftyp` box of HEIF containers.
const HEIC_BRANDS: [&[u8; 4]; 8] = [
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"mif1", b"msf1",
];

/// Returns true when `data` is an ISO BMFF container whose `ftyp` box carries
/// a HEIC/HEIF brand.
pub fn is_heic(data: &[u8]) -> bool {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return false;
    }
    let brand = &data[8..12];
    HEIC_BRANDS.iter().any(|b| brand == &b[..])
}

/// Decodes `data` and re-encodes it as a baseline JPEG.
///
/// HEIC input is routed to libheif; other codecs go through the `image`
/// crate per its configured features. `name` is the original filename, used
/// only for error reporting.
pub fn to_jpeg(data: &[u8], name: &str) -> Result<Vec<u8>, PipelineError> {
    let rgb = if is_heic(data) {
        decode_heic(data, name)?
    } else {
        let dyn_img = image::load_from_memory(data).map_err(|source| {
            PipelineError::Conversion {
                name: name.to_string(),
                source,
            }
        })?;

        debug!(
            "Decoded '{}': {}x{}, color {:?}",
            name,
            dyn_img.width(),
            dyn_img.height(),
            dyn_img.color()
        );

        // JPEG has no alpha channel, so flatten to RGB before encoding.
        dyn_img.to_rgb8()
    };

    encode_jpeg(&rgb, name)
}

fn encode_jpeg(rgb: &image::RgbImage, name: &str) -> Result<Vec<u8>, PipelineError> {
    let (width, height) = rgb.dimensions();

    let mut buffer = Cursor::new(Vec::new());
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder
        .encode(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .map_err(|source| PipelineError::Conversion {
            name: name.to_string(),
            source,
        })?;

    Ok(buffer.into_inner())
}

#[cfg(feature = "heic")]
fn decode_heic(data: &[u8], name: &str) -> Result<image::RgbImage, PipelineError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let heic_error = |message: String| PipelineError::Conversion {
        name: name.to_string(),
        source: image::ImageError::Decoding(image::error::DecodingError::new(
            image::error::ImageFormatHint::Name("heic".to_string()),
            message,
        )),
    };

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(data).map_err(|e| heic_error(e.to_string()))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| heic_error(e.to_string()))?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| heic_error(e.to_string()))?;

    let plane = decoded
        .planes()
        .interleaved
        .ok_or_else(|| heic_error("no interleaved RGB plane".to_string()))?;
    let (width, height) = (plane.width, plane.height);
    debug!("Decoded '{}' via libheif: {}x{}", name, width, height);

    // libheif rows are stride-padded; repack them tightly.
    let row_bytes = width as usize * 3;
    let mut raw = Vec::with_capacity(row_bytes * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        raw.extend_from_slice(&row[..row_bytes]);
    }

    image::RgbImage::from_raw(width, height, raw)
        .ok_or_else(|| heic_error("decoded plane has unexpected size".to_string()))
}

#[cfg(not(feature = "heic"))]
fn decode_heic(_data: &[u8], name: &str) -> Result<image::RgbImage, PipelineError> {
    Err(PipelineError::Conversion {
        name: name.to_string(),
        source: image::ImageError::Unsupported(
            image::error::UnsupportedError::from_format_and_kind(
                image::error::ImageFormatHint::Name("heic".to_string()),
                image::error::UnsupportedErrorKind::Format(image::error::ImageFormatHint::Name(
                    "heic (rebuild with the 'heic' feature)".to_string(),
                )),
            ),
        ),
    })
}

/// Pass-through for backends that transcode on ingest.
///
/// The remote blob store is configured to store every upload as JPEG, but the
/// declared format is not trusted blindly: if the fetched bytes do not carry a
/// JPEG signature they are re-encoded locally instead of being embedded as-is.
pub fn ensure_jpeg(data: Vec<u8>, name: &str) -> Result<Vec<u8>, PipelineError> {
    if data.starts_with(&JPEG_MAGIC) {
        return Ok(data);
    }

    debug!(
        "Stored object for '{}' is not JPEG despite backend transcoding, re-encoding locally",
        name
    );
    to_jpeg(&data, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
        let mut buffer = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    // A well-formed ftyp box with a HEIC brand and nothing after it.
    fn heic_container_stub(brand: &[u8; 4]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&20u32.to_be_bytes());
        data.extend_from_slice(b"ftyp");
        data.extend_from_slice(brand);
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(brand);
        data
    }

    #[test]
    fn test_png_converts_to_jpeg() {
        let png = png_bytes(64, 48);
        let jpeg = to_jpeg(&png, "photo.png").unwrap();

        assert!(jpeg.starts_with(&JPEG_MAGIC));
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }

    #[test]
    fn test_garbage_input_fails() {
        let result = to_jpeg(b"definitely not an image", "broken.bin");
        assert!(matches!(
            result,
            Err(PipelineError::Conversion { ref name, .. }) if name == "broken.bin"
        ));
    }

    #[test]
    fn test_heic_container_detection() {
        assert!(is_heic(&heic_container_stub(b"heic")));
        assert!(is_heic(&heic_container_stub(b"heix")));
        assert!(is_heic(&heic_container_stub(b"mif1")));

        assert!(!is_heic(&png_bytes(8, 8)));
        assert!(!is_heic(&heic_container_stub(b"avif")));
        assert!(!is_heic(b"ftypheic"));
    }

    #[test]
    fn test_heic_container_without_image_data_fails_with_conversion_error() {
        // Routes through the HEIC branch either way: libheif rejects the
        // truncated container, and builds without the decoder report the
        // format as unsupported.
        let result = to_jpeg(&heic_container_stub(b"heic"), "IMG_0001.HEIC");
        assert!(matches!(
            result,
            Err(PipelineError::Conversion { ref name, .. }) if name == "IMG_0001.HEIC"
        ));
    }

    #[test]
    fn test_ensure_jpeg_passes_jpeg_through_untouched() {
        let jpeg = to_jpeg(&png_bytes(16, 16), "a.png").unwrap();
        let passed = ensure_jpeg(jpeg.clone(), "a.jpg").unwrap();
        assert_eq!(passed, jpeg);
    }

    #[test]
    fn test_ensure_jpeg_reencodes_non_jpeg() {
        let png = png_bytes(20, 10);
        let jpeg = ensure_jpeg(png, "b.png").unwrap();
        assert!(jpeg.starts_with(&JPEG_MAGIC));
    }
}
