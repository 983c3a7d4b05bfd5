// PDF document composition: one JPEG per page, pages at half the image's
// natural pixel dimensions.

use crate::error::PipelineError;
use image::ImageDecoder;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;
use tracing::debug;

/// Every page is the source image's natural dimensions scaled by this factor.
pub const PAGE_SCALE: f32 = 0.5;

/// In-memory PDF accumulator. Pages are appended in call order and the
/// document is serialized exactly once by [`PdfBuilder::finish`].
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        // Reserved up front so page objects can reference their parent.
        let pages_id = doc.new_object_id();
        PdfBuilder {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Embeds `jpeg` as a DCTDecode image XObject and appends a page of
    /// exactly the scaled image dimensions, with the image drawn filling the
    /// full page. `name` is the original filename, for error reporting only.
    pub fn add_page(&mut self, jpeg: &[u8], name: &str) -> Result<(), PipelineError> {
        let decoder = image::codecs::jpeg::JpegDecoder::new(Cursor::new(jpeg)).map_err(|e| {
            PipelineError::Compose {
                name: name.to_string(),
                message: format!("not a readable JPEG: {e}"),
            }
        })?;
        let (px_width, px_height) = decoder.dimensions();
        let color_space: &[u8] = match decoder.color_type() {
            image::ColorType::L8 | image::ColorType::L16 => b"DeviceGray",
            _ => b"DeviceRGB",
        };

        let page_width = px_width as f32 * PAGE_SCALE;
        let page_height = px_height as f32 * PAGE_SCALE;
        debug!(
            "Embedding '{}': {}x{} px -> {}x{} pt page",
            name, px_width, px_height, page_width, page_height
        );

        // The JPEG bytes go into the PDF as-is; DCTDecode is the JPEG codec.
        let mut image_dict = Dictionary::new();
        image_dict.set("Type", Object::Name(b"XObject".to_vec()));
        image_dict.set("Subtype", Object::Name(b"Image".to_vec()));
        image_dict.set("Width", Object::Integer(px_width as i64));
        image_dict.set("Height", Object::Integer(px_height as i64));
        image_dict.set("ColorSpace", Object::Name(color_space.to_vec()));
        image_dict.set("BitsPerComponent", Object::Integer(8));
        image_dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        let mut image_stream = Stream::new(image_dict, jpeg.to_vec());
        // The stream content is already DCT-compressed.
        image_stream.allows_compression = false;
        let image_id = self.doc.add_object(image_stream);

        // Scale the unit image square up to the page size and draw it at the
        // origin so it covers the page exactly.
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(page_width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page_height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ];
        let content = Content { operations };
        let content_data = content.encode().map_err(|e| PipelineError::Compose {
            name: name.to_string(),
            message: format!("content stream encoding failed: {e}"),
        })?;
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content_data));

        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_width),
                Object::Real(page_height),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));
        let page_id = self.doc.add_object(page_dict);

        self.page_ids.push(page_id);
        Ok(())
    }

    /// Builds the page tree and catalog, then serializes the document to
    /// bytes. Consumes the builder; a document is finalized exactly once.
    pub fn finish(mut self) -> Result<Vec<u8>, PipelineError> {
        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set(
            "Kids",
            Object::Array(self.page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        );
        pages_dict.set("Count", Object::Integer(self.page_ids.len() as i64));
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| PipelineError::Delivery(e.to_string()))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 90, 170]));
        let mut buffer = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, image::ImageFormat::Jpeg)
            .unwrap();
        buffer.into_inner()
    }

    fn media_box(doc: &Document, page_id: ObjectId) -> (f32, f32) {
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let width = media_box[2].as_float().unwrap();
        let height = media_box[3].as_float().unwrap();
        (width, height)
    }

    #[test]
    fn test_pages_match_input_order_and_scaled_dimensions() {
        let mut builder = PdfBuilder::new();
        builder.add_page(&jpeg_bytes(300, 400), "portrait.jpg").unwrap();
        builder.add_page(&jpeg_bytes(400, 300), "landscape.jpg").unwrap();
        assert_eq!(builder.page_count(), 2);

        let bytes = builder.finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert_eq!(pages.len(), 2);

        assert_eq!(media_box(&doc, pages[0]), (150.0, 200.0));
        assert_eq!(media_box(&doc, pages[1]), (200.0, 150.0));
    }

    #[test]
    fn test_embedded_stream_is_raw_jpeg() {
        let jpeg = jpeg_bytes(32, 32);
        let mut builder = PdfBuilder::new();
        builder.add_page(&jpeg, "one.jpg").unwrap();
        let bytes = builder.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let has_dct_stream = doc.objects.values().any(|obj| {
            matches!(obj, Object::Stream(stream) if stream.content == jpeg)
        });
        assert!(has_dct_stream);
    }

    #[test]
    fn test_non_jpeg_input_is_rejected() {
        let mut builder = PdfBuilder::new();
        let result = builder.add_page(b"not a jpeg", "bad.bin");
        assert!(matches!(result, Err(PipelineError::Compose { .. })));
    }

    #[test]
    fn test_empty_document_still_serializes() {
        let bytes = PdfBuilder::new().finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }
}
