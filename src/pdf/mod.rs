//! # PDF Serializer
//!
//! An append-only PDF document made of full-width page images.
//!
//! This is a from-scratch PDF 1.7 writer. The export pipeline only ever
//! places one raster image per page, so the subset needed is small: a
//! catalog, a page tree, one image XObject and one content stream per image.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog
//! 2 0 obj ... endobj  <- page tree
//! ...                 <- per page: image XObjects, content stream, page
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! Placement is given in millimeters from the page's top-left corner, the
//! way the invoice layout is measured, and converted to PDF points with the
//! origin flipped to the bottom-left.

use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>
use std::path::Path;

use image::RgbImage;
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::{ExportError, Result};
use crate::model::{ImageEncoding, PageSpec};
use crate::units::mm_to_pt;

/// Where an image is drawn on the current page, in millimeters from the
/// top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// An output document that pages are appended to.
///
/// A new document already has one empty page. Images are always drawn on
/// the last page.
pub trait DocumentWriter {
    /// Create an empty document for the spec's page format.
    fn new_document(spec: &PageSpec) -> Result<Self>
    where
        Self: Sized;

    /// Append a blank page and make it current.
    fn add_page(&mut self);

    fn page_count(&self) -> usize;

    /// Encode `image` and draw it on the current page.
    fn draw_image(&mut self, image: &RgbImage, placement: ImagePlacement) -> Result<()>;

    /// Set the document title recorded in the PDF info dictionary.
    fn set_title(&mut self, _title: &str) {}

    /// Finalize the document and write it to `path`.
    fn save(&mut self, path: &Path) -> Result<()>;
}

/// The PDF implementation of [`DocumentWriter`].
#[derive(Debug)]
pub struct PdfDocument {
    page_width_mm: f64,
    page_height_mm: f64,
    encoding: ImageEncoding,
    compress: bool,
    title: Option<String>,
    pages: Vec<PdfPage>,
}

#[derive(Debug, Default)]
struct PdfPage {
    images: Vec<PlacedImage>,
}

#[derive(Debug)]
struct PlacedImage {
    image: EncodedImage,
    placement: ImagePlacement,
}

/// Image bytes ready to drop into an XObject stream.
#[derive(Debug)]
struct EncodedImage {
    width_px: u32,
    height_px: u32,
    filter: &'static str,
    data: Vec<u8>,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    fn push_stream(&mut self, dict_entries: &str, stream: &[u8]) -> usize {
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< {} /Length {} >>\nstream\n",
            dict_entries,
            stream.len()
        );
        data.extend_from_slice(stream);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

impl PdfDocument {
    pub fn new(page_width_mm: f64, page_height_mm: f64) -> Self {
        Self {
            page_width_mm,
            page_height_mm,
            encoding: ImageEncoding::Flate,
            compress: true,
            title: None,
            pages: vec![PdfPage::default()],
        }
    }

    pub fn with_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Serialize the document to PDF bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
        };

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        builder.push(vec![]);
        builder.push(vec![]);
        builder.push(vec![]);

        let width_pt = mm_to_pt(self.page_width_mm);
        let height_pt = mm_to_pt(self.page_height_mm);
        let mut page_obj_ids: Vec<usize> = Vec::with_capacity(self.pages.len());

        for page in &self.pages {
            let mut xobjects = String::new();
            let mut content = String::new();

            for (idx, placed) in page.images.iter().enumerate() {
                let img = &placed.image;
                let xobj_id = builder.push_stream(
                    &format!(
                        "/Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter {}",
                        img.width_px, img.height_px, img.filter
                    ),
                    &img.data,
                );
                let _ = write!(xobjects, "/Im{} {} 0 R ", idx, xobj_id);

                let p = placed.placement;
                let w = mm_to_pt(p.width_mm);
                let h = mm_to_pt(p.height_mm);
                let x = mm_to_pt(p.x_mm);
                let y = height_pt - mm_to_pt(p.y_mm) - h;
                let _ = writeln!(
                    content,
                    "q {:.4} 0 0 {:.4} {:.4} {:.4} cm /Im{} Do Q",
                    w, h, x, y, idx
                );
            }

            let content_obj_id = if self.compress {
                let compressed = compress_to_vec_zlib(content.as_bytes(), 6);
                builder.push_stream("/Filter /FlateDecode", &compressed)
            } else {
                builder.push_stream("", content.as_bytes())
            };

            let resources = if xobjects.is_empty() {
                String::new()
            } else {
                format!("/XObject << {}>>", xobjects)
            };
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                width_pt, height_pt, content_obj_id, resources
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(ref title) = self.title {
            let _ = write!(info, "/Title {} ", pdf_text_string(title));
        }
        let _ = write!(info, "/Producer (folio) /Creator (folio) >>");
        let info_obj_id = builder.push(info.into_bytes());

        serialize(&builder, info_obj_id)
    }

    fn encode(&self, image: &RgbImage) -> Result<EncodedImage> {
        let (width_px, height_px) = image.dimensions();
        match self.encoding {
            ImageEncoding::Flate => Ok(EncodedImage {
                width_px,
                height_px,
                filter: "/FlateDecode",
                data: compress_to_vec_zlib(image.as_raw(), 6),
            }),
            ImageEncoding::Jpeg { quality } => {
                let mut data = Vec::new();
                let encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut data, quality);
                image::ImageEncoder::write_image(
                    encoder,
                    image.as_raw(),
                    width_px,
                    height_px,
                    image::ColorType::Rgb8,
                )?;
                Ok(EncodedImage {
                    width_px,
                    height_px,
                    filter: "/DCTDecode",
                    data,
                })
            }
        }
    }
}

impl DocumentWriter for PdfDocument {
    fn new_document(spec: &PageSpec) -> Result<Self> {
        spec.validate()?;
        let (w, h) = spec.format.dimensions_mm();
        Ok(PdfDocument::new(w, h)
            .with_encoding(spec.image_encoding)
            .with_compression(spec.compress))
    }

    fn add_page(&mut self) {
        self.pages.push(PdfPage::default());
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn draw_image(&mut self, image: &RgbImage, placement: ImagePlacement) -> Result<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ExportError::Write("cannot embed an empty image".into()));
        }
        let encoded = self.encode(image)?;
        let page = self
            .pages
            .last_mut()
            .ok_or_else(|| ExportError::Write("document has no pages".into()))?;
        page.images.push(PlacedImage {
            image: encoded,
            placement,
        });
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    /// Writes through a temporary file in the target directory so a failed
    /// save never leaves a truncated PDF behind.
    fn save(&mut self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
            ExportError::Write(format!("cannot create file in '{}': {}", dir.display(), e))
        })?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| {
            ExportError::Write(format!("cannot save '{}': {}", path.display(), e.error))
        })?;
        Ok(())
    }
}

/// Encode a text string for the info dictionary: a literal string for
/// ASCII, otherwise UTF-16BE with a byte order mark as a hex string.
fn pdf_text_string(s: &str) -> String {
    if s.is_ascii() {
        return format!("({})", escape_pdf_string(s));
    }
    let mut hex = String::from("<FEFF");
    for unit in s.encode_utf16() {
        let _ = write!(hex, "{:04X}", unit);
    }
    hex.push('>');
    hex
}

/// Escape special characters in a PDF string.
fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Serialize all objects into the final PDF byte stream.
fn serialize(builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, obj) in builder.objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let header = format!("{} 0 obj\n", i);
        output.extend_from_slice(header.as_bytes());
        output.extend_from_slice(&obj.data);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
    let _ = write!(output, "0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{:010} 00000 n \n", offset);
    }

    let _ = write!(
        output,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        builder.objects.len(),
        info_obj_id,
        xref_offset
    );

    output
}
