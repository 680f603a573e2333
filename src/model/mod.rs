//! # Export Model
//!
//! Configuration and value types shared by every stage of the pipeline.
//!
//! [`PageSpec`] is the only configuration input. It deserializes from
//! camelCase JSON where every field is optional, so a spec file only needs
//! to name what it changes:
//!
//! ```json
//! { "format": "Letter", "scale": 2.0, "regionPlacement": "StartOnFreshPage" }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};
use crate::units::Density;

/// Complete export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSpec {
    /// Output page format (portrait).
    pub format: PageFormat,
    /// Density the render surface is measured in.
    pub density: Density,
    /// Bitmap pixels per surface pixel.
    pub scale: f64,
    /// Logical viewport width the surface is laid out at during capture.
    pub window_width: u32,
    /// Fill painted under the document so the bitmap has no transparency.
    pub background: Rgb,
    /// Top margin drawn on every page after the first, in millimeters.
    pub top_margin_mm: f64,
    /// Breathing room left above the protected region, in bitmap pixels.
    pub region_margin_px: u32,
    /// Height mismatch (surface px) below which no padding is applied.
    pub height_tolerance_px: f64,
    /// When the protected region is forced onto a fresh page.
    pub region_placement: RegionPlacement,
    /// How page images are embedded in the PDF.
    pub image_encoding: ImageEncoding,
    /// Deflate page content streams.
    pub compress: bool,
    /// Identifier of the region that must never be split.
    pub protected_region_id: String,
    /// First component of the output file name.
    pub file_prefix: String,
    /// Used in the file name when the document has no identifier.
    pub draft_placeholder: String,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            format: PageFormat::A4,
            density: Density::CSS,
            scale: 3.0,
            window_width: 1800,
            background: Rgb::WHITE,
            top_margin_mm: 15.0,
            region_margin_px: 24,
            height_tolerance_px: 0.5,
            region_placement: RegionPlacement::CutInside,
            image_encoding: ImageEncoding::Flate,
            compress: true,
            protected_region_id: "payment-and-footer".to_string(),
            file_prefix: "Invoice".to_string(),
            draft_placeholder: "draft".to_string(),
        }
    }
}

impl PageSpec {
    /// Parse a spec from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: PageSpec = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Read and parse a spec file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ExportError::Precondition(format!(
                "cannot read page spec '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    /// Reject values that cannot produce a page.
    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.format.dimensions_mm();
        if !(w > 0.0 && h > 0.0) {
            return Err(ExportError::Geometry(format!(
                "page format must have positive dimensions, got {}x{} mm",
                w, h
            )));
        }
        if !(self.scale > 0.0) || !self.scale.is_finite() {
            return Err(ExportError::Geometry(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if !(self.density.px_per_mm > 0.0) {
            return Err(ExportError::Geometry(format!(
                "density must be positive, got {} px/mm",
                self.density.px_per_mm
            )));
        }
        if self.top_margin_mm < 0.0 || self.top_margin_mm >= h {
            return Err(ExportError::Geometry(format!(
                "top margin {} mm does not fit a {} mm page",
                self.top_margin_mm, h
            )));
        }
        if let ImageEncoding::Jpeg { quality } = self.image_encoding {
            if quality == 0 || quality > 100 {
                return Err(ExportError::Geometry(format!(
                    "JPEG quality must be within 1..=100, got {}",
                    quality
                )));
            }
        }
        Ok(())
    }

    pub fn page_width_mm(&self) -> f64 {
        self.format.dimensions_mm().0
    }

    pub fn page_height_mm(&self) -> f64 {
        self.format.dimensions_mm().1
    }
}

/// Standard page formats, portrait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageFormat {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    #[serde(rename_all = "camelCase")]
    Custom { width_mm: f64, height_mm: f64 },
}

impl PageFormat {
    /// Returns (width, height) in millimeters.
    pub fn dimensions_mm(&self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (210.0, 297.0),
            PageFormat::A3 => (297.0, 420.0),
            PageFormat::A5 => (148.0, 210.0),
            PageFormat::Letter => (215.9, 279.4),
            PageFormat::Legal => (215.9, 355.6),
            PageFormat::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

/// What happens when the protected region meets a page boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionPlacement {
    /// Move the region to a fresh page only when a tentative cut would land
    /// strictly inside it. A region that already fits on the current page
    /// stays where it is.
    #[default]
    CutInside,
    /// Always begin the region on a fresh page, unless the current page
    /// already starts at or below it.
    StartOnFreshPage,
}

/// Image compression used for the page bitmaps inside the PDF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageEncoding {
    /// Lossless: raw RGB, zlib compressed.
    #[default]
    Flate,
    /// Lossy: baseline JPEG at the given quality (1-100).
    Jpeg { quality: u8 },
}

/// Whether the surface should apply its export-safe styling.
///
/// Passed explicitly into measurement and capture instead of living in a
/// shared flag, so one export cannot leak its mode into another caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Interactive,
    Export,
}

/// An opaque 8-bit RGB colour. Serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    pub const BLACK: Rgb = Rgb([0, 0, 0]);

    /// Parse `#rgb` or `#rrggbb` (the leading `#` is optional).
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        let digit = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
        match hex.len() {
            3 => Some(Rgb([
                digit(0, 1)? * 17,
                digit(1, 1)? * 17,
                digit(2, 1)? * 17,
            ])),
            6 => Some(Rgb([digit(0, 2)?, digit(2, 2)?, digit(4, 2)?])),
            _ => None,
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Rgb::parse(&value).ok_or_else(|| format!("invalid colour '{}', expected #rrggbb", value))
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> String {
        c.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

/// Bounds of a sub-region relative to the surface's top-left corner, in
/// surface (CSS) pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CssRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl CssRect {
    /// A full-width vertical span.
    pub fn span(top: f64, bottom: f64) -> Self {
        Self {
            left: 0.0,
            top,
            right: 0.0,
            bottom,
        }
    }
}

/// Half-open vertical interval `[start, end)` of bitmap rows that must stay
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectedRegion {
    pub start: u32,
    pub end: u32,
}

impl ProtectedRegion {
    /// Returns `None` for an empty interval.
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Convert surface coordinates to bitmap rows. The scale is applied here
    /// and nowhere else; the start rounds down and the end rounds up so the
    /// region never loses a partially covered row.
    pub fn from_css(rect: CssRect, scale: f64, bitmap_height: u32) -> Option<Self> {
        let start = (rect.top * scale).floor().max(0.0);
        let end = (rect.bottom * scale).ceil().min(bitmap_height as f64);
        if !(start < end) {
            return None;
        }
        Self::new(start as u32, end as u32)
    }

    pub fn height(&self) -> u32 {
        self.end - self.start
    }
}

/// One horizontal slice of the bitmap, mapped to one output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBand {
    pub y_start: u32,
    pub height: u32,
    pub is_first_page: bool,
}

impl PageBand {
    pub fn y_end(&self) -> u32 {
        self.y_start + self.height
    }
}
