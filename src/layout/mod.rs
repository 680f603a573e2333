//! # Pagination
//!
//! Geometry that turns one tall bitmap into page-sized pieces.
//!
//! Every page is filled edge to edge horizontally, so the bitmap is scaled
//! by a single width-fit ratio and the page height follows from it. The
//! slicer in [`page_break`] then decides where the cuts go and [`assemble`]
//! places each piece on its page.

pub mod assemble;
pub mod page_break;

use crate::error::{ExportError, Result};
use crate::model::PageSpec;

/// Scale that maps bitmap pixels onto the page's physical width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthFit {
    /// Millimeters per bitmap pixel before fitting.
    pub mm_per_px: f64,
    /// Uniform scale making `bitmap_width * mm_per_px * ratio == page_width_mm`.
    pub ratio: f64,
    /// Bitmap rows that exactly fill one page height at `ratio`.
    pub page_height_px: u32,
    pub page_width_mm: f64,
    pub page_height_mm: f64,
}

impl WidthFit {
    pub fn new(spec: &PageSpec, bitmap_width: u32) -> Result<Self> {
        if bitmap_width == 0 {
            return Err(ExportError::Geometry("bitmap has no width".into()));
        }
        let mm_per_px = spec.density.mm_per_px();
        let page_width_mm = spec.page_width_mm();
        let page_height_mm = spec.page_height_mm();

        let ratio = page_width_mm / (bitmap_width as f64 * mm_per_px);
        // page_height_mm / (mm_per_px * ratio), with mm_per_px cancelled out
        // so exact aspect ratios don't floor one row short.
        let capacity = (page_height_mm * bitmap_width as f64 / page_width_mm).floor();
        if !(capacity >= 1.0) || !capacity.is_finite() {
            return Err(ExportError::Geometry(format!(
                "a {} mm page holds {} rows of a {} px wide bitmap",
                page_height_mm, capacity, bitmap_width
            )));
        }

        Ok(Self {
            mm_per_px,
            ratio,
            page_height_px: capacity.min(u32::MAX as f64) as u32,
            page_width_mm,
            page_height_mm,
        })
    }

    /// Physical height of `rows` bitmap rows once fitted to the page.
    pub fn rows_to_mm(&self, rows: u32) -> f64 {
        rows as f64 * self.mm_per_px * self.ratio
    }
}
