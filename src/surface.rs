//! # Render Surfaces
//!
//! A render surface is the laid-out document the pipeline exports. It is
//! owned by the caller; the pipeline only measures it, temporarily pads its
//! bottom edge, and hands it to a [`Rasterizer`](crate::raster::Rasterizer).
//!
//! [`normalize_height`] is the height normalizer: it pads the surface until
//! it measures exactly one page tall and returns a [`PaddingGuard`] that puts
//! the original padding back when dropped, whichever way the export ends.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use image::RgbaImage;

use crate::model::{CssRect, PageSpec, RenderMode};

/// A laid-out document with a measurable box and a mutable bottom padding.
pub trait RenderSurface {
    /// Width and height in surface pixels, including the bottom padding.
    fn measure(&self, mode: RenderMode) -> (f64, f64);

    /// Current bottom padding in surface pixels.
    fn padding_bottom(&self) -> f64;

    /// Replace the bottom padding. Values below zero are treated as zero.
    fn set_padding_bottom(&mut self, px: f64);

    /// Bounds of a named sub-region relative to the surface's top edge, or
    /// `None` when the surface has no such region.
    fn region_bounds(&self, id: &str, mode: RenderMode) -> Option<CssRect>;
}

/// A surface backed by an image of the already-rendered document.
///
/// `pixel_ratio` is the number of image pixels per surface pixel, so a 2x
/// screenshot measures the same as the 1x layout it was taken from. An
/// optional second image stands in for the document with its export styling
/// applied (no transforms, no interactive chrome).
#[derive(Debug, Clone)]
pub struct SnapshotSurface {
    content: RgbaImage,
    export_content: Option<RgbaImage>,
    pixel_ratio: f64,
    padding_bottom: f64,
    regions: HashMap<String, CssRect>,
}

impl SnapshotSurface {
    pub fn new(content: RgbaImage) -> Self {
        Self {
            content,
            export_content: None,
            pixel_ratio: 1.0,
            padding_bottom: 0.0,
            regions: HashMap::new(),
        }
    }

    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        if ratio > 0.0 && ratio.is_finite() {
            self.pixel_ratio = ratio;
        }
        self
    }

    pub fn with_export_content(mut self, content: RgbaImage) -> Self {
        self.export_content = Some(content);
        self
    }

    pub fn with_padding_bottom(mut self, px: f64) -> Self {
        self.padding_bottom = px.max(0.0);
        self
    }

    /// Register a named region, in surface pixels.
    pub fn with_region(mut self, id: impl Into<String>, rect: CssRect) -> Self {
        self.regions.insert(id.into(), rect);
        self
    }

    /// The image painted for the given mode.
    pub fn content(&self, mode: RenderMode) -> &RgbaImage {
        match (mode, &self.export_content) {
            (RenderMode::Export, Some(export)) => export,
            _ => &self.content,
        }
    }

    /// Content size in surface pixels, without padding.
    pub fn content_size(&self, mode: RenderMode) -> (f64, f64) {
        let img = self.content(mode);
        (
            img.width() as f64 / self.pixel_ratio,
            img.height() as f64 / self.pixel_ratio,
        )
    }
}

impl RenderSurface for SnapshotSurface {
    fn measure(&self, mode: RenderMode) -> (f64, f64) {
        let (w, h) = self.content_size(mode);
        (w, h + self.padding_bottom)
    }

    fn padding_bottom(&self) -> f64 {
        self.padding_bottom
    }

    fn set_padding_bottom(&mut self, px: f64) {
        self.padding_bottom = px.max(0.0);
    }

    fn region_bounds(&self, id: &str, _mode: RenderMode) -> Option<CssRect> {
        self.regions.get(id).copied()
    }
}

/// Restores a surface's bottom padding when dropped.
///
/// Dereferences to the surface so capture and measurement can run while the
/// override is in place.
pub struct PaddingGuard<'a, S: RenderSurface + ?Sized> {
    surface: &'a mut S,
    original: f64,
}

impl<'a, S: RenderSurface + ?Sized> PaddingGuard<'a, S> {
    /// Remember the current padding. Nothing is changed yet.
    pub fn new(surface: &'a mut S) -> Self {
        let original = surface.padding_bottom();
        Self { surface, original }
    }

    /// The padding that will be restored.
    pub fn original(&self) -> f64 {
        self.original
    }
}

impl<S: RenderSurface + ?Sized> Deref for PaddingGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> DerefMut for PaddingGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> Drop for PaddingGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.set_padding_bottom(self.original);
        log::debug!("restored surface padding-bottom to {:.2}px", self.original);
    }
}

/// Pad the surface so it measures exactly one page tall.
///
/// The target is the page height in whole surface pixels, rounded down, so a
/// scaled capture of a page-width surface never spills a one-row sliver onto
/// a second page.
///
/// Content shorter than a page is padded out to a full page; content taller
/// than a page has its existing padding reduced, never below zero, so the
/// measured height lands as close to a page as the padding allows. Within
/// `spec.height_tolerance_px` nothing is changed.
pub fn normalize_height<'a, S: RenderSurface + ?Sized>(
    surface: &'a mut S,
    spec: &PageSpec,
) -> PaddingGuard<'a, S> {
    let mut guard = PaddingGuard::new(surface);

    let target_px = page_height_px(spec);
    let (_, current_px) = guard.measure(RenderMode::Export);
    let delta = target_px - current_px;

    if delta.abs() > spec.height_tolerance_px {
        let padded = (guard.original() + delta).max(0.0);
        guard.set_padding_bottom(padded);
        log::debug!(
            "normalized surface height {:.2}px -> target {:.2}px (padding-bottom {:.2}px)",
            current_px,
            target_px,
            padded
        );
    }

    guard
}

/// One page height in whole surface pixels.
pub fn page_height_px(spec: &PageSpec) -> f64 {
    spec.density.mm_to_px(spec.page_height_mm()).floor()
}
