//! # Rasterization
//!
//! Captures a render surface into one tall, opaque [`Bitmap`]. The bitmap is
//! produced once per export and only read afterwards.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbImage, RgbaImage};

use crate::error::{ExportError, Result};
use crate::model::{PageSpec, RenderMode, Rgb};
use crate::surface::{RenderSurface, SnapshotSurface};

/// Refuse to allocate bitmaps beyond this many pixels (about 1.2 GB RGB).
pub const MAX_BITMAP_PIXELS: u64 = 400_000_000;

/// An immutable, opaque RGB pixel grid.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pixels: RgbImage,
}

impl Bitmap {
    /// Wrap captured pixels. Empty captures are malformed output.
    pub fn new(pixels: RgbImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ExportError::Capture(format!(
                "rasterizer returned an empty {}x{} bitmap",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Copy rows `[y, y + height)` into a standalone image.
    pub fn strip(&self, y: u32, height: u32) -> RgbImage {
        imageops::crop_imm(&self.pixels, 0, y, self.width(), height).to_image()
    }
}

/// Parameters for one capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    /// Bitmap pixels per surface pixel.
    pub scale: f64,
    /// Logical viewport width a live renderer should lay the surface out
    /// at before capturing. A layout hint only: surfaces that are already
    /// laid out, like [`SnapshotSurface`], keep their own width.
    pub window_width: u32,
    /// Opaque fill under the document.
    pub background: Rgb,
    pub mode: RenderMode,
}

impl CaptureOptions {
    /// Export-mode capture settings for a page spec.
    pub fn for_export(spec: &PageSpec) -> Self {
        Self {
            scale: spec.scale,
            window_width: spec.window_width,
            background: spec.background,
            mode: RenderMode::Export,
        }
    }
}

/// Turns a surface into a bitmap. Implementations must fail rather than
/// return a partial capture.
///
/// The bitmap is `scale` times the surface's measured size. Rasterizers that
/// drive a layout engine apply `window_width` before measuring; the others
/// ignore it.
pub trait Rasterizer<S: RenderSurface + ?Sized> {
    fn capture(&self, surface: &S, options: &CaptureOptions) -> Result<Bitmap>;
}

/// Rasterizes a [`SnapshotSurface`] by resampling its image.
///
/// The snapshot was laid out when it was taken, so `window_width` cannot
/// change it and is only logged.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotRasterizer {
    pub filter: FilterType,
}

impl Default for SnapshotRasterizer {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl Rasterizer<SnapshotSurface> for SnapshotRasterizer {
    fn capture(&self, surface: &SnapshotSurface, options: &CaptureOptions) -> Result<Bitmap> {
        if !(options.scale > 0.0) || !options.scale.is_finite() {
            return Err(ExportError::Capture(format!(
                "invalid capture scale {}",
                options.scale
            )));
        }

        let (css_width, css_height) = surface.measure(options.mode);
        let (_, content_css_height) = surface.content_size(options.mode);

        let width = (css_width * options.scale).round() as u32;
        let height = (css_height * options.scale).round() as u32;
        let content_height = ((content_css_height * options.scale).round() as u32).min(height);

        if width == 0 || height == 0 {
            return Err(ExportError::Capture(format!(
                "surface measures {:.1}x{:.1}px, nothing to capture",
                css_width, css_height
            )));
        }
        if width as u64 * height as u64 > MAX_BITMAP_PIXELS {
            return Err(ExportError::Capture(format!(
                "{}x{} bitmap exceeds the {} pixel capture limit",
                width, height, MAX_BITMAP_PIXELS
            )));
        }

        log::debug!(
            "capturing {:.1}x{:.1}px surface at {}x into {}x{} bitmap (window width {})",
            css_width,
            css_height,
            options.scale,
            width,
            height,
            options.window_width
        );

        let [r, g, b] = options.background.0;
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));

        let content = surface.content(options.mode);
        if content_height > 0 {
            if content.dimensions() == (width, content_height) {
                imageops::overlay(&mut canvas, content, 0, 0);
            } else {
                let scaled = imageops::resize(content, width, content_height, self.filter);
                imageops::overlay(&mut canvas, &scaled, 0, 0);
            }
        }

        Bitmap::new(DynamicImage::ImageRgba8(canvas).to_rgb8())
    }
}
