//! # Export Pipeline
//!
//! Sequences one export from a live surface to a saved file:
//!
//! ```text
//! surface ─ normalize ─ capture ─ region ─ (restore) ─ fit ─ slice ─ assemble ─ save
//! ```
//!
//! The surface is borrowed mutably for the whole run, so two exports can't
//! share it. Its padding is restored by a guard before geometry starts, on
//! every exit path. Every failure comes back as an [`ExportError`] and is
//! logged once here.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info};

use crate::error::{ExportError, Result};
use crate::layout::assemble::assemble_pages;
use crate::layout::page_break::slice_pages;
use crate::layout::WidthFit;
use crate::model::{PageBand, PageSpec, ProtectedRegion, RenderMode};
use crate::pdf::{DocumentWriter, PdfDocument};
use crate::raster::{Bitmap, CaptureOptions, Rasterizer};
use crate::surface::{normalize_height, RenderSurface};

/// Cooperative cancellation shared between the caller and a running export.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-export inputs that are not page geometry.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Invoice number or other identifier used in the file name.
    pub document_id: Option<String>,
    pub output_dir: PathBuf,
    /// Milliseconds since the Unix epoch; the current time when `None`.
    pub timestamp_ms: Option<i64>,
    pub cancel: Option<CancelToken>,
}

impl ExportRequest {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            document_id: None,
            output_dir: output_dir.into(),
            timestamp_ms: None,
            cancel: None,
        }
    }

    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }

    pub fn with_timestamp_ms(mut self, ms: i64) -> Self {
        self.timestamp_ms = Some(ms);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// What a successful export produced.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub path: PathBuf,
    pub page_count: usize,
    pub bands: Vec<PageBand>,
}

/// A captured bitmap and the bands it will be cut into.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub bitmap: Bitmap,
    pub fit: WidthFit,
    pub region: Option<ProtectedRegion>,
    pub bands: Vec<PageBand>,
}

/// Capture `surface` and work out its pages without writing anything.
///
/// The surface's padding is back to its original value when this returns,
/// whether it succeeded or not.
pub fn paginate<S, R>(surface: &mut S, rasterizer: &R, spec: &PageSpec) -> Result<Pagination>
where
    S: RenderSurface + ?Sized,
    R: Rasterizer<S> + ?Sized,
{
    spec.validate()?;

    let (bitmap, region) = {
        let guard = normalize_height(surface, spec);
        let bitmap = rasterizer.capture(&*guard, &CaptureOptions::for_export(spec))?;
        let region = guard
            .region_bounds(&spec.protected_region_id, RenderMode::Export)
            .and_then(|rect| ProtectedRegion::from_css(rect, spec.scale, bitmap.height()));
        (bitmap, region)
    };

    match region {
        Some(r) => debug!(
            "protected region '{}' covers rows [{}, {})",
            spec.protected_region_id, r.start, r.end
        ),
        None => debug!(
            "no protected region '{}' on surface, slicing at fixed height",
            spec.protected_region_id
        ),
    }

    let fit = WidthFit::new(spec, bitmap.width())?;
    let bands = slice_pages(
        bitmap.height(),
        fit.page_height_px,
        region,
        spec.region_margin_px,
        spec.region_placement,
    );
    debug!(
        "{}x{} bitmap, {} rows per page, {} band(s)",
        bitmap.width(),
        bitmap.height(),
        fit.page_height_px,
        bands.len()
    );

    Ok(Pagination {
        bitmap,
        fit,
        region,
        bands,
    })
}

/// Export `surface` to a PDF file.
pub fn export<S, R>(
    surface: Option<&mut S>,
    rasterizer: &R,
    spec: &PageSpec,
    request: &ExportRequest,
) -> Result<ExportReport>
where
    S: RenderSurface + ?Sized,
    R: Rasterizer<S> + ?Sized,
{
    export_with::<PdfDocument, S, R>(surface, rasterizer, spec, request)
}

/// Export `surface` through any [`DocumentWriter`].
pub fn export_with<W, S, R>(
    surface: Option<&mut S>,
    rasterizer: &R,
    spec: &PageSpec,
    request: &ExportRequest,
) -> Result<ExportReport>
where
    W: DocumentWriter,
    S: RenderSurface + ?Sized,
    R: Rasterizer<S> + ?Sized,
{
    let result = run::<W, S, R>(surface, rasterizer, spec, request);
    if let Err(ref e) = result {
        error!("PDF export failed: {}", e);
    }
    result
}

fn run<W, S, R>(
    surface: Option<&mut S>,
    rasterizer: &R,
    spec: &PageSpec,
    request: &ExportRequest,
) -> Result<ExportReport>
where
    W: DocumentWriter,
    S: RenderSurface + ?Sized,
    R: Rasterizer<S> + ?Sized,
{
    let surface = surface
        .ok_or_else(|| ExportError::Precondition("no render surface to export".into()))?;

    let pagination = paginate(surface, rasterizer, spec)?;
    let id = request.document_id.as_deref();
    let cancel = request.cancel.as_ref();

    let mut writer = W::new_document(spec)?;
    writer.set_title(&document_title(spec, id));
    let page_count = assemble_pages(
        &pagination.bitmap,
        &pagination.bands,
        &pagination.fit,
        spec.top_margin_mm,
        &mut writer,
        cancel,
    )?;

    if cancel.is_some_and(|c| c.is_cancelled()) {
        return Err(ExportError::Cancelled { pages: page_count });
    }

    let timestamp = request
        .timestamp_ms
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
    let path = request.output_dir.join(file_name(spec, id, timestamp));
    writer.save(&path)?;

    info!("saved {} page(s) to {}", page_count, path.display());
    Ok(ExportReport {
        path,
        page_count,
        bands: pagination.bands,
    })
}

/// `<prefix>_<id or placeholder>_<timestamp>.pdf`
///
/// Anything in the id other than ASCII letters, digits, `-` and `_` becomes
/// `_`, so the name can't leave the output directory.
pub fn file_name(spec: &PageSpec, document_id: Option<&str>, timestamp_ms: i64) -> String {
    let id = document_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(sanitize)
        .unwrap_or_else(|| spec.draft_placeholder.clone());
    format!("{}_{}_{}.pdf", spec.file_prefix, id, timestamp_ms)
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn document_title(spec: &PageSpec, document_id: Option<&str>) -> String {
    match document_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("{} {}", spec.file_prefix, id),
        None => spec.file_prefix.clone(),
    }
}
