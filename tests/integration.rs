//! Integration tests for the export pipeline.
//!
//! These tests exercise the full path from a snapshot to a saved PDF.
//! They verify:
//! - Short documents land on exactly one page
//! - Tall documents are cut into the right number of pages
//! - The protected region is never split across a page boundary
//! - The surface's padding survives every export, failed or not
//! - The saved file is a structurally valid PDF

use std::path::Path;

use folio::model::{CssRect, ImageEncoding, PageFormat};
use folio::raster::CaptureOptions;
use folio::*;
use image::{Rgba, RgbaImage};

// ─── Helpers ────────────────────────────────────────────────────

const FOOTER: &str = "payment-and-footer";

/// A grey page with a dark footer block between `footer` rows.
fn invoice_snapshot(width: u32, height: u32, footer: (u32, u32)) -> RgbaImage {
    RgbaImage::from_fn(width, height, |_, y| {
        if y >= footer.0 && y < footer.1 {
            Rgba([20, 20, 60, 255])
        } else {
            Rgba([230, 230, 230, 255])
        }
    })
}

fn invoice_surface(width: u32, height: u32, footer: (u32, u32)) -> SnapshotSurface {
    SnapshotSurface::new(invoice_snapshot(width, height, footer))
        .with_padding_bottom(16.0)
        .with_region(FOOTER, CssRect::span(footer.0 as f64, footer.1 as f64))
}

/// Default A4 spec captured at 1x to keep the bitmaps small.
fn spec_1x() -> PageSpec {
    PageSpec {
        scale: 1.0,
        ..Default::default()
    }
}

/// A page exactly 500 bitmap rows tall for a 1000 px wide capture.
fn spec_500_rows() -> PageSpec {
    PageSpec {
        format: PageFormat::Custom {
            width_mm: 100.0,
            height_mm: 50.0,
        },
        scale: 1.0,
        ..Default::default()
    }
}

fn request(dir: &Path) -> ExportRequest {
    ExportRequest::new(dir).with_timestamp_ms(1_767_225_600_000)
}

fn spans(bands: &[PageBand]) -> Vec<(u32, u32)> {
    bands.iter().map(|b| (b.y_start, b.y_end())).collect()
}

fn pdf_page_count(bytes: &[u8]) -> usize {
    let needle = b"/Type /Page /Parent";
    bytes.windows(needle.len()).filter(|w| w == needle).count()
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "Missing PDF header");
    assert!(
        bytes.windows(5).any(|w| w == b"%%EOF"),
        "Missing %%EOF marker"
    );
    assert!(
        bytes.windows(4).any(|w| w == b"xref"),
        "Missing xref table"
    );
    assert!(
        bytes.windows(7).any(|w| w == b"trailer"),
        "Missing trailer"
    );
}

// ─── Basic Pipeline Tests ───────────────────────────────────────

#[test]
fn test_short_invoice_is_one_page() {
    let dir = tempfile::tempdir().unwrap();
    let mut surface = invoice_surface(800, 400, (300, 380));

    let report = export(
        Some(&mut surface),
        &SnapshotRasterizer::default(),
        &spec_1x(),
        &request(dir.path()).with_document_id("INV-2026-001"),
    )
    .unwrap();

    assert_eq!(report.page_count, 1);
    let bytes = std::fs::read(&report.path).unwrap();
    assert_valid_pdf(&bytes);
    assert_eq!(pdf_page_count(&bytes), 1);
    assert_eq!(
        report.path.file_name().unwrap().to_str().unwrap(),
        "Invoice_INV-2026-001_1767225600000.pdf"
    );
}

#[test]
fn test_draft_invoice_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut surface = invoice_surface(800, 400, (300, 380));
    let report = export(
        Some(&mut surface),
        &SnapshotRasterizer::default(),
        &spec_1x(),
        &request(dir.path()),
    )
    .unwrap();
    assert_eq!(
        report.path.file_name().unwrap().to_str().unwrap(),
        "Invoice_draft_1767225600000.pdf"
    );
}

#[test]
fn test_pdf_pages_match_bands() {
    let dir = tempfile::tempdir().unwrap();
    let mut surface = invoice_surface(800, 3000, (2900, 2990));
    let report = export(
        Some(&mut surface),
        &SnapshotRasterizer::default(),
        &spec_1x(),
        &request(dir.path()),
    )
    .unwrap();

    let bytes = std::fs::read(&report.path).unwrap();
    assert_valid_pdf(&bytes);
    assert_eq!(pdf_page_count(&bytes), report.bands.len());
    assert_eq!(report.page_count, report.bands.len());
    assert_eq!(report.bands.iter().map(|b| b.height).sum::<u32>(), 3000);
}

// ─── Protected Region Tests ─────────────────────────────────────

#[test]
fn test_footer_on_boundary_moves_to_next_page() {
    let mut surface = invoice_surface(1000, 1400, (900, 1100));
    let plan = paginate(&mut surface, &SnapshotRasterizer::default(), &spec_500_rows()).unwrap();

    assert_eq!(plan.fit.page_height_px, 500);
    assert_eq!(
        spans(&plan.bands),
        vec![(0, 500), (500, 876), (876, 1100), (1100, 1400)]
    );
}

#[test]
fn test_footer_fresh_page_policy() {
    let mut surface = invoice_surface(1000, 1200, (1100, 1200));
    let spec = PageSpec {
        region_placement: RegionPlacement::StartOnFreshPage,
        ..spec_500_rows()
    };
    let plan = paginate(&mut surface, &SnapshotRasterizer::default(), &spec).unwrap();
    assert_eq!(
        spans(&plan.bands),
        vec![(0, 500), (500, 1000), (1000, 1076), (1076, 1200)]
    );
}

#[test]
fn test_footer_fitting_on_page_is_left_alone() {
    let mut surface = invoice_surface(1000, 1200, (1100, 1200));
    let plan = paginate(&mut surface, &SnapshotRasterizer::default(), &spec_500_rows()).unwrap();
    assert_eq!(spans(&plan.bands), vec![(0, 500), (500, 1000), (1000, 1200)]);
}

#[test]
fn test_tall_footer_gets_whole_pages() {
    let mut surface = invoice_surface(1000, 1600, (300, 1450));
    let plan = paginate(&mut surface, &SnapshotRasterizer::default(), &spec_500_rows()).unwrap();
    assert_eq!(
        spans(&plan.bands),
        vec![(0, 276), (276, 776), (776, 1276), (1276, 1450), (1450, 1600)]
    );
}

#[test]
fn test_footer_pixels_stay_together() {
    let mut surface = invoice_surface(1000, 1400, (900, 1100));
    let plan = paginate(&mut surface, &SnapshotRasterizer::default(), &spec_500_rows()).unwrap();

    // Every footer row lives in the same band.
    let footer_band = plan
        .bands
        .iter()
        .find(|b| b.y_start <= 900 && b.y_end() >= 1100)
        .expect("one band holds the whole footer");
    let strip = plan.bitmap.strip(footer_band.y_start, footer_band.height);
    let dark = (0..strip.height())
        .filter(|&y| strip.get_pixel(0, y).0 == [20, 20, 60])
        .count();
    assert_eq!(dark, 200);
}

#[test]
fn test_missing_region_falls_back_to_fixed_height() {
    let mut surface = SnapshotSurface::new(invoice_snapshot(1000, 1200, (0, 0)));
    let plan = paginate(&mut surface, &SnapshotRasterizer::default(), &spec_500_rows()).unwrap();
    assert!(plan.region.is_none());
    assert_eq!(spans(&plan.bands), vec![(0, 500), (500, 1000), (1000, 1200)]);
}

// ─── Surface Restoration Tests ──────────────────────────────────

#[test]
fn test_padding_restored_after_export() {
    let dir = tempfile::tempdir().unwrap();
    let mut surface = invoice_surface(800, 400, (300, 380));
    export(
        Some(&mut surface),
        &SnapshotRasterizer::default(),
        &spec_1x(),
        &request(dir.path()),
    )
    .unwrap();
    assert_eq!(surface.padding_bottom(), 16.0);
}

struct CrashingRasterizer;

impl Rasterizer<SnapshotSurface> for CrashingRasterizer {
    fn capture(&self, surface: &SnapshotSurface, _options: &CaptureOptions) -> Result<Bitmap> {
        // The override is visible while capture runs.
        assert_ne!(surface.padding_bottom(), 16.0);
        Err(ExportError::Capture("out of memory".into()))
    }
}

#[test]
fn test_padding_restored_after_failed_capture() {
    let dir = tempfile::tempdir().unwrap();
    let mut surface = invoice_surface(800, 400, (300, 380));
    let err = export(
        Some(&mut surface),
        &CrashingRasterizer,
        &spec_1x(),
        &request(dir.path()),
    )
    .unwrap_err();

    assert!(matches!(err, ExportError::Capture(_)));
    assert_eq!(surface.padding_bottom(), 16.0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_surface_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let err = export::<SnapshotSurface, _>(
        None,
        &SnapshotRasterizer::default(),
        &spec_1x(),
        &request(dir.path()),
    )
    .unwrap_err();
    assert_eq!(
        err.user_message(),
        "Invoice preview not found. Please click Preview first."
    );
}

#[test]
fn test_unwritable_directory_reports_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-dir");
    let mut surface = invoice_surface(800, 400, (300, 380));
    let err = export(
        Some(&mut surface),
        &SnapshotRasterizer::default(),
        &spec_1x(),
        &request(&missing),
    )
    .unwrap_err();
    assert!(matches!(err, ExportError::Write(_)));
    assert_eq!(
        err.user_message(),
        "Failed to generate PDF. Please try the Print option and save as PDF."
    );
    assert_eq!(surface.padding_bottom(), 16.0);
}

// ─── Input & Config Tests ───────────────────────────────────────

#[test]
fn test_png_snapshot_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("invoice.png");
    invoice_snapshot(400, 300, (200, 280)).save(&png).unwrap();

    let content = image_loader::load_snapshot(png.to_str().unwrap()).unwrap();
    assert_eq!(content.dimensions(), (400, 300));

    let mut surface = SnapshotSurface::new(content).with_pixel_ratio(2.0);
    let plan = paginate(&mut surface, &SnapshotRasterizer::default(), &spec_1x()).unwrap();
    assert_eq!(plan.bitmap.width(), 200);
    assert_eq!(
        plan.bands.iter().map(|b| b.height).sum::<u32>(),
        plan.bitmap.height()
    );
}

#[test]
fn test_spec_json_drives_export() {
    let dir = tempfile::tempdir().unwrap();
    let spec = PageSpec::from_json(
        r##"{
            "format": "Letter",
            "scale": 1.0,
            "imageEncoding": { "Jpeg": { "quality": 70 } },
            "filePrefix": "Receipt"
        }"##,
    )
    .unwrap();
    assert_eq!(spec.image_encoding, ImageEncoding::Jpeg { quality: 70 });

    let mut surface = invoice_surface(800, 400, (300, 380));
    let report = export(
        Some(&mut surface),
        &SnapshotRasterizer::default(),
        &spec,
        &request(dir.path()).with_document_id("R-1"),
    )
    .unwrap();

    let bytes = std::fs::read(&report.path).unwrap();
    assert_valid_pdf(&bytes);
    assert!(bytes.windows(10).any(|w| w == b"/DCTDecode"));
    // Letter is 612 x 792 pt.
    assert!(bytes.windows(24).any(|w| w == b"/MediaBox [0 0 612.00 79"));
    assert!(report
        .path
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("Receipt_R-1_"));
}

#[test]
fn test_bad_spec_json_has_hint() {
    let err = PageSpec::from_json(r#"{ "scale": 2.0, }"#).unwrap_err();
    assert!(matches!(err, ExportError::Config { .. }));
    assert!(err.to_string().contains("Hint"));
}
