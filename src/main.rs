//! # Folio CLI
//!
//! Usage:
//!   folio invoice.png -o out/ --invoice-no INV-2026-001
//!   folio invoice.png --protect 1480:1730 --fresh-page
//!   folio --example-spec > spec.json

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use folio::model::{CssRect, ImageEncoding, PageSpec, RegionPlacement};
use folio::{image_loader, ExportReport, ExportRequest, SnapshotRasterizer, SnapshotSurface};

#[derive(Parser, Debug)]
#[command(version, about = "Export a rendered document snapshot as a paginated PDF", long_about = None)]
struct Args {
    /// Snapshot image: PNG or JPEG path, data URI, or raw base64
    #[arg(required_unless_present = "example_spec")]
    snapshot: Option<String>,

    /// Snapshot of the document with export styling, captured instead of SNAPSHOT
    #[arg(long)]
    export_snapshot: Option<String>,

    /// Directory the PDF is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Invoice number used in the file name
    #[arg(long)]
    invoice_no: Option<String>,

    /// Page spec JSON file
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Protected region as TOP:BOTTOM in surface pixels
    #[arg(long, value_parser = parse_span)]
    protect: Option<Span>,

    /// Snapshot pixels per surface pixel
    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f64,

    /// Capture scale, overriding the spec
    #[arg(long)]
    scale: Option<f64>,

    /// Always start the protected region on a fresh page
    #[arg(long)]
    fresh_page: bool,

    /// Embed pages as JPEG at this quality instead of lossless
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg: Option<u8>,

    /// Print the default page spec as JSON and exit
    #[arg(long)]
    example_spec: bool,
}

#[derive(Debug, Clone, Copy)]
struct Span {
    top: f64,
    bottom: f64,
}

fn parse_span(s: &str) -> Result<Span, String> {
    let (top, bottom) = s
        .split_once(':')
        .ok_or_else(|| format!("expected TOP:BOTTOM, got '{}'", s))?;
    let top: f64 = top.trim().parse().map_err(|e| format!("bad top '{}': {}", top, e))?;
    let bottom: f64 = bottom
        .trim()
        .parse()
        .map_err(|e| format!("bad bottom '{}': {}", bottom, e))?;
    if !(top < bottom) {
        return Err(format!("region top {} must be above bottom {}", top, bottom));
    }
    Ok(Span { top, bottom })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("folio=info"))
        .init();

    let args = Args::parse();

    if args.example_spec {
        return match serde_json::to_string_pretty(&PageSpec::default()) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("✗ {}", e);
                ExitCode::FAILURE
            }
        };
    }

    match run(&args) {
        Ok(report) => {
            eprintln!(
                "✓ Written {} page(s) to {}",
                report.page_count,
                report.path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ {}", e.user_message());
            eprintln!("  {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> folio::Result<ExportReport> {
    let mut spec = match &args.spec {
        Some(path) => PageSpec::load(path)?,
        None => PageSpec::default(),
    };
    if let Some(scale) = args.scale {
        spec.scale = scale;
    }
    if args.fresh_page {
        spec.region_placement = RegionPlacement::StartOnFreshPage;
    }
    if let Some(quality) = args.jpeg {
        spec.image_encoding = ImageEncoding::Jpeg { quality };
    }

    let mut surface = match &args.snapshot {
        Some(src) => Some(build_surface(src, args, &spec)?),
        None => None,
    };

    std::fs::create_dir_all(&args.output_dir)?;
    let mut request = ExportRequest::new(&args.output_dir);
    if let Some(id) = &args.invoice_no {
        request = request.with_document_id(id);
    }

    folio::export(surface.as_mut(), &SnapshotRasterizer::default(), &spec, &request)
}

fn build_surface(src: &str, args: &Args, spec: &PageSpec) -> folio::Result<SnapshotSurface> {
    let mut surface =
        SnapshotSurface::new(image_loader::load_snapshot(src)?).with_pixel_ratio(args.pixel_ratio);
    if let Some(export_src) = &args.export_snapshot {
        surface = surface.with_export_content(image_loader::load_snapshot(export_src)?);
    }
    if let Some(span) = args.protect {
        surface = surface.with_region(
            spec.protected_region_id.clone(),
            CssRect::span(span.top, span.bottom),
        );
    }
    Ok(surface)
}
