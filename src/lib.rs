//! # Folio
//!
//! Rasterize-and-paginate PDF export.
//!
//! A laid-out document is captured into one tall bitmap and then cut into
//! page-sized bands, one band per PDF page. Cutting at fixed heights would
//! slice straight through whatever sits on a page boundary, which for an
//! invoice is usually the payment details and footer. Folio treats that block
//! as a **protected region**: page boundaries move around it, so it always
//! lands whole on a page of its own.
//!
//! ## Architecture
//!
//! ```text
//! RenderSurface (caller-owned)
//!       ↓
//!   [surface]  — pad to one page tall, restore on drop
//!       ↓
//!   [raster]   — capture into an opaque bitmap
//!       ↓
//!   [layout]   — width fit, page slicing, page assembly
//!       ↓
//!   [pdf]      — serialize to PDF bytes, atomic save
//! ```
//!
//! [`export`] runs the whole pipeline; [`export::paginate`] stops after
//! slicing for callers that only want the page plan.

pub mod error;
pub mod export;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod raster;
pub mod surface;
pub mod units;

pub use error::{ExportError, Result};
pub use export::{export, export_with, paginate, CancelToken, ExportReport, ExportRequest};
pub use model::{PageBand, PageSpec, ProtectedRegion, RegionPlacement, RenderMode};
pub use pdf::{DocumentWriter, PdfDocument};
pub use raster::{Bitmap, Rasterizer, SnapshotRasterizer};
pub use surface::{RenderSurface, SnapshotSurface};
