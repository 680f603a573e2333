//! Page assembly: one band, one page.

use crate::error::{ExportError, Result};
use crate::export::CancelToken;
use crate::layout::WidthFit;
use crate::model::PageBand;
use crate::pdf::{DocumentWriter, ImagePlacement};
use crate::raster::Bitmap;

/// Where a band lands on its page.
///
/// The first page uses the whole sheet. Continuation pages start
/// `top_margin_mm` down and lose the same amount of drawn height, which
/// keeps every page's used height equal to the band's fitted height.
pub fn placement_for(band: &PageBand, fit: &WidthFit, top_margin_mm: f64) -> ImagePlacement {
    let drawn_mm = fit.rows_to_mm(band.height);
    let (y_mm, height_mm) = if band.is_first_page {
        (0.0, drawn_mm)
    } else {
        if drawn_mm < top_margin_mm {
            log::warn!(
                "band at row {} is {:.2} mm tall, shorter than the {:.2} mm top margin; drawing it with zero height",
                band.y_start,
                drawn_mm,
                top_margin_mm
            );
        }
        (top_margin_mm, (drawn_mm - top_margin_mm).max(0.0))
    };

    ImagePlacement {
        x_mm: 0.0,
        y_mm,
        width_mm: fit.page_width_mm,
        height_mm,
    }
}

/// Draw every band onto `writer`, adding a page before each band after the
/// first. Returns the number of pages the document holds afterwards.
pub fn assemble_pages<W: DocumentWriter + ?Sized>(
    bitmap: &Bitmap,
    bands: &[PageBand],
    fit: &WidthFit,
    top_margin_mm: f64,
    writer: &mut W,
    cancel: Option<&CancelToken>,
) -> Result<usize> {
    for (i, band) in bands.iter().enumerate() {
        if cancel.is_some_and(|c| c.is_cancelled()) {
            return Err(ExportError::Cancelled { pages: i });
        }
        debug_assert_eq!(i == 0, band.is_first_page);

        if i > 0 {
            writer.add_page();
        }

        let strip = bitmap.strip(band.y_start, band.height);
        let placement = placement_for(band, fit, top_margin_mm);
        log::debug!(
            "page {}: rows [{}, {}) at y={:.2}mm h={:.2}mm",
            i + 1,
            band.y_start,
            band.y_end(),
            placement.y_mm,
            placement.height_mm
        );
        writer.draw_image(&strip, placement)?;
    }

    Ok(writer.page_count())
}
