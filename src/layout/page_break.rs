//! # Page Break Decisions
//!
//! Walks a bitmap top to bottom and cuts it into page-sized bands. A naive
//! paginator would slice straight through the payment and footer block; this
//! one treats the protected region as a unit. Page boundaries move around the
//! region instead of the region being compressed or scaled, and a region
//! taller than a page is still re-split, but only into whole page-capacity
//! pieces that each start a page of their own.

use crate::model::{PageBand, ProtectedRegion, RegionPlacement};

/// What to do with the next tentative band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// Emit a full-capacity band (or the remainder of the bitmap).
    Place,
    /// Close the current page early and move the protected region onto
    /// fresh pages.
    MoveRegionToNextPage,
}

/// Decide how to treat the band starting at `y`.
pub fn decide_break(
    y: u32,
    next_cut: u32,
    region: Option<ProtectedRegion>,
    placement: RegionPlacement,
) -> BreakDecision {
    let Some(region) = region else {
        return BreakDecision::Place;
    };

    // Only regions still ahead of the cursor can conflict; once the cursor
    // is past the start the region has already been emitted.
    if y >= region.start {
        return BreakDecision::Place;
    }

    let conflict = match placement {
        RegionPlacement::CutInside => region.start < next_cut && next_cut < region.end,
        RegionPlacement::StartOnFreshPage => region.start < next_cut,
    };

    if conflict {
        BreakDecision::MoveRegionToNextPage
    } else {
        BreakDecision::Place
    }
}

/// Cut `[0, bitmap_height)` into contiguous bands of at most
/// `page_height_px` rows.
///
/// `margin_px` rows of breathing room are left between the page closed early
/// and the protected region; those rows travel with the region onto its
/// first page. The margin shrinks as needed so a region no taller than a page
/// always fits on one. Returns an empty list when either height is zero.
pub fn slice_pages(
    bitmap_height: u32,
    page_height_px: u32,
    region: Option<ProtectedRegion>,
    margin_px: u32,
    placement: RegionPlacement,
) -> Vec<PageBand> {
    let mut bands = Vec::new();
    if bitmap_height == 0 || page_height_px == 0 {
        return bands;
    }

    // Region rows past the end of the bitmap do not exist.
    let region = region
        .and_then(|r| ProtectedRegion::new(r.start, r.end.min(bitmap_height)));

    let mut y = 0u32;
    while y < bitmap_height {
        let next_cut = y.saturating_add(page_height_px);

        match (decide_break(y, next_cut, region, placement), region) {
            (BreakDecision::MoveRegionToNextPage, Some(region)) => {
                // Close the current page just above the region.
                let mut close_at = region.start.saturating_sub(margin_px);
                if region.height() <= page_height_px {
                    close_at = close_at.max(region.end.saturating_sub(page_height_px));
                }
                let close_at = close_at.min(bitmap_height);
                if close_at > y {
                    bands.push(band(y, close_at - y));
                    y = close_at;
                }

                // The region, in page-capacity pieces, each on a fresh page.
                while y < region.end {
                    let h = page_height_px.min(region.end - y);
                    bands.push(band(y, h));
                    y += h;
                }

                log::debug!(
                    "protected region [{}, {}) moved to a fresh page, resuming at {}",
                    region.start,
                    region.end,
                    y
                );
            }
            _ => {
                let h = page_height_px.min(bitmap_height - y);
                bands.push(band(y, h));
                y += h;
            }
        }
    }

    bands
}

fn band(y_start: u32, height: u32) -> PageBand {
    PageBand {
        y_start,
        height,
        is_first_page: y_start == 0,
    }
}
