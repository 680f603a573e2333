//! # Unit Conversion
//!
//! Device pixels, millimeters and PDF points. The pipeline measures in CSS
//! pixels, paginates in bitmap pixels, places images in millimeters and
//! finally writes points.

use serde::{Deserialize, Serialize};

/// CSS reference density: 96 px per inch.
pub const PX_PER_MM: f64 = 96.0 / 25.4;

/// PDF user space unit: 72 pt per inch.
pub const PT_PER_MM: f64 = 72.0 / 25.4;

/// Convert millimeters to PDF points.
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// A pixel density, in pixels per millimeter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Density {
    pub px_per_mm: f64,
}

impl Density {
    /// The 96 dpi density browsers lay out at.
    pub const CSS: Density = Density {
        px_per_mm: PX_PER_MM,
    };

    pub fn from_dpi(dpi: f64) -> Self {
        Self {
            px_per_mm: dpi / 25.4,
        }
    }

    pub fn mm_per_px(&self) -> f64 {
        1.0 / self.px_per_mm
    }

    pub fn mm_to_px(&self, mm: f64) -> f64 {
        mm * self.px_per_mm
    }
}

impl Default for Density {
    fn default() -> Self {
        Density::CSS
    }
}
