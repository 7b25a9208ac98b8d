//! Bayer CFA demosaicing.
//!
//! Reconstructs full-resolution red, green and blue planes from one mosaiced
//! plane by bilinear interpolation:
//! - native samples are copied unchanged into their own plane;
//! - at red/blue sites, green is the mean of the 4 orthogonal neighbours and
//!   the opposite color the mean of the 4 diagonal neighbours;
//! - at green sites, red and blue are the means of the 2 neighbours along the
//!   axis where that color lies.
//!
//! Out-of-bounds neighbours are mirrored about the edge pixel (`-1 → 1`,
//! `n → n - 2`). Mirroring preserves the CFA parity of every neighbour, so
//! edge pixels interpolate from samples of the correct color. A dimension of
//! 1 has no mirror partner and reads index 0.

mod bilinear;
#[cfg(test)]
mod tests;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::error::{Error, Result};
use crate::image_buffer::{Channel, ColorTriple, ImageBuffer};

pub use bilinear::demosaic_bilinear;

/// Bayer CFA (Color Filter Array) pattern: the 2x2 layout of color filters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BayerPattern {
    /// Red at (0,0), green at (0,1) and (1,0), blue at (1,1).
    Rggb,
    /// Blue at (0,0), green at (0,1) and (1,0), red at (1,1).
    Bggr,
    /// Green at (0,0), red at (0,1), blue at (1,0), green at (1,1).
    Grbg,
    /// Green at (0,0), blue at (0,1), red at (1,0), green at (1,1).
    Gbrg,
}

impl BayerPattern {
    /// Colors as `[row0_col0, row0_col1, row1_col0, row1_col1]`.
    #[inline]
    pub fn pattern_2x2(&self) -> [Channel; 4] {
        use Channel::{Blue as B, Green as G, Red as R};
        match self {
            BayerPattern::Rggb => [R, G, G, B],
            BayerPattern::Bggr => [B, G, G, R],
            BayerPattern::Grbg => [G, R, B, G],
            BayerPattern::Gbrg => [G, B, R, G],
        }
    }

    /// Native color at row `y`, column `x`.
    #[inline]
    pub fn color_at(&self, y: usize, x: usize) -> Channel {
        self.pattern_2x2()[((y & 1) << 1) | (x & 1)]
    }

    /// True when row `y` holds red samples (and therefore green sites on it
    /// take red from their horizontal neighbours).
    #[inline]
    pub fn red_in_row(&self, y: usize) -> bool {
        match self {
            BayerPattern::Rggb | BayerPattern::Grbg => (y & 1) == 0,
            BayerPattern::Bggr | BayerPattern::Gbrg => (y & 1) == 1,
        }
    }
}

impl FromStr for BayerPattern {
    type Err = Error;

    /// Parses a `BAYERPAT` header value. Case-insensitive, surrounding
    /// whitespace ignored; the boolean convention `TRUE` means RGGB.
    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "RGGB" | "TRUE" => Ok(BayerPattern::Rggb),
            "BGGR" => Ok(BayerPattern::Bggr),
            "GRBG" => Ok(BayerPattern::Grbg),
            "GBRG" => Ok(BayerPattern::Gbrg),
            _ => Err(Error::UnsupportedPattern(value.to_string())),
        }
    }
}

/// Split `source` into three planes of the same shape using `pattern`.
///
/// Planes carry the source header and the origins `<origin>_r`, `_g`, `_b`.
pub fn demosaic(source: &ImageBuffer, pattern: BayerPattern) -> ColorTriple {
    let _span = tracing::debug_span!("demosaic", origin = %source.origin, %pattern).entered();
    let [red, green, blue] = demosaic_bilinear(&source.data, pattern);
    ColorTriple {
        red: source.derive_with(red, Channel::Red.suffix()),
        green: source.derive_with(green, Channel::Green.suffix()),
        blue: source.derive_with(blue, Channel::Blue.suffix()),
    }
}

/// [`demosaic`] with the pattern read from the source header.
///
/// Fails with [`Error::MissingMetadata`] or [`Error::UnsupportedPattern`].
pub fn demosaic_from_header(source: &ImageBuffer) -> Result<ColorTriple> {
    let pattern = source.bayer_pattern()?;
    Ok(demosaic(source, pattern))
}
