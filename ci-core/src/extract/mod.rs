//! Extraction of FPR and EPER bands from charge-injection frames.
//!
//! Every extractor turns a [`PixelWindow`] into one region per injected
//! region (or a single calibration slab), then offers the same reductions:
//!
//! - **array_2d_list_from**: the pixels of each region, with their mask
//! - **stacked_array_2d_from**: cell-wise mean over those arrays
//! - **binned_array_1d_from**: the stack collapsed into a 1D profile
//! - **add_to_array**: the extracted pixels written back at their origin
//!
//! Parallel extractors bin along rows (collapsing columns), serial extractors
//! along columns (collapsing rows).

mod parallel;
mod serial;

pub use parallel::{ExtractParallelCalibration, ExtractParallelEper, ExtractParallelFpr};
pub use serial::{ExtractSerialCalibration, ExtractSerialEper, ExtractSerialFpr};

use log::debug;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::Layout2DCI;
use crate::mask::Mask2D;
use crate::masked::MaskedArray2;
use crate::region::{PixelWindow, Region, RegionError};

/// Errors raised while extracting bands from a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Arrays that must share a shape do not.
    #[error("inconsistent band shapes: expected {expected:?}, found {found:?}")]
    InconsistentShapes {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("no regions to extract")]
    NoRegions,

    #[error(transparent)]
    Region(#[from] RegionError),
}

/// The six extractor variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    ParallelFpr,
    ParallelEper,
    SerialFpr,
    SerialEper,
    ParallelCalibration,
    SerialCalibration,
}

/// Shared behaviour of all extractors.
///
/// Implementors supply the layout, the binning axis, a default window and the
/// window-to-regions transform; the reductions are provided.
pub trait Extractor2D {
    fn layout(&self) -> &Layout2DCI;

    /// Axis collapsed by [`Extractor2D::binned_array_1d_from`].
    fn binning_axis(&self) -> Axis;

    /// Window used when the caller gives none.
    fn default_pixels(&self) -> Result<PixelWindow, ExtractError>;

    /// One region per injected region (or per calibration slab) for `pixels`.
    fn region_list_from_window(&self, pixels: PixelWindow) -> Result<Vec<Region>, ExtractError>;

    fn region_list_from(&self, pixels: Option<PixelWindow>) -> Result<Vec<Region>, ExtractError> {
        let pixels = match pixels {
            Some(pixels) => pixels,
            None => {
                let pixels = self.default_pixels()?;
                debug!("No pixel window given, defaulting to {pixels}");
                pixels
            }
        };
        self.region_list_from_window(pixels)
    }

    /// Pixels of each extracted region, carrying the matching mask slice.
    fn array_2d_list_from(
        &self,
        array: &Array2<f64>,
        mask: Option<&Mask2D>,
        pixels: Option<PixelWindow>,
    ) -> Result<Vec<MaskedArray2>, ExtractError> {
        if let Some(mask) = mask {
            if mask.shape() != array.dim() {
                return Err(ExtractError::InconsistentShapes {
                    expected: array.dim(),
                    found: mask.shape(),
                });
            }
        }

        let regions = self.region_list_from(pixels)?;
        regions
            .iter()
            .map(|region| -> Result<MaskedArray2, ExtractError> {
                let data = region.view(array)?;
                let mask = mask.map(|mask| region.view(mask.as_array())).transpose()?;
                Ok(MaskedArray2::from_views(data, mask))
            })
            .collect()
    }

    /// Cell-wise mean of the extracted arrays, masked cells excluded.
    fn stacked_array_2d_from(
        &self,
        array: &Array2<f64>,
        mask: Option<&Mask2D>,
        pixels: Option<PixelWindow>,
    ) -> Result<MaskedArray2, ExtractError> {
        let arrays = self.array_2d_list_from(array, mask, pixels)?;
        MaskedArray2::stacked_mean(&arrays)
    }

    /// Stacked array collapsed along [`Extractor2D::binning_axis`].
    ///
    /// Bins whose cells are all masked hold `f64::INFINITY`.
    fn binned_array_1d_from(
        &self,
        array: &Array2<f64>,
        mask: Option<&Mask2D>,
        pixels: Option<PixelWindow>,
    ) -> Result<Array1<f64>, ExtractError> {
        let stacked = self.stacked_array_2d_from(array, mask, pixels)?;
        Ok(stacked.mean_axis(self.binning_axis()))
    }

    /// Add the pixels of `array` inside each extracted region onto `new_array`
    /// at the same coordinates.
    fn add_to_array(
        &self,
        mut new_array: Array2<f64>,
        array: &Array2<f64>,
        pixels: Option<PixelWindow>,
    ) -> Result<Array2<f64>, ExtractError> {
        if new_array.dim() != array.dim() {
            return Err(ExtractError::InconsistentShapes {
                expected: array.dim(),
                found: new_array.dim(),
            });
        }

        for region in self.region_list_from(pixels)? {
            let source = region.view(array)?;
            let mut target = region.view_mut(&mut new_array)?;
            target += &source;
        }
        Ok(new_array)
    }
}

/// Any extractor, selected at runtime by [`ExtractorKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Extractor {
    ParallelFpr(ExtractParallelFpr),
    ParallelEper(ExtractParallelEper),
    SerialFpr(ExtractSerialFpr),
    SerialEper(ExtractSerialEper),
    ParallelCalibration(ExtractParallelCalibration),
    SerialCalibration(ExtractSerialCalibration),
}

impl Extractor {
    pub fn kind(&self) -> ExtractorKind {
        match self {
            Extractor::ParallelFpr(_) => ExtractorKind::ParallelFpr,
            Extractor::ParallelEper(_) => ExtractorKind::ParallelEper,
            Extractor::SerialFpr(_) => ExtractorKind::SerialFpr,
            Extractor::SerialEper(_) => ExtractorKind::SerialEper,
            Extractor::ParallelCalibration(_) => ExtractorKind::ParallelCalibration,
            Extractor::SerialCalibration(_) => ExtractorKind::SerialCalibration,
        }
    }

    fn inner(&self) -> &dyn Extractor2D {
        match self {
            Extractor::ParallelFpr(e) => e,
            Extractor::ParallelEper(e) => e,
            Extractor::SerialFpr(e) => e,
            Extractor::SerialEper(e) => e,
            Extractor::ParallelCalibration(e) => e,
            Extractor::SerialCalibration(e) => e,
        }
    }
}

impl Extractor2D for Extractor {
    fn layout(&self) -> &Layout2DCI {
        self.inner().layout()
    }

    fn binning_axis(&self) -> Axis {
        self.inner().binning_axis()
    }

    fn default_pixels(&self) -> Result<PixelWindow, ExtractError> {
        self.inner().default_pixels()
    }

    fn region_list_from_window(&self, pixels: PixelWindow) -> Result<Vec<Region>, ExtractError> {
        self.inner().region_list_from_window(pixels)
    }
}
