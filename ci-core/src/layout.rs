//! Layout of a charge-injection frame: its shape, injected regions and
//! read-out geometry, validated together.

use crate::extract::{
    ExtractParallelCalibration, ExtractParallelEper, ExtractParallelFpr,
    ExtractSerialCalibration, ExtractSerialEper, ExtractSerialFpr, Extractor, ExtractorKind,
};
use crate::geometry::FrameGeometry;
use crate::pattern::{CIPattern, PatternError};
use crate::region::Region;

/// Frame shape, charge-injection regions and geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout2DCI {
    shape_2d: (usize, usize),
    region_list: Vec<Region>,
    geometry: FrameGeometry,
}

impl Layout2DCI {
    /// Build a layout; every region must fit inside `shape_2d`.
    pub fn new(
        shape_2d: (usize, usize),
        region_list: Vec<Region>,
        geometry: FrameGeometry,
    ) -> Result<Self, PatternError> {
        if let Some(region) = region_list.iter().find(|r| !r.fits_within(shape_2d)) {
            return Err(PatternError::OutsideImage {
                region: *region,
                rows: shape_2d.0,
                columns: shape_2d.1,
            });
        }
        Ok(Self {
            shape_2d,
            region_list,
            geometry,
        })
    }

    /// Layout whose regions are already known to fit `shape_2d`.
    pub(crate) fn from_parts(
        shape_2d: (usize, usize),
        region_list: Vec<Region>,
        geometry: FrameGeometry,
    ) -> Self {
        Self {
            shape_2d,
            region_list,
            geometry,
        }
    }

    /// Layout taking its regions from `pattern`.
    pub fn from_pattern(
        shape_2d: (usize, usize),
        pattern: &CIPattern,
        geometry: FrameGeometry,
    ) -> Result<Self, PatternError> {
        pattern.check_pattern_is_within_image_dimensions(shape_2d)?;
        Self::new(shape_2d, pattern.regions().to_vec(), geometry)
    }

    pub fn shape_2d(&self) -> (usize, usize) {
        self.shape_2d
    }

    pub fn region_list(&self) -> &[Region] {
        &self.region_list
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// Fewest rows of any region.
    pub fn total_rows_min(&self) -> usize {
        self.region_list
            .iter()
            .map(Region::total_rows)
            .min()
            .unwrap_or(0)
    }

    /// Fewest columns of any region.
    pub fn total_columns_min(&self) -> usize {
        self.region_list
            .iter()
            .map(Region::total_columns)
            .min()
            .unwrap_or(0)
    }

    /// Longest parallel trail every region can offer before running into the
    /// next region or the image edge.
    pub fn smallest_parallel_trails_rows_from_shape(&self) -> usize {
        self.geometry
            .smallest_parallel_trails_rows_from_shape(&self.region_list, self.shape_2d)
    }

    /// Columns of serial trail available before the image edge.
    pub fn serial_trail_size_to_image_edge(&self) -> usize {
        self.geometry
            .serial_trail_size_to_image_edge(&self.region_list, self.shape_2d)
    }

    /// Build the extractor of the requested kind over this layout.
    pub fn extractor(&self, kind: ExtractorKind) -> Extractor {
        let layout = self.clone();
        match kind {
            ExtractorKind::ParallelFpr => Extractor::ParallelFpr(ExtractParallelFpr::new(layout)),
            ExtractorKind::ParallelEper => {
                Extractor::ParallelEper(ExtractParallelEper::new(layout))
            }
            ExtractorKind::SerialFpr => Extractor::SerialFpr(ExtractSerialFpr::new(layout)),
            ExtractorKind::SerialEper => Extractor::SerialEper(ExtractSerialEper::new(layout)),
            ExtractorKind::ParallelCalibration => {
                Extractor::ParallelCalibration(ExtractParallelCalibration::new(layout))
            }
            ExtractorKind::SerialCalibration => {
                Extractor::SerialCalibration(ExtractSerialCalibration::new(layout))
            }
        }
    }
}
