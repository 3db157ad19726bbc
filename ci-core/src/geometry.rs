//! Read-out orientation and frame geometry of a CCD quadrant.
//!
//! The corner holding the read-out electronics decides which side of a
//! charge-injection region is its front edge (the side nearest the read-out
//! register) and which side collects trailed charge. [`FrameGeometry`] turns
//! logical offsets ("the first two rows of the front edge", "ten pixels of
//! trail") into absolute [`Region`]s for a given orientation.

use serde::{Deserialize, Serialize};

use crate::region::{PixelWindow, Region, RegionError};

/// Corner of the frame holding the read-out electronics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
}

impl Orientation {
    /// Map a read-out-electronics corner `(row, column)` to an orientation.
    ///
    /// Row `1` is the bottom of the frame, column `0` the left.
    pub fn from_roe_corner(corner: (usize, usize)) -> Option<Self> {
        match corner {
            (1, 0) => Some(Orientation::BottomLeft),
            (1, 1) => Some(Orientation::BottomRight),
            (0, 0) => Some(Orientation::TopLeft),
            (0, 1) => Some(Orientation::TopRight),
            _ => None,
        }
    }

    /// Parallel read-out at the low-row side.
    pub fn is_bottom(&self) -> bool {
        matches!(self, Orientation::BottomLeft | Orientation::BottomRight)
    }

    /// Serial read-out at the low-column side.
    pub fn is_left(&self) -> bool {
        matches!(self, Orientation::BottomLeft | Orientation::TopLeft)
    }
}

/// `anchor - offset`, failing instead of wrapping below zero.
fn offset_below(edge: &'static str, anchor: usize, offset: usize) -> Result<usize, RegionError> {
    anchor
        .checked_sub(offset)
        .ok_or(RegionError::NegativeBound {
            edge,
            anchor,
            offset,
        })
}

/// Orientation plus the non-imaging bands of a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub orientation: Orientation,
    #[serde(default)]
    pub parallel_overscan: Option<Region>,
    #[serde(default)]
    pub serial_prescan: Option<Region>,
    #[serde(default)]
    pub serial_overscan: Option<Region>,
}

/// Rows of a Euclid VIS quadrant.
const EUCLID_ROWS: usize = 2086;
/// Columns of a Euclid VIS quadrant.
const EUCLID_COLUMNS: usize = 2128;

impl FrameGeometry {
    pub fn new(
        orientation: Orientation,
        parallel_overscan: Option<Region>,
        serial_prescan: Option<Region>,
        serial_overscan: Option<Region>,
    ) -> Self {
        Self {
            orientation,
            parallel_overscan,
            serial_prescan,
            serial_overscan,
        }
    }

    /// Geometry with no prescan or overscan bands.
    pub fn bare(orientation: Orientation) -> Self {
        Self::new(orientation, None, None, None)
    }

    /// Shape of a Euclid VIS quadrant as `(rows, columns)`.
    pub fn euclid_shape() -> (usize, usize) {
        (EUCLID_ROWS, EUCLID_COLUMNS)
    }

    /// Euclid VIS quadrant geometry read out from `orientation`.
    ///
    /// The bottom-left quadrant has a 51 column serial prescan, a 29 column
    /// serial overscan and a 20 row parallel overscan; other corners mirror it.
    pub fn euclid(orientation: Orientation) -> Self {
        let (rows, columns) = Self::euclid_shape();
        let (prescan_x, overscan_x, imaging_x) = if orientation.is_left() {
            ((0, 51), (2099, columns), (51, 2099))
        } else {
            ((columns - 51, columns), (0, columns - 2099), (columns - 2099, columns - 51))
        };
        let parallel_overscan_y = if orientation.is_bottom() {
            (rows - 20, rows)
        } else {
            (0, 20)
        };

        // All bounds are non-degenerate constants.
        let region = |y: (usize, usize), x: (usize, usize)| Region::new(y.0, y.1, x.0, x.1).ok();

        Self::new(
            orientation,
            region(parallel_overscan_y, imaging_x),
            region((0, rows), prescan_x),
            region((0, rows), overscan_x),
        )
    }

    /// Rows `rows` of the front edge of `region`.
    ///
    /// Bottom orientations count from `y0` upwards; top orientations count from
    /// `y1` downwards.
    pub fn parallel_front_edge_region(
        &self,
        region: &Region,
        rows: PixelWindow,
    ) -> Result<Region, RegionError> {
        if self.orientation.is_bottom() {
            Region::new(
                region.y0() + rows.start(),
                region.y0() + rows.end(),
                region.x0(),
                region.x1(),
            )
        } else {
            Region::new(
                offset_below("y1", region.y1(), rows.end())?,
                offset_below("y1", region.y1(), rows.start())?,
                region.x0(),
                region.x1(),
            )
        }
    }

    /// Rows `rows` of the parallel trail following `region`.
    pub fn parallel_trails_region(
        &self,
        region: &Region,
        rows: PixelWindow,
    ) -> Result<Region, RegionError> {
        if self.orientation.is_bottom() {
            Region::new(
                region.y1() + rows.start(),
                region.y1() + rows.end(),
                region.x0(),
                region.x1(),
            )
        } else {
            Region::new(
                offset_below("y0", region.y0(), rows.end())?,
                offset_below("y0", region.y0(), rows.start())?,
                region.x0(),
                region.x1(),
            )
        }
    }

    /// Columns `columns` of the serial front edge of `region`.
    pub fn serial_front_edge_region(
        &self,
        region: &Region,
        columns: PixelWindow,
    ) -> Result<Region, RegionError> {
        if self.orientation.is_left() {
            Region::new(
                region.y0(),
                region.y1(),
                region.x0() + columns.start(),
                region.x0() + columns.end(),
            )
        } else {
            Region::new(
                region.y0(),
                region.y1(),
                offset_below("x1", region.x1(), columns.end())?,
                offset_below("x1", region.x1(), columns.start())?,
            )
        }
    }

    /// Columns `columns` of the serial trail following `region`.
    pub fn serial_trails_region(
        &self,
        region: &Region,
        columns: PixelWindow,
    ) -> Result<Region, RegionError> {
        if self.orientation.is_left() {
            Region::new(
                region.y0(),
                region.y1(),
                region.x1() + columns.start(),
                region.x1() + columns.end(),
            )
        } else {
            Region::new(
                region.y0(),
                region.y1(),
                offset_below("x0", region.x0(), columns.end())?,
                offset_below("x0", region.x0(), columns.start())?,
            )
        }
    }

    /// Full-height slab of `columns` counted from the serial read-out side.
    pub fn parallel_side_nearest_read_out_region(
        &self,
        image_shape: (usize, usize),
        columns: PixelWindow,
    ) -> Result<Region, RegionError> {
        if self.orientation.is_left() {
            Region::new(0, image_shape.0, columns.start(), columns.end())
        } else {
            Region::new(
                0,
                image_shape.0,
                offset_below("image edge", image_shape.1, columns.end())?,
                offset_below("image edge", image_shape.1, columns.start())?,
            )
        }
    }

    /// Rows of `region` extended across the frame: from the serial read-out
    /// edge (prescan included) to the image edge on the trailing side.
    pub fn serial_prescan_ci_region_and_trails(
        &self,
        region: &Region,
        image_shape: (usize, usize),
    ) -> Result<Region, RegionError> {
        Region::new(region.y0(), region.y1(), 0, image_shape.1)
    }

    /// Rows between the trailing edge of the regions and the image edge.
    pub fn parallel_trail_size_to_image_edge(
        &self,
        regions: &[Region],
        shape: (usize, usize),
    ) -> usize {
        if self.orientation.is_bottom() {
            let last = regions.iter().map(Region::y1).max().unwrap_or(shape.0);
            shape.0.saturating_sub(last)
        } else {
            regions.iter().map(Region::y0).min().unwrap_or(0)
        }
    }

    /// Columns between the trailing edge of the regions and the image edge.
    pub fn serial_trail_size_to_image_edge(
        &self,
        regions: &[Region],
        shape: (usize, usize),
    ) -> usize {
        if self.orientation.is_left() {
            let last = regions.iter().map(Region::x1).max().unwrap_or(shape.1);
            shape.1.saturating_sub(last)
        } else {
            regions.iter().map(Region::x0).min().unwrap_or(0)
        }
    }

    /// Smallest parallel trail available to every region: the minimum of the
    /// gaps between consecutive regions and the trailing gap to the image edge.
    pub fn smallest_parallel_trails_rows_from_shape(
        &self,
        regions: &[Region],
        shape: (usize, usize),
    ) -> usize {
        rows_between_regions(regions)
            .into_iter()
            .chain(std::iter::once(
                self.parallel_trail_size_to_image_edge(regions, shape),
            ))
            .min()
            .unwrap_or(0)
    }

    /// Rows `[y0, y1)` covering row `y` and `dy` further rows along its
    /// parallel trail, clipped to a frame of `rows` rows.
    pub fn parallel_trail_span_from_row(&self, y: usize, dy: usize, rows: usize) -> (usize, usize) {
        if self.orientation.is_bottom() {
            (y, (y + dy + 1).min(rows))
        } else {
            (y.saturating_sub(dy), (y + 1).min(rows))
        }
    }

    /// Columns `[x0, x1)` covering column `x` and `dx` further columns along
    /// its serial trail, clipped to a frame of `columns` columns.
    pub fn serial_trail_span_from_column(
        &self,
        x: usize,
        dx: usize,
        columns: usize,
    ) -> (usize, usize) {
        if self.orientation.is_left() {
            (x, (x + dx + 1).min(columns))
        } else {
            (x.saturating_sub(dx), (x + 1).min(columns))
        }
    }
}

/// Gaps `regions[i + 1].y0 - regions[i].y1` between consecutive regions.
///
/// Regions must be sorted by `y0`, as a validated
/// [`crate::pattern::CIPattern`] guarantees. Regions sharing rows have a gap
/// of zero.
pub fn rows_between_regions(regions: &[Region]) -> Vec<usize> {
    regions
        .windows(2)
        .map(|pair| pair[1].y0().saturating_sub(pair[0].y1()))
        .collect()
}
