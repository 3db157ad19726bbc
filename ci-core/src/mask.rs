//! Pixel masks for fitting charge-injection frames.
//!
//! A [`Mask2D`] has the shape of the frame; `true` marks a pixel excluded from
//! the fit. Masks are built fresh from a [`SettingsMask2D`] (FPR/EPER bands)
//! or from a cosmic-ray map, and combined with [`Mask2D::union`].

use log::debug;
use ndarray::{s, Array2, Zip};
use serde::{Deserialize, Serialize};
use std::ops::Not;
use std::path::Path;

use crate::extract::{ExtractError, Extractor2D, ExtractorKind};
use crate::geometry::FrameGeometry;
use crate::json;
use crate::layout::Layout2DCI;
use crate::region::{PixelWindow, Region};

/// Which FPR/EPER bands to mask, and how far to grow cosmic-ray masks.
///
/// A `None` window disables that band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsMask2D {
    pub parallel_fpr_pixels: Option<PixelWindow>,
    pub parallel_eper_pixels: Option<PixelWindow>,
    pub serial_fpr_pixels: Option<PixelWindow>,
    pub serial_eper_pixels: Option<PixelWindow>,
    pub cosmic_ray_parallel_buffer: usize,
    pub cosmic_ray_serial_buffer: usize,
    pub cosmic_ray_diagonal_buffer: usize,
}

impl Default for SettingsMask2D {
    fn default() -> Self {
        Self {
            parallel_fpr_pixels: None,
            parallel_eper_pixels: None,
            serial_fpr_pixels: None,
            serial_eper_pixels: None,
            cosmic_ray_parallel_buffer: 10,
            cosmic_ray_serial_buffer: 10,
            cosmic_ray_diagonal_buffer: 3,
        }
    }
}

impl SettingsMask2D {
    /// Requested band windows paired with the extractor that resolves them.
    fn band_windows(&self) -> impl Iterator<Item = (ExtractorKind, PixelWindow)> {
        [
            (ExtractorKind::ParallelFpr, self.parallel_fpr_pixels),
            (ExtractorKind::ParallelEper, self.parallel_eper_pixels),
            (ExtractorKind::SerialFpr, self.serial_fpr_pixels),
            (ExtractorKind::SerialEper, self.serial_eper_pixels),
        ]
        .into_iter()
        .filter_map(|(kind, window)| window.map(|window| (kind, window)))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        json::save_to_file(self, path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        json::load_from_file(path)
    }
}

/// Boolean exclusion grid; `true` = masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask2D {
    mask: Array2<bool>,
}

impl Mask2D {
    /// Nothing masked.
    pub fn unmasked(shape: (usize, usize)) -> Self {
        Self {
            mask: Array2::from_elem(shape, false),
        }
    }

    /// Everything masked.
    pub fn all_masked(shape: (usize, usize)) -> Self {
        Self {
            mask: Array2::from_elem(shape, true),
        }
    }

    pub fn from_array(mask: Array2<bool>) -> Self {
        Self { mask }
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.mask
    }

    pub fn into_array(self) -> Array2<bool> {
        self.mask
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mask.dim()
    }

    /// Whether pixel `(y, x)` is masked; pixels outside the mask read as
    /// unmasked.
    pub fn is_masked(&self, y: usize, x: usize) -> bool {
        self.mask.get((y, x)).copied().unwrap_or(false)
    }

    /// Mask pixel `(y, x)`; coordinates outside the mask are ignored.
    pub fn mask_pixel(&mut self, y: usize, x: usize) {
        if let Some(pixel) = self.mask.get_mut((y, x)) {
            *pixel = true;
        }
    }

    /// Number of masked pixels.
    pub fn pixels_in_mask(&self) -> usize {
        self.mask.iter().filter(|&&masked| masked).count()
    }

    /// Pixels masked in either `self` or `other`; shapes must agree.
    pub fn union(&self, other: &Mask2D) -> Result<Mask2D, ExtractError> {
        if self.shape() != other.shape() {
            return Err(ExtractError::InconsistentShapes {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        let mask = Zip::from(&self.mask)
            .and(&other.mask)
            .map_collect(|&a, &b| a || b);
        Ok(Mask2D { mask })
    }

    /// Mask every pixel inside `regions`.
    pub fn from_regions(shape: (usize, usize), regions: &[Region]) -> Result<Self, ExtractError> {
        let mut mask = Self::unmasked(shape);
        for region in regions {
            region.view_mut(&mut mask.mask)?.fill(true);
        }
        Ok(mask)
    }

    /// Mask the FPR/EPER bands requested by `settings`, optionally inverted so
    /// that only those bands are fitted.
    pub fn masked_fpr_and_eper_from(
        layout: &Layout2DCI,
        settings: &SettingsMask2D,
        invert: bool,
    ) -> Result<Self, ExtractError> {
        let mut mask = Self::unmasked(layout.shape_2d());

        for (kind, window) in settings.band_windows() {
            let regions = layout.extractor(kind).region_list_from(Some(window))?;
            debug!("Masking {} {kind:?} regions over {window}", regions.len());
            mask = mask.union(&Self::from_regions(layout.shape_2d(), &regions)?)?;
        }

        Ok(if invert { !mask } else { mask })
    }

    /// Mask every cosmic-ray hit (`cosmic_ray_map > 0`) and the trailing
    /// pixels it contaminates: `parallel` rows along its parallel trail,
    /// `serial` columns along its serial trail and a `diagonal` block in the
    /// quadrant trailing both.
    pub fn from_cosmic_ray_map_buffed(
        cosmic_ray_map: &Array2<f64>,
        geometry: &FrameGeometry,
        settings: &SettingsMask2D,
    ) -> Self {
        let (rows, columns) = cosmic_ray_map.dim();
        let mut mask = Array2::from_elem((rows, columns), false);

        for ((y, x), &value) in cosmic_ray_map.indexed_iter() {
            if value <= 0.0 {
                continue;
            }

            let (y0, y1) =
                geometry.parallel_trail_span_from_row(y, settings.cosmic_ray_parallel_buffer, rows);
            mask.slice_mut(s![y0..y1, x]).fill(true);

            let (x0, x1) = geometry.serial_trail_span_from_column(
                x,
                settings.cosmic_ray_serial_buffer,
                columns,
            );
            mask.slice_mut(s![y, x0..x1]).fill(true);

            let (y0, y1) =
                geometry.parallel_trail_span_from_row(y, settings.cosmic_ray_diagonal_buffer, rows);
            let (x0, x1) = geometry.serial_trail_span_from_column(
                x,
                settings.cosmic_ray_diagonal_buffer,
                columns,
            );
            mask.slice_mut(s![y0..y1, x0..x1]).fill(true);
        }

        Self { mask }
    }
}

impl Not for Mask2D {
    type Output = Mask2D;

    fn not(self) -> Mask2D {
        Mask2D {
            mask: self.mask.mapv(|masked| !masked),
        }
    }
}
