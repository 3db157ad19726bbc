//! Charge-injection imaging dataset: the observed frame and every map fitted
//! alongside it.

use ci_core::extract::{ExtractParallelCalibration, ExtractSerialCalibration};
use ci_core::{CIPattern, FrameGeometry, Layout2DCI, Mask2D, PixelWindow, SettingsMask2D};
use log::debug;
use ndarray::Array2;

use crate::fit::{check_shape, FitError};

/// Pixel scale of a Euclid VIS quadrant in arcseconds.
const DEFAULT_PIXEL_SCALES: f64 = 0.1;

/// Observed image, noise map and pre-CTI image of one frame, sharing a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagingCI {
    image: Array2<f64>,
    noise_map: Array2<f64>,
    pre_cti_data: Array2<f64>,
    layout: Layout2DCI,
    cosmic_ray_map: Option<Array2<f64>>,
    noise_scaling_map_list: Vec<Array2<f64>>,
    pixel_scales: f64,
    mask: Mask2D,
}

impl ImagingCI {
    /// Bundle a frame; every array must have the layout's shape.
    pub fn new(
        image: Array2<f64>,
        noise_map: Array2<f64>,
        pre_cti_data: Array2<f64>,
        layout: Layout2DCI,
    ) -> Result<Self, FitError> {
        let shape = layout.shape_2d();
        check_shape("image", &image, shape)?;
        check_shape("noise map", &noise_map, shape)?;
        check_shape("pre-CTI data", &pre_cti_data, shape)?;

        Ok(Self {
            image,
            noise_map,
            pre_cti_data,
            layout,
            cosmic_ray_map: None,
            noise_scaling_map_list: Vec::new(),
            pixel_scales: DEFAULT_PIXEL_SCALES,
            mask: Mask2D::unmasked(shape),
        })
    }

    /// Bundle a frame whose pre-CTI image is rendered from `pattern`.
    ///
    /// `seed` is forwarded to non-uniform patterns; the seed actually used is
    /// logged.
    pub fn from_pattern(
        image: Array2<f64>,
        noise_map: Array2<f64>,
        pattern: &CIPattern,
        geometry: FrameGeometry,
        seed: Option<u64>,
    ) -> Result<Self, FitError> {
        let layout = Layout2DCI::from_pattern(image.dim(), pattern, geometry)?;
        let pre_cti = pattern.ci_pre_cti_from(image.dim(), seed)?;
        if let Some(seed) = pre_cti.seed {
            debug!("Pre-CTI data generated with seed {seed}");
        }
        Self::new(image, noise_map, pre_cti.data, layout)
    }

    pub fn with_cosmic_ray_map(mut self, cosmic_ray_map: Array2<f64>) -> Result<Self, FitError> {
        check_shape("cosmic ray map", &cosmic_ray_map, self.shape_2d())?;
        self.cosmic_ray_map = Some(cosmic_ray_map);
        Ok(self)
    }

    pub fn with_noise_scaling_map_list(
        mut self,
        noise_scaling_map_list: Vec<Array2<f64>>,
    ) -> Result<Self, FitError> {
        for map in &noise_scaling_map_list {
            check_shape("noise scaling map", map, self.shape_2d())?;
        }
        self.noise_scaling_map_list = noise_scaling_map_list;
        Ok(self)
    }

    pub fn with_pixel_scales(mut self, pixel_scales: f64) -> Self {
        self.pixel_scales = pixel_scales;
        self
    }

    /// Replace the mask.
    pub fn with_mask(mut self, mask: Mask2D) -> Result<Self, FitError> {
        if mask.shape() != self.shape_2d() {
            return Err(FitError::ShapeMismatch {
                name: "mask",
                expected: self.shape_2d(),
                found: mask.shape(),
            });
        }
        self.mask = mask;
        Ok(self)
    }

    /// Add the FPR/EPER bands of `settings` to the mask, plus the buffed
    /// cosmic-ray mask when a cosmic-ray map is present.
    pub fn with_settings_mask(
        mut self,
        settings: &SettingsMask2D,
        invert: bool,
    ) -> Result<Self, FitError> {
        let mut mask = Mask2D::masked_fpr_and_eper_from(&self.layout, settings, invert)?;
        if let Some(cosmic_ray_map) = &self.cosmic_ray_map {
            mask = mask.union(&Mask2D::from_cosmic_ray_map_buffed(
                cosmic_ray_map,
                self.layout.geometry(),
                settings,
            ))?;
        }
        self.mask = self.mask.union(&mask)?;
        debug!("Mask now covers {} pixels", self.mask.pixels_in_mask());
        Ok(self)
    }

    /// Dataset cut down to the parallel calibration slab of `columns`.
    pub fn parallel_calibration_imaging_from(
        &self,
        columns: Option<PixelWindow>,
    ) -> Result<Self, FitError> {
        let extractor = ExtractParallelCalibration::new(self.layout.clone());
        let extract = |array: &Array2<f64>| extractor.array_2d_from(array, columns);

        Ok(Self {
            image: extract(&self.image)?,
            noise_map: extract(&self.noise_map)?,
            pre_cti_data: extract(&self.pre_cti_data)?,
            layout: extractor.layout_from(columns)?,
            cosmic_ray_map: self.cosmic_ray_map.as_ref().map(extract).transpose()?,
            noise_scaling_map_list: self
                .noise_scaling_map_list
                .iter()
                .map(extract)
                .collect::<Result<_, _>>()?,
            pixel_scales: self.pixel_scales,
            mask: Mask2D::from_array(extractor.array_2d_from(self.mask.as_array(), columns)?),
        })
    }

    /// Dataset cut down to the concatenated serial calibration slabs of `rows`.
    pub fn serial_calibration_imaging_from(
        &self,
        rows: Option<PixelWindow>,
    ) -> Result<Self, FitError> {
        let extractor = ExtractSerialCalibration::new(self.layout.clone());
        let extract = |array: &Array2<f64>| extractor.array_2d_from(array, rows);

        Ok(Self {
            image: extract(&self.image)?,
            noise_map: extract(&self.noise_map)?,
            pre_cti_data: extract(&self.pre_cti_data)?,
            layout: extractor.layout_from(rows)?,
            cosmic_ray_map: self.cosmic_ray_map.as_ref().map(extract).transpose()?,
            noise_scaling_map_list: self
                .noise_scaling_map_list
                .iter()
                .map(extract)
                .collect::<Result<_, _>>()?,
            pixel_scales: self.pixel_scales,
            mask: Mask2D::from_array(extractor.array_2d_from(self.mask.as_array(), rows)?),
        })
    }

    pub fn shape_2d(&self) -> (usize, usize) {
        self.layout.shape_2d()
    }

    pub fn image(&self) -> &Array2<f64> {
        &self.image
    }

    pub fn noise_map(&self) -> &Array2<f64> {
        &self.noise_map
    }

    pub fn pre_cti_data(&self) -> &Array2<f64> {
        &self.pre_cti_data
    }

    pub fn layout(&self) -> &Layout2DCI {
        &self.layout
    }

    pub fn cosmic_ray_map(&self) -> Option<&Array2<f64>> {
        self.cosmic_ray_map.as_ref()
    }

    pub fn noise_scaling_map_list(&self) -> &[Array2<f64>] {
        &self.noise_scaling_map_list
    }

    /// Arcseconds per pixel.
    pub fn pixel_scales(&self) -> f64 {
        self.pixel_scales
    }

    pub fn mask(&self) -> &Mask2D {
        &self.mask
    }
}
