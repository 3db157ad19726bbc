//! Gaussian likelihood of a CTI model against a charge-injection image.
//!
//! The evaluation is a single pass over the frame:
//!
//! 1. residuals `image - model`, zeroed at masked pixels
//! 2. effective noise: the noise map plus any hyper-scaled noise maps
//! 3. chi-squared map `(residual / noise)^2`, summed over every pixel
//! 4. noise normalization `sum ln(2 pi noise^2)` over unmasked pixels only
//! 5. `log_likelihood = -0.5 * (chi_squared + noise_normalization)`
//!
//! Masked pixels therefore still enter the chi-squared sum, as zeros.

use std::f64::consts::PI;

use ci_core::{ExtractError, Mask2D, PatternError};
use log::{debug, warn};
use ndarray::{Array2, Zip};
use thiserror::Error;

use crate::cti::CtiOperator;
use crate::dataset::ImagingCI;
use crate::hyper::{effective_noise_map_from, HyperNoiseScalar};

/// Errors raised while assembling a dataset or evaluating a fit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("{name} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("{scalars} hyper noise scalars given for {maps} noise scaling maps")]
    HyperScalarCount { scalars: usize, maps: usize },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Fail unless `array` has shape `expected`.
pub(crate) fn check_shape(
    name: &'static str,
    array: &Array2<f64>,
    expected: (usize, usize),
) -> Result<(), FitError> {
    if array.dim() != expected {
        return Err(FitError::ShapeMismatch {
            name,
            expected,
            found: array.dim(),
        });
    }
    Ok(())
}

/// `data - model_data`, with masked pixels set to exactly zero.
pub fn residual_map_with_mask_from(
    data: &Array2<f64>,
    mask: &Mask2D,
    model_data: &Array2<f64>,
) -> Array2<f64> {
    Zip::from(data)
        .and(model_data)
        .and(mask.as_array())
        .map_collect(|&d, &m, &masked| if masked { 0.0 } else { d - m })
}

/// `residual / noise`, zero at masked pixels.
pub fn normalized_residual_map_with_mask_from(
    residual_map: &Array2<f64>,
    noise_map: &Array2<f64>,
    mask: &Mask2D,
) -> Array2<f64> {
    Zip::from(residual_map)
        .and(noise_map)
        .and(mask.as_array())
        .map_collect(|&r, &n, &masked| if masked { 0.0 } else { r / n })
}

/// `(residual / noise)^2`, zero at masked pixels.
pub fn chi_squared_map_with_mask_from(
    residual_map: &Array2<f64>,
    noise_map: &Array2<f64>,
    mask: &Mask2D,
) -> Array2<f64> {
    normalized_residual_map_with_mask_from(residual_map, noise_map, mask).mapv(|r| r * r)
}

/// Sum of the chi-squared map over every pixel.
pub fn chi_squared_from(chi_squared_map: &Array2<f64>) -> f64 {
    chi_squared_map.sum()
}

/// `sum ln(2 pi noise^2)` over unmasked pixels.
pub fn noise_normalization_with_mask_from(noise_map: &Array2<f64>, mask: &Mask2D) -> f64 {
    noise_map
        .iter()
        .zip(mask.as_array().iter())
        .filter(|(_, masked)| !**masked)
        .map(|(&noise, _)| (2.0 * PI * noise * noise).ln())
        .sum()
}

pub fn log_likelihood_from(chi_squared: f64, noise_normalization: f64) -> f64 {
    -0.5 * (chi_squared + noise_normalization)
}

/// A fitted charge-injection image and every product of the likelihood.
#[derive(Debug, Clone, PartialEq)]
pub struct FitImagingCI {
    model_data: Array2<f64>,
    effective_noise_map: Array2<f64>,
    residual_map: Array2<f64>,
    normalized_residual_map: Array2<f64>,
    chi_squared_map: Array2<f64>,
    chi_squared: f64,
    noise_normalization: f64,
    log_likelihood: f64,
}

impl FitImagingCI {
    /// Fit `post_cti_data` to `dataset`.
    ///
    /// With no `hyper_noise_scalars` the dataset's noise map is used as is;
    /// otherwise there must be one scalar per noise scaling map.
    pub fn new(
        dataset: &ImagingCI,
        post_cti_data: Array2<f64>,
        hyper_noise_scalars: &[HyperNoiseScalar],
    ) -> Result<Self, FitError> {
        check_shape("post-CTI model", &post_cti_data, dataset.shape_2d())?;

        let mask = dataset.mask();
        let effective_noise_map = if hyper_noise_scalars.is_empty() {
            dataset.noise_map().clone()
        } else {
            effective_noise_map_from(
                dataset.noise_map(),
                hyper_noise_scalars,
                dataset.noise_scaling_map_list(),
            )?
        };

        let non_positive = Zip::from(&effective_noise_map)
            .and(mask.as_array())
            .fold(0usize, |count, &noise, &masked| {
                count + usize::from(!masked && noise <= 0.0)
            });
        if non_positive > 0 {
            warn!("{non_positive} unmasked pixels have non-positive effective noise");
        }

        let residual_map = residual_map_with_mask_from(dataset.image(), mask, &post_cti_data);
        let normalized_residual_map =
            normalized_residual_map_with_mask_from(&residual_map, &effective_noise_map, mask);
        let chi_squared_map = normalized_residual_map.mapv(|r| r * r);
        let chi_squared = chi_squared_from(&chi_squared_map);
        let noise_normalization = noise_normalization_with_mask_from(&effective_noise_map, mask);
        let log_likelihood = log_likelihood_from(chi_squared, noise_normalization);

        debug!(
            "chi_squared={chi_squared:.4} noise_normalization={noise_normalization:.4} \
             log_likelihood={log_likelihood:.4}"
        );

        Ok(Self {
            model_data: post_cti_data,
            effective_noise_map,
            residual_map,
            normalized_residual_map,
            chi_squared_map,
            chi_squared,
            noise_normalization,
            log_likelihood,
        })
    }

    /// Run `cti` on the dataset's pre-CTI image and fit the result.
    pub fn from_cti_operator<C: CtiOperator + ?Sized>(
        dataset: &ImagingCI,
        cti: &C,
        hyper_noise_scalars: &[HyperNoiseScalar],
    ) -> Result<Self, FitError> {
        let post_cti_data = cti.post_cti_from(dataset.pre_cti_data());
        Self::new(dataset, post_cti_data, hyper_noise_scalars)
    }

    pub fn model_data(&self) -> &Array2<f64> {
        &self.model_data
    }

    pub fn effective_noise_map(&self) -> &Array2<f64> {
        &self.effective_noise_map
    }

    pub fn residual_map(&self) -> &Array2<f64> {
        &self.residual_map
    }

    pub fn normalized_residual_map(&self) -> &Array2<f64> {
        &self.normalized_residual_map
    }

    pub fn chi_squared_map(&self) -> &Array2<f64> {
        &self.chi_squared_map
    }

    pub fn chi_squared(&self) -> f64 {
        self.chi_squared
    }

    pub fn noise_normalization(&self) -> f64 {
        self.noise_normalization
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Value maximised by the sampler.
    pub fn figure_of_merit(&self) -> f64 {
        self.log_likelihood
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_residual_zeroed_where_masked() {
        let data = array![[5.0, 6.0], [7.0, 8.0]];
        let model = array![[4.0, 4.0], [4.0, 4.0]];
        let mut mask = Mask2D::unmasked((2, 2));
        mask.mask_pixel(1, 0);

        let residual = residual_map_with_mask_from(&data, &mask, &model);
        assert_eq!(residual, array![[1.0, 2.0], [0.0, 4.0]]);
    }

    #[test]
    fn test_chi_squared_map_and_sum() {
        let residual = array![[2.0, -4.0], [0.0, 1.0]];
        let noise = array![[2.0, 2.0], [0.0, 0.5]];
        let mut mask = Mask2D::unmasked((2, 2));
        mask.mask_pixel(1, 0);

        let chi_squared_map = chi_squared_map_with_mask_from(&residual, &noise, &mask);
        assert_eq!(chi_squared_map, array![[1.0, 4.0], [0.0, 4.0]]);
        assert_relative_eq!(chi_squared_from(&chi_squared_map), 9.0);
    }

    #[test]
    fn test_noise_normalization_skips_masked() {
        let noise = Array2::from_elem((2, 2), 2.0);
        let mut mask = Mask2D::unmasked((2, 2));
        let full = noise_normalization_with_mask_from(&noise, &mask);
        assert_relative_eq!(full, 4.0 * (2.0 * PI * 4.0).ln(), epsilon = 1e-12);

        mask.mask_pixel(0, 0);
        let partial = noise_normalization_with_mask_from(&noise, &mask);
        assert_relative_eq!(partial, 3.0 * (2.0 * PI * 4.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_log_likelihood() {
        assert_relative_eq!(log_likelihood_from(3.0, 5.0), -4.0);
    }
}
