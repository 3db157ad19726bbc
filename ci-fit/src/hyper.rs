//! Hyper noise scaling.
//!
//! A previous fit's chi-squared map, cut into FPR/EPER bands, gives one noise
//! scaling map per band. During later fits each map is weighted by a free
//! [`HyperNoiseScalar`] and added to the noise map, letting the likelihood
//! down-weight bands the CTI model cannot reproduce.

use ci_core::{Extractor2D, ExtractorKind, Layout2DCI};
use log::debug;
use ndarray::Array2;

use crate::fit::{check_shape, FitError};

/// Weight applied to one noise scaling map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HyperNoiseScalar {
    pub scale_factor: f64,
}

impl HyperNoiseScalar {
    pub fn new(scale_factor: f64) -> Self {
        Self { scale_factor }
    }

    /// `scale_factor * noise_scaling_map`.
    pub fn scaled_noise_map_from(&self, noise_scaling_map: &Array2<f64>) -> Array2<f64> {
        noise_scaling_map * self.scale_factor
    }
}

/// `noise_map + sum_i scalars[i] * noise_scaling_maps[i]`.
pub fn effective_noise_map_from(
    noise_map: &Array2<f64>,
    hyper_noise_scalars: &[HyperNoiseScalar],
    noise_scaling_maps: &[Array2<f64>],
) -> Result<Array2<f64>, FitError> {
    if hyper_noise_scalars.len() != noise_scaling_maps.len() {
        return Err(FitError::HyperScalarCount {
            scalars: hyper_noise_scalars.len(),
            maps: noise_scaling_maps.len(),
        });
    }

    let mut effective = noise_map.clone();
    for (scalar, map) in hyper_noise_scalars.iter().zip(noise_scaling_maps) {
        check_shape("noise scaling map", map, noise_map.dim())?;
        effective.scaled_add(scalar.scale_factor, map);
    }
    Ok(effective)
}

/// One noise scaling map per extractor kind: the chi-squared values inside
/// that extractor's default bands, zero elsewhere.
pub fn noise_scaling_map_list_from(
    chi_squared_map: &Array2<f64>,
    layout: &Layout2DCI,
    kinds: &[ExtractorKind],
) -> Result<Vec<Array2<f64>>, FitError> {
    check_shape("chi-squared map", chi_squared_map, layout.shape_2d())?;

    kinds
        .iter()
        .map(|&kind| -> Result<Array2<f64>, FitError> {
            let extractor = layout.extractor(kind);
            let map = extractor.add_to_array(
                Array2::zeros(layout.shape_2d()),
                chi_squared_map,
                None,
            )?;
            debug!("Built {kind:?} noise scaling map, total {:.4}", map.sum());
            Ok(map)
        })
        .collect()
}
