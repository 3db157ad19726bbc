//! Likelihood fitting of charge-injection images.
//!
//! [`ImagingCI`] bundles an observed frame with its noise map, pre-CTI image,
//! mask and noise scaling maps. [`FitImagingCI`] compares it against the
//! output of an external [`CtiOperator`] and reduces the comparison to a
//! Gaussian log likelihood, optionally inflating the noise with
//! [`HyperNoiseScalar`]-weighted scaling maps.

pub mod cti;
pub mod dataset;
pub mod fit;
pub mod hyper;

pub use cti::CtiOperator;
pub use dataset::ImagingCI;
pub use fit::{FitError, FitImagingCI};
pub use hyper::{effective_noise_map_from, noise_scaling_map_list_from, HyperNoiseScalar};
