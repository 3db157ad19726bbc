//! Seam for the external CTI clocking model.

use ndarray::Array2;

/// Anything that can add CTI trails to a pre-CTI image.
///
/// Trap densities, clocking settings and the like are owned by the
/// implementor; the fit only sees the image going in and coming out.
pub trait CtiOperator {
    fn post_cti_from(&self, pre_cti: &Array2<f64>) -> Array2<f64>;
}

impl<F> CtiOperator for F
where
    F: Fn(&Array2<f64>) -> Array2<f64>,
{
    fn post_cti_from(&self, pre_cti: &Array2<f64>) -> Array2<f64> {
        self(pre_cti)
    }
}
