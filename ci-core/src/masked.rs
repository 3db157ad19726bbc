//! Masked 2D arrays and the mean reductions used to stack and bin them.
//!
//! Each cell carries a value and an exclusion flag (`true` = masked). Means
//! skip masked cells. A reduction over cells that are all masked yields
//! `f64::INFINITY`, which downstream diagnostics treat as "no data".

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};

use crate::extract::ExtractError;

/// A value grid with a parallel exclusion mask of the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray2 {
    data: Array2<f64>,
    mask: Array2<bool>,
}

impl MaskedArray2 {
    /// Pair `data` with `mask`; shapes must agree.
    pub fn new(data: Array2<f64>, mask: Array2<bool>) -> Result<Self, ExtractError> {
        if data.dim() != mask.dim() {
            return Err(ExtractError::InconsistentShapes {
                expected: data.dim(),
                found: mask.dim(),
            });
        }
        Ok(Self { data, mask })
    }

    /// Wrap `data` with nothing masked.
    pub fn unmasked(data: Array2<f64>) -> Self {
        let mask = Array2::from_elem(data.dim(), false);
        Self { data, mask }
    }

    pub(crate) fn from_views(data: ArrayView2<f64>, mask: Option<ArrayView2<bool>>) -> Self {
        match mask {
            Some(mask) => Self {
                data: data.to_owned(),
                mask: mask.to_owned(),
            },
            None => Self::unmasked(data.to_owned()),
        }
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn into_parts(self) -> (Array2<f64>, Array2<bool>) {
        (self.data, self.mask)
    }

    /// Values with masked cells replaced by `fill`.
    pub fn filled(&self, fill: f64) -> Array2<f64> {
        let mut out = self.data.clone();
        Zip::from(&mut out)
            .and(&self.mask)
            .for_each(|value, &masked| {
                if masked {
                    *value = fill;
                }
            });
        out
    }

    /// Cell-wise mean across `arrays`, skipping masked cells.
    ///
    /// A cell masked in every input stays masked in the output (value `0.0`).
    pub fn stacked_mean(arrays: &[MaskedArray2]) -> Result<MaskedArray2, ExtractError> {
        let first = arrays.first().ok_or(ExtractError::NoRegions)?;
        let shape = first.dim();

        if let Some(odd) = arrays.iter().find(|array| array.dim() != shape) {
            return Err(ExtractError::InconsistentShapes {
                expected: shape,
                found: odd.dim(),
            });
        }

        let mut sums = Array2::<f64>::zeros(shape);
        let mut counts = Array2::<usize>::zeros(shape);
        for array in arrays {
            Zip::from(&mut sums)
                .and(&mut counts)
                .and(&array.data)
                .and(&array.mask)
                .for_each(|sum, count, &value, &masked| {
                    if !masked {
                        *sum += value;
                        *count += 1;
                    }
                });
        }

        let data = Zip::from(&sums)
            .and(&counts)
            .map_collect(|&sum, &count| if count == 0 { 0.0 } else { sum / count as f64 });
        let mask = counts.mapv(|count| count == 0);

        Ok(MaskedArray2 { data, mask })
    }

    /// Mean along `axis`, skipping masked cells; all-masked lanes give `+inf`.
    pub fn mean_axis(&self, axis: Axis) -> Array1<f64> {
        Zip::from(self.data.lanes(axis))
            .and(self.mask.lanes(axis))
            .map_collect(|values, mask| {
                let (sum, count) = values
                    .iter()
                    .zip(mask.iter())
                    .filter(|(_, masked)| !**masked)
                    .fold((0.0, 0usize), |(sum, count), (&value, _)| {
                        (sum + value, count + 1)
                    });
                if count == 0 {
                    f64::INFINITY
                } else {
                    sum / count as f64
                }
            })
    }
}
