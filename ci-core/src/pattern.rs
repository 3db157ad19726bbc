//! Charge-injection patterns and synthetic pre-CTI images.
//!
//! A [`CIPattern`] is an ordered set of charge-injection regions plus the law
//! describing how much charge each pixel receives:
//!
//! - **Uniform**: every injected pixel holds `normalization`.
//! - **Non-uniform**: each column draws its own level from
//!   `Normal(normalization, column_sigma)` (rejection-resampled into
//!   `(0, maximum_normalization)`), and rows follow a power law
//!   `level * (row + 1)^row_slope` from the front of the region.
//!
//! Non-uniform generation takes an explicit seed. Every region of one image is
//! filled from a generator seeded with that same value, so the column levels
//! repeat from region to region: the injection line feeding a column is the
//! same for every region it crosses.

use log::debug;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::rows_between_regions;
use crate::region::{Region, RegionError};

/// Draws allowed per column before rejection sampling gives up.
const MAX_COLUMN_DRAWS: usize = 100_000;

/// Errors raised while validating or rendering a pattern.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    #[error("charge injection pattern has no regions")]
    NoRegions,

    #[error("regions must be sorted by y0: {previous} precedes {next}")]
    Unsorted { previous: Region, next: Region },

    #[error("regions {previous} and {next} overlap")]
    Overlapping { previous: Region, next: Region },

    #[error("pattern region {region} lies outside image of shape {rows}x{columns}")]
    OutsideImage {
        region: Region,
        rows: usize,
        columns: usize,
    },

    #[error("column sigma must be finite and non-negative, got {0}")]
    InvalidColumnSigma(f64),

    #[error("maximum normalization must be positive, got {0}")]
    InvalidMaximumNormalization(f64),

    #[error(
        "no column normalization in (0, {maximum}) after {draws} draws from N({mean}, {sigma})"
    )]
    RejectionSamplingExhausted {
        mean: f64,
        sigma: f64,
        maximum: f64,
        draws: usize,
    },

    #[error(transparent)]
    Region(#[from] RegionError),
}

/// How charge is distributed inside each injected region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "law", rename_all = "snake_case")]
pub enum NormalizationLaw {
    Uniform,
    NonUniform {
        row_slope: f64,
        column_sigma: f64,
        /// Upper bound on column levels; `None` means unbounded.
        #[serde(default)]
        maximum_normalization: Option<f64>,
    },
}

/// A synthetic pre-CTI image and the seed it was generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct PreCtiImage {
    pub data: Array2<f64>,
    /// Seed used for column draws; `None` for uniform patterns.
    pub seed: Option<u64>,
}

/// Ordered, non-overlapping charge-injection regions plus a normalization law.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPattern", into = "RawPattern")]
pub struct CIPattern {
    normalization: f64,
    regions: Vec<Region>,
    law: NormalizationLaw,
}

#[derive(Serialize, Deserialize)]
struct RawPattern {
    normalization: f64,
    regions: Vec<Region>,
    #[serde(flatten)]
    law: NormalizationLaw,
}

impl TryFrom<RawPattern> for CIPattern {
    type Error = PatternError;

    fn try_from(raw: RawPattern) -> Result<Self, Self::Error> {
        CIPattern::new(raw.normalization, raw.regions, raw.law)
    }
}

impl From<CIPattern> for RawPattern {
    fn from(pattern: CIPattern) -> Self {
        RawPattern {
            normalization: pattern.normalization,
            regions: pattern.regions,
            law: pattern.law,
        }
    }
}

impl CIPattern {
    /// Validate and build a pattern.
    pub fn new(
        normalization: f64,
        regions: Vec<Region>,
        law: NormalizationLaw,
    ) -> Result<Self, PatternError> {
        if regions.is_empty() {
            return Err(PatternError::NoRegions);
        }

        for pair in regions.windows(2) {
            let (previous, next) = (pair[0], pair[1]);
            if next.y0() < previous.y0() {
                return Err(PatternError::Unsorted { previous, next });
            }
        }

        // Regions may share rows when their columns are disjoint.
        for (index, &previous) in regions.iter().enumerate() {
            if let Some(&next) = regions[index + 1..]
                .iter()
                .find(|next| previous.intersection(next).is_some())
            {
                return Err(PatternError::Overlapping { previous, next });
            }
        }

        if let NormalizationLaw::NonUniform {
            column_sigma,
            maximum_normalization,
            ..
        } = &law
        {
            if !column_sigma.is_finite() || *column_sigma < 0.0 {
                return Err(PatternError::InvalidColumnSigma(*column_sigma));
            }
            if let Some(maximum) = maximum_normalization {
                if maximum.is_nan() || *maximum <= 0.0 {
                    return Err(PatternError::InvalidMaximumNormalization(*maximum));
                }
            }
        }

        Ok(Self {
            normalization,
            regions,
            law,
        })
    }

    /// Pattern injecting a constant `normalization` into every region.
    pub fn uniform(normalization: f64, regions: Vec<Region>) -> Result<Self, PatternError> {
        Self::new(normalization, regions, NormalizationLaw::Uniform)
    }

    /// Pattern with column-to-column scatter and a row power law.
    pub fn non_uniform(
        normalization: f64,
        regions: Vec<Region>,
        row_slope: f64,
        column_sigma: f64,
        maximum_normalization: Option<f64>,
    ) -> Result<Self, PatternError> {
        Self::new(
            normalization,
            regions,
            NormalizationLaw::NonUniform {
                row_slope,
                column_sigma,
                maximum_normalization,
            },
        )
    }

    pub fn normalization(&self) -> f64 {
        self.normalization
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn law(&self) -> &NormalizationLaw {
        &self.law
    }

    /// Gaps in rows between consecutive regions.
    pub fn rows_between_regions(&self) -> Vec<usize> {
        rows_between_regions(&self.regions)
    }

    /// Fewest rows of any region.
    pub fn total_rows_min(&self) -> usize {
        self.regions
            .iter()
            .map(Region::total_rows)
            .min()
            .unwrap_or(0)
    }

    /// Fewest columns of any region.
    pub fn total_columns_min(&self) -> usize {
        self.regions
            .iter()
            .map(Region::total_columns)
            .min()
            .unwrap_or(0)
    }

    /// Fail with [`PatternError::OutsideImage`] if any region exceeds `shape`.
    pub fn check_pattern_is_within_image_dimensions(
        &self,
        shape: (usize, usize),
    ) -> Result<(), PatternError> {
        match self.regions.iter().find(|region| !region.fits_within(shape)) {
            Some(region) => Err(PatternError::OutsideImage {
                region: *region,
                rows: shape.0,
                columns: shape.1,
            }),
            None => Ok(()),
        }
    }

    /// Render the pre-CTI image of shape `(rows, columns)`.
    ///
    /// `seed` only matters for non-uniform patterns; when absent a fresh seed
    /// is drawn once and returned alongside the image.
    pub fn ci_pre_cti_from(
        &self,
        shape: (usize, usize),
        seed: Option<u64>,
    ) -> Result<PreCtiImage, PatternError> {
        self.check_pattern_is_within_image_dimensions(shape)?;

        let mut data = Array2::<f64>::zeros(shape);

        match &self.law {
            NormalizationLaw::Uniform => {
                for region in &self.regions {
                    region
                        .view_mut(&mut data)?
                        .mapv_inplace(|pixel| pixel + self.normalization);
                }
                Ok(PreCtiImage { data, seed: None })
            }
            NormalizationLaw::NonUniform {
                row_slope,
                column_sigma,
                maximum_normalization,
            } => {
                let seed = seed.unwrap_or_else(|| {
                    let drawn = thread_rng().gen::<u64>();
                    debug!("Drew charge injection seed {drawn}");
                    drawn
                });
                let maximum = maximum_normalization.unwrap_or(f64::INFINITY);

                for region in &self.regions {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let ci_region = self.non_uniform_region_from(
                        region.shape(),
                        *row_slope,
                        *column_sigma,
                        maximum,
                        &mut rng,
                    )?;
                    let mut target = region.view_mut(&mut data)?;
                    target += &ci_region;
                }
                Ok(PreCtiImage {
                    data,
                    seed: Some(seed),
                })
            }
        }
    }

    /// Fill one region column by column.
    fn non_uniform_region_from(
        &self,
        (rows, columns): (usize, usize),
        row_slope: f64,
        column_sigma: f64,
        maximum: f64,
        rng: &mut StdRng,
    ) -> Result<Array2<f64>, PatternError> {
        let column_dist = Normal::new(self.normalization, column_sigma)
            .map_err(|_| PatternError::InvalidColumnSigma(column_sigma))?;

        let row_profile: Vec<f64> = (1..=rows)
            .map(|row| (row as f64).powf(row_slope))
            .collect();

        let mut region = Array2::<f64>::zeros((rows, columns));
        for mut column in region.columns_mut() {
            let level = draw_column_normalization(&column_dist, maximum, rng).ok_or(
                PatternError::RejectionSamplingExhausted {
                    mean: self.normalization,
                    sigma: column_sigma,
                    maximum,
                    draws: MAX_COLUMN_DRAWS,
                },
            )?;
            column
                .iter_mut()
                .zip(&row_profile)
                .for_each(|(pixel, scale)| *pixel = level * scale);
        }
        Ok(region)
    }
}

/// Resample until the level lies strictly inside `(0, maximum)`.
fn draw_column_normalization(
    dist: &Normal<f64>,
    maximum: f64,
    rng: &mut StdRng,
) -> Option<f64> {
    (0..MAX_COLUMN_DRAWS)
        .map(|_| dist.sample(rng))
        .find(|level| *level > 0.0 && *level < maximum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn region(y0: usize, y1: usize, x0: usize, x1: usize) -> Region {
        Region::new(y0, y1, x0, x1).unwrap()
    }

    #[test]
    fn test_uniform_pre_cti() {
        let pattern = CIPattern::uniform(10.0, vec![region(0, 2, 0, 2)]).unwrap();
        let image = pattern.ci_pre_cti_from((3, 3), None).unwrap();
        assert_eq!(
            image.data,
            array![[10.0, 10.0, 0.0], [10.0, 10.0, 0.0], [0.0, 0.0, 0.0]]
        );
        assert_eq!(image.seed, None);
    }

    #[test]
    fn test_uniform_multiple_regions() {
        let pattern =
            CIPattern::uniform(5.0, vec![region(0, 1, 0, 3), region(2, 3, 1, 2)]).unwrap();
        let image = pattern.ci_pre_cti_from((3, 3), None).unwrap();
        assert_eq!(image.data.sum(), 20.0);
        assert_eq!(image.data[[2, 1]], 5.0);
        assert_eq!(image.data[[1, 1]], 0.0);
    }

    #[test]
    fn test_pattern_outside_image() {
        let pattern = CIPattern::uniform(1.0, vec![region(0, 4, 0, 2)]).unwrap();
        assert!(matches!(
            pattern.ci_pre_cti_from((3, 3), None),
            Err(PatternError::OutsideImage { rows: 3, .. })
        ));
        assert!(pattern
            .check_pattern_is_within_image_dimensions((4, 2))
            .is_ok());
    }

    #[test]
    fn test_unsorted_and_overlapping_rejected() {
        assert!(matches!(
            CIPattern::uniform(1.0, vec![region(4, 6, 0, 2), region(0, 2, 0, 2)]),
            Err(PatternError::Unsorted { .. })
        ));
        assert!(matches!(
            CIPattern::uniform(1.0, vec![region(0, 3, 0, 2), region(2, 5, 0, 2)]),
            Err(PatternError::Overlapping { .. })
        ));
        assert_eq!(
            CIPattern::uniform(1.0, vec![]),
            Err(PatternError::NoRegions)
        );
    }

    #[test]
    fn test_side_by_side_regions_accepted() {
        let pattern =
            CIPattern::uniform(3.0, vec![region(0, 2, 0, 2), region(0, 2, 4, 6)]).unwrap();
        assert_eq!(pattern.rows_between_regions(), vec![0]);

        let image = pattern.ci_pre_cti_from((3, 6), None).unwrap();
        assert_eq!(
            image.data,
            array![
                [3.0, 3.0, 0.0, 0.0, 3.0, 3.0],
                [3.0, 3.0, 0.0, 0.0, 3.0, 3.0],
                [0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
            ]
        );

        // Overlap with a non-adjacent region is still caught.
        assert!(matches!(
            CIPattern::uniform(
                1.0,
                vec![region(0, 4, 0, 2), region(1, 2, 4, 6), region(3, 5, 1, 3)]
            ),
            Err(PatternError::Overlapping { .. })
        ));
    }

    #[test]
    fn test_rows_between_regions_and_minimum_extents() {
        let pattern = CIPattern::uniform(
            1.0,
            vec![region(1, 3, 0, 4), region(5, 9, 1, 4), region(10, 12, 0, 4)],
        )
        .unwrap();
        assert_eq!(pattern.rows_between_regions(), vec![2, 1]);
        assert_eq!(pattern.total_rows_min(), 2);
        assert_eq!(pattern.total_columns_min(), 3);
    }

    #[test]
    fn test_non_uniform_same_seed_is_identical() {
        let pattern = CIPattern::non_uniform(
            100.0,
            vec![region(0, 3, 0, 5), region(5, 8, 0, 5)],
            0.0,
            10.0,
            None,
        )
        .unwrap();
        let first = pattern.ci_pre_cti_from((10, 5), Some(1)).unwrap();
        let second = pattern.ci_pre_cti_from((10, 5), Some(1)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.seed, Some(1));

        let other = pattern.ci_pre_cti_from((10, 5), Some(2)).unwrap();
        assert_ne!(first.data, other.data);
    }

    #[test]
    fn test_non_uniform_regions_share_column_levels() {
        let pattern = CIPattern::non_uniform(
            100.0,
            vec![region(0, 2, 0, 4), region(4, 6, 0, 4)],
            0.0,
            5.0,
            None,
        )
        .unwrap();
        let image = pattern.ci_pre_cti_from((6, 4), Some(3)).unwrap();
        for column in 0..4 {
            assert_eq!(image.data[[0, column]], image.data[[4, column]]);
        }
    }

    #[test]
    fn test_non_uniform_row_power_law() {
        let pattern =
            CIPattern::non_uniform(50.0, vec![region(0, 3, 0, 2)], 0.5, 0.0, None).unwrap();
        let image = pattern.ci_pre_cti_from((3, 2), Some(0)).unwrap();
        for column in 0..2 {
            assert_relative_eq!(image.data[[0, column]], 50.0);
            assert_relative_eq!(image.data[[1, column]], 50.0 * 2f64.sqrt());
            assert_relative_eq!(image.data[[2, column]], 50.0 * 3f64.sqrt());
        }
    }

    #[test]
    fn test_non_uniform_respects_maximum() {
        let pattern =
            CIPattern::non_uniform(100.0, vec![region(0, 1, 0, 50)], 0.0, 30.0, Some(110.0))
                .unwrap();
        let image = pattern.ci_pre_cti_from((1, 50), Some(9)).unwrap();
        assert!(image.data.iter().all(|&v| v > 0.0 && v < 110.0));
    }

    #[test]
    fn test_non_uniform_impossible_bounds_exhaust() {
        let pattern =
            CIPattern::non_uniform(-10.0, vec![region(0, 1, 0, 1)], 0.0, 0.0, None).unwrap();
        assert!(matches!(
            pattern.ci_pre_cti_from((1, 1), Some(0)),
            Err(PatternError::RejectionSamplingExhausted { .. })
        ));
    }

    #[test]
    fn test_non_uniform_unseeded_records_seed() {
        let pattern =
            CIPattern::non_uniform(10.0, vec![region(0, 2, 0, 2)], 0.0, 1.0, None).unwrap();
        let image = pattern.ci_pre_cti_from((2, 2), None).unwrap();
        let seed = image.seed.expect("non-uniform image records its seed");
        let replay = pattern.ci_pre_cti_from((2, 2), Some(seed)).unwrap();
        assert_eq!(image.data, replay.data);
    }

    #[test]
    fn test_invalid_non_uniform_parameters() {
        assert_eq!(
            CIPattern::non_uniform(1.0, vec![region(0, 1, 0, 1)], 0.0, -1.0, None),
            Err(PatternError::InvalidColumnSigma(-1.0))
        );
        assert_eq!(
            CIPattern::non_uniform(1.0, vec![region(0, 1, 0, 1)], 0.0, 1.0, Some(0.0)),
            Err(PatternError::InvalidMaximumNormalization(0.0))
        );
    }

    #[test]
    fn test_pattern_json() {
        let json = r#"{
            "normalization": 20.0,
            "regions": [[0, 2, 0, 3]],
            "law": "non_uniform",
            "row_slope": -0.1,
            "column_sigma": 1.5
        }"#;
        let pattern: CIPattern = serde_json::from_str(json).unwrap();
        assert_eq!(
            pattern.law(),
            &NormalizationLaw::NonUniform {
                row_slope: -0.1,
                column_sigma: 1.5,
                maximum_normalization: None
            }
        );

        let unsorted = r#"{"normalization": 1.0, "regions": [[4, 5, 0, 1], [0, 1, 0, 1]], "law": "uniform"}"#;
        assert!(serde_json::from_str::<CIPattern>(unsorted).is_err());
    }
}
