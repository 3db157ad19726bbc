//! JSON configuration tying a frame shape, its geometry, the injected pattern
//! and the mask settings together.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geometry::FrameGeometry;
use crate::json;
use crate::layout::Layout2DCI;
use crate::mask::SettingsMask2D;
use crate::pattern::{CIPattern, PatternError};

/// Everything needed to describe one charge-injection calibration frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CIConfig {
    /// Frame shape as `(rows, columns)`.
    pub shape_2d: (usize, usize),
    pub geometry: FrameGeometry,
    pub pattern: CIPattern,
    #[serde(default)]
    pub mask: SettingsMask2D,
}

impl CIConfig {
    /// Layout of the configured frame, checking the pattern fits it.
    pub fn layout(&self) -> Result<Layout2DCI, PatternError> {
        Layout2DCI::from_pattern(self.shape_2d, &self.pattern, self.geometry.clone())
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        json::save_to_file(self, path)
    }

    /// Read a configuration; malformed or invalid content is `InvalidData`.
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        json::load_from_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Orientation;
    use crate::pattern::NormalizationLaw;
    use crate::region::{PixelWindow, Region};

    const CONFIG_JSON: &str = r#"{
        "shape_2d": [12, 6],
        "geometry": {
            "orientation": "top_right",
            "serial_prescan": [0, 12, 5, 6]
        },
        "pattern": {
            "normalization": 100.0,
            "regions": [[1, 4, 0, 5], [7, 10, 0, 5]],
            "law": "non_uniform",
            "row_slope": -0.1,
            "column_sigma": 5.0
        },
        "mask": {
            "parallel_fpr_pixels": [0, 2]
        }
    }"#;

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ci.json");
        std::fs::write(&path, CONFIG_JSON).unwrap();

        let config = CIConfig::load_from_file(&path).unwrap();
        assert_eq!(config.shape_2d, (12, 6));
        assert_eq!(config.geometry.orientation, Orientation::TopRight);
        assert_eq!(config.geometry.serial_overscan, None);
        assert_eq!(
            config.pattern.law(),
            &NormalizationLaw::NonUniform {
                row_slope: -0.1,
                column_sigma: 5.0,
                maximum_normalization: None,
            }
        );
        assert_eq!(config.mask.parallel_fpr_pixels, PixelWindow::new(0, 2).ok());
        assert_eq!(config.mask.cosmic_ray_diagonal_buffer, 3);

        let layout = config.layout().unwrap();
        assert_eq!(layout.region_list().len(), 2);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ci.json");
        let config = CIConfig {
            shape_2d: (5, 5),
            geometry: FrameGeometry::bare(Orientation::BottomLeft),
            pattern: CIPattern::uniform(10.0, vec![Region::new(0, 2, 0, 2).unwrap()]).unwrap(),
            mask: SettingsMask2D::default(),
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(CIConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_pattern_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ci.json");
        let unsorted = CONFIG_JSON.replace("[[1, 4, 0, 5], [7, 10, 0, 5]]", "[[7, 10, 0, 5], [1, 4, 0, 5]]");
        std::fs::write(&path, unsorted).unwrap();

        let err = CIConfig::load_from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_layout_rejects_pattern_larger_than_frame() {
        let config = CIConfig {
            shape_2d: (3, 3),
            geometry: FrameGeometry::bare(Orientation::BottomLeft),
            pattern: CIPattern::uniform(1.0, vec![Region::new(0, 4, 0, 2).unwrap()]).unwrap(),
            mask: SettingsMask2D::default(),
        };
        assert!(matches!(
            config.layout(),
            Err(PatternError::OutsideImage { .. })
        ));
    }
}
