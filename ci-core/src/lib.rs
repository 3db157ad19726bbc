//! Region algebra and extraction for CCD charge-injection frames.
//!
//! This crate holds the frame-level building blocks used to calibrate charge
//! transfer inefficiency: rectangular regions, orientation-aware geometry,
//! charge-injection patterns, FPR/EPER extractors and the masks built from
//! them. Fitting lives in `ci-fit`.

pub mod config;
pub mod extract;
pub mod geometry;
mod json;
pub mod layout;
pub mod mask;
pub mod masked;
pub mod pattern;
pub mod region;

pub use config::CIConfig;
pub use extract::{ExtractError, Extractor, Extractor2D, ExtractorKind};
pub use geometry::{FrameGeometry, Orientation};
pub use layout::Layout2DCI;
pub use mask::{Mask2D, SettingsMask2D};
pub use masked::MaskedArray2;
pub use pattern::{CIPattern, NormalizationLaw, PatternError, PreCtiImage};
pub use region::{PixelWindow, Region, RegionError};
