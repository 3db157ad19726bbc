//! JSON persistence shared by the configuration types.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Error, ErrorKind};
use std::path::Path;

/// Write `value` to `path` as pretty-printed JSON.
pub(crate) fn save_to_file<T: Serialize>(value: &T, path: &Path) -> Result<(), Error> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
    std::fs::write(path, json)
}

/// Read `path` as JSON; parse and validation failures map to `InvalidData`.
pub(crate) fn load_from_file<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let json = std::fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::PixelWindow;

    #[test]
    fn test_round_trip_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.json");

        let window = PixelWindow::new(2, 7).unwrap();
        save_to_file(&window, &path).unwrap();
        assert_eq!(load_from_file::<PixelWindow>(&path).unwrap(), window);

        std::fs::write(&path, "[7, 2]").unwrap();
        let err = load_from_file::<PixelWindow>(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        let missing = load_from_file::<PixelWindow>(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }
}
