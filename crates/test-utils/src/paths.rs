//! Scratch directories for tests that touch the filesystem.

use std::path::PathBuf;

use tempfile::TempDir;

use crate::wrfout::WrfoutSpec;

/// Fresh scratch directory, removed when the handle drops.
pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().expect("create scratch dir")
}

/// Write `spec` into a fresh scratch directory and return both.
///
/// The file takes the name a real run would carry
/// (`wrfout_d01_<run key>`) so code that reads the domain out of the
/// file name sees the shape it expects. Keep the `TempDir` alive for
/// as long as the file is needed.
pub fn scratch_wrfout(spec: &WrfoutSpec) -> (TempDir, PathBuf) {
    let dir = scratch_dir();
    let path = dir.path().join(spec.file_name());
    spec.write(&path).expect("write synthetic wrfout");
    (dir, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_wrfout_names_the_file_for_its_run() {
        let spec = WrfoutSpec::default()
            .with_times(1)
            .with_grid(2, 3, 3)
            .with_start("2024-11-02_06:00:00");
        let (_dir, path) = scratch_wrfout(&spec);
        assert!(path.exists());
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "wrfout_d01_2024-11-02_06_00_00"
        );
    }
}
