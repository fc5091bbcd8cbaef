#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use tempfile::{TempDir, tempdir};

/// A small monthly resident-registration export in the shape the dashboard expects.
pub const POPULATION_CSV: &str = "\
기간,시도명,시군구명,성별,연령대,총인구수,세대수
202401,서울특별시,종로구,남,20~29세,\"1,000\",400
202401,서울특별시,종로구,여,20~29세,900,380
202401,부산광역시,해운대구,남,30~39세,700,300
202402,서울특별시,중구,여,30~39세,650,
202402,부산광역시,해운대구,여,20~29세,bad,310
invalid,대구광역시,수성구,남,20~29세,500,200
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` as UTF-8 without a byte-order mark.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    /// Writes raw bytes under the workspace and returns the path.
    pub fn write_bytes(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, bytes).expect("write temp file contents");
        path
    }

    /// Writes `contents` transcoded to `encoding`, optionally behind a UTF-8 byte-order mark.
    pub fn write_encoded(
        &self,
        name: &str,
        contents: &str,
        encoding: &'static Encoding,
        with_bom: bool,
    ) -> PathBuf {
        let (encoded, _, had_errors) = encoding.encode(contents);
        assert!(!had_errors, "contents not representable in {}", encoding.name());
        let mut bytes = Vec::new();
        if with_bom {
            bytes.extend_from_slice(b"\xEF\xBB\xBF");
        }
        bytes.extend_from_slice(&encoded);
        self.write_bytes(name, &bytes)
    }
}
