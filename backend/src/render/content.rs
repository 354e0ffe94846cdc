//! Storage for rendered slides.
//!
//! Outputs are addressed as `<carousel_id>/slide_<order>.png` and written
//! through a temp file in the same directory, so readers never see a
//! partial PNG.

use crate::error::{ServiceError, ServiceResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Storage for rendered slide images, addressed by (carousel id, slide order).
pub trait ContentStore: Send + Sync {
    /// Stores `bytes` and returns the public location of the output.
    fn put_output(&self, carousel_id: &str, slide_order: u32, bytes: &[u8]) -> ServiceResult<String>;

    fn get_output(&self, carousel_id: &str, slide_order: u32) -> ServiceResult<Vec<u8>>;
}

/// Public location of a slide output, served by `services::output`.
pub fn output_location(carousel_id: &str, slide_order: u32) -> String {
    format!("/output/{}/{}", carousel_id, output_file_name(slide_order))
}

pub fn output_file_name(slide_order: u32) -> String {
    format!("slide_{}.png", slide_order)
}

/// Parses `slide_<n>.png` back into its order index.
pub fn parse_output_file_name(name: &str) -> Option<u32> {
    name.strip_prefix("slide_")?.strip_suffix(".png")?.parse().ok()
}

/// Keeps outputs as `<root>/<carousel id>/slide_<order>.png`.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> ServiceResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(FsContentStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn carousel_dir(&self, carousel_id: &str) -> ServiceResult<PathBuf> {
        // Only ids we generated ever reach the filesystem.
        let id = Uuid::parse_str(carousel_id)
            .map_err(|_| ServiceError::NotFound(format!("carousel {}", carousel_id)))?;
        Ok(self.root.join(id.hyphenated().to_string()))
    }
}

impl ContentStore for FsContentStore {
    fn put_output(&self, carousel_id: &str, slide_order: u32, bytes: &[u8]) -> ServiceResult<String> {
        let dir = self.carousel_dir(carousel_id)?;
        fs::create_dir_all(&dir)?;

        // Write next to the target and rename so readers never see half a PNG.
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(dir.join(output_file_name(slide_order)))
            .map_err(|e| ServiceError::Persistence(e.to_string()))?;

        Ok(output_location(carousel_id, slide_order))
    }

    fn get_output(&self, carousel_id: &str, slide_order: u32) -> ServiceResult<Vec<u8>> {
        let path = self
            .carousel_dir(carousel_id)?
            .join(output_file_name(slide_order));
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServiceError::NotFound(
                format!("output {}/{}", carousel_id, output_file_name(slide_order)),
            )),
            Err(e) => Err(e.into()),
        }
    }
}
