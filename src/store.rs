use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::Dataset;
use crate::error::RedmineError;

/// Mode of written dataset files; temp files start out owner-only.
#[cfg(unix)]
const DATASET_FILE_MODE: u32 = 0o644;

/// Directory receiving one JSON file per dataset.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: Utf8PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Creates the directory; an existing directory is left as is.
    pub fn ensure_root(&self) -> Result<(), RedmineError> {
        match fs::create_dir(self.root.as_std_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && self.root.is_dir() => Ok(()),
            Err(source) => Err(RedmineError::OutputDir {
                path: self.root.clone().into_std_path_buf(),
                source,
            }),
        }
    }

    pub fn dataset_path(&self, dataset: &Dataset) -> Utf8PathBuf {
        self.root.join(dataset.file_name())
    }

    /// Writes the dataset through a temp file so a failed write leaves no partial file.
    pub fn write_dataset(&self, dataset: &Dataset) -> Result<Utf8PathBuf, RedmineError> {
        let path = self.dataset_path(dataset);
        let content = serde_json::to_vec_pretty(dataset)
            .map_err(|err| RedmineError::Serialize(err.to_string()))?;

        let mut temp = Builder::new()
            .prefix(".redmine-datasets")
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| RedmineError::Filesystem(err.to_string()))?;
        temp.write_all(&content)
            .and_then(|_| temp.write_all(b"\n"))
            .map_err(|err| RedmineError::Filesystem(format!("write {path}: {err}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(fs::Permissions::from_mode(DATASET_FILE_MODE))
                .map_err(|err| RedmineError::Filesystem(format!("chmod {path}: {err}")))?;
        }
        temp.persist(path.as_std_path())
            .map_err(|err| RedmineError::Filesystem(format!("persist {path}: {}", err.error)))?;
        Ok(path)
    }

    pub fn read_dataset(path: &Utf8Path) -> Result<Dataset, RedmineError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| RedmineError::Filesystem(format!("read {path}: {err}")))?;
        serde_json::from_str(&content).map_err(|err| RedmineError::Serialize(err.to_string()))
    }
}
