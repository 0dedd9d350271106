//! Per-job scratch directory holding the unpacked résumé archive.
//!
//! The directory belongs to exactly one job. `cleanup` removes it at the end
//! of the job; if the job task panics instead, the `TempDir` drop guard does.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::extract::is_supported;

const MACOS_METADATA_DIR: &str = "__MACOSX";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("filesystem error")]
    Io(#[from] std::io::Error),

    #[error("invalid zip archive")]
    Archive(#[from] zip::result::ZipError),

    #[error("archive expands to {total} bytes, over the {limit} byte limit")]
    TooLarge { total: u64, limit: u64 },
}

#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
    files: Vec<PathBuf>,
}

impl JobWorkspace {
    /// Unpacks `archive` into a fresh directory under `parent` and lists the
    /// résumé files it contains, sorted by path.
    ///
    /// Archives whose members declare more than `max_unpacked_bytes` in total
    /// are refused before anything touches the disk.
    pub fn unpack(
        archive: &[u8],
        parent: &Path,
        max_unpacked_bytes: u64,
    ) -> Result<Self, WorkspaceError> {
        let mut zip = ZipArchive::new(Cursor::new(archive))?;
        let mut total: u64 = 0;
        for i in 0..zip.len() {
            total = total.saturating_add(zip.by_index_raw(i)?.size());
        }
        if total > max_unpacked_bytes {
            return Err(WorkspaceError::TooLarge {
                total,
                limit: max_unpacked_bytes,
            });
        }

        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix("temp_resumes_")
            .tempdir_in(parent)?;

        zip.extract(dir.path())?;

        let mut files = Vec::new();
        collect_resume_files(dir.path(), &mut files)?;
        files.sort();

        Ok(Self { dir, files })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Deletes the unpacked files and the directory. Failures are logged and
    /// otherwise ignored.
    pub fn cleanup(self) {
        for file in &self.files {
            if let Err(e) = std::fs::remove_file(file) {
                debug!(file = %file.display(), "Could not remove résumé file: {e}");
            }
        }

        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(dir = %path.display(), "Removed job workspace"),
            Err(e) => warn!(dir = %path.display(), "Could not remove job workspace: {e}"),
        }
    }
}

fn collect_resume_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name == MACOS_METADATA_DIR {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_resume_files(&path, out)?;
        } else if file_type.is_file() && is_supported(&path) {
            out.push(path);
        }
    }
    Ok(())
}
