//! Archive builder: one directory in, one `tar.gz` out.
//!
//! The archive is written under `{destination}.partial` and renamed into place
//! only once the gzip stream is finished and synced. A failed build never
//! leaves a file at `destination`.

use std::fs::{File, FileType};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use log::{debug, error, warn};
use walkdir::WalkDir;

use crate::domain::{ArchiveArtifact, BuildError};

const PARTIAL_SUFFIX: &str = "partial";

/// Path the builder writes to before the final rename.
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Compress `source_dir` into a gzip-compressed tar at `destination`.
///
/// Entries are rooted at `source_dir`'s base name, so extracting the archive
/// reproduces the directory under its own name. Symlinks are stored as links.
/// Sockets are skipped with a warning; anything unreadable fails the build.
pub fn build_archive(source_dir: &Path, destination: &Path) -> Result<ArchiveArtifact, BuildError> {
    let root_name = source_dir
        .file_name()
        .ok_or_else(|| BuildError::InvalidSource(source_dir.to_path_buf()))?;

    debug!(
        "Compressing: [{}] to: [{}]",
        source_dir.display(),
        destination.display()
    );

    let partial = partial_path(destination);
    let result = write_tar_gz(source_dir, Path::new(root_name), &partial)
        .and_then(|()| std::fs::rename(&partial, destination));

    match result {
        Ok(()) => Ok(ArchiveArtifact::new(destination)),
        Err(source) => {
            discard_partial(&partial);
            Err(BuildError::Io {
                source_dir: source_dir.to_path_buf(),
                destination: destination.to_path_buf(),
                source,
            })
        }
    }
}

fn write_tar_gz(source_dir: &Path, root_name: &Path, out: &Path) -> io::Result<()> {
    let file = File::create(out)?;
    let encoder = GzEncoder::new(file, Compression::default());

    let mut tar = tar::Builder::new(encoder);
    tar.follow_symlinks(false);
    for entry in WalkDir::new(source_dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.depth() == 0 {
            tar.append_dir(root_name, entry.path())?;
            continue;
        }
        if !is_archivable(&entry.file_type()) {
            warn!(
                "Skipping [{}]: this file type cannot be archived",
                entry.path().display()
            );
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(io::Error::other)?;
        tar.append_path_with_name(entry.path(), root_name.join(relative))?;
    }

    let encoder = tar.into_inner()?;
    let mut file = encoder.finish()?;
    file.flush()?;
    file.sync_all()
}

// tar has no header type for sockets.
#[cfg(unix)]
fn is_archivable(file_type: &FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    !file_type.is_socket()
}

#[cfg(not(unix))]
fn is_archivable(file_type: &FileType) -> bool {
    file_type.is_dir() || file_type.is_file() || file_type.is_symlink()
}

fn discard_partial(partial: &Path) {
    match std::fs::remove_file(partial) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => error!(
            "Cannot remove partial archive [{}], the file leaks: {}",
            partial.display(),
            e
        ),
    }
}
