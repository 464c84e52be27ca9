use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::torrent::ResourceDescriptor;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("no download engine available for '{name}' -> {}", .output.display())]
    Unavailable { name: String, output: PathBuf },
}

/// Fetches the content described by a `ResourceDescriptor` into `output`.
pub trait Downloader {
    fn download_to_file(
        &self,
        descriptor: &ResourceDescriptor,
        output: &Path,
    ) -> Result<(), DownloadError>;
}

/// Stand-in engine used until a peer-wire downloader is plugged in.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableDownloader;

impl Downloader for UnavailableDownloader {
    fn download_to_file(
        &self,
        descriptor: &ResourceDescriptor,
        output: &Path,
    ) -> Result<(), DownloadError> {
        Err(DownloadError::Unavailable {
            name: descriptor.name.clone(),
            output: output.to_path_buf(),
        })
    }
}
