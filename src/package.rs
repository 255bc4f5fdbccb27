//! # Packaging and Publishing
//!
//! `package` bundles the role into `dist/<name>-<version>.tgz`: a gzipped tar
//! of every indexed file, generated artifacts included, stored under a
//! `<name>/` prefix so the archive unpacks into a role directory.
//!
//! `publish` uploads that archive with an HTTP `PUT`. When the repository URL
//! ends with `/` it is treated as a collection and the archive basename is
//! appended.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use url::Url;

use crate::defaults::{build_dir, ARCHIVE_EXT};
use crate::error::{Error, Result};

/// `<name>-<version>.tgz`
pub fn archive_name(name: &str, version: &str) -> String {
    format!("{}-{}.{}", name, version, ARCHIVE_EXT)
}

/// Archive location under the build directory of `root`.
pub fn archive_path(root: &Path, name: &str, version: &str) -> PathBuf {
    build_dir(root).join(archive_name(name, version))
}

/// Write a gzipped tar of `files` (relative to `root`) to `dest`, each entry
/// stored under `prefix/`.
pub fn create_archive(root: &Path, prefix: &str, files: &[PathBuf], dest: &Path) -> Result<()> {
    let package_error = |e: std::io::Error| Error::Package {
        path: dest.to_path_buf(),
        message: e.to_string(),
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(package_error)?;
    }
    log::info!("packaging {} files into {}", files.len(), dest.display());

    let file = File::create(dest).map_err(package_error)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for relative in files {
        let name = Path::new(prefix).join(relative);
        log::debug!("adding {}", name.display());
        builder
            .append_path_with_name(root.join(relative), &name)
            .map_err(package_error)?;
    }
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(package_error)?;
    Ok(())
}

/// Parse a repository URL, accepting HTTP(S) only.
pub fn repository_url(repository: &str) -> Result<Url> {
    let base = Url::parse(repository)?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(Error::Network {
            url: repository.to_string(),
            message: format!("unsupported scheme '{}'", base.scheme()),
        });
    }
    Ok(base)
}

/// Resolve the upload URL of `archive` against `repository`.
pub fn upload_url(repository: &str, archive: &Path) -> Result<Url> {
    let base = repository_url(repository)?;
    if !repository.ends_with('/') {
        return Ok(base);
    }
    let basename = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Package {
            path: archive.to_path_buf(),
            message: "archive has no file name".to_string(),
        })?;
    Ok(base.join(&basename)?)
}

/// Upload `archive` to `repository` with an HTTP PUT.
pub fn upload(archive: &Path, repository: &str, timeout: Duration) -> Result<Url> {
    let url = upload_url(repository, archive)?;
    let network_error = |message: String| Error::Network {
        url: url.to_string(),
        message,
    };

    let body = fs::read(archive).map_err(|e| Error::Package {
        path: archive.to_path_buf(),
        message: e.to_string(),
    })?;

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| network_error(format!("Failed to create HTTP client: {}", e)))?;

    log::info!("uploading {} to {}", archive.display(), url);
    let response = client
        .put(url.clone())
        .header(reqwest::header::CONTENT_TYPE, "application/gzip")
        .body(body)
        .send()
        .map_err(|e| {
            if e.is_timeout() {
                network_error(format!("timed out after {}s", timeout.as_secs()))
            } else if e.is_connect() {
                network_error(format!("Connection failed: {}", e))
            } else {
                network_error(format!("HTTP request failed: {}", e))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(network_error(format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )));
    }
    Ok(url)
}
