use std::io::Read as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use url::Url;

use crate::descriptor::ArtifactDescriptor;
use crate::error::DownloadError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
    /// Older files of the same artifact deleted after the download.
    pub removed: Vec<PathBuf>,
}

/// `<lib_dir>/<group path>/<artifactId>/<file name>`
pub fn artifact_path(lib_dir: &Path, d: &ArtifactDescriptor) -> PathBuf {
    let mut path = lib_dir.to_path_buf();
    for seg in d.group_id().split('.') {
        path.push(seg);
    }
    path.push(d.artifact_id());
    path.push(d.file_name());
    path
}

pub fn download_artifact(
    url: &str,
    lib_dir: &Path,
    d: &ArtifactDescriptor,
) -> Result<FetchedArtifact> {
    let out = artifact_path(lib_dir, d);
    let dir = out
        .parent()
        .with_context(|| format!("artifact path has no parent: {}", out.display()))?;
    std::fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;

    let bytes = fetch_bytes(url)?;

    let file_name = d.file_name();
    let tmp = dir.join(format!(".{file_name}.download.tmp"));
    std::fs::write(&tmp, &bytes).with_context(|| format!("write {}", tmp.display()))?;
    if let Err(err) = std::fs::rename(&tmp, &out) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("rename {} -> {}", tmp.display(), out.display()));
    }

    let removed = prune_stale(dir, d.artifact_id(), d.artifact_type(), &file_name)?;
    Ok(FetchedArtifact {
        path: out,
        sha256: sha256_hex(&bytes),
        size_bytes: bytes.len() as u64,
        removed,
    })
}

/// Deletes regular files in `dir` whose names start with `artifact_id` and end
/// with `.<artifact_type>`, except `keep`.
pub fn prune_stale(
    dir: &Path,
    artifact_id: &str,
    artifact_type: &str,
    keep: &str,
) -> Result<Vec<PathBuf>> {
    let suffix = format!(".{artifact_type}");
    let mut removed = Vec::new();
    let entries = std::fs::read_dir(dir).with_context(|| format!("read dir: {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read dir entry: {}", dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name == keep || !name.starts_with(artifact_id) || !name.ends_with(&suffix) {
            continue;
        }
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        std::fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        removed.push(path);
    }
    removed.sort();
    Ok(removed)
}

/// Fetches `url` over http(s), or reads it from disk for `file://` URLs.
pub fn fetch_bytes(url: &str) -> Result<Vec<u8>, DownloadError> {
    let parsed = Url::parse(url).map_err(|e| DownloadError::new(url, format!("invalid url: {e}")))?;
    match parsed.scheme() {
        "file" => {
            let path = parsed
                .to_file_path()
                .map_err(|_| DownloadError::new(url, "file url could not be converted to a path"))?;
            std::fs::read(&path)
                .map_err(|e| DownloadError::new(url, format!("read {}: {e}", path.display())))
        }
        "http" | "https" => {
            let resp = ureq::get(parsed.as_str()).call().map_err(|e| match e {
                ureq::Error::StatusCode(code) => DownloadError::new(url, format!("HTTP {code}")),
                other => DownloadError::new(url, other.to_string()),
            })?;
            let mut reader = resp.into_body().into_reader();
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .map_err(|e| DownloadError::new(url, format!("read http response: {e}")))?;
            Ok(buf)
        }
        other => Err(DownloadError::new(
            url,
            format!("unsupported url scheme {other:?}"),
        )),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    let digest = h.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
