//! Local persistence of generated images.
//!
//! Each result is written as `<stem>.png` plus a `<stem>.json` metadata
//! sidecar under the configured output directory. The gallery listing
//! is just a directory scan over those pairs -- no database.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tokio::fs;

/// Upper bound on gallery listing size.
pub const GALLERY_LIMIT: usize = 50;

/// One saved image as presented by `GET /gallery`.
#[derive(Debug, Serialize)]
pub struct GalleryEntry {
    pub filename: String,
    /// Serving path under the static `/outputs` mount.
    pub url: String,
    /// Unix mtime in seconds.
    pub created: f64,
    /// Sidecar metadata; empty object when the sidecar is missing or
    /// unreadable.
    pub metadata: Value,
}

/// Filesystem-backed store for generated images.
#[derive(Clone)]
pub struct Gallery {
    dir: PathBuf,
}

impl Gallery {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory the images live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Persist one image plus its metadata sidecar.
    ///
    /// Returns the generated filename. Stems are timestamped to
    /// millisecond precision, so concurrent saves do not collide in
    /// practice.
    pub async fn save(&self, bytes: &[u8], metadata: &Value) -> std::io::Result<String> {
        let stem = format!("flux_{}", chrono::Local::now().format("%Y%m%d_%H%M%S%3f"));
        let filename = format!("{stem}.png");

        fs::write(self.dir.join(&filename), bytes).await?;

        let sidecar = serde_json::to_vec_pretty(metadata).unwrap_or_else(|_| b"{}".to_vec());
        fs::write(self.dir.join(format!("{stem}.json")), sidecar).await?;

        Ok(filename)
    }

    /// List saved images, newest first, capped at [`GALLERY_LIMIT`].
    ///
    /// Timestamped stems make the filename ordering chronological.
    pub async fn list(&self) -> std::io::Result<Vec<GalleryEntry>> {
        let mut entries = Vec::new();
        let mut reader = match fs::read_dir(&self.dir).await {
            Ok(reader) => reader,
            // A missing directory is an empty gallery, not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e),
        };

        while let Some(entry) = reader.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let created = entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);

            let metadata = match fs::read(path.with_extension("json")).await {
                Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|_| Value::Object(Default::default())),
                Err(_) => Value::Object(Default::default()),
            };

            entries.push(GalleryEntry {
                url: format!("/outputs/{filename}"),
                filename: filename.to_string(),
                created,
                metadata,
            });
        }

        entries.sort_by(|a, b| b.filename.cmp(&a.filename));
        entries.truncate(GALLERY_LIMIT);
        Ok(entries)
    }

    /// Delete one image and its sidecar.
    ///
    /// Returns `Ok(true)` when the image existed, `Ok(false)` when it
    /// did not. The filename must be a plain `.png` name -- anything that
    /// looks like a path is rejected as not-found rather than resolved.
    pub async fn delete(&self, filename: &str) -> std::io::Result<bool> {
        if !is_safe_image_name(filename) {
            return Ok(false);
        }

        let path = self.dir.join(filename);
        match fs::remove_file(&path).await {
            Ok(()) => {
                // Sidecar removal is best-effort; a stray sidecar is
                // invisible to the listing.
                let _ = fs::remove_file(path.with_extension("json")).await;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// A bare `.png` filename with no path components.
fn is_safe_image_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && !name.contains("..")
        && name.ends_with(".png")
}
