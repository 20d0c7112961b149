//! Artifact download and naming.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::client::YourMusicClient;
use crate::config::ArtifactNaming;
use crate::error::{GenerationError, Result};
use crate::logging;
use crate::modules::status::JobItem;
use crate::utils::{sanitize_file_stem, write_bytes};

/// Item fields that may carry the download URL, highest priority first.
pub const URL_FIELDS: &[&str] = &["audio_url", "url", "audioUrl", "downloadUrl"];

/// A song written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactFile {
    pub path: PathBuf,
    pub filename: String,
    pub bytes: u64,
}

/// First non-empty URL field of an item, in `URL_FIELDS` order.
#[must_use]
pub fn resolve_url(item: &JobItem) -> Option<&str> {
    URL_FIELDS.iter().find_map(|field| item.str_field(field))
}

/// `{title}{index}.{ext}`, with the fallback label standing in for a missing title.
#[must_use]
pub fn artifact_filename(title: Option<&str>, index: usize, naming: &ArtifactNaming) -> String {
    let stem = title
        .map(sanitize_file_stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| sanitize_file_stem(&naming.fallback_label));
    format!("{stem}{index}.{}", naming.extension)
}

/// Download every item that has a URL into `output_dir`.
///
/// Items without a URL are skipped. The first failed download aborts the
/// rest; files already written stay on disk. Existing files with the same
/// name are overwritten.
pub async fn download_artifacts(
    client: &YourMusicClient,
    items: &[JobItem],
    output_dir: &Path,
    naming: &ArtifactNaming,
) -> Result<Vec<ArtifactFile>> {
    let mut saved = Vec::new();

    for (position, item) in items.iter().enumerate() {
        let Some(url) = resolve_url(item) else {
            logging::warn(format!(
                "Skipping item {}: no download URL in response",
                position + 1
            ));
            tracing::warn!(item = position + 1, "item has no download URL");
            continue;
        };

        let bytes = client.get_bytes(url).await?;
        let filename = artifact_filename(item.title(), saved.len() + 1, naming);
        let path = output_dir.join(&filename);
        write_bytes(&path, &bytes)?;

        logging::info(format!("Saved {} ({} bytes)", path.display(), bytes.len()));
        saved.push(ArtifactFile {
            path,
            filename,
            bytes: bytes.len() as u64,
        });
    }

    if saved.is_empty() {
        return Err(GenerationError::NoArtifactsProduced);
    }
    Ok(saved)
}
