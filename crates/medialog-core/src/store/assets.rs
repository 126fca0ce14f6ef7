//! Materializing image references into a record's `assets/` folder

use futures::future::join_all;
use percent_encoding::percent_decode_str;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::{Error, Result};
use crate::store::ASSETS_DIR;

/// Outcome of resolving a record's image list
#[derive(Debug, Default)]
pub struct ResolvedAssets {
    /// Final paths relative to the record folder, in submission order.
    /// A single empty string when nothing resolved.
    pub paths: Vec<String>,
    /// One entry per image that could not be fetched or copied
    pub failures: Vec<Error>,
}

impl ResolvedAssets {
    /// The "no image" placeholder list
    pub fn placeholder() -> Vec<String> {
        vec![String::new()]
    }
}

/// Where an image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum AssetSource {
    Remote(Url),
    Local(PathBuf),
}

/// One planned image: where it comes from and the file name it will get
#[derive(Debug)]
struct PlannedAsset {
    reference: String,
    source: AssetSource,
    file_name: String,
}

/// Downloads remote images and copies local ones into a record folder
#[derive(Debug, Clone, Default)]
pub struct AssetResolver {
    http: reqwest::Client,
}

impl AssetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Materialize every reference into `record_dir/assets/`.
    ///
    /// All items run concurrently; each failure is reported on its own and
    /// never prevents the other images from resolving. Relative local paths
    /// are taken relative to `record_dir`, so already-stored images
    /// (`assets/cover.jpg`) are kept without copying.
    pub async fn resolve(&self, references: &[String], record_dir: &Path) -> ResolvedAssets {
        let planned = plan(references, record_dir);
        if planned.is_empty() {
            return ResolvedAssets {
                paths: ResolvedAssets::placeholder(),
                failures: Vec::new(),
            };
        }

        let assets_dir = record_dir.join(ASSETS_DIR);
        if let Err(e) = tokio::fs::create_dir_all(&assets_dir).await {
            tracing::warn!("Cannot create {}: {}", assets_dir.display(), e);
        }

        let results = join_all(
            planned
                .iter()
                .map(|item| self.materialize(item, &assets_dir)),
        )
        .await;

        let mut resolved = ResolvedAssets::default();
        for (item, result) in planned.iter().zip(results) {
            match result {
                Ok(()) => resolved
                    .paths
                    .push(format!("{}/{}", ASSETS_DIR, item.file_name)),
                Err(e) => {
                    tracing::warn!("Image '{}' skipped: {}", item.reference, e);
                    resolved.failures.push(e);
                }
            }
        }

        if resolved.paths.is_empty() {
            resolved.paths = ResolvedAssets::placeholder();
        }
        resolved
    }

    async fn materialize(&self, item: &PlannedAsset, assets_dir: &Path) -> Result<()> {
        let dest = assets_dir.join(&item.file_name);
        match &item.source {
            AssetSource::Remote(url) => {
                let result = self.download(url, &dest).await;
                if result.is_err() {
                    let _ = tokio::fs::remove_file(&dest).await;
                }
                result
            }
            AssetSource::Local(path) => {
                if same_file(path, &dest) {
                    return Ok(());
                }
                tokio::fs::copy(path, &dest)
                    .await
                    .map(|_| ())
                    .map_err(|e| Error::AssetCopyFailed {
                        source_path: item.reference.clone(),
                        reason: e.to_string(),
                    })
            }
        }
    }

    /// Stream a remote image to `dest`
    async fn download(&self, url: &Url, dest: &Path) -> Result<()> {
        let failed = |reason: String| Error::AssetDownloadFailed {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .http
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| failed(e.to_string()))?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| failed(e.to_string()))?;

        while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
            file.write_all(&chunk)
                .await
                .map_err(|e| failed(e.to_string()))?;
        }
        file.flush().await.map_err(|e| failed(e.to_string()))?;

        tracing::debug!("Downloaded {} -> {}", url, dest.display());
        Ok(())
    }
}

/// Classify references and give each one a unique file name.
///
/// Images already stored in `assets/` keep their names, and new images are
/// named around them.
fn plan(references: &[String], record_dir: &Path) -> Vec<PlannedAsset> {
    let assets_dir = record_dir.join(ASSETS_DIR);
    let classified: Vec<(&str, AssetSource, String, bool)> = references
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .map(|reference| {
            let source = classify(reference, record_dir);
            let base = match &source {
                AssetSource::Remote(url) => url_basename(url),
                AssetSource::Local(path) => path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "image".to_string()),
            };
            let stored = matches!(
                &source,
                AssetSource::Local(path) if same_file(path, &assets_dir.join(&base))
            );
            (reference, source, base, stored)
        })
        .collect();

    let mut used: HashSet<String> = classified
        .iter()
        .filter(|(_, _, _, stored)| *stored)
        .map(|(_, _, base, _)| base.clone())
        .collect();

    classified
        .into_iter()
        .map(|(reference, source, base, stored)| {
            let file_name = if stored { base } else { unique_name(&base, &mut used) };
            PlannedAsset {
                reference: reference.to_string(),
                source,
                file_name,
            }
        })
        .collect()
}

fn classify(reference: &str, record_dir: &Path) -> AssetSource {
    if let Ok(url) = Url::parse(reference) {
        if matches!(url.scheme(), "http" | "https") {
            return AssetSource::Remote(url);
        }
        if url.scheme() == "file" {
            if let Ok(path) = url.to_file_path() {
                return AssetSource::Local(path);
            }
        }
    }

    let path = PathBuf::from(reference);
    if path.is_absolute() {
        AssetSource::Local(path)
    } else {
        AssetSource::Local(record_dir.join(path))
    }
}

/// Last non-empty path segment of a URL, percent-decoded
fn url_basename(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| {
            let decoded = percent_decode_str(s).decode_utf8_lossy();
            crate::utils::strip_forbidden(&decoded)
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string())
}

/// `cover.jpg`, then `cover-1.jpg`, `cover-2.jpg`, ...
fn unique_name(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    };
    let mut n = 1;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{}-{}.{}", stem, n, ext),
            None => format!("{}-{}", stem, n),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_url_basename() {
        let url = Url::parse("https://cdn.example.com/images/covers/bebop%20cover.jpg?x=1").unwrap();
        assert_eq!(url_basename(&url), "bebop cover.jpg");

        let bare = Url::parse("https://example.com/").unwrap();
        assert_eq!(url_basename(&bare), "image");

        let encoded = Url::parse("https://example.com/%E6%B8%A1%E8%BE%BA.png").unwrap();
        assert_eq!(url_basename(&encoded), "渡辺.png");

        let slashed = Url::parse("https://example.com/a%2Fb%3F.jpg").unwrap();
        assert_eq!(url_basename(&slashed), "ab.jpg");
    }

    #[test]
    fn test_unique_names() {
        let mut used = HashSet::new();
        assert_eq!(unique_name("cover.jpg", &mut used), "cover.jpg");
        assert_eq!(unique_name("cover.jpg", &mut used), "cover-1.jpg");
        assert_eq!(unique_name("cover.jpg", &mut used), "cover-2.jpg");
        assert_eq!(unique_name("README", &mut used), "README");
        assert_eq!(unique_name("README", &mut used), "README-1");
    }

    #[test]
    fn test_classify() {
        let dir = Path::new("/library/Anime-Foo-0");
        assert!(matches!(
            classify("https://example.com/a.png", dir),
            AssetSource::Remote(_)
        ));
        assert_eq!(
            classify("assets/a.png", dir),
            AssetSource::Local(dir.join("assets/a.png"))
        );
    }

    #[tokio::test]
    async fn test_empty_input_gives_placeholder() {
        let temp = tempdir().unwrap();
        let resolver = AssetResolver::new();

        let resolved = resolver.resolve(&[], temp.path()).await;
        assert_eq!(resolved.paths, vec![String::new()]);

        let resolved = resolver.resolve(&[String::new()], temp.path()).await;
        assert_eq!(resolved.paths, vec![String::new()]);
        assert!(resolved.failures.is_empty());
    }

    #[tokio::test]
    async fn test_local_copy_failure_is_isolated() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("picked.png");
        fs::write(&source, [7u8; 16]).unwrap();
        let record_dir = temp.path().join("Anime-Foo-0");
        fs::create_dir_all(&record_dir).unwrap();

        let references = vec![
            temp.path().join("missing.png").to_string_lossy().to_string(),
            source.to_string_lossy().to_string(),
        ];
        let resolved = AssetResolver::new().resolve(&references, &record_dir).await;

        assert_eq!(resolved.paths, vec!["assets/picked.png".to_string()]);
        assert_eq!(resolved.failures.len(), 1);
        assert!(matches!(resolved.failures[0], Error::AssetCopyFailed { .. }));
        assert_eq!(fs::read(record_dir.join("assets/picked.png")).unwrap(), vec![7u8; 16]);
    }

    #[tokio::test]
    async fn test_stored_asset_is_kept_in_place() {
        let temp = tempdir().unwrap();
        let record_dir = temp.path().join("Film-Heat-0");
        fs::create_dir_all(record_dir.join("assets")).unwrap();
        fs::write(record_dir.join("assets/poster.jpg"), b"jpeg").unwrap();

        let resolved = AssetResolver::new()
            .resolve(&["assets/poster.jpg".to_string()], &record_dir)
            .await;

        assert_eq!(resolved.paths, vec!["assets/poster.jpg".to_string()]);
        assert!(resolved.failures.is_empty());
        assert_eq!(fs::read(record_dir.join("assets/poster.jpg")).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_new_image_named_around_stored_one() {
        let temp = tempdir().unwrap();
        let record_dir = temp.path().join("Film-Heat-0");
        fs::create_dir_all(record_dir.join("assets")).unwrap();
        fs::write(record_dir.join("assets/cover.jpg"), b"old").unwrap();
        let picked = temp.path().join("picked");
        fs::create_dir_all(&picked).unwrap();
        fs::write(picked.join("cover.jpg"), b"new").unwrap();

        let references = vec![
            picked.join("cover.jpg").to_string_lossy().to_string(),
            "assets/cover.jpg".to_string(),
        ];
        let resolved = AssetResolver::new().resolve(&references, &record_dir).await;

        assert!(resolved.failures.is_empty());
        assert_eq!(resolved.paths, ["assets/cover-1.jpg", "assets/cover.jpg"]);
        assert_eq!(fs::read(record_dir.join("assets/cover.jpg")).unwrap(), b"old");
        assert_eq!(fs::read(record_dir.join("assets/cover-1.jpg")).unwrap(), b"new");
    }
}
