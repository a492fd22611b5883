//! File-backed tier for persisting rate sheets to disk
//!
//! Stores one JSON file per base currency, named
//! `<basename>-<base lowercase>.json` next to a configured template path.
//! Files hold the raw payload with no added framing. The tier reports each
//! file's modification time as the entry's storage time and leaves freshness
//! decisions to the chain resolver.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use tokio::fs;
use tokio::io::AsyncReadExt;

use super::{Entry, Tier, TierError, TierKind};
use crate::data::{Base, RateSheet};

/// File name used when no template path is configured
pub const DEFAULT_FILE_NAME: &str = "exchange-rates.json";

/// Distinguishes temporary files written concurrently by this process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Persistent tier keyed by base currency
#[derive(Debug, Clone)]
pub struct FileTier {
    /// Directory where rate files are stored
    directory: PathBuf,
    /// File name prefix, taken from the template path without `.json`
    basename: String,
    expiration: Duration,
}

impl FileTier {
    /// Creates a file tier from a template path such as `./data/exchange-rates.json`
    ///
    /// Files for each base are written next to the template:
    /// `./data/exchange-rates-usd.json`, `./data/exchange-rates-eur.json`, ...
    pub fn new(template: impl AsRef<Path>, expiration: Duration) -> Self {
        let template = template.as_ref();
        let directory = template
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let file_name = template
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        let basename = file_name
            .strip_suffix(".json")
            .unwrap_or(&file_name)
            .to_string();

        Self {
            directory,
            basename,
            expiration,
        }
    }

    /// Template path inside the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/ratechain/exchange-rates.json` on Linux, or the
    /// equivalent on other platforms. Returns `None` if no home directory can
    /// be determined.
    pub fn default_template() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "ratechain")?;
        Some(project_dirs.cache_dir().join(DEFAULT_FILE_NAME))
    }

    /// Returns the path of the rate file for `base`
    ///
    /// Only plain alphanumeric codes name a file; anything else could step
    /// outside the cache directory and fails with `UnsupportedKey`.
    pub fn path_for(&self, base: &Base) -> Result<PathBuf, TierError> {
        if !base.is_plain_code() {
            return Err(TierError::UnsupportedKey(base.clone()));
        }
        Ok(self
            .directory
            .join(format!("{}-{}.json", self.basename, base.file_stem())))
    }

    /// Writes `contents` to a sibling temp file and renames it over `path`
    async fn replace_file(&self, path: &Path, contents: &str) -> std::io::Result<()> {
        let temp_path = path.with_extension(format!(
            "json.{}-{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        fs::write(&temp_path, contents).await?;
        if let Err(err) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err);
        }
        Ok(())
    }
}

#[async_trait]
impl Tier for FileTier {
    fn kind(&self) -> TierKind {
        TierKind::File
    }

    async fn read(&self, base: &Base) -> Result<Entry, TierError> {
        let path = self.path_for(base)?;

        let mut file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(TierError::NotFound(base.clone()));
            }
            Err(err) => return Err(err.into()),
        };

        // Contents and mtime come from the same handle, so a concurrent
        // rename cannot pair one file's bytes with another's timestamp
        let modified = file.metadata().await?.modified()?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        let sheet = RateSheet::parse(contents)?;
        sheet.ensure_base(base)?;

        Ok(Entry::stored(sheet, DateTime::<Utc>::from(modified)))
    }

    async fn write(&self, base: &Base, sheet: &RateSheet) -> Result<(), TierError> {
        sheet.ensure_base(base)?;

        let path = self.path_for(base)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        self.replace_file(&path, sheet.raw()).await?;
        Ok(())
    }

    fn expiration(&self) -> Duration {
        self.expiration
    }

    fn can_write(&self) -> bool {
        true
    }
}
