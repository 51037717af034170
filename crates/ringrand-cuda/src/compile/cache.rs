//! On-disk PTX cache.
//!
//! Entries are keyed by the SHA-256 of the macro-expanded CUDA source and the
//! target architecture, so a change to either the kernel text or any macro
//! value produces a new file. File names are
//! `<sha256>_<arch>_<CACHE_VERSION>.ptx`.
//!
//! Location, in order of precedence: [`RandomConfig::cache_dir`],
//! `RINGRAND_PTX_CACHE_DIR`, the platform cache directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use ringrand_core::config::{RandomConfig, ENV_PTX_CACHE_DIR};

/// Cache format version. Bumping it orphans every existing entry.
pub const CACHE_VERSION: u32 = 1;

/// PTX cache failures.
#[derive(Debug, thiserror::Error)]
pub enum PtxCacheError {
    /// The cache directory could not be created.
    #[error("cannot create PTX cache directory {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An entry could not be read.
    #[error("cannot read PTX cache entry: {0}")]
    Read(#[source] std::io::Error),

    /// An entry could not be written.
    #[error("cannot write PTX cache entry: {0}")]
    Write(#[source] std::io::Error),

    /// An entry exists but does not look like PTX. It has been removed.
    #[error("corrupted PTX cache entry {0}")]
    Corrupted(PathBuf),
}

/// Result type for PTX cache operations.
pub type PtxCacheResult<T> = Result<T, PtxCacheError>;

/// Identity of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PtxKey {
    /// Lowercase hex SHA-256 of the expanded source.
    pub source_hash: String,
    /// Target architecture, e.g. `sm_86`.
    pub arch: String,
}

impl PtxKey {
    /// Key for `source` compiled for `arch`.
    pub fn new(source: &str, arch: impl Into<String>) -> Self {
        Self {
            source_hash: hash_source(source),
            arch: arch.into(),
        }
    }

    fn file_name(&self) -> String {
        format!("{}_{}_{}.ptx", self.source_hash, self.arch, CACHE_VERSION)
    }
}

/// Lowercase hex SHA-256 of `source`.
pub fn hash_source(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

/// Architecture tag for a compute capability.
pub fn arch_tag(major: u32, minor: u32) -> String {
    format!("sm_{}{}", major, minor)
}

/// File-backed PTX cache. A cache without a directory is disabled and every
/// operation is a no-op.
#[derive(Debug, Clone)]
pub struct PtxCache {
    dir: Option<PathBuf>,
}

impl PtxCache {
    /// Cache rooted at `dir`, created if missing.
    pub fn with_dir(dir: impl Into<PathBuf>) -> PtxCacheResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| PtxCacheError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir: Some(dir) })
    }

    /// Cache that stores nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Cache configured by `config`.
    ///
    /// Falls back to a disabled cache, with a warning, if the directory
    /// cannot be created.
    pub fn from_config(config: &RandomConfig) -> Self {
        if !config.ptx_cache {
            return Self::disabled();
        }
        let dir = config.cache_dir.clone().unwrap_or_else(default_cache_dir);
        match Self::with_dir(&dir) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!("PTX cache disabled: {}", e);
                Self::disabled()
            }
        }
    }

    /// Returns true if entries are persisted.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Cache directory, if enabled.
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Look up an entry.
    pub fn get(&self, key: &PtxKey) -> PtxCacheResult<Option<String>> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let path = dir.join(key.file_name());

        let ptx = match fs::read_to_string(&path) {
            Ok(ptx) => ptx,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PtxCacheError::Read(e)),
        };

        if !ptx.contains(".version") {
            let _ = fs::remove_file(&path);
            return Err(PtxCacheError::Corrupted(path));
        }

        tracing::debug!(path = %path.display(), bytes = ptx.len(), "PTX cache hit");
        Ok(Some(ptx))
    }

    /// Store an entry. The file appears atomically under its final name.
    pub fn put(&self, key: &PtxKey, ptx: &str) -> PtxCacheResult<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let path = dir.join(key.file_name());
        let staging = dir.join(format!(".{}.{}.tmp", key.file_name(), std::process::id()));

        let written = fs::File::create(&staging)
            .and_then(|mut file| {
                file.write_all(ptx.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&staging, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(PtxCacheError::Write(e));
        }

        tracing::debug!(path = %path.display(), bytes = ptx.len(), "PTX cached");
        Ok(())
    }

    /// Remove every entry.
    pub fn clear(&self) -> PtxCacheResult<usize> {
        let mut removed = 0;
        for path in self.entries()? {
            if fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Entry count and total size.
    pub fn stats(&self) -> PtxCacheStats {
        let entries = self.entries().unwrap_or_default();
        PtxCacheStats {
            bytes: entries
                .iter()
                .filter_map(|p| fs::metadata(p).ok())
                .map(|m| m.len())
                .sum(),
            entries: entries.len(),
            dir: self.dir.clone(),
        }
    }

    fn entries(&self) -> PtxCacheResult<Vec<PathBuf>> {
        let Some(dir) = &self.dir else {
            return Ok(Vec::new());
        };
        Ok(fs::read_dir(dir)
            .map_err(PtxCacheError::Read)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "ptx"))
            .collect())
    }
}

/// PTX cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PtxCacheStats {
    /// Number of entries.
    pub entries: usize,
    /// Total size in bytes.
    pub bytes: u64,
    /// Cache directory, `None` when disabled.
    pub dir: Option<PathBuf>,
}

impl std::fmt::Display for PtxCacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.dir {
            Some(dir) => write!(
                f,
                "{} PTX entries, {:.1} KiB in {}",
                self.entries,
                self.bytes as f64 / 1024.0,
                dir.display()
            ),
            None => write!(f, "PTX cache disabled"),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(ENV_PTX_CACHE_DIR).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Caches/ringrand/ptx");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            return PathBuf::from(local).join("ringrand\\ptx");
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME").filter(|d| !d.is_empty()) {
            return PathBuf::from(xdg).join("ringrand/ptx");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".cache/ringrand/ptx");
        }
    }

    std::env::temp_dir().join("ringrand/ptx")
}
