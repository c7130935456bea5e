//! Per-run artifact files.
//!
//! Every stage hands its output to the next through a fixed file name under a
//! single output directory. This crate owns those names and the read/write
//! rules:
//!
//! - writes go to a temp file first and are renamed into place, so a killed
//!   process never leaves a half-written artifact behind
//! - a missing upstream artifact is a [`ReviewError::MissingArtifact`] naming
//!   the exact path
//! - the static steps 1–2 overview is looked up in the output directory
//!   first, then in the root (working) directory

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use regreview_shared::{Result, ReviewError, StaticOverview};

/// File name prefix of every assembled review document.
pub const DOCUMENT_PREFIX: &str = "MFDS_Procurement_Review";

/// Subdirectory for capture debug snapshots.
const DEBUG_DIR: &str = "debug";

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

/// The JSON artifacts handed between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    RawEvidence,
    ProductUnderstanding,
    Sections,
    Conclusion,
}

impl ArtifactKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::RawEvidence => "step3_raw_evidence.json",
            Self::ProductUnderstanding => "step4_product_understanding.json",
            Self::Sections => "step5_to_step8_sections.json",
            Self::Conclusion => "step9_conclusion.json",
        }
    }
}

/// Deterministic document file name for a product.
///
/// Whitespace, path separators and other characters that are not valid in a
/// file name become `_`, so the result is always a single path component.
pub fn document_file_name(product_name: &str) -> String {
    let stem: String = product_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{DOCUMENT_PREFIX}_{stem}.md")
}

/// Metadata for a written review document.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenDocument {
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

// ---------------------------------------------------------------------------
// ArtifactStore
// ---------------------------------------------------------------------------

/// Fixed-name artifact files under one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    root_dir: PathBuf,
    static_overview_name: String,
}

impl ArtifactStore {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        root_dir: impl Into<PathBuf>,
        static_overview_name: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            root_dir: root_dir.into(),
            static_overview_name: static_overview_name.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Absolute location of an artifact.
    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        self.output_dir.join(kind.file_name())
    }

    pub fn exists(&self, kind: ArtifactKind) -> bool {
        self.path(kind).is_file()
    }

    /// Load a required artifact.
    pub fn load<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<T> {
        read_json(&self.path(kind))
    }

    /// Load an artifact whose absence is meaningful.
    pub fn load_optional<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<Option<T>> {
        if !self.exists(kind) {
            return Ok(None);
        }
        self.load(kind).map(Some)
    }

    /// Atomically write an artifact, creating the output directory if needed.
    pub fn save<T: Serialize>(&self, kind: ArtifactKind, data: &T) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(data).map_err(|e| {
            ReviewError::validation(format!("JSON serialization failed: {e}"))
        })?;
        let path = self.path(kind);
        self.ensure_output_dir()?;
        write_atomic(&path, json.as_bytes())?;
        debug!(path = %path.display(), "wrote artifact");
        Ok(path)
    }

    /// Remove an artifact. Returns whether a file was removed.
    pub fn remove(&self, kind: ArtifactKind) -> Result<bool> {
        let path = self.path(kind);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).map_err(|e| ReviewError::io(&path, e))?;
        debug!(path = %path.display(), "removed artifact");
        Ok(true)
    }

    /// Locate the static overview: output directory first, then the root directory.
    pub fn resolve_static_overview(&self) -> Result<PathBuf> {
        let run_scoped = self.output_dir.join(&self.static_overview_name);
        if run_scoped.is_file() {
            return Ok(run_scoped);
        }

        let root = self.root_dir.join(&self.static_overview_name);
        if root.is_file() {
            info!(path = %root.display(), "using static overview from root directory");
            return Ok(root);
        }

        Err(ReviewError::MissingArtifact { path: run_scoped })
    }

    pub fn load_static_overview(&self) -> Result<StaticOverview> {
        read_json(&self.resolve_static_overview()?)
    }

    /// Atomically write the final document, overwriting any earlier one of the same name.
    pub fn write_document(&self, file_name: &str, content: &str) -> Result<WrittenDocument> {
        self.ensure_output_dir()?;
        let path = self.output_dir.join(file_name);
        write_atomic(&path, content.as_bytes())?;

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());

        Ok(WrittenDocument {
            path,
            sha256: format!("{:x}", hasher.finalize()),
            size_bytes: content.len(),
        })
    }

    /// Save a fetched page for inspection (capture debug mode).
    pub fn write_debug_snapshot(&self, name: &str, html: &str) -> Result<PathBuf> {
        let dir = self.output_dir.join(DEBUG_DIR);
        std::fs::create_dir_all(&dir).map_err(|e| ReviewError::io(&dir, e))?;
        let path = dir.join(name);
        write_atomic(&path, html.as_bytes())?;
        Ok(path)
    }

    /// Newest review document in the output directory (by modification time).
    pub fn latest_document(&self) -> Result<PathBuf> {
        let entries = std::fs::read_dir(&self.output_dir)
            .map_err(|e| ReviewError::io(&self.output_dir, e))?;

        let prefix = DOCUMENT_PREFIX.to_lowercase();
        let mut newest: Option<(SystemTime, PathBuf)> = None;

        for entry in entries {
            let entry = entry.map_err(|e| ReviewError::io(&self.output_dir, e))?;
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if !name.starts_with(&prefix) {
                continue;
            }
            let meta = entry
                .metadata()
                .map_err(|e| ReviewError::io(entry.path(), e))?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().map_err(|e| ReviewError::io(entry.path(), e))?;
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, entry.path()));
            }
        }

        newest.map(|(_, path)| path).ok_or_else(|| {
            ReviewError::validation(format!(
                "no review document found in {}",
                self.output_dir.display()
            ))
        })
    }

    fn ensure_output_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| ReviewError::io(&self.output_dir, e))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(ReviewError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| ReviewError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| ReviewError::parse(format!("invalid {}: {e}", path.display())))
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, bytes).map_err(|e| ReviewError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| ReviewError::io(path, e))?;
    Ok(())
}
