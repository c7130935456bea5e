//! Evidence Capture: registry search and page-text extraction.
//!
//! This crate provides:
//! - [`EvidenceOutcome`]: `Found(RawEvidence)` or `NotFound`, never a partial record
//! - [`RegistrySource`]: the seam the pipeline captures evidence through
//! - [`RegistryClient`]: HTTP implementation against the public registry portal
//! - [`visible_text`]: rendered-text extraction from an HTML page

mod client;
mod text;

use regreview_shared::{RawEvidence, Result};

pub use client::RegistryClient;
pub use text::{page_title, visible_text};

/// Result of searching the registry for one product.
#[derive(Debug, Clone, PartialEq)]
pub enum EvidenceOutcome {
    /// The first matching registry entry, with non-empty visible text.
    Found(RawEvidence),
    /// No usable entry: no result row, timeout, missing link, or empty page.
    NotFound,
}

impl EvidenceOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Capture behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Keep every fetched page as a snapshot for inspection.
    pub show_browser: bool,
}

/// A fetched page kept in debug mode.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    /// File name to store the snapshot under.
    pub name: String,
    pub url: String,
    pub html: String,
}

/// Everything one capture attempt produced.
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub outcome: EvidenceOutcome,
    /// Empty unless [`CaptureOptions::show_browser`] was set.
    pub snapshots: Vec<PageSnapshot>,
}

/// Something that can look a product up in the device registry.
///
/// Recoverable absence is reported as [`EvidenceOutcome::NotFound`];
/// an `Err` is reserved for conditions that should stop the run.
#[allow(async_fn_in_trait)]
pub trait RegistrySource {
    async fn capture(&self, product: &str, opts: &CaptureOptions) -> Result<CaptureReport>;
}
