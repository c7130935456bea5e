//! Pipeline Driver and per-stage runners.
//!
//! Each runner reads its inputs from the [`ArtifactStore`] and writes its
//! output back, so any stage can be re-run on its own. [`run_review`] chains
//! them in fixed order and stops at the first failure.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument, warn};

use regreview_artifacts::{ArtifactKind, ArtifactStore};
use regreview_capture::{CaptureOptions, EvidenceOutcome, RegistryClient, RegistrySource};
use regreview_extraction::{Extractor, OpenAiExtractor};
use regreview_shared::{
    Conclusion, LlmConfig, ProductUnderstanding, RawEvidence, RegistryConfig, Result, ReviewError,
    SectionBundle, Stage, canonical_risk_class,
};

use crate::assembler::{self, AssembledDocument};
use crate::conclusion::build_conclusion;
use crate::interpreter;
use crate::rules::build_sections;

/// Everything a full review run needs.
#[derive(Debug, Clone)]
pub struct ReviewRunConfig {
    /// Registry search string.
    pub product: String,
    pub output_dir: PathBuf,
    /// Fallback location of the static overview.
    pub root_dir: PathBuf,
    pub static_overview: String,
    pub registry: RegistryConfig,
    pub llm: LlmConfig,
    /// Completion-service credential, already resolved.
    pub api_key: String,
    pub show_browser: bool,
}

impl ReviewRunConfig {
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.output_dir, &self.root_dir, &self.static_overview)
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewResult {
    pub product_name: String,
    pub document: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
    pub section_count: usize,
    pub evidence_found: bool,
    /// Canonical risk class the content rules branched on.
    pub risk_class: String,
    pub disclaimer_applied: bool,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a stage starts.
    fn stage(&self, stage: Stage);
    /// Called when the pipeline completes.
    fn done(&self, result: &ReviewResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: Stage) {}
    fn done(&self, _result: &ReviewResult) {}
}

// ---------------------------------------------------------------------------
// Stage runners
// ---------------------------------------------------------------------------

/// Search the registry and persist the evidence.
///
/// On `NotFound` no evidence file is left behind, including one from an
/// earlier run.
#[instrument(skip_all, fields(product = %product))]
pub async fn run_capture<R: RegistrySource>(
    store: &ArtifactStore,
    source: &R,
    product: &str,
    opts: &CaptureOptions,
) -> Result<EvidenceOutcome> {
    let report = source.capture(product, opts).await?;

    for snapshot in &report.snapshots {
        let path = store.write_debug_snapshot(&snapshot.name, &snapshot.html)?;
        info!(url = %snapshot.url, path = %path.display(), "saved page snapshot");
    }

    match &report.outcome {
        EvidenceOutcome::Found(evidence) => {
            let path = store.save(ArtifactKind::RawEvidence, evidence)?;
            info!(path = %path.display(), "evidence captured");
        }
        EvidenceOutcome::NotFound => {
            warn!("no valid registry entry found");
            if store.remove(ArtifactKind::RawEvidence)? {
                info!("removed evidence left by an earlier run");
            }
        }
    }

    Ok(report.outcome)
}

/// Evidence on disk, as a capture outcome.
pub fn stored_evidence(store: &ArtifactStore) -> Result<EvidenceOutcome> {
    Ok(store
        .load_optional::<RawEvidence>(ArtifactKind::RawEvidence)?
        .map_or(EvidenceOutcome::NotFound, EvidenceOutcome::Found))
}

/// Interpret an outcome and persist the product understanding.
pub async fn run_interpret<E: Extractor>(
    store: &ArtifactStore,
    outcome: &EvidenceOutcome,
    product: &str,
    extractor: &E,
    registry_url: &str,
) -> Result<ProductUnderstanding> {
    let understanding = interpreter::interpret(outcome, product, extractor, registry_url).await?;
    let path = store.save(ArtifactKind::ProductUnderstanding, &understanding)?;
    info!(path = %path.display(), "product understanding written");
    Ok(understanding)
}

/// Render steps 5–8 from the stored product understanding.
#[instrument(skip_all)]
pub fn run_sections(store: &ArtifactStore) -> Result<SectionBundle> {
    let understanding: ProductUnderstanding = store.load(ArtifactKind::ProductUnderstanding)?;
    let bundle = build_sections(
        &understanding.meta.regulated_product_type,
        &understanding.classification.risk_class,
    );
    let path = store.save(ArtifactKind::Sections, &bundle)?;
    info!(
        path = %path.display(),
        risk_class = %canonical_risk_class(&understanding.classification.risk_class),
        "sections written"
    );
    Ok(bundle)
}

/// Render step 9. Requires the step 5–8 bundle to exist.
#[instrument(skip_all)]
pub fn run_conclusion(store: &ArtifactStore) -> Result<Conclusion> {
    let understanding: ProductUnderstanding = store.load(ArtifactKind::ProductUnderstanding)?;
    let _: SectionBundle = store.load(ArtifactKind::Sections)?;

    let classification = &understanding.classification;
    let conclusion = build_conclusion(
        &understanding.meta.regulated_product_type,
        &classification.risk_class,
        &classification.approval_number,
    );
    let path = store.save(ArtifactKind::Conclusion, &conclusion)?;
    info!(
        path = %path.display(),
        disclaimer = conclusion.disclaimer_applied,
        "conclusion written"
    );
    Ok(conclusion)
}

pub fn run_assemble(store: &ArtifactStore) -> Result<AssembledDocument> {
    assembler::assemble(store)
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Checks that must pass before any stage runs.
pub fn preflight(config: &ReviewRunConfig, store: &ArtifactStore) -> Result<()> {
    if config.product.trim().is_empty() {
        return Err(ReviewError::validation("product name must not be empty"));
    }
    if config.api_key.trim().is_empty() {
        return Err(ReviewError::config(format!(
            "completion service API key not found. Set the {} environment variable.",
            config.llm.api_key_env
        )));
    }
    store.resolve_static_overview()?;
    Ok(())
}

/// Run the full review against the configured registry and completion service.
pub async fn run_review(
    config: &ReviewRunConfig,
    progress: &dyn ProgressReporter,
) -> Result<ReviewResult> {
    let source = RegistryClient::new(&config.registry)?;
    let extractor = OpenAiExtractor::new(&config.llm, config.api_key.clone())?;
    run_review_with(config, &source, &extractor, progress).await
}

/// Run the full review with the given collaborators.
///
/// 1. Capture registry evidence
/// 2. Interpret it (or fall back)
/// 3. Render steps 5–8
/// 4. Render the conclusion
/// 5. Assemble the document
#[instrument(skip_all, fields(product = %config.product))]
pub async fn run_review_with<R: RegistrySource, E: Extractor>(
    config: &ReviewRunConfig,
    source: &R,
    extractor: &E,
    progress: &dyn ProgressReporter,
) -> Result<ReviewResult> {
    let start = Instant::now();
    let store = config.store();

    preflight(config, &store)?;
    info!(output = %store.output_dir().display(), "starting review pipeline");

    progress.stage(Stage::Capture);
    let opts = CaptureOptions {
        show_browser: config.show_browser,
    };
    let outcome = run_capture(&store, source, &config.product, &opts)
        .await
        .map_err(|e| e.in_stage(Stage::Capture))?;

    progress.stage(Stage::Interpret);
    let understanding = run_interpret(
        &store,
        &outcome,
        &config.product,
        extractor,
        &config.registry.search_url,
    )
    .await
    .map_err(|e| e.in_stage(Stage::Interpret))?;

    progress.stage(Stage::Sections);
    run_sections(&store).map_err(|e| e.in_stage(Stage::Sections))?;

    progress.stage(Stage::Conclusion);
    let conclusion = run_conclusion(&store).map_err(|e| e.in_stage(Stage::Conclusion))?;

    progress.stage(Stage::Assemble);
    let document = run_assemble(&store).map_err(|e| e.in_stage(Stage::Assemble))?;

    let result = ReviewResult {
        product_name: document.product_name,
        document: document.written.path,
        sha256: document.written.sha256,
        size_bytes: document.written.size_bytes,
        section_count: document.section_count,
        evidence_found: outcome.is_found(),
        risk_class: canonical_risk_class(&understanding.classification.risk_class),
        disclaimer_applied: conclusion.disclaimer_applied,
        elapsed: start.elapsed(),
    };

    info!(
        document = %result.document.display(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "review pipeline complete"
    );
    progress.done(&result);

    Ok(result)
}
