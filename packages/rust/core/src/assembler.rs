//! Document Assembler: stage artifacts → one Markdown review document.
//!
//! Fixed order: authority, key regulations, about the device, classification,
//! steps 5–8 (absent steps are skipped), conclusion.

use tracing::{info, instrument};

use regreview_artifacts::{ArtifactKind, ArtifactStore, WrittenDocument, document_file_name};
use regreview_shared::{
    Conclusion, ProductUnderstanding, Result, Section, SectionBundle, StaticOverview,
};

use crate::interpreter::COUNTRY;

/// The written document plus what went into it.
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub product_name: String,
    pub written: WrittenDocument,
    /// Number of `##` sections rendered.
    pub section_count: usize,
}

/// Sections in document order.
pub fn ordered_sections<'a>(
    overview: &'a StaticOverview,
    understanding: &'a ProductUnderstanding,
    sections: &'a SectionBundle,
    conclusion: &'a Conclusion,
) -> Vec<(&'a str, &'a str)> {
    let mut ordered = vec![
        pair(&overview.step1_regulatory_authority),
        pair(&overview.step2_key_regulations),
        (
            understanding.about_device.title.as_str(),
            understanding.about_device.content.as_str(),
        ),
        (
            understanding.classification.title.as_str(),
            understanding.classification.content.as_str(),
        ),
    ];
    ordered.extend(sections.steps().into_iter().flatten().map(pair));
    ordered.push(pair(&conclusion.section));
    ordered
}

fn pair(section: &Section) -> (&str, &str) {
    (section.title.as_str(), section.content.as_str())
}

/// Render the Markdown text. Returns the text and its section count.
pub fn render_document(
    overview: &StaticOverview,
    understanding: &ProductUnderstanding,
    sections: &SectionBundle,
    conclusion: &Conclusion,
) -> (String, usize) {
    let product_name = &understanding.product_identity.product_name;
    let mut doc = format!("# Regulatory Review for Procuring {product_name} in {COUNTRY}\n\n");

    let ordered = ordered_sections(overview, understanding, sections, conclusion);
    for (title, content) in &ordered {
        doc.push_str(&format!("## {title}\n\n{content}\n\n"));
    }

    (doc, ordered.len())
}

/// Load every input artifact and write the review document.
///
/// Any missing input fails with its path before anything is written.
#[instrument(skip_all, fields(output = %store.output_dir().display()))]
pub fn assemble(store: &ArtifactStore) -> Result<AssembledDocument> {
    let overview = store.load_static_overview()?;
    let understanding: ProductUnderstanding = store.load(ArtifactKind::ProductUnderstanding)?;
    let sections: SectionBundle = store.load(ArtifactKind::Sections)?;
    let conclusion: Conclusion = store.load(ArtifactKind::Conclusion)?;

    let (content, section_count) = render_document(&overview, &understanding, &sections, &conclusion);

    let product_name = understanding.product_identity.product_name;
    let written = store.write_document(&document_file_name(&product_name), &content)?;

    info!(
        path = %written.path.display(),
        sections = section_count,
        bytes = written.size_bytes,
        "review document written"
    );

    Ok(AssembledDocument {
        product_name,
        written,
        section_count,
    })
}
