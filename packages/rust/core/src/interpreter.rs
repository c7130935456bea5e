//! Evidence Interpreter: registry evidence → product understanding.
//!
//! With evidence, the extraction service fills a fixed schema which is then
//! rendered into the "About the Device" and "Classification" sections.
//! Without evidence, a conservative fallback record is synthesized instead.

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use regreview_capture::EvidenceOutcome;
use regreview_extraction::{ExtractedFields, Extractor};
use regreview_shared::{
    AboutDevice, Classification, EvidenceTraceability, MEDICAL_DEVICE, ProductIdentity,
    ProductMeta, ProductUnderstanding, RawEvidence, Result, UNKNOWN_RISK_CLASS, prefix_risk_class,
};

pub const COUNTRY: &str = "South Korea";
pub const AUTHORITY: &str = "MFDS";

const ABOUT_TITLE: &str = "About the Device";
const CLASSIFICATION_TITLE: &str = "Classification";

const DERIVATION_NOTICE: &str = " Where explicit intended use was not clearly stated in the MFDS listing, a conservative functional use has been derived for procurement reference based on device description and common clinical application.";

const FALLBACK_ABOUT: &str = "No publicly available MFDS product listing with normal status was identified for this product designation at the time of review. This description is based on general product understanding and is provided for internal procurement reference only.";

const FALLBACK_CLASSIFICATION: &str = "Public MFDS classification information could not be identified from available listings. Risk classification and regulatory pathway should be confirmed through formal regulatory assessment.";

/// Product fields after extraction, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpretedProduct {
    pub product_name: String,
    pub device_description: String,
    pub intended_use: String,
    /// `intended_use` was copied from the device description.
    pub intended_use_derived: bool,
    pub risk_class: String,
    pub approval_number: String,
    pub approval_date: String,
    pub confidence_notes: String,
}

impl InterpretedProduct {
    /// Apply the derivation rule, the name fallback and class prefixing.
    pub fn from_fields(fields: ExtractedFields, search_product: &str) -> Self {
        let product_name = match fields.product_name.translated_en.trim() {
            "" => search_product.to_string(),
            name => name.to_string(),
        };

        let device_description = fields.device_description.translated_en;
        let (intended_use, intended_use_derived) = if fields.intended_use.translated_en.trim().is_empty() {
            (device_description.clone(), true)
        } else {
            (fields.intended_use.translated_en, false)
        };

        Self {
            product_name,
            device_description,
            intended_use,
            intended_use_derived,
            risk_class: prefix_risk_class(&fields.risk_class),
            approval_number: fields.approval_number.trim().to_string(),
            approval_date: fields.approval_date.trim().to_string(),
            confidence_notes: fields.confidence_notes,
        }
    }
}

/// Meta block shared by every record this tool produces.
pub fn product_meta() -> ProductMeta {
    ProductMeta {
        regulated_product_type: MEDICAL_DEVICE.to_string(),
        country: COUNTRY.to_string(),
        authority: AUTHORITY.to_string(),
    }
}

/// Turn a capture outcome into a product understanding.
///
/// `NotFound` never reaches the extractor. An extraction failure is returned
/// as-is; there is no fallback once evidence exists.
#[instrument(skip_all, fields(product = %search_product, found = outcome.is_found()))]
pub async fn interpret<E: Extractor>(
    outcome: &EvidenceOutcome,
    search_product: &str,
    extractor: &E,
    registry_url: &str,
) -> Result<ProductUnderstanding> {
    match outcome {
        EvidenceOutcome::NotFound => {
            warn!("no registry entry found, falling back to conservative record");
            Ok(fallback_understanding(search_product, registry_url, Utc::now()))
        }
        EvidenceOutcome::Found(evidence) => {
            let fields = extractor.extract(&evidence.visible_text).await?;
            let product = InterpretedProduct::from_fields(fields, search_product);
            info!(
                risk_class = %product.risk_class,
                derived = product.intended_use_derived,
                "evidence interpreted"
            );
            Ok(understanding_from_product(&product, evidence))
        }
    }
}

/// Record built from interpreted evidence.
pub fn understanding_from_product(
    product: &InterpretedProduct,
    evidence: &RawEvidence,
) -> ProductUnderstanding {
    ProductUnderstanding {
        meta: product_meta(),
        product_identity: ProductIdentity {
            product_name: product.product_name.clone(),
        },
        about_device: AboutDevice {
            title: ABOUT_TITLE.to_string(),
            content: build_about_device(product),
            intended_use_derived: product.intended_use_derived,
        },
        classification: Classification {
            title: CLASSIFICATION_TITLE.to_string(),
            content: build_classification(product),
            risk_class: product.risk_class.clone(),
            approval_number: product.approval_number.clone(),
            approval_date: product.approval_date.clone(),
        },
        evidence_traceability: EvidenceTraceability {
            source_url: evidence.source_url.clone(),
            accessed_at: evidence.access_timestamp.to_rfc3339(),
        },
    }
}

/// Conservative record used when the registry has no usable entry.
pub fn fallback_understanding(
    search_product: &str,
    registry_url: &str,
    accessed_at: DateTime<Utc>,
) -> ProductUnderstanding {
    ProductUnderstanding {
        meta: product_meta(),
        product_identity: ProductIdentity {
            product_name: search_product.to_string(),
        },
        about_device: AboutDevice {
            title: ABOUT_TITLE.to_string(),
            content: FALLBACK_ABOUT.to_string(),
            intended_use_derived: false,
        },
        classification: Classification {
            title: CLASSIFICATION_TITLE.to_string(),
            content: FALLBACK_CLASSIFICATION.to_string(),
            risk_class: UNKNOWN_RISK_CLASS.to_string(),
            approval_number: String::new(),
            approval_date: String::new(),
        },
        evidence_traceability: EvidenceTraceability {
            source_url: registry_url.to_string(),
            accessed_at: accessed_at.to_rfc3339(),
        },
    }
}

pub fn build_about_device(product: &InterpretedProduct) -> String {
    let mut text = format!(
        "The {} is a regulated product listed in the MFDS public product database.",
        product.product_name
    );

    let description = product.device_description.trim().trim_end_matches('.');
    if !description.is_empty() {
        text.push_str(&format!(
            " Based on publicly available listing information, it is a medical device designed to {description}."
        ));
    }

    let intended_use = product.intended_use.trim().trim_end_matches('.');
    if !intended_use.is_empty() {
        text.push_str(&format!(" It is intended to {intended_use}."));
    }

    if product.intended_use_derived {
        text.push_str(DERIVATION_NOTICE);
    }

    let note = product.confidence_notes.trim();
    if !note.is_empty() {
        text.push_str(&format!(" Confidence note: {note}"));
    }

    text.push_str(
        " This description is derived from interpreted information available in MFDS public product listings and is provided for internal procurement reference only.",
    );
    text
}

pub fn build_classification(product: &InterpretedProduct) -> String {
    let mut text = format!(
        "According to publicly available information in the MFDS e-Medi system, the device is listed as a {} medical device in South Korea.",
        product.risk_class
    );

    if !product.approval_number.is_empty() {
        text.push_str(&format!(
            " The MFDS record includes an approval reference number ({}).",
            product.approval_number
        ));
    }

    text.push_str(
        " This classification information is reported as identified in MFDS public records and is provided for internal reference and procurement planning purposes only.",
    );
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use regreview_extraction::BilingualText;
    use regreview_shared::ReviewError;

    fn en(text: &str) -> BilingualText {
        BilingualText {
            original_ko: String::new(),
            translated_en: text.to_string(),
        }
    }

    fn fields(intended_use: &str) -> ExtractedFields {
        ExtractedFields {
            product_name: en("Pulse Oximeter"),
            device_description: en("measure blood oxygen saturation."),
            intended_use: en(intended_use),
            risk_class: "2".into(),
            approval_number: "제허 12-345호".into(),
            approval_date: "2012-05-01".into(),
            confidence_notes: String::new(),
        }
    }

    fn evidence() -> RawEvidence {
        RawEvidence {
            source_url: "https://registry.example/detail/42".into(),
            page_title: "detail".into(),
            access_timestamp: Utc::now(),
            visible_text: "품목명 맥박산소측정기".into(),
            human_verified: false,
        }
    }

    struct FixedExtractor(ExtractedFields);

    impl Extractor for FixedExtractor {
        async fn extract(&self, _evidence_text: &str) -> Result<ExtractedFields> {
            Ok(self.0.clone())
        }
    }

    struct FailingExtractor;

    impl Extractor for FailingExtractor {
        async fn extract(&self, _evidence_text: &str) -> Result<ExtractedFields> {
            Err(ReviewError::ExtractionService {
                status: 401,
                body: "invalid api key".into(),
            })
        }
    }

    #[test]
    fn empty_intended_use_is_derived_and_disclosed() {
        let product = InterpretedProduct::from_fields(fields(""), "oximeter");
        assert!(product.intended_use_derived);
        assert_eq!(product.intended_use, product.device_description);

        let about = build_about_device(&product);
        assert!(about.contains(DERIVATION_NOTICE.trim()));
        assert!(about.contains("It is intended to measure blood oxygen saturation."));
    }

    #[test]
    fn stated_intended_use_is_not_flagged() {
        let product = InterpretedProduct::from_fields(fields("monitor patients in wards"), "oximeter");
        assert!(!product.intended_use_derived);

        let about = build_about_device(&product);
        assert!(!about.contains("conservative functional use"));
        assert!(about.contains("It is intended to monitor patients in wards."));
    }

    #[test]
    fn blank_product_name_falls_back_to_search_string() {
        let mut f = fields("x");
        f.product_name = en("  ");
        let product = InterpretedProduct::from_fields(f, "Skin Thermometer");
        assert_eq!(product.product_name, "Skin Thermometer");
    }

    #[test]
    fn risk_class_is_prefixed() {
        let product = InterpretedProduct::from_fields(fields("x"), "oximeter");
        assert_eq!(product.risk_class, "Class 2");

        let mut f = fields("x");
        f.risk_class = String::new();
        assert_eq!(InterpretedProduct::from_fields(f, "o").risk_class, "Unknown");
    }

    #[test]
    fn confidence_note_is_appended() {
        let mut f = fields("x");
        f.confidence_notes = "grade read from table ".into();
        let about = build_about_device(&InterpretedProduct::from_fields(f, "o"));
        assert!(about.contains("Confidence note: grade read from table This description"));
    }

    #[test]
    fn classification_mentions_approval_only_when_present() {
        let product = InterpretedProduct::from_fields(fields("x"), "o");
        assert!(build_classification(&product).contains("approval reference number (제허 12-345호)"));

        let mut f = fields("x");
        f.approval_number = String::new();
        let product = InterpretedProduct::from_fields(f, "o");
        assert!(!build_classification(&product).contains("approval reference"));
    }

    #[test]
    fn fallback_is_conservative() {
        let record = fallback_understanding("Skin Thermometer", "https://registry.example/search", Utc::now());
        assert_eq!(record.product_identity.product_name, "Skin Thermometer");
        assert_eq!(record.classification.risk_class, "Unknown");
        assert!(record.classification.approval_number.is_empty());
        assert!(record.classification.approval_date.is_empty());
        assert_eq!(record.evidence_traceability.source_url, "https://registry.example/search");
        assert_eq!(record.meta.regulated_product_type, MEDICAL_DEVICE);
    }

    #[tokio::test]
    async fn not_found_skips_extraction() {
        let record = interpret(&EvidenceOutcome::NotFound, "oximeter", &FailingExtractor, "https://r")
            .await
            .unwrap();
        assert_eq!(record.classification.risk_class, "Unknown");
    }

    #[tokio::test]
    async fn found_evidence_is_interpreted() {
        let ev = evidence();
        let outcome = EvidenceOutcome::Found(ev.clone());
        let record = interpret(&outcome, "oximeter", &FixedExtractor(fields("")), "https://r")
            .await
            .unwrap();

        assert_eq!(record.product_identity.product_name, "Pulse Oximeter");
        assert_eq!(record.classification.risk_class, "Class 2");
        assert!(record.about_device.intended_use_derived);
        assert_eq!(record.evidence_traceability.source_url, ev.source_url);
        assert_eq!(record.evidence_traceability.accessed_at, ev.access_timestamp.to_rfc3339());
    }

    #[tokio::test]
    async fn extraction_failure_is_not_masked() {
        let outcome = EvidenceOutcome::Found(evidence());
        let err = interpret(&outcome, "oximeter", &FailingExtractor, "https://r")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("[401]"));
    }
}
