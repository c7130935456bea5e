//! Section Rule Engine (steps 5–8).
//!
//! Pure lookup: `(product type, risk class)` → four optional sections. Every
//! branch is keyed on [`RiskTier`], so the class label is canonicalized before
//! any content is chosen.

use regreview_shared::{MEDICAL_DEVICE, RiskTier, RulesVersion, Section, SectionBundle};

pub const RULES_VERSION: &str = "MFDS_MD_RULES_v1.1";
pub const RULES_LAST_UPDATED: &str = "2026-02-01";
pub const RULES_NOTES: &str = "Enhanced procurement-oriented regulatory interpretation";

const STEP5_TITLE: &str = "Regulatory Considerations (Procurement-Focused)";
const STEP6_TITLE: &str = "Documentation Expectations (Procurement-Oriented)";
const STEP7_TITLE: &str = "Labeling, Traceability, and Post-Market Considerations";
const STEP8_TITLE: &str = "Procurement Impact (Decision-Relevant)";

const STEP5_SUFFIX: &str = "\n\nFor procurement purposes, the following regulatory elements should be verified prior to purchase:\n\
• Valid MFDS approval or certification status\n\
• Confirmed Korean License Holder (KLH)\n\
• Alignment of approved intended use with clinical application\n\
• Applicability of UDI and post-market obligations\
\n\nThis overview reflects regulatory expectations based on device classification and is provided for internal procurement reference.";

const STEP6_SUFFIX: &str = "\n\nFrom a procurement standpoint, documentation completeness should be confirmed prior to final supplier selection to mitigate regulatory and supply risks.";

const STEP7_CONTENT: &str = "Medical devices supplied in South Korea are expected to comply with Korean-language labeling and instructions for use requirements. Labeling typically includes product identification details, manufacturer and importer information, intended use, and warnings appropriate to the device type.\
\n\nDepending on device classification and regulatory pathway, Unique Device Identification (UDI) requirements may apply. Post-market surveillance (PMS) responsibilities are generally assigned to the Korean License Holder and should be considered during supplier qualification.\
\n\nFor procurement purposes, confirmation of labeling readiness and post-market support arrangements is recommended prior to purchase.";

const STEP8_SUFFIX: &str = "\n\nThese factors should be reflected in procurement timelines, budgeting, and supplier selection criteria.";

/// The stamp written into every section bundle.
pub fn rules_version() -> RulesVersion {
    RulesVersion {
        version: RULES_VERSION.to_string(),
        last_updated: RULES_LAST_UPDATED.to_string(),
        notes: RULES_NOTES.to_string(),
    }
}

/// Render steps 5–8. Product types other than medical devices get all `None`.
pub fn build_sections(product_type: &str, risk_class: &str) -> SectionBundle {
    if product_type != MEDICAL_DEVICE {
        return SectionBundle {
            rules_version: rules_version(),
            step5_regulatory_considerations: None,
            step6_documents_required: None,
            step7_labeling_udi_pms: None,
            step8_procurement_impact: None,
        };
    }

    let tier = RiskTier::classify(risk_class);
    SectionBundle {
        rules_version: rules_version(),
        step5_regulatory_considerations: Some(step5(tier)),
        step6_documents_required: Some(step6(tier)),
        step7_labeling_udi_pms: Some(Section::new(STEP7_TITLE, STEP7_CONTENT)),
        step8_procurement_impact: Some(step8(tier)),
    }
}

fn step5(tier: RiskTier) -> Section {
    let body = match tier {
        RiskTier::I => "Medical devices classified as Class I in South Korea are generally subject to lower-risk regulatory pathways with proportionate regulatory oversight. Such products are typically subject to notification or simplified registration processes depending on device characteristics.",
        RiskTier::II => "Medical devices classified as Class II in South Korea are subject to MFDS regulatory pathways applicable to moderate-risk devices. Distribution is generally conducted through a Korean License Holder (KLH). Regulatory expectations commonly include MFDS registration or certification, quality system compliance, Korean-language labeling, applicable UDI requirements, and defined post-market obligations.",
        RiskTier::III => "Medical devices classified as Class III are subject to enhanced MFDS regulatory oversight. Regulatory pathways typically involve detailed technical evaluation, conformity assessment, and increased pre-market scrutiny prior to approval.",
        RiskTier::IV => "Medical devices classified as Class IV are subject to the highest level of MFDS regulatory scrutiny. Regulatory pathways generally involve comprehensive pre-market approval processes supported by extensive technical and clinical evidence.",
        RiskTier::Unrecognized => "The risk classification of this device could not be confirmed from public MFDS records. The applicable regulatory pathway, approval requirements, and post-market obligations depend on that classification and should be established through formal regulatory assessment before any regulatory expectation is assumed.",
    };
    Section::new(STEP5_TITLE, format!("{body}{STEP5_SUFFIX}"))
}

fn step6(tier: RiskTier) -> Section {
    let body = match tier {
        RiskTier::I => "Documentation typically associated with Class I medical devices includes basic product identification details, labeling materials, and administrative documentation relevant to the supply arrangement.",
        RiskTier::II => "For Class II medical devices, procurement is typically supported by structured documentation demonstrating regulatory compliance. Common documentation may include MFDS approval or certification references, evidence of quality system compliance (e.g., KGMP), technical specifications, Korean-language labeling and instructions for use, UDI information where applicable, and authorization documentation for the Korean License Holder (KLH).",
        RiskTier::III | RiskTier::IV => "For Class III and Class IV medical devices, procurement is typically supported by extensive regulatory documentation. This may include comprehensive technical documentation, safety and performance evidence, quality system documentation, and, where applicable, clinical or post-market data.",
        RiskTier::Unrecognized => "Documentation expectations depend on a device classification that could not be confirmed from public MFDS records. Suppliers should be asked for MFDS approval or certification references and quality system evidence, and the full documentation set should be defined once the classification is confirmed.",
    };
    Section::new(STEP6_TITLE, format!("{body}{STEP6_SUFFIX}"))
}

fn step8(tier: RiskTier) -> Section {
    let body = match tier {
        RiskTier::I => "Products in this classification are generally associated with lower regulatory complexity. Procurement timelines are typically shorter, with reduced regulatory coordination requirements.",
        RiskTier::II => "Products classified as Class II are associated with moderate regulatory complexity. Procurement planning typically requires coordination with regulatory or compliance stakeholders, confirmation of MFDS approval status, and engagement of a Korean License Holder.",
        RiskTier::III | RiskTier::IV => "Products classified as Class III or Class IV are associated with higher regulatory complexity. Procurement planning may involve longer preparation timelines, increased regulatory coordination, and early engagement with regulatory, quality, and legal stakeholders.",
        RiskTier::Unrecognized => "The regulatory complexity of procuring this product cannot be estimated until its risk classification is confirmed. Procurement planning should allow time for formal regulatory assessment before sourcing commitments are made.",
    };
    Section::new(STEP8_TITLE, format!("{body}{STEP8_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(section: Option<Section>) -> String {
        section.expect("section present").content
    }

    #[test]
    fn class_ii_mentions_license_holder() {
        let bundle = build_sections(MEDICAL_DEVICE, "Class 2");
        assert!(content(bundle.step5_regulatory_considerations).contains("Korean License Holder"));
        assert!(content(bundle.step6_documents_required).contains("KGMP"));
        assert!(content(bundle.step8_procurement_impact).contains("moderate regulatory complexity"));
    }

    #[test]
    fn numeral_and_roman_labels_agree() {
        assert_eq!(build_sections(MEDICAL_DEVICE, "Class 3"), build_sections(MEDICAL_DEVICE, "Class III"));
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let a = serde_json::to_string(&build_sections(MEDICAL_DEVICE, "Class IV")).unwrap();
        let b = serde_json::to_string(&build_sections(MEDICAL_DEVICE, "Class IV")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn non_medical_product_has_no_sections() {
        let bundle = build_sections("cosmetic", "Class II");
        assert!(bundle.steps().iter().all(Option::is_none));
        assert_eq!(bundle.rules_version.version, RULES_VERSION);
    }

    #[test]
    fn unknown_class_gets_explicit_fallback() {
        let bundle = build_sections(MEDICAL_DEVICE, "Unknown");
        let step5 = content(bundle.step5_regulatory_considerations);
        let step8 = content(bundle.step8_procurement_impact);

        assert!(step5.starts_with("The risk classification of this device could not be confirmed"));
        assert!(step5.ends_with("provided for internal procurement reference."));
        assert!(!step8.contains("Class III or Class IV"));
        assert!(step8.contains("cannot be estimated"));
    }

    #[test]
    fn step7_ignores_risk_class() {
        let a = build_sections(MEDICAL_DEVICE, "Class I").step7_labeling_udi_pms;
        let b = build_sections(MEDICAL_DEVICE, "Unknown").step7_labeling_udi_pms;
        assert_eq!(a, b);
    }

    #[test]
    fn every_step_carries_procurement_guidance() {
        let bundle = build_sections(MEDICAL_DEVICE, "Class I");
        for section in bundle.steps().into_iter().flatten() {
            assert!(section.content.to_lowercase().contains("procurement"), "{}", section.title);
        }
    }
}
