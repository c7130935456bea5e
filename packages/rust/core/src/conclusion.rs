//! Conclusion Synthesizer (step 9).

use regreview_shared::{
    Conclusion, MEDICAL_DEVICE, RiskTier, Section, UNKNOWN_RISK_CLASS, canonical_risk_class,
};

const TITLE: &str = "Conclusion and Procurement Recommendation";

/// Appended when the recommendation rests on incomplete evidence.
pub const DISCLAIMER: &str = " This conclusion is based on publicly available information and general regulatory expectations and is provided for internal procurement reference only. Formal regulatory confirmation is required prior to submission, import, or market supply.";

const NEEDS_ASSESSMENT_OTHER_TYPE: &str = "Based on the available public information, the product is identified within its regulated category under the MFDS framework. Regulatory and procurement considerations are expected to vary depending on the applicable classification and regulatory pathway.";

const NEEDS_ASSESSMENT: &str = "Based on the available public information, the product is subject to MFDS regulatory oversight. Procurement and regulatory expectations should be confirmed based on the applicable classification during formal regulatory assessment.";

/// Pick the recommendation and decide on the disclaimer.
///
/// The disclaimer is added when the approval number is blank, the class is
/// `"Unknown"`, or the catch-all branch was taken (non-medical product or an
/// unrecognized class).
pub fn build_conclusion(product_type: &str, risk_class: &str, approval_number: &str) -> Conclusion {
    let risk_class = canonical_risk_class(risk_class);

    let (body, uncertain) = if product_type != MEDICAL_DEVICE {
        (NEEDS_ASSESSMENT_OTHER_TYPE, true)
    } else {
        match RiskTier::classify(&risk_class) {
            RiskTier::I => (
                "Based on the available public information and the identified classification, the product is considered a lower-risk medical device under the MFDS regulatory framework. From a procurement perspective, the product may be considered suitable for sourcing provided that applicable MFDS notification requirements, labeling compliance, and supplier authorization are verified prior to purchase.",
                false,
            ),
            RiskTier::II => (
                "Based on the available public information and the identified Class II classification, the product is considered to fall within a moderate-risk category under the MFDS regulatory framework. From a procurement perspective, the product may be considered suitable for sourcing provided that MFDS approval or certification status, Korean License Holder authorization, approved intended use alignment, and documentation completeness are verified prior to purchase.",
                false,
            ),
            RiskTier::III => (
                "Based on the available public information and the identified Class III classification, the product is considered a higher-risk medical device under the MFDS regulatory framework. Procurement activities for this product should be supported by early and thorough regulatory planning, including confirmation of MFDS approval status, documentation readiness, and regulatory timelines prior to sourcing decisions.",
                false,
            ),
            RiskTier::IV => (
                "Based on the available public information and the identified Class IV classification, the product is subject to the highest level of regulatory oversight under the MFDS framework. Procurement decisions for this product should be supported by comprehensive regulatory planning, extensive documentation review, and early engagement with regulatory and compliance stakeholders prior to sourcing.",
                false,
            ),
            RiskTier::Unrecognized => (NEEDS_ASSESSMENT, true),
        }
    };

    let disclaimer_applied =
        approval_number.trim().is_empty() || risk_class == UNKNOWN_RISK_CLASS || uncertain;

    let mut content = body.to_string();
    if disclaimer_applied {
        content.push_str(DISCLAIMER);
    }

    Conclusion {
        section: Section::new(TITLE, content),
        disclaimer_applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_disclaimer(c: &Conclusion) -> bool {
        c.section.content.contains(DISCLAIMER.trim())
    }

    #[test]
    fn approved_class_ii_has_no_disclaimer() {
        let c = build_conclusion(MEDICAL_DEVICE, "Class 2", "제허 12-345호");
        assert!(!c.disclaimer_applied);
        assert!(!has_disclaimer(&c));
        assert!(c.section.content.contains("moderate-risk category"));
    }

    #[test]
    fn missing_approval_adds_disclaimer() {
        let c = build_conclusion(MEDICAL_DEVICE, "Class II", "  ");
        assert!(c.disclaimer_applied);
        assert!(has_disclaimer(&c));
    }

    #[test]
    fn unknown_class_adds_disclaimer_even_with_approval() {
        let c = build_conclusion(MEDICAL_DEVICE, "Unknown", "제허 1호");
        assert!(c.disclaimer_applied);
        assert!(c.section.content.starts_with(NEEDS_ASSESSMENT));
    }

    #[test]
    fn unrecognized_class_adds_disclaimer() {
        let c = build_conclusion(MEDICAL_DEVICE, "Class 2a", "제허 1호");
        assert!(c.disclaimer_applied);
        assert!(has_disclaimer(&c));
    }

    #[test]
    fn unknown_without_approval_has_single_disclaimer() {
        let c = build_conclusion(MEDICAL_DEVICE, "Unknown", "");
        assert_eq!(c.section.content.matches(DISCLAIMER.trim()).count(), 1);
    }

    #[test]
    fn other_product_type_uses_catch_all() {
        let c = build_conclusion("cosmetic", "Class I", "A-1");
        assert!(c.disclaimer_applied);
        assert!(c.section.content.starts_with(NEEDS_ASSESSMENT_OTHER_TYPE));
    }

    #[test]
    fn higher_classes_have_own_templates() {
        let iii = build_conclusion(MEDICAL_DEVICE, "Class 3", "A-1");
        let iv = build_conclusion(MEDICAL_DEVICE, "Class IV", "A-1");
        assert!(iii.section.content.contains("higher-risk medical device"));
        assert!(iv.section.content.contains("highest level of regulatory oversight"));
        assert!(!iii.disclaimer_applied && !iv.disclaimer_applied);
        assert_eq!(iii.section.title, TITLE);
    }
}
