//! Artifact types exchanged between pipeline stages.
//!
//! Every type here is persisted as a JSON file under the output directory and
//! read back by the next stage. Field aliases accept files written by the
//! earlier script-based tool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only regulated product type the content rules cover.
pub const MEDICAL_DEVICE: &str = "medical_device";

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// A rendered `{title, content}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(alias = "section_title")]
    pub title: String,
    pub content: String,
}

impl Section {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RawEvidence (step 3)
// ---------------------------------------------------------------------------

/// Page evidence captured from the public registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvidence {
    pub source_url: String,
    pub page_title: String,
    #[serde(alias = "access_date")]
    pub access_timestamp: DateTime<Utc>,
    pub visible_text: String,
    #[serde(default)]
    pub human_verified: bool,
}

// ---------------------------------------------------------------------------
// ProductUnderstanding (step 4)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMeta {
    pub regulated_product_type: String,
    pub country: String,
    #[serde(alias = "regulatory_authority")]
    pub authority: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductIdentity {
    pub product_name: String,
}

/// The "About the Device" section plus the intended-use derivation flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutDevice {
    #[serde(alias = "section_title")]
    pub title: String,
    pub content: String,
    /// Set when intended use was substituted from the device description.
    #[serde(default)]
    pub intended_use_derived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(alias = "section_title")]
    pub title: String,
    pub content: String,
    pub risk_class: String,
    #[serde(default)]
    pub approval_number: String,
    #[serde(default)]
    pub approval_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceTraceability {
    pub source_url: String,
    pub accessed_at: String,
}

/// Interpreted product record; exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUnderstanding {
    pub meta: ProductMeta,
    pub product_identity: ProductIdentity,
    pub about_device: AboutDevice,
    pub classification: Classification,
    pub evidence_traceability: EvidenceTraceability,
}

// ---------------------------------------------------------------------------
// SectionBundle (steps 5–8)
// ---------------------------------------------------------------------------

/// Which content rule set produced a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesVersion {
    pub version: String,
    pub last_updated: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionBundle {
    pub rules_version: RulesVersion,
    pub step5_regulatory_considerations: Option<Section>,
    pub step6_documents_required: Option<Section>,
    pub step7_labeling_udi_pms: Option<Section>,
    pub step8_procurement_impact: Option<Section>,
}

impl SectionBundle {
    /// Steps 5 through 8 in document order.
    pub fn steps(&self) -> [Option<&Section>; 4] {
        [
            self.step5_regulatory_considerations.as_ref(),
            self.step6_documents_required.as_ref(),
            self.step7_labeling_udi_pms.as_ref(),
            self.step8_procurement_impact.as_ref(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Conclusion (step 9)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conclusion {
    #[serde(rename = "step9_conclusion")]
    pub section: Section,
    #[serde(default)]
    pub disclaimer_applied: bool,
}

// ---------------------------------------------------------------------------
// Static jurisdiction overview (steps 1–2)
// ---------------------------------------------------------------------------

/// Hand-maintained authority and regulation overview; never generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticOverview {
    pub step1_regulatory_authority: Section,
    pub step2_key_regulations: Section,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn understanding_accepts_legacy_field_names() {
        let json = r#"{
          "meta": {
            "regulated_product_type": "medical_device",
            "country": "South Korea",
            "regulatory_authority": "MFDS"
          },
          "product_identity": { "product_name": "Pulse Oximeter" },
          "about_device": { "section_title": "About the Device", "content": "..." },
          "classification": {
            "section_title": "Classification",
            "content": "...",
            "risk_class": "Class 2",
            "approval_number": "제허 12-345호",
            "approval_date": "2012-05-01"
          },
          "evidence_traceability": {
            "source_url": "https://emedi.mfds.go.kr/x",
            "accessed_at": "2026-01-01T00:00:00"
          }
        }"#;

        let parsed: ProductUnderstanding = serde_json::from_str(json).expect("parse legacy");
        assert_eq!(parsed.meta.authority, "MFDS");
        assert_eq!(parsed.about_device.title, "About the Device");
        assert!(!parsed.about_device.intended_use_derived);
        assert_eq!(parsed.classification.approval_number, "제허 12-345호");
    }

    #[test]
    fn bundle_serializes_null_steps() {
        let bundle = SectionBundle {
            rules_version: RulesVersion {
                version: "v".into(),
                last_updated: "d".into(),
                notes: "n".into(),
            },
            step5_regulatory_considerations: None,
            step6_documents_required: None,
            step7_labeling_udi_pms: Some(Section::new("Labeling", "text")),
            step8_procurement_impact: None,
        };

        let value = serde_json::to_value(&bundle).expect("serialize");
        assert!(value["step5_regulatory_considerations"].is_null());
        assert_eq!(value["step7_labeling_udi_pms"]["title"], "Labeling");
        assert_eq!(bundle.steps().iter().filter(|s| s.is_some()).count(), 1);
    }

    #[test]
    fn conclusion_uses_step9_key() {
        let conclusion = Conclusion {
            section: Section::new("Conclusion", "text"),
            disclaimer_applied: true,
        };
        let value = serde_json::to_value(&conclusion).expect("serialize");
        assert_eq!(value["step9_conclusion"]["content"], "text");

        let legacy = r#"{"step9_conclusion": {"section_title": "C", "content": "x"}}"#;
        let parsed: Conclusion = serde_json::from_str(legacy).expect("parse legacy");
        assert_eq!(parsed.section.title, "C");
        assert!(!parsed.disclaimer_applied);
    }

    #[test]
    fn evidence_accepts_access_date() {
        let json = r#"{
          "source_url": "https://emedi.mfds.go.kr/detail",
          "page_title": "의료기기 상세",
          "access_date": "2026-02-01T10:00:00Z",
          "visible_text": "품목명 ...",
          "human_verified": false
        }"#;
        let parsed: RawEvidence = serde_json::from_str(json).expect("parse");
        assert_eq!(parsed.page_title, "의료기기 상세");
    }
}
