//! Classification Normalizer.
//!
//! Two separate passes exist and both apply to class labels that come out of
//! free-text extraction:
//!
//! 1. [`prefix_risk_class`]: light syntactic fix-up (`"2"` → `"Class 2"`),
//!    applied once by the interpreter.
//! 2. [`canonical_risk_class`]: maps Arabic numerals onto the canonical Roman
//!    vocabulary (`"Class 2"` → `"Class II"`). Every stage that branches on a
//!    risk class calls this first.

/// Label used when no classification could be established.
pub const UNKNOWN_RISK_CLASS: &str = "Unknown";

const CLASS_MARKER: &str = "Class";

const CANONICAL_TABLE: [(&str, &str); 4] = [
    ("Class 1", "Class I"),
    ("Class 2", "Class II"),
    ("Class 3", "Class III"),
    ("Class 4", "Class IV"),
];

/// Prefix a raw extracted label with the class marker.
///
/// Empty input becomes [`UNKNOWN_RISK_CLASS`]. Input that already starts with
/// "class" (any case) is returned trimmed, otherwise `"Class " + raw`.
pub fn prefix_risk_class(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return UNKNOWN_RISK_CLASS.to_string();
    }
    if raw.to_lowercase().starts_with("class") {
        return raw.to_string();
    }
    format!("{CLASS_MARKER} {raw}")
}

/// Map a risk class onto the canonical vocabulary. Unknown input passes through.
pub fn canonical_risk_class(risk_class: &str) -> String {
    CANONICAL_TABLE
        .iter()
        .find(|(from, _)| *from == risk_class)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or_else(|| risk_class.to_string())
}

/// Branch key for the content rule tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskTier {
    I,
    II,
    III,
    IV,
    /// Anything outside the four canonical classes, `"Unknown"` included.
    Unrecognized,
}

impl RiskTier {
    /// Normalize a risk class label and resolve it to a tier.
    pub fn classify(risk_class: &str) -> Self {
        match canonical_risk_class(risk_class).as_str() {
            "Class I" => Self::I,
            "Class II" => Self::II,
            "Class III" => Self::III,
            "Class IV" => Self::IV,
            _ => Self::Unrecognized,
        }
    }
}
