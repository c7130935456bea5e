//! Shared types, error model, and configuration for the regulatory review pipeline.
//!
//! This crate is the foundation depended on by all other regreview crates.
//! It provides:
//! - [`ReviewError`]: the unified error type
//! - Artifact types ([`RawEvidence`], [`ProductUnderstanding`], [`SectionBundle`], [`Conclusion`])
//! - The Classification Normalizer ([`prefix_risk_class`], [`canonical_risk_class`], [`RiskTier`])
//! - Configuration ([`AppConfig`], [`RegistryConfig`], [`LlmConfig`], config loading)

pub mod config;
pub mod error;
pub mod risk_class;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LlmConfig, RegistryConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{ReviewError, Result, Stage};
pub use risk_class::{RiskTier, UNKNOWN_RISK_CLASS, canonical_risk_class, prefix_risk_class};
pub use types::{
    AboutDevice, Classification, Conclusion, EvidenceTraceability, MEDICAL_DEVICE, ProductIdentity,
    ProductMeta, ProductUnderstanding, RawEvidence, RulesVersion, Section, SectionBundle,
    StaticOverview,
};
