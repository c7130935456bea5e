//! Review pipeline domain logic for regreview.
//!
//! This crate ties together evidence capture, field extraction, the content
//! rules and document assembly into an end-to-end review run
//! (see [`pipeline::run_review`]).

pub mod assembler;
pub mod conclusion;
pub mod interpreter;
pub mod pipeline;
pub mod rules;
