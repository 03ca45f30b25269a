//! Orca Common - natural-language optimization assistant core
//!
//! The two pure pieces, [`normalizer::normalize`] and
//! [`output_parser::parse_output`], sit between an LLM that writes OR-Tools
//! programs and an interpreter that runs them. Everything else here is the
//! plumbing around them: code extraction, the streaming LLM client, the
//! runner, configuration and the end-to-end pipeline.

pub mod code_extract;
pub mod config;
pub mod llm;
pub mod normalizer;
pub mod output_parser;
pub mod pipeline;
pub mod problems;
pub mod prompts;
pub mod runner;

pub use code_extract::extract_code;
pub use config::OrcaConfig;
pub use normalizer::normalize;
pub use output_parser::{parse_output, ParsedResult, VariableBinding};
pub use pipeline::{SolveError, SolvePipeline, SolveReport};
