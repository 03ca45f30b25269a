//! Solve Pipeline - problem text to parsed solver results
//!
//! Stages:
//! 1. Generate: stream code from the model (thinking enabled if configured)
//! 2. Extract: pull the fenced program out of the reply; retry once with the
//!    strict prompt when the reply had no code
//! 3. Normalize: repair CP-SAT call shapes
//! 4. Run: execute in the interpreter, capture stdout
//! 5. Parse: objective + variable bindings
//! 6. Summarize: optional plain-language conclusion (failure is not fatal)
//!
//! The LLM backend and the runner are injected; the pipeline owns neither.

use crate::code_extract::extract_code;
use crate::llm::{collect_content, ChatRequest, LlmBackend, LlmError, StreamChunk};
use crate::normalizer::normalize_with_report;
use crate::output_parser::{parse_output, ParsedResult};
use crate::prompts;
use crate::runner::{CodeRunner, RunError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Pipeline stage, reported to observers as it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Generating,
    Retrying,
    Normalizing,
    Running,
    Parsing,
    Summarizing,
}

impl Stage {
    pub fn description(&self) -> &'static str {
        match self {
            Stage::Generating => "Building the model...",
            Stage::Retrying => "No code in reply, retrying with strict prompt...",
            Stage::Normalizing => "Normalizing generated code...",
            Stage::Running => "Running solver...",
            Stage::Parsing => "Reading solver output...",
            Stage::Summarizing => "Summarizing results...",
        }
    }
}

/// Receives progress while a problem is being solved
pub trait SolveObserver {
    fn on_stage(&mut self, _stage: Stage) {}
    fn on_reasoning(&mut self, _text: &str) {}
    fn on_content(&mut self, _text: &str) {}
}

/// Observer that ignores everything
pub struct SilentObserver;

impl SolveObserver for SilentObserver {}

/// Per-run options
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub model: String,
    pub enable_thinking: bool,
    pub summarize: bool,
    pub summary_language: String,
}

/// Everything a successful solve produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub problem: String,
    pub model: String,
    /// Normalized program that was executed
    pub code: String,
    /// True when the normalizer changed the extracted program
    pub code_normalized: bool,
    /// True when the strict retry produced the code
    pub retried: bool,
    pub stdout: String,
    pub parsed: ParsedResult,
    pub summary: Option<String>,
}

/// Solve pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("Problem description is empty")]
    EmptyProblem,

    #[error("Model did not produce a code block, even after retrying")]
    NoCode { raw_output: String },

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Generated code failed: {source}")]
    Run {
        /// Program that was executed, for display alongside the failure
        code: String,
        #[source]
        source: RunError,
    },
}

/// The solve pipeline over an injected backend and runner
pub struct SolvePipeline<'a> {
    backend: &'a dyn LlmBackend,
    runner: &'a dyn CodeRunner,
    options: PipelineOptions,
}

impl<'a> SolvePipeline<'a> {
    pub fn new(backend: &'a dyn LlmBackend, runner: &'a dyn CodeRunner, options: PipelineOptions) -> Self {
        Self {
            backend,
            runner,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Solve a problem end to end
    pub fn solve(&self, problem: &str, observer: &mut dyn SolveObserver) -> Result<SolveReport, SolveError> {
        let problem = problem.trim();
        if problem.is_empty() {
            return Err(SolveError::EmptyProblem);
        }
        info!(model = %self.options.model, "Solving problem ({} chars)", problem.len());

        let (code, retried) = self.generate_code(problem, observer)?;

        observer.on_stage(Stage::Normalizing);
        let normalization = normalize_with_report(&code);
        let code_normalized = normalization.changed();
        if code_normalized {
            debug!("Normalizer rewrote the generated program");
        }
        let code = normalization.code;

        observer.on_stage(Stage::Running);
        let output = self.runner.run(&code).map_err(|source| SolveError::Run {
            code: code.clone(),
            source,
        })?;

        observer.on_stage(Stage::Parsing);
        let parsed = parse_output(&output.stdout);

        let summary = if self.options.summarize {
            observer.on_stage(Stage::Summarizing);
            match self.summarize(problem, &output.stdout) {
                Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                Ok(_) => {
                    warn!("Summary request returned no text");
                    None
                }
                Err(e) => {
                    warn!("Summary unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(SolveReport {
            problem: problem.to_string(),
            model: self.options.model.clone(),
            code,
            code_normalized,
            retried,
            stdout: output.stdout,
            parsed,
            summary,
        })
    }

    /// Stream a reply and return its code block, retrying once without thinking
    fn generate_code(&self, problem: &str, observer: &mut dyn SolveObserver) -> Result<(String, bool), SolveError> {
        observer.on_stage(Stage::Generating);
        let request = ChatRequest::new(&self.options.model, prompts::generation_system_prompt(), problem)
            .with_thinking(self.options.enable_thinking);
        let reply = match self.stream_reply(&request, observer) {
            Ok(reply) => reply,
            // Nothing streamed at all; the strict retry gets a chance like any codeless reply
            Err(LlmError::EmptyResponse) => String::new(),
            Err(e) => return Err(e.into()),
        };

        if let Some(code) = extract_code(&reply) {
            return Ok((code, false));
        }

        warn!("First reply had no code block ({} chars), retrying", reply.len());
        observer.on_stage(Stage::Retrying);
        let request = ChatRequest::new(&self.options.model, prompts::strict_system_prompt(), problem);
        let retry = self.stream_reply(&request, observer)?;

        match extract_code(&retry) {
            Some(code) => Ok((code, true)),
            None => Err(SolveError::NoCode { raw_output: retry }),
        }
    }

    fn stream_reply(&self, request: &ChatRequest, observer: &mut dyn SolveObserver) -> Result<String, LlmError> {
        let stream = self.backend.chat_stream(request)?;
        collect_content(stream, &mut |chunk: &StreamChunk| match chunk {
            StreamChunk::Reasoning(text) => observer.on_reasoning(text),
            StreamChunk::Content(text) => observer.on_content(text),
        })
    }

    fn summarize(&self, problem: &str, stdout: &str) -> Result<String, LlmError> {
        let language = &self.options.summary_language;
        let request = ChatRequest::new(
            &self.options.model,
            prompts::summary_system_prompt(language),
            prompts::summary_user_prompt(problem, stdout, language),
        );
        let stream = self.backend.chat_stream(&request)?;
        collect_content(stream, &mut |_: &StreamChunk| {})
    }
}
