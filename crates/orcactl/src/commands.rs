//! Subcommand handlers

use crate::output;
use crate::progress::CliObserver;
use anyhow::{bail, Context, Result};
use orca_common::code_extract::extract_code;
use orca_common::config::OrcaConfig;
use orca_common::llm::HttpOpenAiBackend;
use orca_common::normalizer::normalize_with_report;
use orca_common::output_parser::parse_output;
use orca_common::pipeline::{PipelineOptions, SolveError, SolvePipeline};
use orca_common::problems::{example_problems, find_example};
use orca_common::runner::PythonRunner;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

pub struct SolveArgs {
    pub problem: String,
    pub example: Option<String>,
    pub model: Option<String>,
    pub json: bool,
    pub show_code: bool,
    pub thinking: bool,
    pub summarize: bool,
}

/// Read FILE, or stdin when FILE is absent or `-`
fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

pub fn solve(config_path: Option<&Path>, args: SolveArgs) -> Result<()> {
    let config = OrcaConfig::load(config_path);

    let problem = match args.example.as_deref() {
        Some(name) => match find_example(name) {
            Some(example) => example.text.to_string(),
            None => bail!("Unknown example '{}' (see `orcactl examples`)", name),
        },
        None => args.problem,
    };
    if problem.trim().is_empty() {
        bail!("Describe the problem, or pass --example NAME");
    }

    let model = config.resolve_model(args.model.as_deref());
    debug!("Using model {} at {}", model, config.llm.base_url);

    let backend = HttpOpenAiBackend::new(&config.llm).context("LLM backend unavailable")?;
    let runner = PythonRunner::new(&config.runner);
    let options = PipelineOptions {
        model,
        enable_thinking: config.llm.enable_thinking,
        summarize: args.summarize && config.summary.enabled,
        summary_language: config.summary.language.clone(),
    };
    let pipeline = SolvePipeline::new(&backend, &runner, options);

    let mut observer = CliObserver::new(args.thinking && !args.json);
    let result = pipeline.solve(&problem, &mut observer);
    observer.finish();

    match result {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::display_report(&report, args.show_code);
            }
            Ok(())
        }
        Err(e) => {
            match &e {
                SolveError::NoCode { raw_output } => output::display_raw_reply(raw_output),
                SolveError::Run { code, source } => output::display_run_failure(code, source),
                _ => {}
            }
            Err(e.into())
        }
    }
}

pub fn normalize(file: Option<&Path>, explain: bool) -> Result<()> {
    let code = read_input(file)?;
    let report = normalize_with_report(&code);
    print!("{}", report.code);
    if explain {
        output::display_normalization(&report);
    }
    Ok(())
}

pub fn parse(file: Option<&Path>, json: bool) -> Result<()> {
    let text = read_input(file)?;
    let parsed = parse_output(&text);
    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    } else {
        output::display_parsed(&parsed);
    }
    Ok(())
}

pub fn extract(file: Option<&Path>) -> Result<()> {
    let text = read_input(file)?;
    match extract_code(&text) {
        Some(code) => {
            println!("{}", code);
            Ok(())
        }
        None => bail!("No fenced code block found"),
    }
}

pub fn examples() -> Result<()> {
    output::display_examples(example_problems());
    Ok(())
}

pub fn models(config_path: Option<&Path>) -> Result<()> {
    let config = OrcaConfig::load(config_path);
    output::display_models(&config.models, &config.llm.model);
    Ok(())
}

pub fn config(config_path: Option<&Path>, init: bool, force: bool) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .or_else(OrcaConfig::default_path)
        .context("No config directory for this user; pass --config PATH")?;

    if init {
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        OrcaConfig::save_default(&path)?;
        output::display_config_written(&path);
        return Ok(());
    }

    let config = OrcaConfig::load(Some(&path));
    let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
    output::display_config(&path, &rendered);
    Ok(())
}
