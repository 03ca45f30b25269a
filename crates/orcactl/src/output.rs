//! Output formatting - ASCII-only terminal output

use orca_common::config::ModelPreset;
use orca_common::normalizer::{Normalization, SolverInsertion};
use orca_common::output_parser::ParsedResult;
use orca_common::pipeline::SolveReport;
use orca_common::problems::ExampleProblem;
use orca_common::runner::RunError;
use owo_colors::OwoColorize;
use std::path::Path;

pub const THIN_SEPARATOR: &str = "------------------------------------------------------------";

/// Lines of stdout/stderr shown after a failed run
const FAILURE_TAIL_LINES: usize = 15;

/// Display a finished solve
pub fn display_report(report: &SolveReport, show_code: bool) {
    println!();
    if show_code {
        println!("[CODE]{}", if report.code_normalized { " (normalized)".dimmed().to_string() } else { String::new() });
        println!("{}", THIN_SEPARATOR.dimmed());
        println!("{}", report.code);
        println!("{}", THIN_SEPARATOR.dimmed());
        println!();
    }

    if report.parsed.is_empty() {
        println!("{} No objective or variable values in the solver output", "[NOTE]".yellow());
        if !report.stdout.trim().is_empty() {
            println!();
            println!("[OUTPUT]");
            println!("{}", report.stdout.trim_end());
        }
    } else {
        display_parsed(&report.parsed);
    }

    if let Some(summary) = &report.summary {
        println!();
        println!("[SUMMARY]");
        println!("{}", summary);
    }

    println!();
    println!(
        "{}",
        format!(
            "model: {}{}",
            report.model,
            if report.retried { " * retried with strict prompt" } else { "" }
        )
        .dimmed()
    );
}

/// Display objective and variable bindings
pub fn display_parsed(parsed: &ParsedResult) {
    match &parsed.objective {
        Some(objective) => println!("{}  Objective value: {}", "[OK]".bright_green(), objective.bold()),
        None => println!("{}  No objective value reported", "[NOTE]".yellow()),
    }

    if parsed.variables.is_empty() {
        return;
    }

    let width = parsed
        .variables
        .iter()
        .map(|v| v.name.len())
        .max()
        .unwrap_or(0);

    println!();
    println!("[VARIABLES]");
    for binding in &parsed.variables {
        println!("  {:<width$}  {}", binding.name.cyan(), binding.value, width = width);
    }
}

/// Show what the model said when no code block could be found
pub fn display_raw_reply(raw_output: &str) {
    eprintln!();
    eprintln!("{} Model reply had no code block:", "[ERROR]".red());
    eprintln!("{}", THIN_SEPARATOR.dimmed());
    eprintln!("{}", raw_output.trim_end());
    eprintln!("{}", THIN_SEPARATOR.dimmed());
}

/// Show the failing program and whatever it printed
pub fn display_run_failure(code: &str, error: &RunError) {
    eprintln!();
    eprintln!("{} {}", "[ERROR]".red(), error.to_string().red());
    eprintln!();
    eprintln!("[CODE]");
    eprintln!("{}", THIN_SEPARATOR.dimmed());
    eprintln!("{}", code);
    eprintln!("{}", THIN_SEPARATOR.dimmed());

    if let Some(stdout) = error.partial_stdout().filter(|s| !s.trim().is_empty()) {
        eprintln!();
        eprintln!("[OUTPUT]");
        eprintln!("{}", tail(stdout, FAILURE_TAIL_LINES));
    }
    if let RunError::Failed { stderr, .. } = error {
        if !stderr.trim().is_empty() {
            eprintln!();
            eprintln!("[STDERR]");
            eprintln!("{}", tail(stderr, FAILURE_TAIL_LINES).bright_red());
        }
    }
}

/// Report which normalizer rewrites fired
pub fn display_normalization(report: &Normalization) {
    if !report.applicable {
        eprintln!("{} not a CP-SAT program, left unchanged", "[NOTE]".yellow());
        return;
    }

    let insertion = match report.solver_inserted {
        Some(SolverInsertion::AfterModel) => "inserted after model",
        Some(SolverInsertion::AfterImport) => "inserted after import",
        Some(SolverInsertion::AtStart) => "inserted at start",
        None => "already present",
    };

    eprintln!("{} model variable: {}", "[OK]".bright_green(), report.model_var.cyan());
    eprintln!("  solver:                  {}", insertion);
    eprintln!("  Solve() calls:           {}", report.solve_calls_rewritten);
    eprintln!("  objective accessors:     {}", report.objective_accessors_rewritten);
    eprintln!("  solution_value accessors: {}", report.value_accessors_rewritten);
}

pub fn display_examples(examples: &[ExampleProblem]) {
    for example in examples {
        println!("{}  {}", format!("{:<12}", example.name).cyan(), example.title);
    }
    println!();
    println!("{}", "Run one with: orcactl solve --example NAME".dimmed());
}

pub fn display_models(models: &[ModelPreset], default_id: &str) {
    for preset in models {
        let marker = if preset.id == default_id { "*" } else { " " };
        println!("{} {}  {}", marker.bright_green(), preset.id.cyan(), preset.label.dimmed());
    }
    if !models.iter().any(|m| m.id == default_id) {
        println!("{} {}  {}", "*".bright_green(), default_id.cyan(), "(configured)".dimmed());
    }
}

pub fn display_config(path: &Path, rendered: &str) {
    let state = if path.exists() { "" } else { " (not found, showing defaults)" };
    println!("{}", format!("# {}{}", path.display(), state).dimmed());
    println!("{}", rendered.trim_end());
}

pub fn display_config_written(path: &Path) {
    println!("{}  Wrote default config to {}", "[OK]".bright_green(), path.display());
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
