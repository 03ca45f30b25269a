//! Code Normalizer - repairs generated CP-SAT snippets before execution
//!
//! Models frequently mix the two OR-Tools calling conventions: a `cp_model`
//! program that calls `model.Solve()` like `pywraplp`, forgets to build a
//! `CpSolver`, or reads results through `solution_value()`. The normalizer
//! rewrites those call shapes textually so the snippet runs.
//!
//! Rules (applied in order, each over the whole snippet):
//! 1. Discover the model variable (`<ident> = cp_model.CpModel()`, fallback `model`)
//! 2. Insert `solver = cp_model.CpSolver()` when no `CpSolver` is present
//! 3. `<model>.Solve()` / `solver.Solve()` -> `solver.Solve(<model>)`
//! 4. `solver.Objective().Value()` -> `solver.ObjectiveValue()`
//! 5. `<ident>.solution_value()` -> `solver.Value(<ident>)`
//!
//! Snippets that never mention `cp_model` are returned untouched: linear
//! solver code (`pywraplp`) legitimately uses the shapes rewritten here.

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Import line that marks a constraint-programming snippet
pub const CP_MODEL_IMPORT: &str = "from ortools.sat.python import cp_model";

/// Module reference prefix that also marks a constraint-programming snippet
pub const CP_MODEL_PREFIX: &str = "cp_model.";

/// Token whose presence means a solver object already exists
pub const SOLVER_CONSTRUCTOR_TOKEN: &str = "CpSolver";

/// Identifier bound to the inserted solver object
pub const SOLVER_IDENT: &str = "solver";

/// Model variable name used when no `CpModel()` assignment is found
pub const DEFAULT_MODEL_IDENT: &str = "model";

const SOLVER_STATEMENT: &str = "\nsolver = cp_model.CpSolver()";

const OBJECTIVE_ACCESSORS: [&str; 2] = [
    "solver.Objective().Value()",
    "solver.Objective().value()",
];

const OBJECTIVE_VALUE_CALL: &str = "solver.ObjectiveValue()";

// =============================================================================
// Compiled Patterns
// =============================================================================

static MODEL_ASSIGN_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"([A-Za-z_][A-Za-z0-9_]*)\s*=\s*cp_model\.CpModel\(\)"));

static CP_IMPORT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"from ortools\.sat\.python import cp_model"));

static SOLVER_SOLVE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\bsolver\.Solve\(\s*\)"));

static SOLUTION_VALUE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"([A-Za-z_][A-Za-z0-9_]*)\.solution_value\(\)"));

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Skipping normalizer pattern {:?}: {}", pattern, e);
            None
        }
    }
}

// =============================================================================
// Normalization Report
// =============================================================================

/// Where the solver statement was inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverInsertion {
    /// Right after the `CpModel()` assignment
    AfterModel,
    /// Right after the `cp_model` import
    AfterImport,
    /// At the very start of the snippet
    AtStart,
}

/// Normalized snippet plus a record of which rules changed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    /// The rewritten snippet
    pub code: String,
    /// False when the snippet is not CP code and was passed through
    pub applicable: bool,
    /// Model variable name the solve rewrites used
    pub model_var: String,
    /// Set when a solver statement was added
    pub solver_inserted: Option<SolverInsertion>,
    /// Number of `Solve()` calls rewritten to `solver.Solve(<model>)`
    pub solve_calls_rewritten: usize,
    /// Number of `Objective().Value()` accessors replaced
    pub objective_accessors_rewritten: usize,
    /// Number of `.solution_value()` accessors replaced
    pub value_accessors_rewritten: usize,
}

impl Normalization {
    fn passthrough(code: &str) -> Self {
        Self {
            code: code.to_string(),
            applicable: false,
            model_var: DEFAULT_MODEL_IDENT.to_string(),
            solver_inserted: None,
            solve_calls_rewritten: 0,
            objective_accessors_rewritten: 0,
            value_accessors_rewritten: 0,
        }
    }

    /// True when at least one rule changed the snippet
    pub fn changed(&self) -> bool {
        self.solver_inserted.is_some()
            || self.solve_calls_rewritten > 0
            || self.objective_accessors_rewritten > 0
            || self.value_accessors_rewritten > 0
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Check whether a snippet targets the `cp_model` calling convention
pub fn is_cp_snippet(code: &str) -> bool {
    code.contains(CP_MODEL_IMPORT) || code.contains(CP_MODEL_PREFIX)
}

/// Normalize a generated snippet, returning only the rewritten text
pub fn normalize(code: &str) -> String {
    normalize_with_report(code).code
}

/// Normalize a generated snippet and report which rules fired
pub fn normalize_with_report(code: &str) -> Normalization {
    if !is_cp_snippet(code) {
        return Normalization::passthrough(code);
    }

    let mut code = code.to_string();

    let model_match = MODEL_ASSIGN_RE
        .as_ref()
        .and_then(|re| re.captures(&code))
        .and_then(|caps| Some((caps.get(1)?.as_str().to_string(), caps.get(0)?.end())));

    let model_var = model_match
        .as_ref()
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| DEFAULT_MODEL_IDENT.to_string());

    let solver_inserted = if code.contains(SOLVER_CONSTRUCTOR_TOKEN) {
        None
    } else {
        let (insert_at, placement) = match model_match {
            Some((_, end)) => (end, SolverInsertion::AfterModel),
            None => match CP_IMPORT_RE.as_ref().and_then(|re| re.find(&code)) {
                Some(m) => (m.end(), SolverInsertion::AfterImport),
                None => (0, SolverInsertion::AtStart),
            },
        };
        code.insert_str(insert_at, SOLVER_STATEMENT);
        debug!("Inserted CpSolver statement ({:?}) at byte {}", placement, insert_at);
        Some(placement)
    };

    let solve_call = format!("{}.Solve({})", SOLVER_IDENT, model_var);
    let mut solve_calls_rewritten = 0;

    let model_solve = compile(&format!(r"\b{}\.Solve\(\s*\)", regex::escape(&model_var)));
    for re in [model_solve.as_ref(), SOLVER_SOLVE_RE.as_ref()].into_iter().flatten() {
        let (rewritten, count) = replace_counted(re, &code, &solve_call);
        code = rewritten;
        solve_calls_rewritten += count;
    }

    let mut objective_accessors_rewritten = 0;
    for accessor in OBJECTIVE_ACCESSORS {
        let count = code.matches(accessor).count();
        if count > 0 {
            code = code.replace(accessor, OBJECTIVE_VALUE_CALL);
            objective_accessors_rewritten += count;
        }
    }

    let mut value_accessors_rewritten = 0;
    if let Some(re) = SOLUTION_VALUE_RE.as_ref() {
        value_accessors_rewritten = re.find_iter(&code).count();
        if value_accessors_rewritten > 0 {
            code = re.replace_all(&code, "solver.Value(${1})").into_owned();
        }
    }

    let report = Normalization {
        code,
        applicable: true,
        model_var,
        solver_inserted,
        solve_calls_rewritten,
        objective_accessors_rewritten,
        value_accessors_rewritten,
    };

    debug!(
        model_var = %report.model_var,
        solve = report.solve_calls_rewritten,
        objective = report.objective_accessors_rewritten,
        values = report.value_accessors_rewritten,
        "Normalized CP snippet"
    );

    report
}

/// Replace every match with a literal string, returning the match count
fn replace_counted(re: &Regex, text: &str, replacement: &str) -> (String, usize) {
    let count = re.find_iter(text).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    (re.replace_all(text, NoExpand(replacement)).into_owned(), count)
}
