//! Tests for the CP-SAT snippet normalizer.

use orca_common::normalizer::{is_cp_snippet, normalize, normalize_with_report, SolverInsertion};

const KNAPSACK_CP: &str = "\
from ortools.sat.python import cp_model

model = cp_model.CpModel()
x = model.NewBoolVar('x')
y = model.NewBoolVar('y')
model.Add(2 * x + 3 * y <= 4)
model.Maximize(3 * x + 4 * y)
status = model.Solve()
print('Objective value =', solver.Objective().Value())
print('x =', x.solution_value())
print('y =', y.solution_value())
";

const LINEAR_MIP: &str = "\
from ortools.linear_solver import pywraplp

solver = pywraplp.Solver.CreateSolver('SCIP')
x = solver.IntVar(0, 10, 'x')
solver.Maximize(3 * x)
status = solver.Solve()
print('Objective value =', solver.Objective().Value())
print('x =', x.solution_value())
";

#[test]
fn test_model_solve_gets_solver() {
    let out = normalize("model = cp_model.CpModel()\nstatus = model.Solve()");
    assert!(out.contains("solver = cp_model.CpSolver()"));
    assert!(out.contains("solver.Solve(model)"));
    assert!(!out.contains("model.Solve()"));
}

#[test]
fn test_linear_snippet_untouched() {
    assert!(!is_cp_snippet(LINEAR_MIP));
    assert_eq!(normalize(LINEAR_MIP), LINEAR_MIP);
}

#[test]
fn test_non_cp_text_untouched() {
    for text in ["", "print('hello')", "x.solution_value()", "solver.Objective().Value()"] {
        assert_eq!(normalize(text), text);
    }
}

#[test]
fn test_full_snippet_repair() {
    let report = normalize_with_report(KNAPSACK_CP);
    assert!(report.applicable);
    assert_eq!(report.model_var, "model");
    assert_eq!(report.solver_inserted, Some(SolverInsertion::AfterModel));
    assert_eq!(report.solve_calls_rewritten, 1);
    assert_eq!(report.objective_accessors_rewritten, 1);
    assert_eq!(report.value_accessors_rewritten, 2);

    let expected = "\
from ortools.sat.python import cp_model

model = cp_model.CpModel()
solver = cp_model.CpSolver()
x = model.NewBoolVar('x')
y = model.NewBoolVar('y')
model.Add(2 * x + 3 * y <= 4)
model.Maximize(3 * x + 4 * y)
status = solver.Solve(model)
print('Objective value =', solver.ObjectiveValue())
print('x =', solver.Value(x))
print('y =', solver.Value(y))
";
    assert_eq!(report.code, expected);
}

#[test]
fn test_idempotent_once_repaired() {
    let once = normalize(KNAPSACK_CP);
    assert_eq!(normalize(&once), once);

    let already = "model = cp_model.CpModel()\nsolver = cp_model.CpSolver()\nstatus = solver.Solve(model)\n";
    assert_eq!(normalize(already), already);
    assert!(!normalize_with_report(already).changed());
}

#[test]
fn test_existing_solver_not_duplicated() {
    let code = "m = cp_model.CpModel()\nsolver = cp_model.CpSolver()\nstatus = solver.Solve()\n";
    let out = normalize(code);
    assert_eq!(out.matches("CpSolver").count(), 1);
    assert!(out.contains("status = solver.Solve(m)"));
}

#[test]
fn test_custom_model_name() {
    let code = "from ortools.sat.python import cp_model\nmdl = cp_model.CpModel()\nr = mdl.Solve()\n";
    let out = normalize(code);
    assert!(out.contains("mdl = cp_model.CpModel()\nsolver = cp_model.CpSolver()"));
    assert!(out.contains("r = solver.Solve(mdl)"));
}

#[test]
fn test_only_first_model_assignment_counts() {
    let code = "a = cp_model.CpModel()\nb = cp_model.CpModel()\na.Solve()\nb.Solve()\n";
    let out = normalize(code);
    assert!(out.contains("solver.Solve(a)"));
    assert!(out.contains("b.Solve()"));
}

#[test]
fn test_objective_accessor_each_occurrence() {
    let code = "import cp_model\nsolver = cp_model.CpSolver()\nprint(solver.Objective().Value())\nv = solver.Objective().value()\nw = solver.Objective().Value()\n";
    let report = normalize_with_report(code);
    assert_eq!(report.objective_accessors_rewritten, 3);
    assert_eq!(report.code.matches("solver.ObjectiveValue()").count(), 3);
    assert!(!report.code.contains("Objective()"));
}

#[test]
fn test_objective_accessor_case_sensitive() {
    let code = "solver = cp_model.CpSolver()\nsolver.objective().Value()\n";
    assert_eq!(normalize(code), code);
}

#[test]
fn test_solution_value_any_identifier() {
    let code = "solver = cp_model.CpSolver()\nprint(x.solution_value(), y.solution_value())\n";
    let out = normalize(code);
    assert!(out.contains("solver.Value(x)"));
    assert!(out.contains("solver.Value(y)"));
    assert!(!out.contains("solution_value"));
}

#[test]
fn test_solve_with_whitespace_args() {
    let code = "model = cp_model.CpModel()\nsolver = cp_model.CpSolver()\nmodel.Solve(  )\n";
    assert!(normalize(code).contains("solver.Solve(model)\n"));
}
