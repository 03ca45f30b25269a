//! Output Parser - extracts the objective and variable values from solver stdout
//!
//! Generated programs print results in free form (`Objective value = 42`,
//! `x = 3`, `x: 3.0`, ...). Only two shapes are recognized:
//!
//! - `Objective value <:|=> NUMBER` (case-insensitive, first occurrence wins)
//! - `IDENT = NUMBER` anywhere in the text
//!
//! The variable scan is deliberately permissive. There is no symbol table of
//! real decision variables, so every assignment-shaped fragment becomes a
//! binding, in order, duplicates included. `Objective value = 42.5` itself
//! yields a `value = 42.5` binding.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

static OBJECTIVE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)Objective\s*value\s*[:=]\s*([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)").ok()
});

static VARIABLE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*=\s*([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)").ok()
});

/// A `name = value` pair found in solver output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableBinding {
    pub name: String,
    pub value: f64,
}

impl VariableBinding {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Structured view of solver output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResult {
    /// Objective value exactly as printed
    pub objective: Option<String>,
    /// Every binding, in order of appearance
    pub variables: Vec<VariableBinding>,
}

impl ParsedResult {
    /// True when neither an objective nor any binding was found
    pub fn is_empty(&self) -> bool {
        self.objective.is_none() && self.variables.is_empty()
    }

    /// Objective as a number, when it parses
    pub fn objective_f64(&self) -> Option<f64> {
        self.objective.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Parse captured solver output
pub fn parse_output(text: &str) -> ParsedResult {
    let objective = OBJECTIVE_RE
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let mut variables = Vec::new();
    if let Some(re) = VARIABLE_RE.as_ref() {
        for caps in re.captures_iter(text) {
            let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            // The number grammar is a subset of what f64 accepts
            if let Ok(value) = value.as_str().parse::<f64>() {
                variables.push(VariableBinding::new(name.as_str(), value));
            }
        }
    }

    debug!(
        objective = ?objective,
        bindings = variables.len(),
        "Parsed solver output"
    );

    ParsedResult {
        objective,
        variables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_colon_separator() {
        let parsed = parse_output("Objective value: -3.5e2\n");
        assert_eq!(parsed.objective.as_deref(), Some("-3.5e2"));
        assert_eq!(parsed.objective_f64(), Some(-350.0));
    }

    #[test]
    fn test_objective_case_insensitive_no_space() {
        let parsed = parse_output("OBJECTIVEVALUE=.5");
        assert_eq!(parsed.objective.as_deref(), Some(".5"));
    }

    #[test]
    fn test_empty_is_empty() {
        assert!(parse_output("no numbers here").is_empty());
    }

    #[test]
    fn test_signed_and_exponent_bindings() {
        let parsed = parse_output("a = -1\nb=+2.5E-1\n");
        assert_eq!(
            parsed.variables,
            vec![VariableBinding::new("a", -1.0), VariableBinding::new("b", 0.25)]
        );
    }
}
