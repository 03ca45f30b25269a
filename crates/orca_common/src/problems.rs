//! Bundled example problems, one per problem class the prompts cover

use serde::Serialize;

/// A ready-made problem description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExampleProblem {
    /// Short name used on the command line
    pub name: &'static str,
    /// Human-readable title
    pub title: &'static str,
    /// Problem text sent to the model
    pub text: &'static str,
}

const EXAMPLES: &[ExampleProblem] = &[
    ExampleProblem {
        name: "production",
        title: "Production planning (linear programming)",
        text: "Maximize 3x + 4y subject to: x + 2y <= 14, 3x - y >= 0, x - y <= 2, x >= 0, y >= 0.",
    },
    ExampleProblem {
        name: "knapsack",
        title: "Resource allocation (knapsack)",
        text: "There are 4 items with weights [2, 3, 4, 5] and values [3, 4, 5, 6]. \
               The knapsack capacity is 5. Which items maximize the total value?",
    },
    ExampleProblem {
        name: "assignment",
        title: "Staff scheduling (assignment)",
        text: "Assign 3 workers to 3 tasks. Cost matrix: [[90, 80, 75], [35, 85, 55], [125, 95, 90]]. \
               Minimize the total cost.",
    },
    ExampleProblem {
        name: "digits",
        title: "Logic puzzle (three digits)",
        text: "Find three distinct digits X, Y, Z between 1 and 9 such that X + Y = Z, \
               with Z as large as possible.",
    },
];

/// All bundled examples
pub fn example_problems() -> &'static [ExampleProblem] {
    EXAMPLES
}

/// Look up an example by name (case-insensitive)
pub fn find_example(name: &str) -> Option<&'static ExampleProblem> {
    EXAMPLES.iter().find(|e| e.name.eq_ignore_ascii_case(name.trim()))
}
