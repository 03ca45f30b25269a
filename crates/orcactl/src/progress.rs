//! Terminal progress for a running solve
//!
//! Spinner on stderr while the model streams or the program runs; reasoning
//! text can be echoed instead. Non-TTY stderr gets neither.

use indicatif::{ProgressBar, ProgressStyle};
use orca_common::pipeline::{SolveObserver, Stage};
use owo_colors::OwoColorize;
use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

/// Braille spinner frames
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct CliObserver {
    spinner: Option<ProgressBar>,
    show_thinking: bool,
    in_reasoning: bool,
    start_time: Instant,
}

impl CliObserver {
    pub fn new(show_thinking: bool) -> Self {
        let is_tty = io::stderr().is_terminal();
        let no_color = std::env::var("NO_COLOR").is_ok();

        // Echoed reasoning and a spinner would fight over the same line
        let spinner = if is_tty && !no_color && !show_thinking {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .tick_strings(SPINNER_FRAMES)
                .template("{spinner} {msg} {elapsed:.dim}")
            {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(80));
            Some(pb)
        } else {
            None
        };

        Self {
            spinner,
            show_thinking,
            in_reasoning: false,
            start_time: Instant::now(),
        }
    }

    /// Clear the spinner and report total time
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        if self.in_reasoning {
            eprintln!();
            self.in_reasoning = false;
        }
        if io::stderr().is_terminal() {
            eprintln!(
                "{} {}",
                "done".bright_green(),
                format!("({:.1}s)", self.start_time.elapsed().as_secs_f64()).dimmed()
            );
        }
    }
}

impl SolveObserver for CliObserver {
    fn on_stage(&mut self, stage: Stage) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(stage.description());
        } else if self.show_thinking {
            if self.in_reasoning {
                eprintln!();
                self.in_reasoning = false;
            }
            eprintln!("{} {}", "[orca]".bright_cyan(), stage.description());
        }
    }

    fn on_reasoning(&mut self, text: &str) {
        if !self.show_thinking {
            return;
        }
        self.in_reasoning = true;
        eprint!("{}", text.dimmed());
        let _ = io::stderr().flush();
    }
}

impl Drop for CliObserver {
    fn drop(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}
