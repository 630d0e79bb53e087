// crates/rule-convert-cli/src/prompt.rs
// ============================================================================
// Module: Interactive Prompts
// Description: Line-oriented questions over any reader/writer pair.
// Purpose: Keep the interactive setup sequence testable with in-memory streams.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`Prompter`] asks free-text and yes/no questions. Answers are trimmed;
//! required questions repeat until answered. End of input is an error rather
//! than an endless loop.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::BufRead;
use std::io::Write;

use thiserror::Error;

use crate::t;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while prompting.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Input ended before a usable answer was read.
    #[error("input closed while waiting for: {0}")]
    Closed(String),
    /// Reading or writing the terminal failed.
    #[error("terminal i/o failed: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// SECTION: Prompter
// ============================================================================

/// Asks questions on `output` and reads answers from `input`.
pub struct Prompter<R, W> {
    /// Answer source.
    input: R,
    /// Question sink.
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Creates a prompter over the given streams.
    pub const fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
        }
    }

    /// Writes one informational line.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Io`] when the output cannot be written.
    pub fn say(&mut self, message: &str) -> Result<(), PromptError> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    /// Asks a free-text question.
    ///
    /// An empty answer yields `default` when one is given, an empty string
    /// when `required` is false, and otherwise repeats the question.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError`] on I/O failure or end of input.
    pub fn ask(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        required: bool,
    ) -> Result<String, PromptError> {
        let full_prompt = match default {
            Some(default) => format!("{prompt} [{default}]: "),
            None => format!("{prompt}: "),
        };
        loop {
            let answer = self.read_answer(&full_prompt, prompt)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            if let Some(default) = default {
                return Ok(default.to_string());
            }
            if !required {
                return Ok(String::new());
            }
            self.say(&t!("prompt.required"))?;
        }
    }

    /// Asks a yes/no question whose empty answer means yes.
    ///
    /// Anything other than empty, `y`, or `yes` counts as no.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError`] on I/O failure or end of input.
    pub fn accept(&mut self, question: &str) -> Result<bool, PromptError> {
        let answer = self.read_answer(&format!("{question}: "), question)?.to_lowercase();
        Ok(matches!(answer.as_str(), "" | "y" | "yes"))
    }

    /// Asks a yes/no question until the answer is yes or no.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError`] on I/O failure or end of input.
    pub fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        loop {
            let answer = self.read_answer(&format!("{question}: "), question)?.to_lowercase();
            match answer.as_str() {
                "yes" | "y" => return Ok(true),
                "no" | "n" => return Ok(false),
                _ => self.say(&t!("prompt.yes_no"))?,
            }
        }
    }

    /// Writes `full_prompt` without a newline and reads one trimmed line.
    fn read_answer(&mut self, full_prompt: &str, label: &str) -> Result<String, PromptError> {
        write!(self.output, "{full_prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::Closed(label.to_string()));
        }
        Ok(line.trim().to_string())
    }

    /// Consumes the prompter and returns its streams.
    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }
}
