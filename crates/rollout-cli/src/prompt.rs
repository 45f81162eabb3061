//! Typed confirmation prompts
//!
//! The operator must type `yes`; any other answer, including an empty line
//! or end of input, declines.

use console::style;
use rollout_core::{Confirmation, ConfirmationSource};
use std::io::{BufRead, Write};

/// Reads confirmation tokens from a line-oriented input
pub struct PromptConfirmer<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirmer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

/// Prompts on stderr, answers from stdin
pub fn terminal() -> PromptConfirmer<std::io::StdinLock<'static>, std::io::Stderr> {
    PromptConfirmer::new(std::io::stdin().lock(), std::io::stderr())
}

impl<R: BufRead, W: Write> ConfirmationSource for PromptConfirmer<R, W> {
    fn confirm(&mut self, prompt: &str) -> Confirmation {
        // A prompt that cannot be shown still reads the answer
        let _ = write!(self.output, "{} {}: ", style("?").yellow().bold(), prompt);
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => {
                let _ = writeln!(self.output);
                Confirmation::No
            }
            Ok(_) => Confirmation::parse(&line),
        }
    }
}
