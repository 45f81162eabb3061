//! Typed confirmation tokens for destructive actions
//!
//! Only the literal word `yes` (any case, surrounding whitespace ignored)
//! confirms. Everything else, including an empty line, `y` or `yes please`,
//! is a refusal.

use std::collections::VecDeque;

/// The operator's answer to a destructive-action prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
}

impl Confirmation {
    /// Interpret a typed answer
    pub fn parse(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("yes") {
            Self::Yes
        } else {
            Self::No
        }
    }

    pub fn is_yes(self) -> bool {
        self == Self::Yes
    }
}

/// Something that can ask the operator to confirm
///
/// The CLI backs this with stdin; tests use [`ScriptedConfirmations`].
pub trait ConfirmationSource {
    fn confirm(&mut self, prompt: &str) -> Confirmation;
}

/// Replays a fixed list of answers; once exhausted every prompt is refused
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfirmations {
    answers: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedConfirmations {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// Prompts shown so far, in order
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl ConfirmationSource for ScriptedConfirmations {
    fn confirm(&mut self, prompt: &str) -> Confirmation {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .map(|a| Confirmation::parse(&a))
            .unwrap_or(Confirmation::No)
    }
}
