//! Human review of inconclusive captions
//!
//! The classifier hands a [`ReviewContext`] to a [`ReviewPrompt`] and waits for
//! a yes/no answer. The binary asks on the console; [`ScriptedPrompt`] answers
//! from a script so the review path can be driven deterministically.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;

/// What the reviewer is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewContext {
    pub series_name: String,
    pub season: String,
    pub episode_number: String,
    pub title: String,
    /// Copy of the caption to inspect
    pub inspection_path: PathBuf,
}

/// Source of review decisions.
///
/// The classifier never calls `ask` concurrently, so implementations may own
/// the console for the duration of a call.
#[async_trait]
pub trait ReviewPrompt: Send + Sync {
    /// Return `true` to keep the caption.
    async fn ask(&self, context: &ReviewContext) -> Result<bool>;
}

/// Scripted [`ReviewPrompt`] that records every context it is asked about
#[derive(Debug)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<bool>>,
    fallback: bool,
    asked: Mutex<Vec<ReviewContext>>,
}

impl ScriptedPrompt {
    /// Answer `answer` to every question
    pub fn always(answer: bool) -> Self {
        Self::queued(Vec::new(), answer)
    }

    /// Answer from `answers` in order, then `false`
    pub fn answers(answers: impl IntoIterator<Item = bool>) -> Self {
        Self::queued(answers, false)
    }

    fn queued(answers: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            fallback,
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Contexts asked so far, in order
    pub fn asked(&self) -> Vec<ReviewContext> {
        self.asked
            .lock()
            .map(|asked| asked.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReviewPrompt for ScriptedPrompt {
    async fn ask(&self, context: &ReviewContext) -> Result<bool> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(context.clone());
        }
        let next = self
            .answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front());
        Ok(next.unwrap_or(self.fallback))
    }
}

/// Whether a console answer means "yes"
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y")
}
