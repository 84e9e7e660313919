//! Sources of answers for values the configuration leaves open.

use std::collections::HashMap;

use async_trait::async_trait;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputOpts {
    /// Stable identifier, e.g. `provider.aws.region`.
    pub id: String,
    pub query: String,
    pub description: Option<String>,
    pub default: Option<String>,
}

#[async_trait]
pub trait UiInput: Send + Sync {
    /// `None` when there is no answer.
    async fn input(&self, opts: &InputOpts) -> Option<String>;
}

/// Answers questions from a fixed map keyed by [`InputOpts::id`].
#[derive(Debug, Clone, Default)]
pub struct MapInput {
    answers: HashMap<String, String>,
}

impl MapInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, id: impl Into<String>, answer: impl Into<String>) -> Self {
        self.answers.insert(id.into(), answer.into());
        self
    }
}

#[async_trait]
impl UiInput for MapInput {
    async fn input(&self, opts: &InputOpts) -> Option<String> {
        self.answers
            .get(&opts.id)
            .cloned()
            .or_else(|| opts.default.clone())
    }
}
