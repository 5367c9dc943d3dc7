use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use lore_core::{AnswerModel, LoreError, Passage};

/// One recorded call to a [`ScriptedAnswerModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerCall {
    pub question: String,
    pub passages: Vec<Passage>,
}

/// An answer model that replays scripted responses and records every call.
///
/// Once the script is exhausted the fallback answer is returned.
pub struct ScriptedAnswerModel {
    script: Mutex<VecDeque<Result<String, LoreError>>>,
    fallback: String,
    calls: Mutex<Vec<AnswerCall>>,
}

impl ScriptedAnswerModel {
    pub fn new(responses: Vec<Result<String, LoreError>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            fallback: String::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A model that always answers with `answer`.
    pub fn always(answer: impl Into<String>) -> Self {
        Self {
            fallback: answer.into(),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> Vec<AnswerCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl AnswerModel for ScriptedAnswerModel {
    async fn answer(&self, question: &str, passages: &[Passage]) -> Result<String, LoreError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(AnswerCall {
                question: question.to_string(),
                passages: passages.to_vec(),
            });
        let next = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}
