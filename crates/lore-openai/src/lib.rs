mod answer_model;
mod scripted;

pub use answer_model::{stuff_prompt, OpenAiAnswerConfig, OpenAiAnswerModel};
pub use scripted::{AnswerCall, ScriptedAnswerModel};

pub use lore_core::{AnswerModel, Passage};
