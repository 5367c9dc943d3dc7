use async_trait::async_trait;
use lore_core::{AnswerModel, LoreError, Passage};
use serde_json::{json, Value};

const STUFF_QA_TEMPLATE_HEAD: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Build the "stuff" QA prompt: every passage is placed into a single prompt,
/// closest first.
pub fn stuff_prompt(question: &str, passages: &[Passage]) -> String {
    let context = passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{STUFF_QA_TEMPLATE_HEAD}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
}

#[derive(Debug, Clone)]
pub struct OpenAiAnswerConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
}

impl OpenAiAnswerConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: None,
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_frequency_penalty(mut self, penalty: f64) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }

    pub fn with_presence_penalty(mut self, penalty: f64) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }
}

/// Answers questions through an OpenAI-compatible `/chat/completions` API.
pub struct OpenAiAnswerModel {
    config: OpenAiAnswerConfig,
    client: reqwest::Client,
}

impl OpenAiAnswerModel {
    pub fn new(config: OpenAiAnswerConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &OpenAiAnswerConfig {
        &self.config
    }

    fn build_body(&self, question: &str, passages: &[Passage]) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "user", "content": stuff_prompt(question, passages)},
            ],
        });
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temp) = self.config.temperature {
            body["temperature"] = json!(temp);
        }
        if let Some(top_p) = self.config.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(penalty) = self.config.frequency_penalty {
            body["frequency_penalty"] = json!(penalty);
        }
        if let Some(penalty) = self.config.presence_penalty {
            body["presence_penalty"] = json!(penalty);
        }
        body
    }
}

#[async_trait]
impl AnswerModel for OpenAiAnswerModel {
    async fn answer(&self, question: &str, passages: &[Passage]) -> Result<String, LoreError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&self.build_body(question, passages))
            .send()
            .await
            .map_err(|e| LoreError::Model(format!("chat request: {e}")))?;
        let status = resp.status().as_u16();
        let json: Value = resp
            .json()
            .await
            .map_err(|e| LoreError::Model(format!("chat response parse: {e}")))?;
        if status >= 400 {
            return Err(LoreError::Model(format!("chat API error ({status}): {json}")));
        }
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LoreError::Model("missing choices[0].message.content".to_string()))?;
        tracing::debug!(
            model = %self.config.model,
            passages = passages.len(),
            "answer synthesized"
        );
        Ok(content.to_string())
    }
}
