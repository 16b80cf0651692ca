use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use crate::llm::{CompletionClient, CompletionError, CompletionRequest};

type Responder = dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync;

/// Completion double that answers from a closure and records every prompt.
#[derive(Clone)]
pub struct ScriptedClient {
    responder: Arc<Responder>,
    prompts: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl ScriptedClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            prompts: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    pub fn fixed(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn calls_containing(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(request)
    }
}

/// Answer a relevance prompt with YES for every listed claim whose text
/// contains `keyword` (case-insensitive), NO otherwise.
pub fn keyword_verdicts(prompt: &str, keyword: &str) -> String {
    let keyword = keyword.to_lowercase();
    prompt
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("Claim "))
        .map(|line| {
            if line.to_lowercase().contains(&keyword) {
                "YES"
            } else {
                "NO"
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub const RELEVANCE_MARKER: &str = "comma-separated list of YES or NO";
pub const EXPLANATION_MARKER: &str = "Generate a concise explanation";
pub const FEATURES_MARKER: &str = "List 3-5 specific technical features";
pub const NARRATIVE_MARKER: &str = "overall risk assessment";

/// Answer by prompt kind: relevance verdicts by keyword, fixed text otherwise.
pub fn pipeline_response(
    request: &CompletionRequest,
    keyword: &str,
) -> Result<String, CompletionError> {
    let prompt = &request.prompt;
    if prompt.contains(RELEVANCE_MARKER) {
        Ok(keyword_verdicts(prompt, keyword))
    } else if prompt.contains(EXPLANATION_MARKER) {
        Ok("The product mirrors the claimed coil arrangement.".to_string())
    } else if prompt.contains(FEATURES_MARKER) {
        Ok("- Coil array\n- Alignment magnets\n- Foreign object detection\n".to_string())
    } else if prompt.contains(NARRATIVE_MARKER) {
        Ok("Overall exposure is concentrated in charging products.".to_string())
    } else {
        Err(CompletionError::Malformed("unexpected prompt".into()))
    }
}

pub fn pipeline_client(keyword: &'static str) -> ScriptedClient {
    ScriptedClient::new(move |request| pipeline_response(request, keyword))
}
