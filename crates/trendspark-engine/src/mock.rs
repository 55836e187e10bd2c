//! Scripted stand-ins for the external services
//!
//! Used by the unit and integration tests, and handy for running the
//! pipeline offline.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{EngineError, Result};
use crate::providers::{GenerationParams, TextGenerator};
use crate::search::{SearchBackend, SearchItem, SearchResponse};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// `EngineError` is not `Clone` (it can wrap `io::Error`); rebuild it.
fn replicate(error: &EngineError) -> EngineError {
    match error {
        EngineError::MissingCredential(m) => EngineError::MissingCredential(m.clone()),
        EngineError::NoUsableModel { attempts } => EngineError::NoUsableModel {
            attempts: attempts.clone(),
        },
        EngineError::InvalidConfig(m) => EngineError::InvalidConfig(m.clone()),
        EngineError::InvalidInput(m) => EngineError::InvalidInput(m.clone()),
        EngineError::Http(m) => EngineError::Http(m.clone()),
        EngineError::Provider { status, message } => EngineError::Provider {
            status: *status,
            message: message.clone(),
        },
        EngineError::EmptyCompletion => EngineError::EmptyCompletion,
        EngineError::Serialization(m) => EngineError::Serialization(m.clone()),
        EngineError::Io(e) => EngineError::Io(std::io::Error::new(e.kind(), e.to_string())),
    }
}

#[derive(Debug)]
enum Reply {
    Text(String),
    Fail(EngineError),
}

/// Returns queued replies in order; fails once the script runs out
#[derive(Debug)]
pub struct ScriptedGenerator {
    model: String,
    replies: Mutex<VecDeque<Reply>>,
    always_fail: Option<EngineError>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(model: &str, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: model.to_string(),
            replies: Mutex::new(replies.into_iter().map(|r| Reply::Text(r.into())).collect()),
            always_fail: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A generator whose every call fails with `error`.
    pub fn failing(model: &str, error: EngineError) -> Self {
        Self {
            model: model.to_string(),
            replies: Mutex::new(VecDeque::new()),
            always_fail: Some(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failure after the replies queued so far.
    pub fn then_fail(self, error: EngineError) -> Self {
        lock(&self.replies).push_back(Reply::Fail(error));
        self
    }

    /// Queue a text reply.
    pub fn then_reply(self, text: impl Into<String>) -> Self {
        lock(&self.replies).push_back(Reply::Text(text.into()));
        self
    }

    pub fn calls(&self) -> usize {
        lock(&self.prompts).len()
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        lock(&self.prompts).push(prompt.to_string());

        if let Some(error) = &self.always_fail {
            return Err(replicate(error));
        }

        match lock(&self.replies).pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(error)) => Err(error),
            None => Err(EngineError::Http("scripted replies exhausted".to_string())),
        }
    }
}

/// Search backend with a fixed answer
#[derive(Debug)]
pub struct StaticSearchBackend {
    result: std::result::Result<SearchResponse, EngineError>,
    calls: AtomicUsize,
    last: Mutex<Option<(String, u8)>>,
}

impl StaticSearchBackend {
    pub fn with_items(items: Vec<SearchItem>) -> Self {
        Self {
            result: Ok(SearchResponse { items }),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn failing(error: EngineError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        lock(&self.last).as_ref().map(|(q, _)| q.clone())
    }

    pub fn last_num(&self) -> Option<u8> {
        lock(&self.last).as_ref().map(|(_, n)| *n)
    }
}

#[async_trait]
impl SearchBackend for StaticSearchBackend {
    async fn query(&self, query: &str, num: u8) -> Result<SearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last) = Some((query.to_string(), num));

        match &self.result {
            Ok(response) => Ok(response.clone()),
            Err(error) => Err(replicate(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_generator_order() {
        let generator = ScriptedGenerator::new("m", ["one"])
            .then_fail(EngineError::EmptyCompletion)
            .then_reply("three");
        let params = GenerationParams::new();

        assert_eq!(generator.generate("p1", &params).await.unwrap(), "one");
        assert!(matches!(
            generator.generate("p2", &params).await,
            Err(EngineError::EmptyCompletion)
        ));
        assert_eq!(generator.generate("p3", &params).await.unwrap(), "three");
        assert!(generator.generate("p4", &params).await.is_err());
        assert_eq!(generator.calls(), 4);
        assert_eq!(generator.prompts()[0], "p1");
    }

    #[test]
    fn test_replicate_io_error() {
        let original = EngineError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        match replicate(&original) {
            EngineError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected {other}"),
        }
    }
}
