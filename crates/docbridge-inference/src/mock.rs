//! Mock extraction backend for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docbridge_core::ExtractionBackend;
//! use docbridge_inference::mock::MockExtractionBackend;
//!
//! #[tokio::test]
//! async fn test_with_mock_backend() {
//!     let backend = MockExtractionBackend::new()
//!         .with_default_response("ACME invoice")
//!         .with_malformed_reply_for_content("garbled");
//!
//!     let title = backend.extract_field("Invoice", "Extract a title").await.unwrap();
//!     assert_eq!(title, "ACME invoice");
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use docbridge_core::{Error, ExtractionBackend, Result};

/// Mock extraction backend for testing.
#[derive(Clone)]
pub struct MockExtractionBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

/// What the mock answers for a matching call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Successful extraction of this value.
    Value(String),
    /// Reply that does not match the `{info}` schema.
    Malformed,
    /// Inference service error.
    Unavailable,
    /// Panic inside the backend.
    Panic,
}

#[derive(Debug, Clone)]
enum Matcher {
    Instruction(String),
    ContentContains(String),
}

impl Matcher {
    fn matches(&self, content: &str, instruction: &str) -> bool {
        match self {
            Matcher::Instruction(expected) => instruction == expected,
            Matcher::ContentContains(needle) => content.contains(needle.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
struct MockConfig {
    model: String,
    rules: Vec<(Matcher, MockReply)>,
    default_reply: MockReply,
    latency_ms: u64,
    self_check: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            model: "mock-model".to_string(),
            rules: Vec::new(),
            default_reply: MockReply::Value("Mock response".to_string()),
            latency_ms: 0,
            self_check: true,
        }
    }
}

/// A recorded `extract_field` call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub content: String,
    pub instruction: String,
    pub timestamp: std::time::Instant,
}

impl Default for MockExtractionBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractionBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Value returned when no rule matches.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_reply = MockReply::Value(response.into());
        self
    }

    /// Reply returned when no rule matches.
    pub fn with_default_reply(mut self, reply: MockReply) -> Self {
        Arc::make_mut(&mut self.config).default_reply = reply;
        self
    }

    /// Answer `reply` for calls with exactly this instruction.
    pub fn with_reply_for_instruction(mut self, instruction: impl Into<String>, reply: MockReply) -> Self {
        Arc::make_mut(&mut self.config)
            .rules
            .push((Matcher::Instruction(instruction.into()), reply));
        self
    }

    /// Answer `reply` for calls whose document content contains `needle`.
    pub fn with_reply_for_content(mut self, needle: impl Into<String>, reply: MockReply) -> Self {
        Arc::make_mut(&mut self.config)
            .rules
            .push((Matcher::ContentContains(needle.into()), reply));
        self
    }

    /// Shorthand for a schema-violating reply on matching content.
    pub fn with_malformed_reply_for_content(self, needle: impl Into<String>) -> Self {
        self.with_reply_for_content(needle, MockReply::Malformed)
    }

    /// Set simulated latency for every extraction.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Result of `self_check`.
    pub fn with_self_check(mut self, ok: bool) -> Self {
        Arc::make_mut(&mut self.config).self_check = ok;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).model = model.into();
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.call_log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.log().clone()
    }

    /// Number of `extract_field` calls so far.
    pub fn call_count(&self) -> usize {
        self.log().len()
    }

    fn reply_for(&self, content: &str, instruction: &str) -> MockReply {
        self.config
            .rules
            .iter()
            .find(|(matcher, _)| matcher.matches(content, instruction))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.config.default_reply.clone())
    }
}

#[async_trait]
impl ExtractionBackend for MockExtractionBackend {
    async fn extract_field(&self, content: &str, instruction: &str) -> Result<String> {
        self.log().push(MockCall {
            content: content.to_string(),
            instruction: instruction.to_string(),
            timestamp: std::time::Instant::now(),
        });

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        match self.reply_for(content, instruction) {
            MockReply::Value(value) => Ok(value),
            MockReply::Malformed => Err(Error::MalformedResponse(
                "Reply does not match {\"info\": string}: expected value at line 1 column 1"
                    .to_string(),
            )),
            MockReply::Unavailable => Err(Error::Inference(
                "Ollama returned 503 Service Unavailable".to_string(),
            )),
            MockReply::Panic => panic!("mock backend panic for instruction '{}'", instruction),
        }
    }

    async fn self_check(&self) -> Result<bool> {
        Ok(self.config.self_check)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
