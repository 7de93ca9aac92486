//! Prompt construction and reply parsing for field extraction.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use docbridge_core::{Error, Result};

/// Fixed system prompt sent ahead of every extraction request.
pub const SYSTEM_PROMPT: &str = "You are a personalized document analyzer. \
Your task is to analyze documents and extract relevant information. \
Analyze the document content which you will get in the next message. \
After that, I will send you the instruction which information you need to extract. \
Be short and concise and answer without any other additional information and without control characters. \
Correct spelling or other errors in your answer. \
Return the info in JSON format.";

/// Chat API message for `/api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Messages for one extraction: system prompt, document text, instruction.
pub fn extraction_messages(content: &str, instruction: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::system(content),
        ChatMessage::user(instruction),
    ]
}

/// JSON schema the model output is constrained to: `{"info": string}`.
pub fn info_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "info": {"type": "string"}
        },
        "required": ["info"]
    })
}

#[derive(Deserialize)]
struct InfoReply {
    info: String,
}

/// Extract the `info` value from a model reply.
pub fn parse_info_reply(content: &str) -> Result<String> {
    let reply: InfoReply = serde_json::from_str(content.trim()).map_err(|e| {
        Error::MalformedResponse(format!("Reply does not match {{\"info\": string}}: {}", e))
    })?;
    Ok(reply.info)
}
