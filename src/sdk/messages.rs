use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// One line of the agent's `stream-json` output.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    System {
        #[serde(default)]
        session_id: Option<String>,
    },
    Assistant {
        message: MessageBody<AssistantBlock>,
        #[serde(default)]
        session_id: Option<String>,
    },
    User {
        message: MessageBody<UserBlock>,
        #[serde(default)]
        session_id: Option<String>,
    },
    Result(ResultMessage),
    #[serde(other)]
    Unknown,
}

impl AgentMessage {
    pub fn session_id(&self) -> Option<&str> {
        let id = match self {
            AgentMessage::System { session_id, .. }
            | AgentMessage::Assistant { session_id, .. }
            | AgentMessage::User { session_id, .. } => session_id.as_deref(),
            AgentMessage::Result(result) => result.session_id.as_deref(),
            AgentMessage::Unknown => None,
        };
        id.filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "B: DeserializeOwned + Fallback"))]
pub struct MessageBody<B> {
    /// User prompts are echoed back as plain strings; only block lists are relayed.
    #[serde(default, deserialize_with = "block_list")]
    content: Vec<B>,
}

impl<B> MessageBody<B> {
    pub fn blocks(&self) -> &[B] {
        &self.content
    }
}

/// The variant a block decodes to when its own body is malformed.
pub trait Fallback {
    fn fallback() -> Self;
}

fn block_list<'de, D, B>(deserializer: D) -> Result<Vec<B>, D::Error>
where
    D: Deserializer<'de>,
    B: DeserializeOwned + Fallback,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(decode_block).collect(),
        _ => Vec::new(),
    })
}

// Each block decodes on its own so one bad block leaves its siblings intact.
fn decode_block<B: DeserializeOwned + Fallback>(item: Value) -> B {
    serde_json::from_value(item).unwrap_or_else(|err| {
        warn!(error = %err, "skipping malformed content block");
        B::fallback()
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantBlock {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
    },
    ToolUse {
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

impl Fallback for AssistantBlock {
    fn fallback() -> Self {
        AssistantBlock::Unknown
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserBlock {
    ToolResult {
        #[serde(default)]
        tool_use_id: Option<String>,
        #[serde(default)]
        content: ToolResultContent,
    },
    #[serde(other)]
    Unknown,
}

impl Fallback for UserBlock {
    fn fallback() -> Self {
        UserBlock::Unknown
    }
}

#[derive(Debug, Clone)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ToolResultPart>),
    Other(Value),
}

impl<'de> Deserialize<'de> for ToolResultContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => ToolResultContent::Text(text),
            Value::Array(items) => {
                ToolResultContent::Blocks(items.into_iter().map(decode_block).collect())
            }
            other => ToolResultContent::Other(other),
        })
    }
}

impl Default for ToolResultContent {
    fn default() -> Self {
        ToolResultContent::Other(Value::Null)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResultPart {
    Text { text: String },
    Image { source: ImageSource },
    #[serde(other)]
    Unknown,
}

impl Fallback for ToolResultPart {
    fn fallback() -> Self {
        ToolResultPart::Unknown
    }
}

/// Image payload as the agent reports it, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    Base64 {
        #[serde(default)]
        media_type: Option<Value>,
        #[serde(default)]
        data: Option<Value>,
    },
    Url {
        #[serde(default)]
        url: Option<Value>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultMessage {
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl ResultMessage {
    pub fn is_success(&self) -> bool {
        self.subtype == "success"
    }
}

/// Decode a single NDJSON line. Unknown message types decode to `Unknown`.
pub fn parse_line(line: &str) -> Result<AgentMessage, serde_json::Error> {
    serde_json::from_str(line)
}
