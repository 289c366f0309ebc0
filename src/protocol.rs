use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which front end the events are shaped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Browser over SSE.
    Stream,
    /// JSON lines on stdout, with metadata.
    Console,
}

impl Variant {
    pub fn tool_result_limit(self) -> usize {
        match self {
            Variant::Stream => 150,
            Variant::Console => 200,
        }
    }

    pub fn completed_message(self) -> &'static str {
        match self {
            Variant::Stream => "Task completed",
            Variant::Console => "Task completed successfully",
        }
    }

    pub fn carries_metadata(self) -> bool {
        matches!(self, Variant::Console)
    }
}

/// A client-facing event: `{type, content, sessionId?, metadata?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Thinking {
        content: String,
    },
    ToolStart {
        content: String,
    },
    ToolResult {
        content: String,
    },
    Image {
        content: String,
    },
    Done {
        content: String,
        #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
        #[serde(skip)]
        subtype: String,
    },
    Error {
        content: String,
    },
}

impl NormalizedEvent {
    fn new(kind: EventKind) -> Self {
        Self {
            kind,
            metadata: None,
        }
    }

    pub fn thinking(content: impl Into<String>) -> Self {
        Self::new(EventKind::Thinking {
            content: content.into(),
        })
    }

    pub fn tool_start(content: impl Into<String>) -> Self {
        Self::new(EventKind::ToolStart {
            content: content.into(),
        })
    }

    pub fn tool_result(content: impl Into<String>) -> Self {
        Self::new(EventKind::ToolResult {
            content: content.into(),
        })
    }

    pub fn image(reference: impl Into<String>) -> Self {
        Self::new(EventKind::Image {
            content: reference.into(),
        })
    }

    pub fn done(
        content: impl Into<String>,
        subtype: impl Into<String>,
        session_id: Option<SessionId>,
    ) -> Self {
        Self::new(EventKind::Done {
            content: content.into(),
            session_id,
            subtype: subtype.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        let content = if message.is_empty() {
            "Unknown error".to_string()
        } else {
            message
        };
        Self::new(EventKind::Error { content })
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn content(&self) -> &str {
        match &self.kind {
            EventKind::Thinking { content }
            | EventKind::ToolStart { content }
            | EventKind::ToolResult { content }
            | EventKind::Image { content }
            | EventKind::Done { content, .. }
            | EventKind::Error { content } => content,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::Done { .. } | EventKind::Error { .. })
    }
}
