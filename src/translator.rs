use crate::agent::{AgentService, MessageStream, PermissionMode, QueryOptions};
use crate::image;
use crate::protocol::{NormalizedEvent, Variant};
use crate::sdk::{
    AgentMessage, AssistantBlock, ResultMessage, ToolResultContent, ToolResultPart, UserBlock,
};
use crate::session::{ConversationId, SessionId, SessionStore};
use crate::tools;
use futures::stream::{self, Stream, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Maps upstream messages for one turn into normalized events.
pub struct Translator {
    variant: Variant,
    session_id: Option<SessionId>,
}

impl Translator {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            session_id: None,
        }
    }

    /// The most recent session id seen during this turn.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn translate(&mut self, message: &AgentMessage) -> Vec<NormalizedEvent> {
        if let Some(id) = message.session_id() {
            self.session_id = Some(SessionId::new(id));
        }

        match message {
            AgentMessage::Assistant { message, .. } => message
                .blocks()
                .iter()
                .filter_map(|block| self.assistant_block(block))
                .collect(),
            AgentMessage::User { message, .. } => message
                .blocks()
                .iter()
                .flat_map(|block| self.user_block(block))
                .collect(),
            AgentMessage::Result(result) => vec![self.done(result)],
            AgentMessage::System { .. } | AgentMessage::Unknown => Vec::new(),
        }
    }

    fn assistant_block(&self, block: &AssistantBlock) -> Option<NormalizedEvent> {
        match block {
            AssistantBlock::Text { text } if !text.is_empty() => {
                Some(NormalizedEvent::thinking(text.as_str()))
            }
            AssistantBlock::Text { .. } => None,
            AssistantBlock::Image { source } => image::validate(source).map(NormalizedEvent::image),
            AssistantBlock::ToolUse { name, input } => {
                let event = NormalizedEvent::tool_start(tools::summarize(name, input, self.variant));
                Some(self.annotate(event, || json!({ "tool": name, "input": input })))
            }
            AssistantBlock::Unknown => None,
        }
    }

    fn user_block(&self, block: &UserBlock) -> Vec<NormalizedEvent> {
        let UserBlock::ToolResult {
            tool_use_id,
            content,
        } = block
        else {
            return Vec::new();
        };

        let limit = self.variant.tool_result_limit();
        let events = match content {
            ToolResultContent::Text(text) => {
                vec![NormalizedEvent::tool_result(truncate(text, limit))]
            }
            ToolResultContent::Blocks(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ToolResultPart::Text { text } => {
                        Some(NormalizedEvent::tool_result(truncate(text, limit)))
                    }
                    ToolResultPart::Image { source } => {
                        image::validate(source).map(NormalizedEvent::image)
                    }
                    ToolResultPart::Unknown => None,
                })
                .collect(),
            ToolResultContent::Other(_) => vec![NormalizedEvent::tool_result("OK")],
        };

        events
            .into_iter()
            .map(|event| self.annotate(event, || json!({ "tool_use_id": tool_use_id })))
            .collect()
    }

    fn done(&self, result: &ResultMessage) -> NormalizedEvent {
        let content = if result.is_success() {
            self.variant.completed_message().to_string()
        } else {
            format!("Ended: {}", result.subtype)
        };
        let event = NormalizedEvent::done(content, result.subtype.as_str(), self.session_id.clone());
        self.annotate(event, || json!({ "subtype": result.subtype, "result": result.result }))
    }

    fn annotate(&self, event: NormalizedEvent, metadata: impl FnOnce() -> Value) -> NormalizedEvent {
        if self.variant.carries_metadata() {
            event.with_metadata(metadata())
        } else {
            event
        }
    }
}

/// Keeps the first `limit` characters, appending `...` when anything was cut.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Everything one relayed turn needs.
#[derive(Clone)]
pub struct RelayContext {
    pub agent: Arc<dyn AgentService>,
    pub sessions: Arc<SessionStore>,
    pub allowed_tools: Vec<String>,
    pub permission_mode: PermissionMode,
}

pub struct RelayRequest {
    pub prompt: String,
    pub conversation_id: Option<ConversationId>,
    pub variant: Variant,
}

/// Runs one turn against the agent and yields normalized events in arrival
/// order. The stream ends after the first `done` or `error`.
pub fn relay(
    ctx: RelayContext,
    request: RelayRequest,
) -> impl Stream<Item = NormalizedEvent> + Send + 'static {
    let span = info_span!(
        "relay",
        request_id = %Uuid::new_v4(),
        conversation = request.conversation_id.as_ref().map(ConversationId::as_str),
    );
    stream::unfold(Phase::Start(ctx, request), move |phase| {
        phase.advance().instrument(span.clone())
    })
    .flat_map(stream::iter)
}

enum Phase {
    Start(RelayContext, RelayRequest),
    Streaming(Turn),
    Finished,
}

struct Turn {
    upstream: MessageStream,
    translator: Translator,
    sessions: Arc<SessionStore>,
    conversation_id: Option<ConversationId>,
}

impl Phase {
    async fn advance(self) -> Option<(Vec<NormalizedEvent>, Phase)> {
        match self {
            Phase::Start(ctx, request) => {
                let (prelude, turn) = start(ctx, request).await;
                Some((prelude, Phase::Streaming(turn)))
            }
            Phase::Streaming(turn) => turn.pull().await,
            Phase::Finished => None,
        }
    }
}

async fn start(ctx: RelayContext, request: RelayRequest) -> (Vec<NormalizedEvent>, Turn) {
    let resume = match &request.conversation_id {
        Some(conversation) => ctx.sessions.get(conversation).await,
        None => None,
    };
    info!(
        resume = resume.as_ref().map(SessionId::as_str),
        "starting agent turn"
    );

    let prelude = match request.variant {
        Variant::Console => vec![
            NormalizedEvent::thinking("Starting agent...")
                .with_metadata(json!({ "prompt": request.prompt })),
        ],
        Variant::Stream => Vec::new(),
    };

    let options = QueryOptions {
        allowed_tools: ctx.allowed_tools,
        permission_mode: ctx.permission_mode,
        resume: resume.map(|id| id.as_str().to_string()),
    };
    let upstream = ctx.agent.query(request.prompt, options);

    let turn = Turn {
        upstream,
        translator: Translator::new(request.variant),
        sessions: ctx.sessions,
        conversation_id: request.conversation_id,
    };
    (prelude, turn)
}

impl Turn {
    async fn pull(mut self) -> Option<(Vec<NormalizedEvent>, Phase)> {
        loop {
            match self.upstream.next().await {
                Some(Ok(message)) => {
                    let events = self.translator.translate(&message);
                    if matches!(message, AgentMessage::Result(_)) {
                        let session = self.translator.session_id().cloned();
                        if let (Some(conversation), Some(session)) =
                            (self.conversation_id.take(), session)
                        {
                            self.sessions.set(conversation, session).await;
                        }
                        return Some((events, Phase::Finished));
                    }
                    if events.is_empty() {
                        continue;
                    }
                    return Some((events, Phase::Streaming(self)));
                }
                Some(Err(err)) => {
                    warn!(error = %err, "agent stream failed");
                    return Some((vec![NormalizedEvent::error(err.to_string())], Phase::Finished));
                }
                None => {
                    debug!("agent stream ended without a result");
                    return None;
                }
            }
        }
    }
}
