use crate::protocol::Variant;
use crate::transport::ConsoleSink;
use crate::translator::{RelayContext, RelayRequest, relay};
use futures::StreamExt;
use std::io::Write;

pub const DEFAULT_PROMPT: &str = "Review utils.py for bugs and fix any issues you find.";

/// Runs a single turn and prints each event as a JSON line.
pub async fn run<W: Write>(ctx: RelayContext, prompt: String, out: W) -> std::io::Result<()> {
    let request = RelayRequest {
        prompt,
        conversation_id: None,
        variant: Variant::Console,
    };

    let mut sink = ConsoleSink::new(out);
    let mut events = Box::pin(relay(ctx, request));
    while let Some(event) = events.next().await {
        sink.send(&event)?;
    }
    Ok(())
}
