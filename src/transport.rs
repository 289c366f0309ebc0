use crate::protocol::NormalizedEvent;
use axum::response::sse::Event;
use futures::stream::{Stream, StreamExt};
use std::io::{self, Write};

/// One SSE frame per event: `data: <json>\n\n`.
pub fn sse_events(
    events: impl Stream<Item = NormalizedEvent> + Send + 'static,
) -> impl Stream<Item = Result<Event, axum::Error>> + Send + 'static {
    events.map(|event| Event::default().json_data(&event))
}

/// Writes each event as a single JSON line, flushing after every line.
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn send(&mut self, event: &NormalizedEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}
