use crate::protocol::Variant;
use crate::session::ConversationId;
use crate::transport::sse_events;
use crate::translator::{RelayContext, RelayRequest, relay};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONNECTION};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use futures::StreamExt;
use serde::Deserialize;
use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

const INDEX_HTML: &str = include_str!("../assets/index.html");

pub struct ServerConfig {
    pub listen: SocketAddr,
}

type ServerResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub fn router(ctx: RelayContext) -> axum::Router {
    axum::Router::new()
        .route("/", get(index))
        .route("/stream", get(stream))
        .with_state(ctx)
}

pub async fn run(config: ServerConfig, ctx: RelayContext) -> ServerResult<()> {
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!(address = %listener.local_addr()?, "server listening");
    println!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, router(ctx)).await?;

    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Deserialize)]
struct StreamParams {
    prompt: Option<String>,
    #[serde(rename = "conversationId")]
    conversation_id: Option<String>,
}

async fn stream(State(ctx): State<RelayContext>, Query(params): Query<StreamParams>) -> Response {
    let Some(prompt) = params.prompt.filter(|prompt| !prompt.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing prompt").into_response();
    };

    let request = RelayRequest {
        prompt,
        conversation_id: params
            .conversation_id
            .filter(|id| !id.is_empty())
            .map(ConversationId::new),
        variant: Variant::Stream,
    };
    let events = sse_events(relay(ctx, request)).boxed();

    (
        [(CACHE_CONTROL, "no-cache"), (CONNECTION, "keep-alive")],
        Sse::new(events).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keep-alive"),
        ),
    )
        .into_response()
}
