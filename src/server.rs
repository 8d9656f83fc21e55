//! Webhook server for the order bot.
//!
//! One unauthenticated `POST /` endpoint receiving the chat platform's
//! form-encoded outgoing webhook (`text`, `user_name`). The reply is either
//! an empty body or the JSON chat payload.

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::bot::{format_reply, OrderBot};

/// Fields of the outgoing webhook the bot reads
#[derive(Debug, Deserialize)]
pub struct WebhookForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_name: String,
}

/// Router with the webhook endpoint
pub fn router(bot: Arc<OrderBot>) -> Router {
    Router::new()
        .route("/", post(handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(bot)
}

/// Bind and serve until the process stops
pub async fn start_server(bind_address: &str, bot: Arc<OrderBot>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    info!(address = %bind_address, "Order bot webhook listening");
    axum::serve(listener, router(bot)).await?;
    Ok(())
}

async fn handle_webhook(
    State(bot): State<Arc<OrderBot>>,
    Form(form): Form<WebhookForm>,
) -> Response {
    if form.user_name.trim().is_empty() {
        return StatusCode::OK.into_response();
    }

    match bot.handle(&form.user_name, &form.text).await {
        Ok(reply) => match format_reply(bot.config(), &reply) {
            Some(payload) => Json(payload).into_response(),
            None => StatusCode::OK.into_response(),
        },
        Err(e) => {
            if e.is_unavailable() {
                warn!(user = %form.user_name, error = %e, "Order store unavailable");
            } else {
                error!(user = %form.user_name, error = %e, "Request failed on the order store");
            }
            (StatusCode::INTERNAL_SERVER_ERROR, "order store unavailable").into_response()
        }
    }
}
