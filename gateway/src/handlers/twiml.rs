//! Telephony webhook responder.
//!
//! When a call comes in, the telephony platform requests `/twiml` and
//! receives a markup document telling it to open a ConversationRelay
//! WebSocket to this gateway.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::state::AppState;

/// Pre-rendered webhook markup.
#[derive(Debug, Clone)]
pub struct TwimlDocument {
    body: String,
}

impl TwimlDocument {
    /// Render the ConversationRelay document for `ws_url` and `greeting`.
    ///
    /// Attribute values are XML-escaped.
    pub fn new(ws_url: &str, greeting: &str) -> Self {
        let body = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Connect>
    <ConversationRelay url="{}" welcomeGreeting="{}" />
  </Connect>
</Response>"#,
            escape_xml_attr(ws_url),
            escape_xml_attr(greeting)
        );
        Self { body }
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }
}

/// Escape a string for use inside a double-quoted XML attribute.
fn escape_xml_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Webhook handler, mounted for every HTTP method on `/twiml`.
///
/// Stateless apart from the pre-rendered document; never fails.
pub async fn twiml_handler(State(state): State<Arc<AppState>>) -> Response {
    info!("Serving ConversationRelay webhook markup");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        state.twiml.as_str().to_owned(),
    )
        .into_response()
}
