use chatline_session::SessionId;
use serde::Serialize;
use serde_json::Value;
use snafu::ResultExt;

use super::error::{DecodeSnafu, EncodeSnafu, ExchangeResult};
use super::tracker::ExchangeId;

/// Body of one `POST /chat`; built fresh per send and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeRequest {
    pub agent_name: String,
    pub input: String,
    pub session_id: String,
}

impl ExchangeRequest {
    pub fn new(
        agent_name: impl Into<String>,
        input: impl Into<String>,
        session_id: &SessionId,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            input: input.into(),
            session_id: session_id.to_string(),
        }
    }

    pub fn to_json(&self) -> ExchangeResult<String> {
        serde_json::to_string(self).context(EncodeSnafu {
            stage: "encode-chat-request",
        })
    }
}

/// A reply that made it into the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeReply {
    pub exchange: ExchangeId,
    /// Display text extracted from the response, before rendering.
    pub text: String,
    pub markup: String,
}

/// Parses a response body; any non-JSON body is a decode failure.
pub fn decode_body(raw: &str) -> ExchangeResult<Value> {
    serde_json::from_str(raw).context(DecodeSnafu {
        stage: "decode-chat-response",
    })
}

/// Picks the text to display from a response body.
///
/// Precedence: a non-empty `result.output` string, then `result` itself (a string
/// verbatim, anything else serialized), then the whole body serialized.
pub fn extract_reply_text(body: &Value) -> String {
    let result = body.get("result").filter(|value| !is_blank(value));

    if let Some(output) = result
        .and_then(|result| result.get("output"))
        .and_then(Value::as_str)
        .filter(|output| !output.is_empty())
    {
        return output.to_string();
    }

    match result {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => body.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}
