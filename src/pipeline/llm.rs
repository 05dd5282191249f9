//! Generation service: stream a question paper from Gemini.
//!
//! The service is a trait so the session can be driven by a stub in tests and
//! by [`GeminiClient`] in production. A call returns a [`ChunkStream`]: text
//! chunks in arrival order, ending either normally or with exactly one error
//! item, after which nothing more is yielded.
//!
//! ## Wire format
//!
//! `POST {base}/models/{model}:streamGenerateContent?alt=sse` with the key in
//! `x-goog-api-key`. The response is SSE; each `data:` event is a JSON
//! `GenerateContentResponse` whose `candidates[0].content.parts[*].text`
//! are concatenated into one chunk. An `error` object, in the HTTP body or
//! inside an event, ends the stream with a classified [`QpaperError`].
//!
//! ## No retries
//!
//! A failed call is surfaced once. Re-submission is the user's decision.

use crate::config::ApiCredential;
use crate::error::QpaperError;
use crate::pipeline::request::{GenerationRequest, Part, Payload};
use crate::pipeline::sse::SseDecoder;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// Default REST endpoint of the Gemini API.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A boxed stream of generated text chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, QpaperError>> + Send>>;

/// A streaming text-generation backend.
pub trait GenerationService: Send + Sync {
    /// Start one streaming call.
    ///
    /// Connection and authorization failures are delivered as the first (and
    /// only) item of the stream rather than as a separate error path.
    fn stream_generate(&self, request: GenerationRequest) -> ChunkStream;
}

/// Drive one streaming call to completion, handing each non-empty chunk to
/// `on_chunk` in arrival order.
///
/// Returns the number of chunks delivered. On error, chunks already handed
/// to `on_chunk` stay delivered; nothing after the error is.
pub async fn stream_generation<F>(
    service: &dyn GenerationService,
    request: GenerationRequest,
    mut on_chunk: F,
) -> Result<usize, QpaperError>
where
    F: FnMut(&str),
{
    info!("Starting generation with model {}", request.model);
    let mut stream = service.stream_generate(request);
    let mut delivered = 0usize;

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) if chunk.is_empty() => continue,
            Ok(chunk) => {
                on_chunk(&chunk);
                delivered += 1;
            }
            Err(e) => {
                warn!("Generation failed after {delivered} chunks: {e}");
                return Err(e);
            }
        }
    }

    debug!("Generation complete: {delivered} chunks");
    Ok(delivered)
}

// ── Gemini client ─────────────────────────────────────────────────────────

/// [`GenerationService`] backed by the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    credential: ApiCredential,
    base_url: String,
}

impl GeminiClient {
    pub fn new(credential: ApiCredential) -> Self {
        Self {
            http: reqwest::Client::new(),
            credential,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Point the client at another endpoint (proxy, mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        )
    }
}

impl GenerationService for GeminiClient {
    fn stream_generate(&self, request: GenerationRequest) -> ChunkStream {
        let url = self.endpoint(&request.model);
        let body = WireRequest::from(&request);
        let call = self
            .http
            .post(url)
            .header("x-goog-api-key", self.credential.expose())
            .json(&body)
            .send();

        let opened = async move {
            let response = call.await.map_err(|e| QpaperError::Transport {
                detail: e.to_string(),
            })?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(classify_http_error(status.as_u16(), &text));
            }
            Ok(response)
        };

        let s = stream::once(opened)
            .map(|opened| match opened {
                Ok(response) => sse_chunks(response).left_stream(),
                Err(e) => stream::once(async move { Err(e) }).right_stream(),
            })
            .flatten();

        Box::pin(s)
    }
}

/// Turn a successful SSE response into a chunk stream.
fn sse_chunks(
    response: reqwest::Response,
) -> impl Stream<Item = Result<String, QpaperError>> + Send {
    let state = SseState {
        bytes: Box::pin(
            response
                .bytes_stream()
                .map(|r| r.map(|b| b.to_vec()).map_err(|e| e.to_string())),
        ),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(buf)) => {
                    let events = st.decoder.push(&buf);
                    st.enqueue(events);
                }
                Some(Err(e)) => {
                    st.pending
                        .push_back(Err(QpaperError::Transport { detail: e }));
                    st.done = true;
                }
                None => {
                    let tail = st.decoder.finish();
                    st.enqueue(tail);
                    st.done = true;
                }
            }
        }
    })
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, String>> + Send>>;

struct SseState {
    bytes: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, QpaperError>>,
    done: bool,
}

impl SseState {
    /// Parse decoded events; stop at the first error so nothing follows it.
    fn enqueue(&mut self, events: impl IntoIterator<Item = String>) {
        for event in events {
            if self.done {
                return;
            }
            let item = parse_event(&event);
            if item.is_err() {
                self.done = true;
            }
            self.pending.push_back(item);
        }
    }
}

/// Parse one SSE payload into the text it carries.
pub fn parse_event(data: &str) -> Result<String, QpaperError> {
    let chunk: WireResponse =
        serde_json::from_str(data).map_err(|e| QpaperError::ServiceError {
            message: format!("malformed stream chunk: {e}"),
        })?;

    if let Some(err) = chunk.error {
        return Err(classify_api_error(err.code.unwrap_or(0), &err));
    }

    let text = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text)
}

// ── Error classification ─────────────────────────────────────────────────

/// Map a non-2xx HTTP response to a user-facing error.
pub fn classify_http_error(status: u16, body: &str) -> QpaperError {
    match serde_json::from_str::<WireErrorEnvelope>(body) {
        Ok(envelope) => classify_api_error(status, &envelope.error),
        Err(_) => classify_message(status, body.trim(), ""),
    }
}

fn classify_api_error(status: u16, err: &WireError) -> QpaperError {
    let reason = err
        .details
        .iter()
        .filter_map(|d| d.reason.as_deref())
        .collect::<Vec<_>>()
        .join(",");
    let message = err.message.as_deref().unwrap_or("");
    let reason = if reason.is_empty() {
        err.status.as_deref().unwrap_or("").to_string()
    } else {
        reason
    };
    classify_message(status, message, &reason)
}

fn classify_message(status: u16, message: &str, reason: &str) -> QpaperError {
    let lower = message.to_ascii_lowercase();
    if reason.contains("API_KEY_INVALID")
        || message.contains("API_KEY_INVALID")
        || lower.contains("api key not valid")
        || status == 401
    {
        return QpaperError::InvalidCredential;
    }
    if status == 403 || reason.contains("PERMISSION_DENIED") || lower.contains("permission") {
        return QpaperError::ServicePermissionDenied {
            detail: message.to_string(),
        };
    }
    if status == 429 || reason.contains("RESOURCE_EXHAUSTED") {
        return QpaperError::QuotaExceeded {
            detail: message.to_string(),
        };
    }
    let message = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        message.to_string()
    };
    QpaperError::ServiceError { message }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    system_instruction: WireContent,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireBlob>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob {
    mime_type: String,
    data: String,
}

impl From<&GenerationRequest> for WireRequest {
    fn from(request: &GenerationRequest) -> Self {
        let parts = match &request.payload {
            Payload::Text(text) => vec![WirePart::text(text)],
            Payload::MultiPart(parts) => parts
                .iter()
                .map(|p| match p {
                    Part::Text(text) => WirePart::text(text),
                    Part::InlineData(d) => WirePart {
                        text: None,
                        inline_data: Some(WireBlob {
                            mime_type: d.mime_type.clone(),
                            data: d.data.clone(),
                        }),
                    },
                })
                .collect(),
        };
        WireRequest {
            contents: vec![WireContent {
                role: Some("user".into()),
                parts,
            }],
            system_instruction: WireContent {
                role: None,
                parts: vec![WirePart::text(&request.system_instruction)],
            },
        }
    }
}

impl WirePart {
    fn text(text: &str) -> Self {
        WirePart {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
    #[serde(default)]
    details: Vec<WireErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    reason: Option<String>,
}
