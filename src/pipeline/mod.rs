//! Pipeline stages from selected files to streamed question-paper text.
//!
//! Each submodule implements exactly one step, so each can be tested without
//! the others and the network stage can be stubbed out entirely.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ extract ──▶ request ──▶ llm ──▶ (chunks)
//! (files)    (pdfium)    (+encode)   (+sse)
//! ```
//!
//! 1. [`source`]: read and classify the selection (all PDFs or all images)
//! 2. [`extract`]: pull the text layer out of PDFs; blocking, so callers run
//!    it in `spawn_blocking`
//! 3. [`encode`]: base64-wrap image bytes as inline request parts
//! 4. [`request`]: assemble system instruction and payload, truncating long
//!    text sources
//! 5. [`llm`]: the streaming Gemini call; the only stage with network I/O
//! 6. [`sse`]: incremental decoding of the event stream `llm` reads

pub mod encode;
pub mod extract;
pub mod llm;
pub mod request;
pub mod source;
pub mod sse;
