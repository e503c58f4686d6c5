//! Pipeline stages for document-to-HTML conversion.
//!
//! Each submodule implements exactly one transformation step so each can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ postprocess
//! (file/paste) (base64)  (Gemini)  (fence strip)
//! ```
//!
//! 1. [`input`]: turn a picked file or a paste event into a `PendingInput`
//! 2. [`encode`]: base64 + MIME for files, lead-in sentence for text
//! 3. [`llm`]: the single model call; the only stage with network I/O
//! 4. [`postprocess`]: remove stray code-fence markers and trim

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
