//! Post-processing: strip code-fence markers from the model's HTML reply.
//!
//! The prompt asks for bare HTML, but models still wrap replies in
//! ` ```html ... ``` ` (or `latex` / `tex` fences) from time to time. Those
//! markers are removed wherever they appear, not only at the edges, and the
//! result is trimmed. Nothing else about the markup is touched.

use once_cell::sync::Lazy;
use regex::Regex;

// Longer markers first so "```html" is not reduced to "html".
static RE_FENCE_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```html|```latex|```tex|```").unwrap());

/// Remove every fence marker and trim surrounding whitespace.
///
/// Pure and idempotent; `sanitize("")` is `""`.
pub fn sanitize(raw: &str) -> String {
    RE_FENCE_MARKERS.replace_all(raw, "").trim().to_string()
}
