//! Content signatures for pattern learning.
//!
//! Two chunks carry the same signature when their identifier structure
//! matches, regardless of whitespace, literals, or punctuation. The
//! signature is a SHA-256 over the first 800 identifier tokens, lowercased.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_]+").expect("static pattern"));

/// Maximum identifier tokens folded into a signature.
const MAX_TOKENS: usize = 800;

/// Compute the learning signature of a piece of content.
///
/// Falls back to a trimmed, lowercased prefix of the raw content when no
/// identifier tokens are present (e.g. pure data files).
#[must_use]
pub fn fingerprint(content: &str) -> String {
    let tokens: Vec<&str> = IDENTIFIER
        .find_iter(content)
        .take(MAX_TOKENS)
        .map(|m| m.as_str())
        .collect();

    let normalized = if tokens.is_empty() {
        content.trim().to_lowercase().chars().take(MAX_TOKENS).collect::<String>()
    } else {
        tokens.join(" ").to_lowercase()
    };

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Whether two replacements are materially identical.
///
/// Used by pattern promotion: fixes only count toward the promotion
/// threshold when the replacement agrees after whitespace normalization.
#[must_use]
pub fn replacements_match(a: &str, b: &str) -> bool {
    let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
    normalize(a) == normalize(b)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
