use serde::{Deserialize, Serialize};
use tracing::debug;

/// A literal substring substitution applied to fetched text content before
/// it is written locally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RewriteRule {
    pub pattern: String,
    pub replacement: String,
}

/// Applies an ordered list of rewrite rules to fetched content.
///
/// Content that does not decode as UTF-8 is treated as binary and passed
/// through untouched. When no rule changes the text, the original bytes are
/// returned as-is so callers can rely on byte-identical output for no-op
/// rewrites.
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    rules: Vec<RewriteRule>,
}

impl Rewriter {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    /// Pure function over the content bytes; the path is used only for
    /// diagnostics. Callers own the surrounding read and write.
    pub fn rewrite(&self, path: &str, bytes: Vec<u8>) -> Vec<u8> {
        if self.rules.is_empty() {
            return bytes;
        }

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(error) => {
                debug!("Skipping rewrite of binary content: {}", path);
                return error.into_bytes();
            }
        };

        let mut rewritten = text.clone();
        for rule in &self.rules {
            rewritten = rewritten.replace(&rule.pattern, &rule.replacement);
        }

        if rewritten == text {
            text.into_bytes()
        } else {
            debug!("Rewrote content of {}", path);
            rewritten.into_bytes()
        }
    }
}
