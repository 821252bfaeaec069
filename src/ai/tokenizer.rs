//! Token Estimation
//!
//! Pre-calculates token counts before content reaches the LLM so the
//! chunker and prompt builder can stay inside the per-call budget.
//! Estimation is code-aware: keywords, operators, and punctuation
//! tokenize individually, so code counts denser than prose.

/// Token counter for budget accounting
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter;

impl TokenCounter {
    /// Estimate token count for a string
    pub fn count(&self, text: &str) -> usize {
        let mut tokens = 0;
        let mut word_len = 0usize;

        for ch in text.chars() {
            match ch {
                '(' | ')' | '{' | '}' | '[' | ']' | ';' | ':' | ',' | '.' | '+' | '-' | '*'
                | '/' | '=' | '<' | '>' | '!' | '&' | '|' | '@' | '#' | '$' | '%' | '^' | '~'
                | '?' | '\\' => {
                    if word_len > 0 {
                        tokens += Self::word_tokens(word_len);
                        word_len = 0;
                    }
                    tokens += 1;
                }
                ' ' | '\t' | '\n' | '\r' => {
                    if word_len > 0 {
                        tokens += Self::word_tokens(word_len);
                        word_len = 0;
                    }
                }
                _ => word_len += 1,
            }
        }

        if word_len > 0 {
            tokens += Self::word_tokens(word_len);
        }

        tokens.max(1)
    }

    fn word_tokens(len: usize) -> usize {
        if len <= 4 {
            1
        } else if len <= 8 {
            2
        } else {
            len.div_ceil(4)
        }
    }

    /// Truncate text so its estimate fits within `limit` tokens.
    /// Cuts at a line boundary and appends a truncation marker.
    pub fn truncate_to(&self, text: &str, limit: usize) -> String {
        if self.count(text) <= limit {
            return text.to_string();
        }

        let mut kept = String::new();
        let mut used = 0usize;
        for line in text.lines() {
            let line_tokens = self.count(line) + 1;
            if used + line_tokens > limit {
                break;
            }
            kept.push_str(line);
            kept.push('\n');
            used += line_tokens;
        }
        kept.push_str("... (truncated)");
        kept
    }
}
