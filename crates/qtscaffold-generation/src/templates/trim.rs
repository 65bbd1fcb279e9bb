//! Whitespace trim markers
//!
//! `{{- ` drops the whitespace run that ends right before the directive and
//! ` -}}` drops the run that starts right after it. The pass runs over the
//! token stream after lexing, so it only ever touches literal template text
//! and never output produced by another directive.

use crate::templates::parser::Token;

fn is_trim_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Text with its trailing whitespace run removed
pub fn trim_run_before(text: &str) -> &str {
    text.trim_end_matches(is_trim_space)
}

/// Text with its leading whitespace run removed
pub fn trim_run_after(text: &str) -> &str {
    text.trim_start_matches(is_trim_space)
}

/// Apply every directive's trim flags to its neighbouring text tokens
///
/// Text tokens emptied by trimming are dropped.
pub(crate) fn apply_trim_markers(tokens: &mut Vec<Token>) {
    for i in 0..tokens.len() {
        let (trim_left, trim_right) = match &tokens[i] {
            Token::Action {
                trim_left,
                trim_right,
                ..
            } => (*trim_left, *trim_right),
            Token::Text(_) => continue,
        };

        if trim_left && i > 0 {
            if let Token::Text(text) = &mut tokens[i - 1] {
                let kept = trim_run_before(text).len();
                text.truncate(kept);
            }
        }

        if trim_right {
            if let Some(Token::Text(text)) = tokens.get_mut(i + 1) {
                let dropped = text.len() - trim_run_after(text).len();
                text.drain(..dropped);
            }
        }
    }

    tokens.retain(|token| !matches!(token, Token::Text(text) if text.is_empty()));
}
