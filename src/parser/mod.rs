//! Parsing of the spec section, element definitions, and layer descriptors

pub mod descriptor;
pub mod elements;
pub mod registry;
pub mod spec;

pub use elements::{Element, ElementKind, SizeSpec};
pub use registry::Registry;
pub use spec::{SpecParser, SpecState};

use std::collections::BTreeMap;

use crate::error::{DiagramError, Result};
use crate::input::{Lines, NumberedLine};

/// A `key: tokens... content` directive line, with indentation-based
/// continuation lines folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyContent {
    pub key: String,
    /// The first `num_tokens` words after the colon; missing words are None.
    pub tokens: Vec<Option<String>>,
    /// Everything after the tokens, whitespace-collapsed, variables applied.
    pub content: String,
    /// The raw trimmed source lines of the value, before tokenization.
    pub content_lines: Vec<String>,
}

/// Parse a `key: value` line, folding in continuation lines that are
/// indented past the colon. Variables are substituted in tokens and content
/// but not in the raw content lines.
pub fn parse_key_content(
    line: &NumberedLine,
    lines: &mut Lines,
    num_tokens: usize,
    variables: &BTreeMap<String, String>,
) -> Result<KeyContent> {
    let colon = line.text.find(':').ok_or_else(|| {
        DiagramError::invalid_spec(format!("Expected 'key: value': {}", line.text), line.number)
    })?;
    let key = line.text[..colon].trim().to_string();
    let content_col = colon + 1;

    let mut content_lines = vec![line.text[content_col..].trim().to_string()];
    while let Some(next) = lines.peek() {
        if is_continuation(&next.text, content_col) {
            let folded = lines.pop().map(|l| l.text.trim().to_string());
            if let Some(folded) = folded {
                content_lines.push(folded);
            }
        } else {
            break;
        }
    }
    if content_lines.len() > 1 && content_lines.last().map(|l| l.is_empty()) == Some(true) {
        content_lines.pop();
    }

    let joined = content_lines.join(" ");
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    let words = split_outside_parens(&collapsed);

    let mut tokens = Vec::with_capacity(num_tokens);
    for i in 0..num_tokens {
        tokens.push(words.get(i).map(|w| var_rep(w, variables)));
    }
    let content = words
        .iter()
        .skip(num_tokens)
        .map(|w| var_rep(w, variables))
        .collect::<Vec<_>>()
        .join(" ");

    Ok(KeyContent {
        key,
        tokens,
        content,
        content_lines,
    })
}

fn is_continuation(text: &str, content_col: usize) -> bool {
    let mut indent = 0usize;
    for c in text.chars() {
        if c == ' ' || c == '\t' {
            indent += 1;
        } else {
            return indent >= content_col;
        }
    }
    false
}

/// Substitute `$name` variable references. Unknown names are left as
/// written.
pub fn var_rep(text: &str, variables: &BTreeMap<String, String>) -> String {
    if variables.is_empty() || !text.contains('$') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' {
            let start = i + 1;
            let mut end = start;
            while end < chars.len()
                && (chars[end].is_ascii_alphanumeric() || chars[end] == '-' || chars[end] == '_')
            {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect();
            if let Some(val) = variables.get(&name) {
                out.push_str(val);
                i = end;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Split on whitespace, keeping parenthesized groups intact so
/// `fill(10, 20)` stays one word.
pub fn split_outside_parens(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Pull a `name(p1, p2)` parameter list off a token, recording the
/// parameters under `param_key` and returning the bare name.
pub fn extract_params(
    token: &str,
    params: &mut BTreeMap<String, Vec<String>>,
    param_key: &str,
) -> String {
    if let (Some(open), Some(close)) = (token.find('('), token.rfind(')')) {
        if open < close {
            let list = token[open + 1..close]
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|p| !p.is_empty())
                .map(|p| p.to_string())
                .collect();
            params.insert(param_key.to_string(), list);
            let mut name = token[..open].to_string();
            name.push_str(&token[close + 1..]);
            return name;
        }
    }
    token.to_string()
}
