//! Color-markup tokens in narrative text
//!
//! Log text carries a fixed vocabulary of tags: `[emphasis]..[/emphasis]`,
//! `[danger]..[/danger]`, `[success]..[/success]` and `[neutral]..[/neutral]`.
//! Anything else, including unbalanced tags, is plain text. Parsing never fails.
//!
//! Wrapped text may not carry tags of its own: [`wrap`] turns square brackets
//! in its input into parentheses.

use serde::{Deserialize, Serialize};

/// Semantic role of a marked-up run of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupRole {
    Emphasis,
    Danger,
    Success,
    Neutral,
}

impl MarkupRole {
    pub const ALL: [MarkupRole; 4] = [
        MarkupRole::Emphasis,
        MarkupRole::Danger,
        MarkupRole::Success,
        MarkupRole::Neutral,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            MarkupRole::Emphasis => "emphasis",
            MarkupRole::Danger => "danger",
            MarkupRole::Success => "success",
            MarkupRole::Neutral => "neutral",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.tag() == tag)
    }
}

/// A run of text with an optional role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub role: Option<MarkupRole>,
    pub text: String,
}

/// Wrap `text` in the tags for `role`
pub fn wrap(role: MarkupRole, text: impl AsRef<str>) -> String {
    let inner: String = text
        .as_ref()
        .chars()
        .map(|c| match c {
            '[' => '(',
            ']' => ')',
            c => c,
        })
        .collect();
    format!("[{tag}]{}[/{tag}]", inner, tag = role.tag())
}

/// Split marked-up text into spans
pub fn parse(input: &str) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let mut plain = String::new();
    let mut rest = input;

    while let Some(open) = rest.find('[') {
        let (before, from_bracket) = rest.split_at(open);
        plain.push_str(before);

        match tagged_run(from_bracket) {
            Some((role, inner, consumed)) => {
                if !plain.is_empty() {
                    spans.push(Span {
                        role: None,
                        text: std::mem::take(&mut plain),
                    });
                }
                spans.push(Span {
                    role: Some(role),
                    text: inner.to_string(),
                });
                rest = &from_bracket[consumed..];
            }
            None => {
                plain.push('[');
                rest = &from_bracket[1..];
            }
        }
    }
    plain.push_str(rest);
    if !plain.is_empty() {
        spans.push(Span { role: None, text: plain });
    }
    spans
}

/// `[role]inner[/role]` at the start of `s`: (role, inner, bytes consumed)
fn tagged_run(s: &str) -> Option<(MarkupRole, &str, usize)> {
    let close = s.find(']')?;
    let role = MarkupRole::from_tag(&s[1..close])?;
    let body = &s[close + 1..];
    let end_tag = format!("[/{}]", role.tag());
    let end = body.find(&end_tag)?;
    Some((role, &body[..end], close + 1 + end + end_tag.len()))
}

/// Drop known tags, keep everything else
pub fn strip(input: &str) -> String {
    parse(input).into_iter().map(|s| s.text).collect()
}
