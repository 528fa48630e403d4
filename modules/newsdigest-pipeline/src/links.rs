//! Link post-processing for synthesized digests.
//!
//! The model is asked to cite article URLs but often leaves them bare. Every
//! bare URL is rewritten as a markdown link: labeled with the matching
//! article's title when the URL belongs to one of the headline articles,
//! otherwise labeled "Read More". Existing markdown links and `<url>`
//! autolinks are left untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use newsdigest_common::Article;

pub const READ_MORE: &str = "Read More";
pub const LABEL_MAX_CHARS: usize = 50;

/// Alternation order matters: at a `[` the markdown-link branch wins, at a `<`
/// the autolink branch wins, so URLs inside either are consumed whole.
static LINK_SCAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?P<markdown>\[[^\]\n]*\]\([^)\n]*\))|(?P<autolink><https?://[^>\s]+>)|(?P<url>https?://[^\s<>\[\]()"'`*]+)"#,
    )
    .unwrap()
});

/// Trimmed off the end of a bare URL: sentence punctuation and markdown emphasis.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '_'];

/// Rewrite every bare URL in `text` as a markdown link.
///
/// `articles` are the candidates for titled labels, normally the first
/// `max_headlines` articles handed to the model.
pub fn linkify(text: &str, articles: &[Article]) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    let mut last = 0;

    for caps in LINK_SCAN.captures_iter(text) {
        let Some(found) = bare_url(&caps) else {
            continue;
        };

        let url = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        if url.len() <= "https://".len() {
            continue;
        }
        let start = found.start();
        let end = start + url.len();

        // `[https://…]` written as a pseudo-link: swallow the brackets.
        let bracketed = text[..start].ends_with('[')
            && text[end..].starts_with(']')
            && !text[end + 1..].starts_with('(');
        let (replace_from, replace_to) = if bracketed {
            (start - 1, end + 1)
        } else {
            (start, end)
        };
        if replace_from < last {
            continue;
        }

        out.push_str(&text[last..replace_from]);
        out.push_str(&markdown_link(url, articles));
        last = replace_to;
    }

    out.push_str(&text[last..]);
    out
}

fn bare_url<'t>(caps: &Captures<'t>) -> Option<regex::Match<'t>> {
    if caps.name("markdown").is_some() || caps.name("autolink").is_some() {
        return None;
    }
    caps.name("url")
}

fn markdown_link(url: &str, articles: &[Article]) -> String {
    let label = articles
        .iter()
        .find(|a| same_url(&a.url, url))
        .map(|a| link_label(&a.title))
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| READ_MORE.to_string());
    format!("[{label}]({url})")
}

/// Exact match, or a match that differs only by a trailing slash.
fn same_url(a: &str, b: &str) -> bool {
    a == b || a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// First `LABEL_MAX_CHARS` characters of the title, brackets escaped.
pub fn link_label(title: &str) -> String {
    let mut label = String::new();
    for c in title.trim().chars().take(LABEL_MAX_CHARS) {
        if matches!(c, '[' | ']') {
            label.push('\\');
        }
        label.push(c);
    }
    label.trim_end().to_string()
}
