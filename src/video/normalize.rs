//! # Video URL Normalization
//!
//! Pure conversion of arbitrary video references into canonical,
//! iframe-embeddable URLs. The canonical host is `youtube-nocookie.com`
//! with suggestions and branding disabled.

use regex::Regex;
use std::sync::OnceLock;

/// Matches `youtu.be/<id>` short links
fn short_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"youtu\.be/([a-zA-Z0-9_-]+)").unwrap())
}

/// Matches `youtube.com/watch?v=<id>` links
fn watch_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"youtube\.com/watch\?v=([a-zA-Z0-9_-]+)").unwrap())
}

/// Matches links already in embed form, on either the standard or the
/// no-cookie host
fn embed_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:youtube|youtube-nocookie)\.com/embed/([a-zA-Z0-9_-]+)").unwrap()
    })
}

/// Build the canonical embed URL for a video identifier
fn embed_url(video_id: &str) -> String {
    format!(
        "https://www.youtube-nocookie.com/embed/{}?rel=0&modestbranding=1&showinfo=0",
        video_id
    )
}

/// Normalize a raw video reference into an embeddable URL
///
/// Precedence, first match wins: short link, watch link, already-embed
/// (returned verbatim, making the function idempotent). Anything else
/// yields `None` — the function is total and never fails.
pub fn normalize_video_url(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    if let Some(captures) = short_link_regex().captures(raw) {
        return Some(embed_url(&captures[1]));
    }

    if let Some(captures) = watch_link_regex().captures(raw) {
        return Some(embed_url(&captures[1]));
    }

    if embed_link_regex().is_match(raw) {
        return Some(raw.to_string());
    }

    None
}
