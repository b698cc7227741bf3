//! Log sanitization for identifiers and personal data.
//!
//! Applied line by line to formatted log output via [`SanitizingMakeWriter`].
//! Redacts:
//! - record ids (UUIDs) and 24-hex document/user ids
//! - emails and phone numbers
//! - `"name": "..."` pairs from serialized input documents
//! - contextual secrets (`password=...`, `token: ...`)
//!
//! Structured redaction comes first (`RawHealthInput`'s `Debug` hides the
//! name); this writer catches what slips into formatted strings anyway.
//!
//! Input is capped at `MEDIPREDICT_SANITIZE_MAX_BYTES` (default 16 KiB) per
//! call.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

struct Patterns {
    set: RegexSet,
    rules: Vec<Rule>,
}

const RULES: &[(&str, &str)] = &[
    (
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        "[REDACTED-UUID]",
    ),
    (r"\b[0-9a-fA-F]{24}\b", "[REDACTED-ID]"),
    (
        r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
        "[REDACTED-EMAIL]",
    ),
    (
        r"(?:\+91[-\s]?)?\b[6-9][0-9]{9}\b|\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s][0-9]{3}[-.\s][0-9]{4}\b",
        "[REDACTED-PHONE]",
    ),
    (r#""name"\s*:\s*"(?:[^"\\]|\\.)*""#, r#""name":"[REDACTED]""#),
    (
        r"(?i)\b(?:password|passwd|secret|token|api[_-]?key|session)\b\s*[:=]\s*\S+",
        "[REDACTED-SECRET]",
    ),
];

fn max_sanitize_bytes() -> usize {
    std::env::var("MEDIPREDICT_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        set: RegexSet::new(RULES.iter().map(|(p, _)| *p)).expect("Valid regex set"),
        rules: RULES
            .iter()
            .map(|(pattern, replacement)| Rule {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect(),
    })
}

/// Sanitize a string by replacing identifiers and personal data.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).into_iter() {
        let rule = &patterns.rules[idx];
        result = rule.regex.replace_all(&result, rule.replacement).into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Whether a string contains anything [`sanitize`] would redact.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let (prefix, _) = truncate_to_char_boundary(input, max_sanitize_bytes());
    patterns().set.is_match(prefix)
}

/// A `tracing_subscriber` writer wrapper that sanitizes each formatted line
/// before it reaches the underlying sink.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let sanitized = sanitize(&String::from_utf8_lossy(&line));
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A line with no newline cannot grow without bound.
        if self.buffer.len() > max_sanitize_bytes().saturating_mul(2) {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}
