//! Secret masking for log output.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;

/// Ordered masking rules; each rule is a pattern and its replacement
pub struct RedactionPatterns {
    rules: Vec<(Regex, &'static str)>,
}

impl RedactionPatterns {
    /// Compile all masking rules
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        let rules = vec![
            // Bot API URLs: https://api.telegram.org/bot<token>/method
            (
                Regex::new(r"(https?://[^/]+/(?:file/)?bot)[0-9]+:[A-Za-z0-9_-]+")?,
                "$1[TELEGRAM_TOKEN]",
            ),
            (
                Regex::new(r"\b[0-9]{8,10}:[A-Za-z0-9_-]{35}\b")?,
                "[TELEGRAM_TOKEN]",
            ),
            (
                Regex::new(r"TELEGRAM_BOT_TOKEN=[^\s&]+")?,
                "TELEGRAM_BOT_TOKEN=[MASKED]",
            ),
            (Regex::new(r"Api-Key [^\s,;]+")?, "Api-Key [MASKED]"),
            (Regex::new(r"SA_API_KEY=[^\s&]+")?, "SA_API_KEY=[MASKED]"),
            (
                Regex::new(r#"sa_api_key: Some\("[^"]*"\)"#)?,
                r#"sa_api_key: Some("[MASKED]")"#,
            ),
            (
                Regex::new(r"STORAGE_ACCESS_KEY_ID=[^\s&]+")?,
                "STORAGE_ACCESS_KEY_ID=[MASKED]",
            ),
            (
                Regex::new(r"STORAGE_SECRET_ACCESS_KEY=[^\s&]+")?,
                "STORAGE_SECRET_ACCESS_KEY=[MASKED]",
            ),
            (
                Regex::new(r#"storage_(access_key_id|secret_access_key): Some\("[^"]*"\)"#)?,
                r#"storage_$1: Some("[MASKED]")"#,
            ),
        ];
        Ok(Self { rules })
    }

    /// Apply every rule to `input`
    pub fn redact(&self, input: &str) -> String {
        self.rules
            .iter()
            .fold(input.to_string(), |acc, (pattern, replacement)| {
                pattern.replace_all(&acc, *replacement).into_owned()
            })
    }
}

/// Writer that masks secrets before forwarding to `inner`
pub struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let redacted = self.patterns.redact(&String::from_utf8_lossy(buf));
        self.inner.write_all(redacted.as_bytes())?;
        // Report the caller's length; the masked text may differ in size
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// `MakeWriter` wrapping each produced writer in a [`RedactingWriter`]
pub struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    pub const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: (self.make_inner)(),
            patterns: self.patterns.clone(),
        }
    }
}
