//! Logging and tracing setup for Warden Core.
//!
//! Every log line passes through a [`Redacting`] writer that masks personal
//! data fields before the line reaches its destination.

use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::Arc;

use regex::{Captures, Regex};
use serde_json::Value;
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Field names whose values never reach the logs.
pub const PII_FIELDS: [&str; 5] = ["email", "ssn", "password", "phone", "ip"];

/// Replacement for redacted values.
pub const REDACTION: &str = "***";

/// Initialize the tracing subscriber with JSON formatting.
///
/// Reads log level from RUST_LOG environment variable.
/// Defaults to `warden_core=info,tower_http=info`.
pub fn init() -> Result<(), regex::Error> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warden_core=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Redacting::new(io::stdout)?),
        )
        .init();

    Ok(())
}

/// Initialize tracing for tests (human-readable format, no JSON).
#[cfg(test)]
pub fn init_test() {
    if let Ok(writer) = Redacting::new(tracing_subscriber::fmt::TestWriter::new()) {
        let _ = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(writer)
            .with_env_filter("warden_core=debug")
            .try_init();
    }
}

/// Shorten a session id for log output so full tokens never reach the logs.
pub fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(idx, _)| idx)
        .unwrap_or(token.len());
    &token[..end]
}

/// Masks configured fields in plain `key=value` text and in JSON log lines.
#[derive(Debug, Clone)]
pub struct Redactor {
    fields: Vec<String>,
    pattern: Option<Regex>,
    redaction: String,
}

impl Redactor {
    pub fn new(fields: &[&str], redaction: &str, separator: char) -> Result<Self, regex::Error> {
        let pattern = if fields.is_empty() {
            None
        } else {
            let names = fields
                .iter()
                .map(|field| regex::escape(field))
                .collect::<Vec<_>>()
                .join("|");
            let separator = regex::escape(&separator.to_string());
            Some(Regex::new(&format!(r"\b({})=[^{}]*", names, separator))?)
        };

        Ok(Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            pattern,
            redaction: redaction.to_string(),
        })
    }

    /// Replace the value of every `field=value` pair with the redaction. A
    /// value runs up to the next separator.
    pub fn redact_text<'a>(&self, message: &'a str) -> Cow<'a, str> {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(message, |caps: &Captures| {
                format!("{}={}", &caps[1], self.redaction)
            }),
            None => Cow::Borrowed(message),
        }
    }

    /// Mask PII keys at any depth; other strings get text redaction.
    pub fn redact_json(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, value) in map.iter_mut() {
                    if self.fields.iter().any(|field| field == key) {
                        *value = Value::String(self.redaction.clone());
                    } else {
                        self.redact_json(value);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.redact_json(item)),
            Value::String(text) => {
                let redacted = self.redact_text(text).into_owned();
                *text = redacted;
            }
            _ => {}
        }
    }

    /// Redact one formatted log line, JSON or plain text.
    pub fn redact_line(&self, line: &str) -> String {
        let body = line.trim_end_matches('\n');
        let newline = if body.len() < line.len() { "\n" } else { "" };

        match serde_json::from_str::<Value>(body) {
            Ok(mut value @ Value::Object(_)) => {
                self.redact_json(&mut value);
                format!("{}{}", value, newline)
            }
            _ => self.redact_text(line).into_owned(),
        }
    }
}

/// `MakeWriter` wrapper that redacts [`PII_FIELDS`] from every line.
#[derive(Clone)]
pub struct Redacting<M> {
    inner: M,
    redactor: Arc<Redactor>,
}

impl<M> Redacting<M> {
    pub fn new(inner: M) -> Result<Self, regex::Error> {
        Ok(Self {
            inner,
            redactor: Arc::new(Redactor::new(&PII_FIELDS, REDACTION, ' ')?),
        })
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for Redacting<M> {
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
            redactor: self.redactor.clone(),
            buffer: Vec::new(),
        }
    }
}

/// Buffers one event and writes it out redacted on flush or drop.
pub struct RedactingWriter<W: Write> {
    inner: W,
    redactor: Arc<Redactor>,
    buffer: Vec<u8>,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let line = String::from_utf8_lossy(&self.buffer);
            let redacted = self.redactor.redact_line(&line);
            self.inner.write_all(redacted.as_bytes())?;
            self.buffer.clear();
        }
        self.inner.flush()
    }
}

impl<W: Write> Drop for RedactingWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
