//! Incremental decoder for newline-delimited JSON synthesis responses.
//!
//! Each complete line is handled as soon as it arrives:
//! - blank line: ignored
//! - not a JSON object: skipped (keep-alive noise), counted
//! - carries `error`: `ProtocolError`, accumulated audio is discarded
//! - carries `result.audioContent`: base64-decoded, appended in arrival order
//! - anything else (e.g. timestamp-only results): ignored
//!
//! A stream that ends without a single audio chunk is a `ProtocolError`.

use crate::{Result, TtsError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    audio: Vec<u8>,
    chunks: usize,
    skipped: usize,
}

enum Line {
    Blank,
    Malformed,
    Error(String),
    Audio(Vec<u8>),
    NoAudio,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed body bytes as received. Lines may be split across calls.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            self.process(&line)?;
        }
        Ok(())
    }

    /// End of stream: handle a trailing unterminated line and return the audio
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.process(&line)?;
        }
        if self.chunks == 0 {
            warn!(target: "inworld_synthesis", skipped = self.skipped, "Stream ended without audio");
            return Err(TtsError::ProtocolError("no audio in response".into()));
        }
        debug!(
            target: "inworld_synthesis",
            chunks = self.chunks,
            skipped = self.skipped,
            bytes = self.audio.len(),
            "Stream complete"
        );
        Ok(self.audio)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }

    pub fn audio_len(&self) -> usize {
        self.audio.len()
    }

    fn process(&mut self, line: &[u8]) -> Result<()> {
        match parse_line(line) {
            Line::Blank | Line::NoAudio => {}
            Line::Malformed => {
                self.skipped += 1;
                trace!(target: "inworld_synthesis", len = line.len(), "Skipping non-JSON stream line");
            }
            Line::Error(message) => {
                self.audio.clear();
                return Err(TtsError::ProtocolError(message));
            }
            Line::Audio(bytes) => {
                self.chunks += 1;
                self.audio.extend_from_slice(&bytes);
            }
        }
        Ok(())
    }
}

fn parse_line(raw: &[u8]) -> Line {
    let line = raw.trim_ascii();
    if line.is_empty() {
        return Line::Blank;
    }
    let value: Value = match serde_json::from_slice(line) {
        Ok(v @ Value::Object(_)) => v,
        _ => return Line::Malformed,
    };

    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        return Line::Error(error_message(err));
    }

    match value
        .get("result")
        .and_then(|r| r.get("audioContent"))
        .and_then(Value::as_str)
    {
        Some(b64) => match STANDARD.decode(b64) {
            Ok(bytes) => Line::Audio(bytes),
            Err(e) => Line::Error(format!("invalid audio chunk encoding: {e}")),
        },
        None => Line::NoAudio,
    }
}

fn error_message(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        _ => err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string()),
    }
}
