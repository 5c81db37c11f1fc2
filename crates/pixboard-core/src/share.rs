//! Share export: `.canvas` files and compressed share links.
//!
//! A share link carries the whole document in its fragment:
//! `<base>#data=<payload>` where the payload is URL-safe base64 of the
//! zstd-compressed document JSON. Compression runs on a worker thread that
//! owns no shared state; every request brings its own reply channel.

use crate::codec::SerializedObject;
use crate::storage::now_millis;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::sync::mpsc;
use std::thread::JoinHandle;
use thiserror::Error;
use url::Url;

/// Document format version written and accepted.
pub const SHARE_VERSION: &str = "1.0";

/// File extension of shared documents.
pub const CANVAS_EXTENSION: &str = "canvas";

const LINK_KEY: &str = "data";
const ZSTD_LEVEL: i32 = 19;

/// Largest document JSON a link may expand to.
pub const MAX_DOCUMENT_BYTES: u64 = 64 * 1024 * 1024;

/// Share errors.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Share worker error: {0}")]
    Worker(String),
    #[error("Invalid share link: {0}")]
    InvalidLink(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for share operations.
pub type ShareResult<T> = Result<T, ShareError>;

/// A shareable snapshot of the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareDocument {
    pub version: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub objects: Vec<SerializedObject>,
}

impl ShareDocument {
    pub fn new(objects: Vec<SerializedObject>) -> Self {
        Self::at(objects, now_millis())
    }

    pub fn at(objects: Vec<SerializedObject>, timestamp: u64) -> Self {
        Self {
            version: SHARE_VERSION.to_string(),
            timestamp,
            objects,
        }
    }

    /// Default file name, `canvas_share_<timestamp>.canvas`.
    pub fn file_name(&self) -> String {
        format!("canvas_share_{}.{}", self.timestamp, CANVAS_EXTENSION)
    }

    pub fn to_json_pretty(&self) -> ShareResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate an imported document.
    pub fn from_json(json: &str) -> ShareResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let version = value
            .get("version")
            .ok_or(ShareError::MissingField("version"))?;
        if value.get("objects").is_none() {
            return Err(ShareError::MissingField("objects"));
        }
        if version.as_str() != Some(SHARE_VERSION) {
            return Err(ShareError::UnsupportedVersion(version.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn write_file(&self, path: &Path) -> ShareResult<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        log::info!("Wrote {} objects to {}", self.objects.len(), path.display());
        Ok(())
    }

    pub fn read_file(path: &Path) -> ShareResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// Compress a document into a link payload.
pub fn encode_payload(document: &ShareDocument) -> ShareResult<String> {
    let json = serde_json::to_vec(document)?;
    let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL)
        .map_err(|e| ShareError::Compression(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

/// Inverse of [`encode_payload`].
pub fn decode_payload(payload: &str) -> ShareResult<ShareDocument> {
    let compressed = URL_SAFE_NO_PAD
        .decode(payload.trim())
        .map_err(|e| ShareError::Encoding(e.to_string()))?;
    let json = decompress(&compressed, MAX_DOCUMENT_BYTES)?;
    let json = String::from_utf8(json).map_err(|e| ShareError::Encoding(e.to_string()))?;
    ShareDocument::from_json(&json)
}

/// Inflate at most `limit` bytes; anything larger is rejected.
fn decompress(compressed: &[u8], limit: u64) -> ShareResult<Vec<u8>> {
    let decoder =
        zstd::Decoder::new(compressed).map_err(|e| ShareError::Compression(e.to_string()))?;
    let mut out = Vec::new();
    decoder
        .take(limit + 1)
        .read_to_end(&mut out)
        .map_err(|e| ShareError::Compression(e.to_string()))?;
    if out.len() as u64 > limit {
        return Err(ShareError::Compression(format!(
            "payload expands past {limit} bytes"
        )));
    }
    Ok(out)
}

/// `<base>#data=<payload>`, replacing any fragment `base` had.
pub fn build_share_link(base: &str, payload: &str) -> ShareResult<String> {
    let mut url = Url::parse(base).map_err(|e| ShareError::InvalidLink(e.to_string()))?;
    url.set_fragment(Some(&format!("{LINK_KEY}={payload}")));
    Ok(url.into())
}

/// Extract and decode the document of a share link. Relative links and bare
/// `#data=...` fragments are accepted.
pub fn parse_share_link(link: &str) -> ShareResult<ShareDocument> {
    let url = match Url::parse(link) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("http://localhost/")
            .and_then(|base| base.join(link))
            .map_err(|e| ShareError::InvalidLink(e.to_string()))?,
        Err(e) => return Err(ShareError::InvalidLink(e.to_string())),
    };
    let fragment = url
        .fragment()
        .ok_or_else(|| ShareError::InvalidLink("no fragment".into()))?;
    let payload = fragment
        .split('&')
        .find_map(|pair| pair.strip_prefix(LINK_KEY)?.strip_prefix('='))
        .ok_or(ShareError::MissingField(LINK_KEY))?;
    decode_payload(payload)
}

enum Job {
    Encode(ShareDocument, mpsc::Sender<ShareResult<String>>),
    Decode(String, mpsc::Sender<ShareResult<ShareDocument>>),
}

/// Reply of a [`ShareWorker`] request.
pub struct PendingShare<T> {
    reply: mpsc::Receiver<ShareResult<T>>,
}

impl<T> PendingShare<T> {
    /// Block until the worker answers.
    pub fn wait(self) -> ShareResult<T> {
        self.reply
            .recv()
            .map_err(|_| ShareError::Worker("worker stopped before replying".into()))?
    }

    /// Non-blocking poll, for callers that check once per frame.
    pub fn try_take(&self) -> Option<ShareResult<T>> {
        match self.reply.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(ShareError::Worker(
                "worker stopped before replying".into(),
            ))),
        }
    }
}

/// Background thread that compresses and decompresses share payloads.
pub struct ShareWorker {
    jobs: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl ShareWorker {
    pub fn spawn() -> ShareResult<Self> {
        let (jobs, queue) = mpsc::channel::<Job>();
        let thread = std::thread::Builder::new()
            .name("pixboard-share".into())
            .spawn(move || {
                for job in queue {
                    // A dropped receiver only means the caller lost interest
                    match job {
                        Job::Encode(document, reply) => {
                            let _ = reply.send(encode_payload(&document));
                        }
                        Job::Decode(payload, reply) => {
                            let _ = reply.send(decode_payload(&payload));
                        }
                    }
                }
                log::debug!("Share worker stopped");
            })?;
        Ok(Self {
            jobs: Some(jobs),
            thread: Some(thread),
        })
    }

    fn submit(&self, job: Job) -> ShareResult<()> {
        self.jobs
            .as_ref()
            .ok_or_else(|| ShareError::Worker("worker is shut down".into()))?
            .send(job)
            .map_err(|_| ShareError::Worker("worker is gone".into()))
    }

    pub fn encode(&self, document: ShareDocument) -> ShareResult<PendingShare<String>> {
        let (reply, rx) = mpsc::channel();
        self.submit(Job::Encode(document, reply))?;
        Ok(PendingShare { reply: rx })
    }

    pub fn decode(&self, payload: impl Into<String>) -> ShareResult<PendingShare<ShareDocument>> {
        let (reply, rx) = mpsc::channel();
        self.submit(Job::Decode(payload.into(), reply))?;
        Ok(PendingShare { reply: rx })
    }
}

impl Drop for ShareWorker {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Share worker panicked");
            }
        }
    }
}
