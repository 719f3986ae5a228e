//! # Bulk Engine
//!
//! Processes a stream of JSON requests concurrently. Each request is
//! handed to its own task as soon as it is decoded; responses come back in
//! completion order on a channel, tagged with the sequence number the
//! request was read under.
//!
//! ## Wire format
//!
//! ```text
//! → {"action": "build", "req_id": "a1", "payload": {"data": {…}}}
//! ← {"req_id": "a1", "seq_id": 1, "payload": {…}, "error": null, "is_final": false}
//! ← {"seq_id": 2, "error": null, "is_final": true}
//! ```
//!
//! Requests may be separated by any JSON whitespace. When the input ends
//! the engine waits for every outstanding task and then sends one final
//! response under the next sequence number. A request that cannot be
//! decoded ends the stream the same way, with the decode error attached.
//! A task that dies without answering is answered for with an `internal`
//! error under its own sequence number.
//!
//! ## Cancellation
//!
//! A `watch` flag set to `true` stops reading and interrupts `sleep`
//! actions. Tasks already running other actions finish normally.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use docket_core::DocketError;
use docket_crypto::PrivateKey;
use docket_doc::Registry;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, warn};

use crate::content;
use crate::ops;
use crate::parse::ParseOptions;
use crate::payload::{
    BuildRequest, CorrectRequest, RegimeRequest, ReplicateRequest, SchemaRequest, SignRequest,
    ValidateRequest, VerifyRequest,
};

/// Responses buffered between the workers and the consumer.
const RESPONSE_BUFFER: usize = 16;

/// One request in the stream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BulkRequest {
    /// What to do.
    #[serde(default)]
    pub action: String,
    /// Opaque id echoed in the response.
    #[serde(default)]
    pub req_id: String,
    /// Action input.
    #[serde(default)]
    pub payload: Value,
    /// Pretty-print the response.
    #[serde(default)]
    pub indent: bool,
}

/// One response in the stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkResponse {
    /// Copy of the request's `req_id`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub req_id: String,
    /// Sequence number of the request, from 1.
    pub seq_id: u64,
    /// Action output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Failure, `null` on success.
    pub error: Option<DocketError>,
    /// Set on the last response of the stream only.
    pub is_final: bool,
    #[serde(skip)]
    indent: bool,
}

impl BulkResponse {
    fn new(req_id: String, seq_id: u64, indent: bool) -> Self {
        Self {
            req_id,
            seq_id,
            payload: None,
            error: None,
            is_final: false,
            indent,
        }
    }

    fn last(seq_id: u64, error: Option<DocketError>) -> Self {
        Self {
            error,
            is_final: true,
            ..Self::new(String::new(), seq_id, false)
        }
    }

    /// JSON bytes without a trailing newline, indented if requested.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        if self.indent {
            serde_json::to_vec_pretty(self)
        } else {
            serde_json::to_vec(self)
        }
    }
}

// -- Helpers ----------------------------------------------------------------

fn payload<T: DeserializeOwned>(value: Value) -> Result<T, DocketError> {
    serde_json::from_value(value).map_err(|e| DocketError::Invalid(format!("invalid payload: {e}")))
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value, DocketError> {
    serde_json::to_value(value).map_err(|e| DocketError::Internal(e.to_string()))
}

// -- Engine ------------------------------------------------------------------

/// The bulk engine. Cheap to clone; clones share the registry and key.
#[derive(Clone)]
pub struct Bulk {
    registry: Arc<Registry>,
    default_key: Arc<PrivateKey>,
}

impl Bulk {
    /// An engine over `registry` that signs with `default_key` when a
    /// `sign` request carries no key of its own.
    pub fn new(registry: Arc<Registry>, default_key: PrivateKey) -> Self {
        Self {
            registry,
            default_key: Arc::new(default_key),
        }
    }

    /// The rule registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The key `sign` falls back to.
    pub fn default_key(&self) -> &PrivateKey {
        &self.default_key
    }

    /// Start reading `input` on a background task. Responses arrive on the
    /// returned channel, which closes after the final response.
    pub fn spawn<R>(&self, input: R, cancel: watch::Receiver<bool>) -> mpsc::Receiver<BulkResponse>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(RESPONSE_BUFFER);
        let engine = self.clone();
        tokio::spawn(async move { engine.run(input, tx, cancel).await });
        rx
    }

    async fn run<R>(self, input: R, tx: mpsc::Sender<BulkResponse>, cancel: watch::Receiver<bool>)
    where
        R: AsyncRead + Unpin,
    {
        let mut frames = FrameReader::new(input);
        let mut workers = Workers::new(tx.clone());
        let mut stop = cancel.clone();
        let mut seq_id = 0u64;

        let fatal = loop {
            seq_id += 1;
            let next = tokio::select! {
                next = frames.next() => next,
                _ = cancelled(&mut stop) => Err(DocketError::Invalid("bulk input cancelled".into())),
            };
            match next {
                Ok(Some(req)) => {
                    debug!(seq_id, action = %req.action, req_id = %req.req_id, "bulk request");
                    let ticket = Ticket {
                        req_id: req.req_id.clone(),
                        seq_id,
                        indent: req.indent,
                    };
                    let engine = self.clone();
                    let cancel = cancel.clone();
                    workers.spawn(ticket, async move { engine.handle(req, seq_id, cancel).await });
                    workers.reap_ready().await;
                }
                Ok(None) => break None,
                Err(e) => {
                    warn!(seq_id, error = %e, "bulk input failed");
                    break Some(e);
                }
            }
        };

        workers.finish().await;
        debug!(seq_id, "bulk stream finished");
        if tx.send(BulkResponse::last(seq_id, fatal)).await.is_err() {
            debug!(seq_id, "bulk consumer gone");
        }
    }

    /// Run one request.
    pub async fn handle(&self, req: BulkRequest, seq_id: u64, mut cancel: watch::Receiver<bool>) -> BulkResponse {
        let mut res = BulkResponse::new(req.req_id, seq_id, req.indent);
        match self.dispatch(&req.action, req.payload, &mut cancel).await {
            Ok(payload) => res.payload = Some(payload),
            Err(e) => {
                debug!(seq_id, action = %req.action, code = e.code(), error = %e, "bulk action failed");
                res.error = Some(e);
            }
        }
        res
    }

    async fn dispatch(
        &self,
        action: &str,
        body: Value,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Value, DocketError> {
        let registry = self.registry.as_ref();
        match action {
            "verify" => {
                let req: VerifyRequest = payload(body)?;
                ops::verify(registry, &req.data.0, &req.publickey)?;
                Ok(json!({"ok": true}))
            }
            "validate" => {
                let req: ValidateRequest = payload(body)?;
                ops::validate(registry, &req.data.0)?;
                Ok(json!({"ok": true}))
            }
            "build" => {
                let req: BuildRequest = payload(body)?;
                to_payload(&ops::build(registry, &req.parse_options())?)
            }
            "sign" => {
                let req: SignRequest = payload(body)?;
                let (opts, key) = req.into_parts();
                let key = key.as_ref().unwrap_or(self.default_key.as_ref());
                to_payload(&ops::sign(registry, &opts, key)?)
            }
            "correct" => {
                let req: CorrectRequest = payload(body)?;
                to_payload(&ops::correct(registry, &req.correct_options())?)
            }
            "replicate" => {
                let req: ReplicateRequest = payload(body)?;
                to_payload(&ops::replicate(registry, &ParseOptions::new(req.data.into_bytes()))?)
            }
            "keygen" => to_payload(&ops::keygen()),
            "ping" => Ok(json!({"pong": true})),
            "sleep" => {
                let delay: String = payload(body)?;
                let dur = parse_duration(&delay)?;
                tokio::select! {
                    _ = tokio::time::sleep(dur) => Ok(json!({"sleep": "done"})),
                    _ = cancelled(cancel) => Err(DocketError::Invalid("sleep cancelled".into())),
                }
            }
            "schemas" => Ok(json!({"list": content::schema_ids()})),
            "schema" => {
                let req: SchemaRequest = payload(body)?;
                let raw = content::schema(&req.path)?;
                serde_json::from_str(raw).map_err(|e| DocketError::Internal(e.to_string()))
            }
            "regime" => {
                let req: RegimeRequest = payload(body)?;
                content::regime(registry, &req.code)
            }
            other => Err(DocketError::BadRequest(format!("unrecognized action: '{other}'"))),
        }
    }
}

/// Who a worker answers for.
#[derive(Debug)]
struct Ticket {
    req_id: String,
    seq_id: u64,
    indent: bool,
}

/// In-flight requests, keyed by task so a worker that panics or is
/// aborted can still be answered for.
struct Workers {
    tasks: JoinSet<()>,
    pending: HashMap<task::Id, Ticket>,
    tx: mpsc::Sender<BulkResponse>,
}

impl Workers {
    fn new(tx: mpsc::Sender<BulkResponse>) -> Self {
        Self {
            tasks: JoinSet::new(),
            pending: HashMap::new(),
            tx,
        }
    }

    fn spawn<F>(&mut self, ticket: Ticket, work: F)
    where
        F: Future<Output = BulkResponse> + Send + 'static,
    {
        let tx = self.tx.clone();
        let seq_id = ticket.seq_id;
        let handle = self.tasks.spawn(async move {
            if tx.send(work.await).await.is_err() {
                debug!(seq_id, "bulk consumer gone");
            }
        });
        self.pending.insert(handle.id(), ticket);
    }

    /// Settle the workers that are already done.
    async fn reap_ready(&mut self) {
        while let Some(joined) = self.tasks.try_join_next_with_id() {
            self.settle(joined).await;
        }
    }

    /// Wait for every worker.
    async fn finish(mut self) {
        while let Some(joined) = self.tasks.join_next_with_id().await {
            self.settle(joined).await;
        }
    }

    async fn settle(&mut self, joined: Result<(task::Id, ()), JoinError>) {
        let err = match joined {
            Ok((id, ())) => {
                self.pending.remove(&id);
                return;
            }
            Err(err) => err,
        };
        let Some(ticket) = self.pending.remove(&err.id()) else {
            return;
        };
        warn!(seq_id = ticket.seq_id, req_id = %ticket.req_id, error = %err, "bulk worker failed");
        let reason = if err.is_panic() { "panicked" } else { "was cancelled" };
        let mut res = BulkResponse::new(ticket.req_id, ticket.seq_id, ticket.indent);
        res.error = Some(DocketError::Internal(format!("request {reason}")));
        if self.tx.send(res).await.is_err() {
            debug!(seq_id = ticket.seq_id, "bulk consumer gone");
        }
    }
}

/// Write responses as newline-delimited JSON until the channel closes.
pub async fn write_responses<W>(mut rx: mpsc::Receiver<BulkResponse>, mut out: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(res) = rx.recv().await {
        let mut line = res.to_json().map_err(std::io::Error::other)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        out.flush().await?;
    }
    Ok(())
}

/// Resolves once the flag is `true`. Never resolves if the sender is gone.
async fn cancelled(flag: &mut watch::Receiver<bool>) {
    loop {
        if *flag.borrow_and_update() {
            return;
        }
        if flag.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// -- Framing -----------------------------------------------------------------

/// Splits an async byte stream into JSON requests.
struct FrameReader<R> {
    input: R,
    buf: Vec<u8>,
    scan: Scan,
    eof: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            buf: Vec::with_capacity(8 * 1024),
            scan: Scan::default(),
            eof: false,
        }
    }

    /// The next request, or `None` at a clean end of input.
    async fn next(&mut self) -> Result<Option<BulkRequest>, DocketError> {
        loop {
            if self.scan.pos == 0 {
                let start = self
                    .buf
                    .iter()
                    .position(|b| !b.is_ascii_whitespace())
                    .unwrap_or(self.buf.len());
                self.buf.drain(..start);
            }

            if self.buf.is_empty() {
                if self.eof {
                    return Ok(None);
                }
            } else if let Some(end) = self.scan.feed(&self.buf) {
                let decoded = serde_json::from_slice::<BulkRequest>(&self.buf[..end]);
                self.buf.drain(..end);
                self.scan = Scan::default();
                return decoded.map(Some).map_err(invalid_request);
            } else if self.eof {
                let decoded = serde_json::from_slice::<BulkRequest>(&self.buf);
                self.buf.clear();
                self.scan = Scan::default();
                return decoded.map(Some).map_err(invalid_request);
            }

            let n = self
                .input
                .read_buf(&mut self.buf)
                .await
                .map_err(|e| DocketError::Invalid(format!("reading input: {e}")))?;
            if n == 0 {
                self.eof = true;
            }
        }
    }
}

fn invalid_request(e: serde_json::Error) -> DocketError {
    DocketError::Invalid(format!("invalid request: {e}"))
}

/// Finds where the first JSON value in a growing buffer ends. Bytes already
/// looked at are not looked at again.
#[derive(Debug, Default)]
struct Scan {
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Scan {
    /// Length of the complete leading value, if the buffer holds one yet.
    /// A value that does not open with a bracket is taken whole and left
    /// for the decoder to reject.
    fn feed(&mut self, buf: &[u8]) -> Option<usize> {
        if !matches!(buf.first(), Some(b'{' | b'[')) {
            return Some(buf.len());
        }
        for (i, &b) in buf.iter().enumerate().skip(self.pos) {
            if self.in_string {
                match b {
                    _ if self.escaped => self.escaped = false,
                    b'\\' => self.escaped = true,
                    b'"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        self.pos = buf.len();
        None
    }
}

// -- Durations ---------------------------------------------------------------

/// Parse a duration such as `100ms`, `1.5s` or `2h45m`. Units are `ns`,
/// `us` (or `µs`), `ms`, `s`, `m` and `h`.
pub fn parse_duration(text: &str) -> Result<Duration, DocketError> {
    let invalid = || DocketError::Invalid(format!("invalid duration: {text:?}"));
    let s = text.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut nanos = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (num, tail) = rest.split_at(num_len);
        if num.is_empty() || num == "." {
            return Err(invalid());
        }
        let value: f64 = num.parse().map_err(|_| invalid())?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        nanos += value * scale;
        rest = tail;
    }
    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}
