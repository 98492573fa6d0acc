//! Line-delimited JSON-RPC framing for the rmcp service loop.
//!
//! Each inbound line is decoded on its own. A line that is not UTF-8, not JSON, or longer than
//! [`MAX_LINE_BYTES`] is answered with `-32700` and skipped, and the session keeps reading.
//! Outbound messages are queued to one writer task and flushed a line at a time.
//!
//! The transport also tracks which requests are still owed a response:
//! - at end of input it holds back the close until those responses are written;
//! - a request the client cancels gets no response at all.

use rmcp::RoleServer;
use rmcp::model::{ClientNotification, ClientRequest, ErrorData, JsonRpcMessage, RequestId};
use rmcp::service::{RxJsonRpcMessage, TxJsonRpcMessage};
use rmcp::transport::Transport;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::future::Future;
use std::io;
use tokio::io::{AsyncBufReadExt as _, AsyncRead, AsyncWrite, AsyncWriteExt as _, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Longest inbound line accepted, newline excluded.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Requests this server answers. rmcp decodes one with unusable params as a custom request.
const SERVED_METHODS: [&str; 4] = ["initialize", "ping", "tools/list", "tools/call"];

enum Frame {
    Line(Vec<u8>),
    Oversized,
    Eof,
}

pub struct LineTransport<R> {
    reader: BufReader<R>,
    // Partial line carried across cancelled `receive` calls.
    line: Vec<u8>,
    oversized: bool,
    eof: bool,
    out: Option<mpsc::UnboundedSender<String>>,
    writer: Option<JoinHandle<()>>,
    pending: HashSet<RequestId>,
    cancelled: HashSet<RequestId>,
}

impl<R> LineTransport<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Must be called from within a Tokio runtime; the writer task starts immediately.
    pub fn new<W>(reader: R, writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out, rx) = mpsc::unbounded_channel();
        Self {
            reader: BufReader::new(reader),
            line: Vec::new(),
            oversized: false,
            eof: false,
            out: Some(out),
            writer: Some(tokio::spawn(write_lines(writer, rx))),
            pending: HashSet::new(),
            cancelled: HashSet::new(),
        }
    }

    /// Read up to the next newline. Only touches `self` between awaits, so a dropped call
    /// resumes where it left off.
    async fn read_frame(&mut self) -> io::Result<Frame> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if std::mem::take(&mut self.oversized) {
                    self.line.clear();
                    return Ok(Frame::Oversized);
                }
                if self.line.is_empty() {
                    return Ok(Frame::Eof);
                }
                return Ok(Frame::Line(std::mem::take(&mut self.line)));
            }

            let newline = available.iter().position(|b| *b == b'\n');
            let chunk = &available[..newline.unwrap_or(available.len())];
            if !self.oversized {
                if self.line.len() + chunk.len() > MAX_LINE_BYTES {
                    self.oversized = true;
                    self.line.clear();
                } else {
                    self.line.extend_from_slice(chunk);
                }
            }
            let used = newline.map_or(available.len(), |i| i + 1);
            self.reader.consume(used);

            if newline.is_some() {
                if std::mem::take(&mut self.oversized) {
                    return Ok(Frame::Oversized);
                }
                return Ok(Frame::Line(std::mem::take(&mut self.line)));
            }
        }
    }

    fn decode(&mut self, line: &[u8]) -> Option<RxJsonRpcMessage<RoleServer>> {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text.trim(),
            Err(e) => {
                warn!(error = %e, "discarding line that is not UTF-8");
                self.reject(Value::Null, ErrorData::parse_error(format!("Parse error: {e}"), None));
                return None;
            }
        };
        if text.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "discarding malformed JSON-RPC message");
                self.reject(Value::Null, ErrorData::parse_error(format!("Parse error: {e}"), None));
                return None;
            }
        };
        let id = value.get("id").cloned();
        let has_method = value.get("method").is_some();

        match serde_json::from_value::<RxJsonRpcMessage<RoleServer>>(value) {
            Ok(JsonRpcMessage::Request(request)) => {
                if let ClientRequest::CustomRequest(custom) = &request.request
                    && SERVED_METHODS.contains(&custom.method.as_str())
                {
                    warn!(method = %custom.method, "rejecting request with malformed params");
                    self.reject(
                        id.unwrap_or(Value::Null),
                        ErrorData::invalid_params(
                            format!("Invalid params for {}", custom.method),
                            None,
                        ),
                    );
                    return None;
                }
                self.pending.insert(request.id.clone());
                Some(JsonRpcMessage::Request(request))
            }
            // An id that is neither a string nor an integer still decodes as a custom
            // notification; answer it instead of dropping it.
            Ok(_) if has_method && id.is_some() => {
                self.reject(
                    id.unwrap_or(Value::Null),
                    ErrorData::invalid_request("Invalid request: malformed id", None),
                );
                None
            }
            Ok(JsonRpcMessage::Notification(notification)) => {
                if let ClientNotification::CancelledNotification(cancelled) =
                    &notification.notification
                {
                    let request_id = &cancelled.params.request_id;
                    if self.pending.remove(request_id) {
                        debug!(%request_id, "request cancelled by client");
                        self.cancelled.insert(request_id.clone());
                    }
                }
                Some(JsonRpcMessage::Notification(notification))
            }
            Ok(message) => Some(message),
            Err(e) => {
                warn!(error = %e, "discarding invalid JSON-RPC message");
                self.reject(
                    id.unwrap_or(Value::Null),
                    ErrorData::invalid_request(format!("Invalid request: {e}"), None),
                );
                None
            }
        }
    }

    /// Answer a message the service loop never sees.
    fn reject(&self, id: Value, error: ErrorData) {
        let response = json!({ "jsonrpc": "2.0", "id": id, "error": error });
        if let Err(e) = self.queue(response.to_string()) {
            warn!(error = %e, "could not report rejected message");
        }
    }

    fn queue(&self, line: String) -> io::Result<()> {
        self.out
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"))?
            .send(line)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "stdout writer stopped"))
    }
}

impl<R> Transport<RoleServer> for LineTransport<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    type Error = io::Error;

    fn send(
        &mut self,
        item: TxJsonRpcMessage<RoleServer>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let answered = match &item {
            JsonRpcMessage::Response(response) => Some(&response.id),
            JsonRpcMessage::Error(error) => Some(&error.id),
            _ => None,
        };
        let mut suppressed = false;
        if let Some(id) = answered {
            self.pending.remove(id);
            if self.cancelled.remove(id) {
                debug!(request_id = %id, "dropping response to cancelled request");
                suppressed = true;
            }
        }

        let result = if suppressed {
            Ok(())
        } else {
            serde_json::to_string(&item)
                .map_err(io::Error::other)
                .and_then(|line| self.queue(line))
        };
        std::future::ready(result)
    }

    async fn receive(&mut self) -> Option<RxJsonRpcMessage<RoleServer>> {
        loop {
            if self.eof {
                if self.pending.is_empty() {
                    return None;
                }
                // Parked until the service loop drops this call to send a response.
                std::future::pending::<()>().await;
            }

            let line = match self.read_frame().await {
                Ok(Frame::Line(line)) => line,
                Ok(Frame::Oversized) => {
                    warn!(limit = MAX_LINE_BYTES, "discarding oversized line");
                    self.reject(
                        Value::Null,
                        ErrorData::parse_error(
                            format!("Parse error: line exceeds {MAX_LINE_BYTES} bytes"),
                            None,
                        ),
                    );
                    continue;
                }
                Ok(Frame::Eof) => {
                    debug!(pending = self.pending.len(), "input closed");
                    self.eof = true;
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "stdin read failed");
                    self.eof = true;
                    continue;
                }
            };

            if let Some(message) = self.decode(&line) {
                return Some(message);
            }
        }
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.out.take();
        if let Some(writer) = self.writer.take() {
            writer.await.map_err(io::Error::other)?;
        }
        Ok(())
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            error!(error = %e, "stdout write failed");
            return;
        }
        if let Err(e) = writer.flush().await {
            error!(error = %e, "stdout flush failed");
            return;
        }
    }
    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "stdout shutdown failed");
    }
}
