use anyhow::Context as _;
use serde_json::{Value, json};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Minimal MCP client driving the server binary over piped stdio.
///
/// Exists only for integration tests; the process is killed when the session drops.
pub struct McpStdioSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl McpStdioSession {
    pub fn spawn(args: &[&str]) -> anyhow::Result<Self> {
        let bin = env!("CARGO_BIN_EXE_iobroker-simple-api-mcp");
        let mut child = Command::new(bin)
            .args(args)
            .env_remove("IOB_HOST")
            .env_remove("IOB_AUTH_TYPE")
            .env_remove("IOB_USER")
            .env_remove("IOB_PASS")
            .env_remove("IOB_TOKEN")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("spawn server binary")?;

        let stdin = child.stdin.take().context("child stdin")?;
        let stdout = child.stdout.take().context("child stdout")?;
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    /// Spawn and complete the `initialize` handshake.
    pub async fn connect(args: &[&str]) -> anyhow::Result<(Self, Value)> {
        let mut session = Self::spawn(args)?;
        let init = session
            .request(
                0,
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "iobroker-simple-api-mcp-integration-tests", "version": "0" }
                }),
            )
            .await?;
        session
            .notify("notifications/initialized", json!({}))
            .await?;
        Ok((session, init))
    }

    pub async fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.send_bytes(format!("{line}\n").as_bytes()).await
    }

    /// Write raw bytes to the server's stdin, newline included by the caller.
    pub async fn send_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.stdin.write_all(bytes).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    pub async fn notify(&mut self, method: &str, params: Value) -> anyhow::Result<()> {
        let msg = json!({ "jsonrpc": "2.0", "method": method, "params": params });
        self.send_line(&msg.to_string()).await
    }

    /// Send a request and wait for the response with the same id.
    pub async fn request(&mut self, id: u64, method: &str, params: Value) -> anyhow::Result<Value> {
        let msg = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        self.send_line(&msg.to_string()).await?;

        loop {
            let msg = self.next_message().await?;
            if msg.get("id") == Some(&json!(id)) {
                return Ok(msg);
            }
        }
    }

    pub async fn next_message(&mut self) -> anyhow::Result<Value> {
        let line = tokio::time::timeout(Duration::from_secs(10), self.stdout.next_line())
            .await
            .context("timed out waiting for server output")??
            .context("server closed stdout")?;
        serde_json::from_str(&line).with_context(|| format!("invalid JSON line: {line}"))
    }

    /// Close stdin and wait for the process to exit.
    pub async fn shutdown(mut self) -> anyhow::Result<std::process::ExitStatus> {
        let _ = self.stdin.shutdown().await;
        drop(self.stdin);
        let status = tokio::time::timeout(Duration::from_secs(10), self.child.wait())
            .await
            .context("server did not exit after stdin closed")??;
        Ok(status)
    }
}

/// Text of the first content block of a `tools/call` response.
pub fn tool_call_text(msg: &Value) -> anyhow::Result<&str> {
    msg.get("result")
        .and_then(|r| r.get("content"))
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .with_context(|| format!("tools/call response has no text content: {msg}"))
}
