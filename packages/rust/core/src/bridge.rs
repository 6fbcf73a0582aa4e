//! LLM bridge subprocess.
//!
//! Spawns the bridge script and talks JSON lines over stdin/stdout: the
//! bridge announces `ready`, then answers each tagged request with a
//! `result` or `error` carrying the request id. [`LlmBridge`] implements
//! both [`TaskAnalyzer`] and [`DecisionFunction`] on top of it.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use canonic_shared::{BridgeConfig, CanonicError, Result, TaskMetadata};

use crate::llm::{ArbitrationRequest, DecisionFunction, Extraction, Selection, TaskAnalyzer};

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize)]
#[serde(tag = "type")]
enum RequestMessage<'a> {
    #[serde(rename = "analyze_metadata")]
    AnalyzeMetadata {
        id: String,
        model: &'a str,
        text: &'a str,
    },
    #[serde(rename = "extract")]
    Extract {
        id: String,
        model: &'a str,
        text: &'a str,
        reference: &'a str,
    },
    #[serde(rename = "select")]
    Select {
        id: String,
        model: &'a str,
        request: &'a ArbitrationRequest,
    },
    #[serde(rename = "shutdown")]
    Shutdown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseMessage {
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "result")]
    Result {
        id: String,
        result: serde_json::Value,
    },
    #[serde(rename = "error")]
    Error { id: String, error: String },
}

#[derive(Debug, Deserialize)]
struct SelectionsResponse {
    #[serde(default)]
    selections: Vec<Selection>,
}

// ---------------------------------------------------------------------------
// Line channel
// ---------------------------------------------------------------------------

/// Request/response framing over any line reader and writer.
struct Channel<R, W> {
    reader: R,
    writer: W,
    request_counter: u64,
}

impl<R: BufRead, W: Write> Channel<R, W> {
    fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            request_counter: 0,
        }
    }

    fn read_message(&mut self) -> Result<ResponseMessage> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| CanonicError::bridge(format!("bridge read error: {e}")))?;
        if line.is_empty() {
            return Err(CanonicError::bridge("bridge closed stdout unexpectedly"));
        }
        serde_json::from_str(line.trim()).map_err(|e| {
            let shown: String = line.chars().take(200).collect();
            CanonicError::bridge(format!("invalid bridge message: {e} (got: {shown})"))
        })
    }

    fn wait_for_ready(&mut self) -> Result<()> {
        match self.read_message()? {
            ResponseMessage::Ready => {
                info!("bridge is ready");
                Ok(())
            }
            other => Err(CanonicError::bridge(format!(
                "expected ready message, got: {other:?}"
            ))),
        }
    }

    fn write(&mut self, request: &RequestMessage<'_>) -> Result<()> {
        let json = serde_json::to_string(request)
            .map_err(|e| CanonicError::bridge(format!("failed to serialize request: {e}")))?;
        writeln!(self.writer, "{json}")
            .map_err(|e| CanonicError::bridge(format!("failed to write to bridge stdin: {e}")))?;
        self.writer
            .flush()
            .map_err(|e| CanonicError::bridge(format!("failed to flush bridge stdin: {e}")))
    }

    /// Send one request and decode its result.
    fn call<'a, T: DeserializeOwned>(
        &mut self,
        build: impl FnOnce(String) -> RequestMessage<'a>,
    ) -> Result<T> {
        self.request_counter += 1;
        let id = format!("req-{}", self.request_counter);
        self.write(&build(id.clone()))?;

        match self.read_message()? {
            ResponseMessage::Result { id: resp_id, result } => {
                if resp_id != id {
                    return Err(CanonicError::bridge(format!(
                        "response id {resp_id} does not match request {id}"
                    )));
                }
                serde_json::from_value(result)
                    .map_err(|e| CanonicError::bridge(format!("unusable bridge result: {e}")))
            }
            ResponseMessage::Error { id: resp_id, error } => {
                if resp_id != id {
                    return Err(CanonicError::bridge(format!(
                        "error response id {resp_id} does not match request {id}"
                    )));
                }
                debug!(id = %resp_id, "bridge returned error");
                Err(CanonicError::bridge(error))
            }
            ResponseMessage::Ready => Err(CanonicError::bridge(
                "unexpected ready message during request",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Bridge handle
// ---------------------------------------------------------------------------

struct BridgeHandle {
    child: Child,
    channel: Channel<BufReader<ChildStdout>, ChildStdin>,
}

impl BridgeHandle {
    fn spawn(config: &BridgeConfig) -> Result<Self> {
        info!(cmd = %config.cmd, script = %config.script, "spawning llm bridge");

        let mut command = Command::new(&config.cmd);
        command
            .arg("run")
            .arg(&config.script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if !config.working_dir.is_empty() {
            command.current_dir(&config.working_dir);
        }

        let mut child = command.spawn().map_err(|e| {
            CanonicError::bridge(format!(
                "failed to spawn bridge: {e}. Is `{}` installed?",
                config.cmd
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CanonicError::bridge("failed to capture bridge stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CanonicError::bridge("failed to capture bridge stdout"))?;

        let mut handle = Self {
            child,
            channel: Channel::new(BufReader::new(stdout), stdin),
        };
        handle.channel.wait_for_ready()?;
        Ok(handle)
    }

    fn shutdown(mut self) {
        if let Err(e) = self.channel.write(&RequestMessage::Shutdown) {
            warn!(error = %e, "failed to send shutdown");
        }
        match self.child.wait() {
            Ok(status) => info!(?status, "bridge exited"),
            Err(e) => warn!("bridge wait error: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A running bridge, shared by the analyzer and decision roles.
pub struct LlmBridge {
    model: String,
    handle: Mutex<Option<BridgeHandle>>,
}

impl LlmBridge {
    /// Spawn the bridge and wait until it is ready.
    #[instrument(skip_all, fields(model = %config.model))]
    pub fn start(config: &BridgeConfig) -> Result<Self> {
        let handle = BridgeHandle::spawn(config)?;
        Ok(Self {
            model: config.model.clone(),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Ask the bridge to exit and reap it.
    pub fn shutdown(&self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            handle.shutdown();
        }
    }

    fn call<'a, T: DeserializeOwned>(
        &self,
        build: impl FnOnce(String) -> RequestMessage<'a>,
    ) -> Result<T> {
        let mut guard = self
            .handle
            .lock()
            .map_err(|_| CanonicError::bridge("bridge lock poisoned"))?;
        let handle = guard
            .as_mut()
            .ok_or_else(|| CanonicError::bridge("bridge already shut down"))?;
        handle.channel.call(build)
    }
}

impl Drop for LlmBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait]
impl TaskAnalyzer for LlmBridge {
    async fn metadata(&self, text: &str) -> Result<TaskMetadata> {
        self.call(|id| RequestMessage::AnalyzeMetadata {
            id,
            model: &self.model,
            text,
        })
    }

    async fn extract_mentions(&self, text: &str, reference: &str) -> Result<Extraction> {
        self.call(|id| RequestMessage::Extract {
            id,
            model: &self.model,
            text,
            reference,
        })
    }
}

#[async_trait]
impl DecisionFunction for LlmBridge {
    async fn select(&self, request: &ArbitrationRequest) -> Result<Vec<Selection>> {
        let response: SelectionsResponse = self.call(|id| RequestMessage::Select {
            id,
            model: &self.model,
            request,
        })?;
        Ok(response.selections)
    }
}
