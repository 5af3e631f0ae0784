// Fallback request handling
// Pure message-in, messages-out logic; sockets live in kernel.rs

use bytes::Bytes;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use pixi_kernel_core::port::{IdProvider, TimeProvider};

use crate::wire::{Header, Message, PROTOCOL_VERSION};

/// `ename` of every failed execution
pub const ERROR_NAME: &str = "PixiKernelError";

const IMPLEMENTATION: &str = "pixi-kernel";
const USERNAME: &str = "kernel";

/// Messages produced for one request, in publication order
#[derive(Debug, Default)]
pub struct Outcome {
    /// IOPub messages sent before the reply (`busy`, streams)
    pub before: Vec<Message>,
    pub reply: Option<Message>,
    /// IOPub messages sent after the reply (`idle`)
    pub after: Vec<Message>,
    /// Stop every socket loop once the reply is sent
    pub shutdown: bool,
}

/// Kernel that fails every execution with a fixed message
pub struct FallbackHandler {
    message: String,
    language: String,
    session: String,
    execution_count: u64,
    ids: Arc<dyn IdProvider>,
    time: Arc<dyn TimeProvider>,
}

impl FallbackHandler {
    /// # Arguments
    /// * `message` - Diagnostic shown on every execution
    /// * `language` - Language reported in `kernel_info_reply`
    pub fn new(
        message: impl Into<String>,
        language: impl Into<String>,
        ids: Arc<dyn IdProvider>,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        let session = ids.generate_id();
        Self {
            message: message.into(),
            language: language.into(),
            session,
            execution_count: 0,
            ids,
            time,
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    fn header(&self, msg_type: &str) -> Header {
        Header {
            msg_id: self.ids.generate_id(),
            session: self.session.clone(),
            username: USERNAME.to_string(),
            date: self.time.now_iso8601(),
            msg_type: msg_type.to_string(),
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Reply on the requesting channel, routed back to the requester
    fn reply(&self, parent: &Message, msg_type: &str, content: Value) -> Message {
        Message {
            identities: parent.identities.clone(),
            header: self.header(msg_type),
            parent_header: header_value(&parent.header),
            metadata: json!({}),
            content,
        }
    }

    /// IOPub broadcast, topic set to the message type
    pub fn broadcast(&self, parent: Option<&Message>, msg_type: &str, content: Value) -> Message {
        Message {
            identities: vec![Bytes::from(msg_type.to_string())],
            header: self.header(msg_type),
            parent_header: parent.map_or_else(|| json!({}), |p| header_value(&p.header)),
            metadata: json!({}),
            content,
        }
    }

    fn status(&self, parent: Option<&Message>, state: &str) -> Message {
        self.broadcast(parent, "status", json!({ "execution_state": state }))
    }

    /// `status: starting`, published once the sockets are bound
    pub fn starting(&self) -> Message {
        self.status(None, "starting")
    }

    /// Handle one shell or control request
    pub fn handle(&mut self, request: &Message) -> Outcome {
        let msg_type = request.msg_type().to_string();
        debug!(msg_type = %msg_type, "Handling request");

        let mut outcome = Outcome {
            before: vec![self.status(Some(request), "busy")],
            ..Default::default()
        };

        let reply = match msg_type.as_str() {
            "kernel_info_request" => self.reply(request, "kernel_info_reply", self.kernel_info()),
            "execute_request" => self.execute(request, &mut outcome.before),
            "is_complete_request" => {
                self.reply(request, "is_complete_reply", json!({ "status": "complete" }))
            }
            "complete_request" => {
                let cursor = request
                    .content
                    .get("cursor_pos")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                self.reply(
                    request,
                    "complete_reply",
                    json!({
                        "status": "ok",
                        "matches": [],
                        "cursor_start": cursor,
                        "cursor_end": cursor,
                        "metadata": {}
                    }),
                )
            }
            "inspect_request" => self.reply(
                request,
                "inspect_reply",
                json!({ "status": "ok", "found": false, "data": {}, "metadata": {} }),
            ),
            "history_request" => self.reply(
                request,
                "history_reply",
                json!({ "status": "ok", "history": [] }),
            ),
            "comm_info_request" => self.reply(
                request,
                "comm_info_reply",
                json!({ "status": "ok", "comms": {} }),
            ),
            "interrupt_request" => {
                self.reply(request, "interrupt_reply", json!({ "status": "ok" }))
            }
            "shutdown_request" => {
                let restart = request
                    .content
                    .get("restart")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                outcome.shutdown = true;
                self.reply(
                    request,
                    "shutdown_reply",
                    json!({ "status": "ok", "restart": restart }),
                )
            }
            other => {
                warn!(msg_type = %other, "Ignoring unsupported request");
                return Outcome::default();
            }
        };

        outcome.reply = Some(reply);
        outcome.after.push(self.status(Some(request), "idle"));
        outcome
    }

    fn kernel_info(&self) -> Value {
        json!({
            "status": "ok",
            "protocol_version": PROTOCOL_VERSION,
            "implementation": IMPLEMENTATION,
            "implementation_version": pixi_kernel_core::VERSION,
            "language_info": {
                "name": self.language,
                "version": "",
                "mimetype": "text/plain",
                "file_extension": ".txt"
            },
            "banner": format!("Pixi kernel could not start:\n{}", self.message),
            "help_links": []
        })
    }

    /// Fail the execution, streaming the message to stderr first
    ///
    /// Silent requests get the error reply only; nothing is broadcast on iopub.
    fn execute(&mut self, request: &Message, iopub: &mut Vec<Message>) -> Message {
        let silent = request
            .content
            .get("silent")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let store_history = request
            .content
            .get("store_history")
            .and_then(Value::as_bool)
            .unwrap_or(!silent);
        if store_history {
            self.execution_count += 1;
        }

        let code = request
            .content
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or_default();

        eprintln!("{}", self.message);

        if !silent {
            iopub.push(self.broadcast(
                Some(request),
                "execute_input",
                json!({ "code": code, "execution_count": self.execution_count }),
            ));
            iopub.push(self.broadcast(
                Some(request),
                "stream",
                json!({ "name": "stderr", "text": format!("{}\n", self.message) }),
            ));
        }

        self.reply(
            request,
            "execute_reply",
            json!({
                "status": "error",
                "execution_count": self.execution_count,
                "ename": ERROR_NAME,
                "evalue": self.message,
                "traceback": []
            }),
        )
    }
}

fn header_value(header: &Header) -> Value {
    serde_json::to_value(header).unwrap_or_else(|_| json!({}))
}
