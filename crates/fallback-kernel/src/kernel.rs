// Fallback kernel sockets
// Binds the five Jupyter channels and drives FallbackHandler until shutdown

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zeromq::{PubSocket, RepSocket, RouterSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use crate::connection::ConnectionInfo;
use crate::error::{Result, WireError};
use crate::handler::FallbackHandler;
use crate::shutdown::{ShutdownSender, ShutdownToken};
use crate::wire::{Message, Signer};

/// State shared by the shell and control loops
struct Shared {
    signer: Signer,
    handler: Mutex<FallbackHandler>,
    iopub: Mutex<PubSocket>,
    shutdown: Arc<ShutdownSender>,
}

impl Shared {
    async fn publish(&self, message: &Message) -> Result<()> {
        let frames = to_zmq(message.encode(&self.signer)?)?;
        self.iopub.lock().await.send(frames).await?;
        Ok(())
    }
}

/// A bound fallback kernel
pub struct FallbackKernel {
    shell: RouterSocket,
    control: RouterSocket,
    stdin: RouterSocket,
    heartbeat: RepSocket,
    shared: Arc<Shared>,
}

impl FallbackKernel {
    /// Bind every channel named in the connection file
    pub async fn bind(
        conn: &ConnectionInfo,
        handler: FallbackHandler,
        shutdown: Arc<ShutdownSender>,
    ) -> Result<Self> {
        let mut shell = RouterSocket::new();
        shell.bind(&conn.endpoint(conn.shell_port)).await?;
        let mut control = RouterSocket::new();
        control.bind(&conn.endpoint(conn.control_port)).await?;
        let mut stdin = RouterSocket::new();
        stdin.bind(&conn.endpoint(conn.stdin_port)).await?;
        let mut iopub = PubSocket::new();
        iopub.bind(&conn.endpoint(conn.iopub_port)).await?;
        let mut heartbeat = RepSocket::new();
        heartbeat.bind(&conn.endpoint(conn.hb_port)).await?;

        info!(
            ip = %conn.ip,
            shell_port = conn.shell_port,
            "Fallback kernel bound"
        );

        Ok(Self {
            shell,
            control,
            stdin,
            heartbeat,
            shared: Arc::new(Shared {
                signer: Signer::new(&conn.key),
                handler: Mutex::new(handler),
                iopub: Mutex::new(iopub),
                shutdown,
            }),
        })
    }

    /// Serve requests until a `shutdown_request` arrives or the sender fires
    pub async fn run(self) -> Result<()> {
        let Self {
            shell,
            control,
            stdin,
            heartbeat,
            shared,
        } = self;

        let starting = shared.handler.lock().await.starting();
        shared.publish(&starting).await?;

        tokio::try_join!(
            echo_heartbeat(heartbeat, shared.shutdown.token()),
            serve_channel("shell", shell, shared.clone(), shared.shutdown.token()),
            serve_channel("control", control, shared.clone(), shared.shutdown.token()),
        )?;

        // Bound only so frontends can connect; input is never requested
        drop(stdin);
        info!("Fallback kernel stopped");
        Ok(())
    }
}

async fn echo_heartbeat(mut socket: RepSocket, mut token: ShutdownToken) -> Result<()> {
    loop {
        tokio::select! {
            _ = token.wait() => return Ok(()),
            ping = socket.recv() => socket.send(ping?).await?,
        }
    }
}

async fn serve_channel(
    channel: &'static str,
    mut socket: RouterSocket,
    shared: Arc<Shared>,
    mut token: ShutdownToken,
) -> Result<()> {
    loop {
        let frames = tokio::select! {
            _ = token.wait() => return Ok(()),
            received = socket.recv() => from_zmq(received?),
        };

        let request = match Message::decode(&frames, &shared.signer) {
            Ok(request) => request,
            Err(err) => {
                warn!(channel, error = %err, "Dropping message");
                continue;
            }
        };
        debug!(channel, msg_type = %request.msg_type(), "Received request");

        let outcome = shared.handler.lock().await.handle(&request);

        for message in &outcome.before {
            shared.publish(message).await?;
        }
        if let Some(reply) = &outcome.reply {
            socket.send(to_zmq(reply.encode(&shared.signer)?)?).await?;
        }
        for message in &outcome.after {
            shared.publish(message).await?;
        }

        if outcome.shutdown {
            info!(channel, "Shutdown requested");
            shared.shutdown.shutdown();
            return Ok(());
        }
    }
}

fn from_zmq(message: ZmqMessage) -> Vec<Bytes> {
    message.iter().cloned().collect()
}

fn to_zmq(frames: Vec<Bytes>) -> Result<ZmqMessage> {
    ZmqMessage::try_from(frames).map_err(|e| WireError::Socket(e.to_string()))
}
