// Signal forwarding to a managed child process (Unix)
// reason: nix for kill(2), tokio::signal for async signal streams
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::signal::unix::{signal, Signal as SignalStream, SignalKind};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Signals that are never forwarded
///
/// SIGKILL and SIGSTOP cannot be caught, SIGCHLD reports on the child itself, and the
/// synchronous fault signals describe this process, not a request for the child.
const NOT_FORWARDED: [Signal; 8] = [
    Signal::SIGKILL,
    Signal::SIGSTOP,
    Signal::SIGCHLD,
    Signal::SIGSEGV,
    Signal::SIGBUS,
    Signal::SIGILL,
    Signal::SIGFPE,
    Signal::SIGTRAP,
];

/// Every signal a managed child should receive when the launcher does
pub fn forwardable_signals() -> Vec<Signal> {
    Signal::iterator()
        .filter(|sig| !NOT_FORWARDED.contains(sig))
        .collect()
}

/// Relays signals received by this process to one child
///
/// Listeners stop when the forwarder is dropped.
pub struct SignalForwarder {
    pending: Vec<(Signal, SignalStream)>,
    tasks: Vec<JoinHandle<()>>,
}

impl SignalForwarder {
    /// Register a listener for every forwardable signal; must be called inside a tokio runtime
    ///
    /// Nothing is relayed until [`forward_to`](Self::forward_to); signals received in
    /// between stay queued on their stream. Signals tokio refuses to register are skipped.
    pub fn listen() -> Self {
        let mut pending = Vec::new();
        for sig in forwardable_signals() {
            match signal(SignalKind::from_raw(sig as i32)) {
                Ok(stream) => pending.push((sig, stream)),
                Err(e) => debug!(signal = %sig, error = %e, "Signal cannot be forwarded"),
            }
        }

        Self {
            pending,
            tasks: Vec::new(),
        }
    }

    /// Start relaying every registered signal to `pid`
    pub fn forward_to(mut self, pid: u32) -> Self {
        let target = Pid::from_raw(pid as i32);

        for (sig, mut stream) in self.pending.drain(..) {
            self.tasks.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    debug!(signal = %sig, pid = %target, "Forwarding signal to kernel");
                    if let Err(e) = kill(target, sig) {
                        warn!(signal = %sig, pid = %target, error = %e, "Failed to forward signal");
                    }
                }
            }));
        }

        debug!(pid = pid, listeners = self.tasks.len(), "Signal forwarding started");
        self
    }
}

impl Drop for SignalForwarder {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
