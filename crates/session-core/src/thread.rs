//! Session threads
//!
//! Every launched session runs on its own OS thread. The thread assigns the
//! session identity, registers it with the core, drives the state machine
//! to `DONE` and destroys the session on the way out, however it got there.

use crate::channel::ChannelState;
use crate::core::CoreInner;
use crate::endpoint::Signal;
use crate::errors::{Result, SwitchError};
use crate::session::Session;
use crate::state_machine;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, info_span, warn};

/// Read timeout of the service loop, bounding how long `end` waits on an
/// endpoint that ignores kill signals
pub const SERVICE_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Destroys the session when the thread leaves, including by unwinding
struct DestroyOnExit<'a>(&'a Session);

impl Drop for DestroyOnExit<'_> {
    fn drop(&mut self) {
        self.0.destroy();
    }
}

/// A launched session and its thread
pub struct SessionHandle {
    session: Arc<Session>,
    thread: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Whether the session thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Ask the session to hang up without waiting for it
    pub fn hangup(&self) {
        self.session.channel().set_state(ChannelState::Hangup);
    }

    /// Hang up, interrupt the endpoint and wait until the session thread is gone
    pub fn kill(self) -> Result<()> {
        self.hangup();
        match self.session.kill_channel(Signal::Kill) {
            Ok(()) | Err(SwitchError::Unsupported { .. }) => {}
            Err(err) => debug!(session = %self.session.name(), error = %err, "Kill signal failed"),
        }
        self.join()
    }

    /// Wait for the session thread to exit
    pub fn join(mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        thread
            .join()
            .map_err(|_| SwitchError::Thread(format!("session {} panicked", self.session.name())))
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session", &self.session.name())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Start the thread that owns `session` from here on
pub(crate) fn spawn_session(core: &Arc<CoreInner>, session: Arc<Session>) -> Result<SessionHandle> {
    if session.is_destroyed() {
        return Err(SwitchError::SessionDestroyed {
            name: session.name().to_string(),
        });
    }
    if session.launched.swap(true, Ordering::AcqRel) {
        return Err(SwitchError::Thread(format!(
            "session {} is already launched",
            session.name()
        )));
    }

    let (ready_tx, ready_rx) = mpsc::sync_channel::<u64>(1);
    let thread_core = Arc::clone(core);
    let thread_session = Arc::clone(&session);

    let thread = thread::Builder::new()
        .name(core.config.thread_name_prefix.clone())
        .spawn(move || {
            let session = thread_session;
            let _guard = DestroyOnExit(&session);

            let id = thread_core.next_session_id();
            session.assign_identity(id);
            thread_core
                .sessions
                .insert(session.name().to_string(), Arc::clone(&session));
            drop(thread_core);
            let _ = ready_tx.send(id);

            let span = info_span!("session", name = %session.name());
            let _entered = span.enter();
            info!(endpoint = session.endpoint().name(), "Session thread started");
            state_machine::run(&session);
            info!("Session thread finished");
        })
        .map_err(|e| {
            session.launched.store(false, Ordering::Release);
            SwitchError::Thread(format!("cannot spawn session thread: {}", e))
        })?;

    ready_rx
        .recv()
        .map_err(|_| SwitchError::Thread("session thread exited before registering".to_string()))?;

    Ok(SessionHandle {
        session,
        thread: Some(thread),
    })
}

/// A running service loop
pub struct ServiceHandle {
    session: Arc<Session>,
    thread: Option<JoinHandle<()>>,
}

impl ServiceHandle {
    pub fn is_running(&self) -> bool {
        self.session.running.load(Ordering::Acquire)
    }

    /// Stop the loop and wait for its thread
    pub fn end(mut self) -> Result<()> {
        self.session.running.store(false, Ordering::Release);
        match self.session.kill_channel(Signal::Kill) {
            Ok(()) | Err(SwitchError::Unsupported { .. }) => {}
            Err(err) => debug!(session = %self.session.name(), error = %err, "Kill signal failed"),
        }
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        thread
            .join()
            .map_err(|_| SwitchError::Thread(format!("service of {} panicked", self.session.name())))
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("session", &self.session.name())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Session {
    /// Start a thread that keeps reading frames until [`ServiceHandle::end`]
    /// is called or a read fails
    pub fn service(self: &Arc<Self>) -> Result<ServiceHandle> {
        self.ensure_live()?;
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(SwitchError::Thread(format!(
                "session {} already has a service thread",
                self.name()
            )));
        }

        let session = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("{}-service", self.name()))
            .spawn(move || {
                debug!(session = %session.name(), "Service started");
                while session.running.load(Ordering::Acquire) {
                    match session.read_frame(Some(SERVICE_READ_TIMEOUT)) {
                        Ok(_) | Err(SwitchError::Timeout) => {}
                        Err(err) => {
                            warn!(session = %session.name(), error = %err, "Service read failed");
                            break;
                        }
                    }
                }
                session.running.store(false, Ordering::Release);
                debug!(session = %session.name(), "Service stopped");
            });

        match spawned {
            Ok(thread) => Ok(ServiceHandle {
                session: Arc::clone(self),
                thread: Some(thread),
            }),
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(SwitchError::Thread(format!("cannot spawn service thread: {}", e)))
            }
        }
    }

    /// Run `f` on a new thread holding a reference to this session
    pub fn launch_thread<F>(self: &Arc<Self>, name: impl Into<String>, f: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce(Arc<Session>) + Send + 'static,
    {
        self.ensure_live()?;
        let session = Arc::clone(self);
        thread::Builder::new()
            .name(name.into())
            .spawn(move || f(session))
            .map_err(|e| SwitchError::Thread(format!("cannot spawn session thread: {}", e)))
    }
}
