//! Process-wide runtime context
//!
//! [`SwitchCore`] replaces process globals: it owns the master memory pool,
//! the module registry, the session table and the identity counter. It is
//! cheap to clone and every clone refers to the same runtime.

use crate::config::CoreConfig;
use crate::channel::ChannelState;
use crate::endpoint::Endpoint;
use crate::errors::{Result, SwitchError};
use crate::modules::ModuleRegistry;
use crate::session::Session;
use crate::thread::{self, SessionHandle};
use crate::timer::Timer;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use softswitch_codec_core::{Codec, CodecFlags};
use softswitch_infra_common::{BlockId, MemoryPool};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

pub(crate) struct CoreInner {
    pub(crate) config: CoreConfig,
    master_pool: Arc<MemoryPool>,
    modules: ModuleRegistry,
    pub(crate) sessions: DashMap<String, Arc<Session>>,
    next_id: Mutex<u64>,
    started_at: DateTime<Utc>,
    shut_down: AtomicBool,
}

impl CoreInner {
    /// Hand out the next session identity, wrapping back to 1 past the maximum
    pub(crate) fn next_session_id(&self) -> u64 {
        let mut next = self.next_id.lock();
        let id = *next;
        *next = if id >= self.config.max_session_id { 1 } else { id + 1 };
        id
    }
}

/// Handle to the session engine runtime
#[derive(Clone)]
pub struct SwitchCore {
    inner: Arc<CoreInner>,
}

impl SwitchCore {
    /// Validate `config` and build a runtime with the built-in modules registered
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let master_pool = MemoryPool::with_limit("master", config.memory_limit);
        let inner = CoreInner {
            master_pool,
            modules: ModuleRegistry::with_builtin(),
            sessions: DashMap::new(),
            next_id: Mutex::new(1),
            started_at: Utc::now(),
            shut_down: AtomicBool::new(false),
            config,
        };
        info!(
            buffer_frames = inner.config.buffer_frames,
            scratch_frame_bytes = inner.config.scratch_frame_bytes,
            "Switch core started"
        );
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub(crate) fn from_inner(inner: Arc<CoreInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.inner.modules
    }

    pub fn master_pool(&self) -> &Arc<MemoryPool> {
        &self.inner.master_pool
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    pub fn uptime(&self) -> ChronoDuration {
        Utc::now() - self.inner.started_at
    }

    /// New pool under the master pool, bounded by `session_memory_limit`
    pub fn new_memory_pool(&self, label: impl Into<String>) -> Result<Arc<MemoryPool>> {
        let pool = self
            .inner
            .master_pool
            .child_with_limit(label, self.inner.config.session_memory_limit)?;
        Ok(pool)
    }

    /// Allocate a block that lives until shutdown
    pub fn permanent_alloc(&self, len: usize) -> Result<BlockId> {
        Ok(self.inner.master_pool.alloc(len)?)
    }

    /// Copy a string that lives until shutdown
    pub fn permanent_strdup(&self, value: &str) -> Result<Arc<str>> {
        Ok(self.inner.master_pool.strdup(value)?)
    }

    /// Create a session in state `NEW` for `endpoint`.
    ///
    /// Without a `pool` the session gets a fresh one from
    /// [`new_memory_pool`](Self::new_memory_pool).
    pub fn request_session(
        &self,
        endpoint: Arc<dyn Endpoint>,
        pool: Option<Arc<MemoryPool>>,
    ) -> Result<Arc<Session>> {
        if self.is_shut_down() {
            return Err(SwitchError::failed("switch core is shut down"));
        }
        let pool = match pool {
            Some(pool) => pool,
            None => self.new_memory_pool(format!("session:{}", endpoint.name()))?,
        };
        Session::new(&self.inner, endpoint, pool)
    }

    /// [`request_session`](Self::request_session) for a registered endpoint
    pub fn request_session_by_name(
        &self,
        endpoint_name: &str,
        pool: Option<Arc<MemoryPool>>,
    ) -> Result<Arc<Session>> {
        let endpoint = self
            .modules()
            .endpoint(endpoint_name)
            .ok_or_else(|| SwitchError::EndpointNotFound {
                name: endpoint_name.to_string(),
            })?;
        self.request_session(endpoint, pool)
    }

    /// Start the session's thread.
    ///
    /// On return the session has its identity and is registered.
    pub fn launch_session(&self, session: Arc<Session>) -> Result<SessionHandle> {
        let handle = thread::spawn_session(&self.inner, session)?;
        debug!(session = %handle.session().name(), "Session launched");
        Ok(handle)
    }

    /// Look up a live session by name
    pub fn find_session(&self, name: &str) -> Option<Arc<Session>> {
        self.inner
            .sessions
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Names of all registered sessions, sorted
    pub fn session_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Run `f` on a named helper thread
    pub fn launch_module_thread<F>(&self, name: impl Into<String>, f: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce(SwitchCore) + Send + 'static,
    {
        let name = name.into();
        let core = self.clone();
        debug!(thread = %name, "Launching module thread");
        std::thread::Builder::new()
            .name(name)
            .spawn(move || f(core))
            .map_err(|e| SwitchError::Thread(format!("cannot spawn module thread: {}", e)))
    }

    /// Initialize a codec by name with an optional rate and frame duration
    pub fn codec_init(
        &self,
        name: &str,
        rate: Option<u32>,
        ms: Option<u32>,
        flags: CodecFlags,
    ) -> Result<Arc<Codec>> {
        let codec = self
            .modules()
            .codecs()
            .init_codec(name, rate, ms, flags, &self.inner.master_pool)?;
        Ok(codec)
    }

    /// Start a registered timer
    pub fn timer_init(&self, name: &str, interval_ms: u32, samples: u32) -> Result<Timer> {
        let interface = self
            .modules()
            .timer(name)
            .ok_or_else(|| SwitchError::TimerNotFound {
                name: name.to_string(),
            })?;
        Timer::start(interface.as_ref(), interval_ms, samples)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Hang up every session and release the master pool. Idempotent.
    ///
    /// Session threads finish on their own; use their handles to wait.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let sessions: Vec<Arc<Session>> = self
            .inner
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        if !sessions.is_empty() {
            warn!(count = sessions.len(), "Hanging up sessions at shutdown");
        }
        for session in &sessions {
            session.channel().set_state(ChannelState::Hangup);
        }
        self.inner.master_pool.destroy();
        info!(uptime_secs = self.uptime().num_seconds(), "Switch core shut down");
    }
}

impl fmt::Debug for SwitchCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchCore")
            .field("sessions", &self.session_count())
            .field("started_at", &self.inner.started_at)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core_with_max_id(max_session_id: u64) -> SwitchCore {
        let config = CoreConfig {
            max_session_id,
            ..Default::default()
        };
        SwitchCore::new(config).unwrap()
    }

    #[test]
    fn test_session_ids_wrap_to_one() {
        let core = core_with_max_id(3);
        let ids: Vec<u64> = (0..5).map(|_| core.inner.next_session_id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 1, 2]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CoreConfig {
            buffer_frames: 0,
            ..Default::default()
        };
        assert!(matches!(SwitchCore::new(config), Err(SwitchError::Config(_))));
    }

    #[test]
    fn test_unknown_lookups() {
        let core = core_with_max_id(10);
        assert!(matches!(
            core.timer_init("hardware", 20, 160),
            Err(SwitchError::TimerNotFound { .. })
        ));
        assert!(matches!(
            core.request_session_by_name("sofia", None),
            Err(SwitchError::EndpointNotFound { .. })
        ));
        assert!(matches!(
            core.codec_init("G729", None, None, CodecFlags::BOTH),
            Err(SwitchError::Codec(_))
        ));
    }

    #[test]
    fn test_permanent_allocations_charge_master_pool() {
        let core = core_with_max_id(10);
        core.permanent_alloc(64).unwrap();
        let name = core.permanent_strdup("softswitch").unwrap();
        assert_eq!(&*name, "softswitch");
        assert!(core.master_pool().used() >= 64 + name.len());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let core = core_with_max_id(10);
        core.shutdown();
        core.shutdown();
        assert!(core.is_shut_down());
        assert!(core.master_pool().is_destroyed());
    }
}
