//! Session: one call's channel, media paths, hooks and memory scope

use super::media::{Direction, MediaPath, MediaStats};
use crate::channel::Channel;
use crate::core::{CoreInner, SwitchCore};
use crate::endpoint::Endpoint;
use crate::errors::{Result, SwitchError};
use crate::hooks::EventHooks;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use softswitch_codec_core::Codec;
use softswitch_infra_common::{BlockId, MemoryPool};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

struct Identity {
    id: u64,
    name: String,
}

/// The full runtime state of one call.
///
/// A session is created in state `NEW` by [`SwitchCore::request_session`],
/// driven by its own thread once launched, and destroyed exactly once when
/// that thread finishes. Everything it allocates is charged to its pool and
/// released together with it.
pub struct Session {
    identity: OnceCell<Identity>,
    pool: Arc<MemoryPool>,
    channel: Channel,
    endpoint: Arc<dyn Endpoint>,
    pub(crate) hooks: RwLock<EventHooks>,
    pub(crate) read_path: Mutex<MediaPath>,
    pub(crate) write_path: Mutex<MediaPath>,
    private: RwLock<Option<Arc<dyn Any + Send + Sync>>>,
    pub(crate) launched: AtomicBool,
    pub(crate) running: AtomicBool,
    destroyed: AtomicBool,
    core: Weak<CoreInner>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(
        core: &Arc<CoreInner>,
        endpoint: Arc<dyn Endpoint>,
        pool: Arc<MemoryPool>,
    ) -> Result<Arc<Self>> {
        let config = &core.config;
        let read_path = MediaPath::new(
            Direction::Read,
            config.scratch_frame_bytes,
            config.buffer_frames,
            Arc::clone(&pool),
        )?;
        let write_path = MediaPath::new(
            Direction::Write,
            config.scratch_frame_bytes,
            config.buffer_frames,
            Arc::clone(&pool),
        )?;

        let session = Arc::new(Self {
            identity: OnceCell::new(),
            pool,
            channel: Channel::new(),
            endpoint,
            hooks: RwLock::new(EventHooks::default()),
            read_path: Mutex::new(read_path),
            write_path: Mutex::new(write_path),
            private: RwLock::new(None),
            launched: AtomicBool::new(false),
            running: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            core: Arc::downgrade(core),
            created_at: Utc::now(),
        });
        debug!(endpoint = session.endpoint.name(), "Session requested");
        Ok(session)
    }

    /// Give the session its identity; only the first call has an effect
    pub(crate) fn assign_identity(&self, id: u64) -> bool {
        self.identity
            .set(Identity {
                id,
                name: id.to_string(),
            })
            .is_ok()
    }

    /// Numeric identity, assigned when the session thread starts
    pub fn id(&self) -> Option<u64> {
        self.identity.get().map(|identity| identity.id)
    }

    /// Display name derived from the identity
    pub fn name(&self) -> &str {
        self.identity
            .get()
            .map_or("unlaunched", |identity| identity.name.as_str())
    }

    pub fn pool(&self) -> &Arc<MemoryPool> {
        &self.pool
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn endpoint(&self) -> &Arc<dyn Endpoint> {
        &self.endpoint
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The core this session belongs to, while it is alive
    pub fn core(&self) -> Option<SwitchCore> {
        self.core.upgrade().map(SwitchCore::from_inner)
    }

    /// Allocate a zeroed block from the session pool
    pub fn alloc(&self, len: usize) -> Result<BlockId> {
        Ok(self.pool.alloc(len)?)
    }

    /// Copy a string into the session pool
    pub fn strdup(&self, value: &str) -> Result<Arc<str>> {
        Ok(self.pool.strdup(value)?)
    }

    /// Attach endpoint-private data, replacing any previous value
    pub fn set_private<T: Any + Send + Sync>(&self, value: T) {
        *self.private.write() = Some(Arc::new(value));
    }

    /// Endpoint-private data, if it was set with type `T`
    pub fn private<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let value = self.private.read().clone()?;
        value.downcast::<T>().ok()
    }

    pub fn read_codec(&self) -> Option<Arc<Codec>> {
        self.read_path.lock().codec()
    }

    /// Set the codec frames are delivered to readers in.
    ///
    /// # Panics
    ///
    /// When `codec` has already been destroyed.
    pub fn set_read_codec(&self, codec: Option<Arc<Codec>>) {
        assert_initialized(codec.as_deref());
        self.read_path.lock().set_codec(codec);
    }

    pub fn write_codec(&self) -> Option<Arc<Codec>> {
        self.write_path.lock().codec()
    }

    /// Set the codec frames are handed to the endpoint in.
    ///
    /// # Panics
    ///
    /// When `codec` has already been destroyed.
    pub fn set_write_codec(&self, codec: Option<Arc<Codec>>) {
        assert_initialized(codec.as_deref());
        self.write_path.lock().set_codec(codec);
    }

    pub fn read_stats(&self) -> MediaStats {
        self.read_path.lock().stats()
    }

    pub fn write_stats(&self) -> MediaStats {
        self.write_path.lock().stats()
    }

    /// Wake the state machine without changing state
    pub fn signal_state_change(&self) {
        self.channel.notify();
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(SwitchError::SessionDestroyed {
                name: self.name().to_string(),
            });
        }
        Ok(())
    }

    /// Tear the session down: unregister it, drop hooks, codecs and buffers
    /// and release the pool. Idempotent.
    pub(crate) fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.running.store(false, Ordering::Release);

        if let (Some(core), Some(identity)) = (self.core.upgrade(), self.identity.get()) {
            core.sessions
                .remove_if(&identity.name, |_, registered| std::ptr::eq(registered.as_ref(), self));
        }

        self.read_path.lock().clear();
        self.write_path.lock().clear();
        *self.hooks.write() = EventHooks::default();
        self.private.write().take();
        self.channel.clear_state_handler();
        self.pool.destroy();

        info!(session = %self.name(), "Session destroyed");
    }
}

fn assert_initialized(codec: Option<&Codec>) {
    if let Some(codec) = codec {
        assert!(
            codec.is_initialized(),
            "codec {} must be initialized before it is attached to a session",
            codec.name()
        );
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name())
            .field("endpoint", &self.endpoint.name())
            .field("state", &self.channel.state())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
