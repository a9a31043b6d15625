//! Hierarchical memory pools
//!
//! A [`MemoryPool`] owns everything allocated for one scope (the process, a
//! session, a codec) and releases all of it in a single step when it is
//! destroyed or dropped. Nothing handed out by a pool has an independent
//! free path.
//!
//! Pools form a tree. Bytes charged to a child are charged to every ancestor
//! as well, so a byte budget on the master pool bounds the whole process and
//! a budget on a session pool bounds one call. Destroying a pool destroys its
//! live children first.

use crate::errors::PoolError;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a zero-initialized block allocated from a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

/// A scoped allocation arena
pub struct MemoryPool {
    id: u64,
    label: String,
    limit: Option<usize>,
    parent: Option<Arc<MemoryPool>>,
    inner: Mutex<PoolInner>,
}

#[derive(Default)]
struct PoolInner {
    used: usize,
    destroyed: bool,
    blocks: Vec<Box<[u8]>>,
    strings: Vec<Arc<str>>,
    objects: Vec<Box<dyn Any + Send + Sync>>,
    children: Vec<Weak<MemoryPool>>,
}

impl MemoryPool {
    /// Create a root pool without a byte budget
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Self::with_limit(label, None)
    }

    /// Create a root pool with an optional byte budget
    pub fn with_limit(label: impl Into<String>, limit: Option<usize>) -> Arc<Self> {
        Arc::new(Self::build(label.into(), limit, None))
    }

    fn build(label: String, limit: Option<usize>, parent: Option<Arc<MemoryPool>>) -> Self {
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        trace!(pool = %label, id, ?limit, "Created memory pool");
        Self {
            id,
            label,
            limit,
            parent,
            inner: Mutex::new(PoolInner::default()),
        }
    }

    /// Create a child pool that charges its allocations to this one
    pub fn child(self: &Arc<Self>, label: impl Into<String>) -> Result<Arc<Self>, PoolError> {
        self.child_with_limit(label, None)
    }

    /// Create a child pool with its own byte budget
    pub fn child_with_limit(
        self: &Arc<Self>,
        label: impl Into<String>,
        limit: Option<usize>,
    ) -> Result<Arc<Self>, PoolError> {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return Err(self.destroyed_error());
        }
        let child = Arc::new(Self::build(label.into(), limit, Some(Arc::clone(self))));
        inner.children.retain(|weak| weak.strong_count() > 0);
        inner.children.push(Arc::downgrade(&child));
        Ok(child)
    }

    /// Unique identifier of this pool
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Human readable label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Byte budget, if any
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Parent pool, if this is not a root
    pub fn parent(&self) -> Option<&Arc<MemoryPool>> {
        self.parent.as_ref()
    }

    /// Bytes currently charged to this pool and its descendants
    pub fn used(&self) -> usize {
        self.inner.lock().used
    }

    /// Whether [`destroy`](Self::destroy) already ran
    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().destroyed
    }

    /// Number of blocks handed out by [`alloc`](Self::alloc)
    pub fn block_count(&self) -> usize {
        self.inner.lock().blocks.len()
    }

    /// Charge `bytes` against this pool and all of its ancestors.
    ///
    /// Used for structures that live in their owner's memory but are not
    /// stored inside the pool itself (hook entries, adaptive buffers). The
    /// charge is released when the pool is destroyed.
    pub fn charge(&self, bytes: usize) -> Result<(), PoolError> {
        {
            let mut inner = self.inner.lock();
            if inner.destroyed {
                return Err(self.destroyed_error());
            }
            if let Some(limit) = self.limit {
                if inner.used.saturating_add(bytes) > limit {
                    return Err(PoolError::Exhausted {
                        pool: self.label.clone(),
                        requested: bytes,
                        used: inner.used,
                        limit,
                    });
                }
            }
            inner.used += bytes;
        }

        if let Some(parent) = &self.parent {
            if let Err(err) = parent.charge(bytes) {
                let mut inner = self.inner.lock();
                inner.used = inner.used.saturating_sub(bytes);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Allocate a zero-initialized block of `len` bytes
    pub fn alloc(&self, len: usize) -> Result<BlockId, PoolError> {
        self.charge(len)?;
        let mut inner = self.inner.lock();
        if inner.destroyed {
            // Lost a race with destroy(); the charge was already released.
            return Err(self.destroyed_error());
        }
        inner.blocks.push(vec![0u8; len].into_boxed_slice());
        Ok(BlockId(inner.blocks.len() - 1))
    }

    /// Run `f` against a block previously returned by [`alloc`](Self::alloc).
    ///
    /// Returns `None` when the block does not belong to this pool or the pool
    /// has been destroyed.
    pub fn with_block<R>(&self, block: BlockId, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        let mut inner = self.inner.lock();
        inner.blocks.get_mut(block.0).map(|data| f(data))
    }

    /// Copy a string into the pool
    pub fn strdup(&self, value: &str) -> Result<Arc<str>, PoolError> {
        self.charge(value.len() + 1)?;
        let duped: Arc<str> = Arc::from(value);
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return Err(self.destroyed_error());
        }
        inner.strings.push(Arc::clone(&duped));
        Ok(duped)
    }

    /// Hand ownership of `value` to the pool; it is dropped when the pool is destroyed
    pub fn adopt<T: Any + Send + Sync>(&self, value: T) -> Result<(), PoolError> {
        self.charge(std::mem::size_of::<T>())?;
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return Err(self.destroyed_error());
        }
        inner.objects.push(Box::new(value));
        Ok(())
    }

    /// Release everything owned by this pool and its live children.
    ///
    /// Idempotent. Allocation attempts after this point fail with
    /// [`PoolError::Destroyed`].
    pub fn destroy(&self) {
        let children = {
            let mut inner = self.inner.lock();
            if inner.destroyed {
                return;
            }
            inner.destroyed = true;
            std::mem::take(&mut inner.children)
        };

        for child in children.iter().filter_map(Weak::upgrade) {
            child.destroy();
        }

        let (released, blocks, strings, objects) = {
            let mut inner = self.inner.lock();
            (
                std::mem::take(&mut inner.used),
                std::mem::take(&mut inner.blocks),
                std::mem::take(&mut inner.strings),
                std::mem::take(&mut inner.objects),
            )
        };
        self.release_from_ancestors(released);

        let block_count = blocks.len();
        drop(blocks);
        drop(strings);
        drop(objects);

        debug!(pool = %self.label, id = self.id, released, block_count, "Destroyed memory pool");
    }

    fn release_from_ancestors(&self, bytes: usize) {
        let mut next = self.parent.as_ref();
        while let Some(pool) = next {
            {
                let mut inner = pool.inner.lock();
                inner.used = inner.used.saturating_sub(bytes);
            }
            next = pool.parent.as_ref();
        }
    }

    fn destroyed_error(&self) -> PoolError {
        PoolError::Destroyed {
            pool: self.label.clone(),
        }
    }
}

impl Drop for MemoryPool {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryPool")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("limit", &self.limit)
            .field("used", &inner.used)
            .field("destroyed", &inner.destroyed)
            .field("blocks", &inner.blocks.len())
            .finish()
    }
}
