//! Codec interfaces and the registry they are looked up in

use crate::codec::Codec;
use crate::codecs;
use crate::error::{CodecError, Result};
use crate::types::{CodecFlags, CodecImplementation};
use dashmap::DashMap;
use softswitch_infra_common::MemoryPool;
use std::sync::Arc;
use tracing::{debug, warn};

/// A named codec with its implementations in preference order
#[derive(Debug, Clone)]
pub struct CodecInterface {
    /// Lookup name
    pub name: String,
    /// Implementations; the first match wins during negotiation
    pub implementations: Vec<Arc<CodecImplementation>>,
}

impl CodecInterface {
    /// Create an interface from its implementations
    pub fn new(name: impl Into<String>, implementations: Vec<CodecImplementation>) -> Self {
        Self {
            name: name.into(),
            implementations: implementations.into_iter().map(Arc::new).collect(),
        }
    }

    /// First implementation matching `rate` and `ms`
    pub fn find(&self, rate: Option<u32>, ms: Option<u32>) -> Option<&Arc<CodecImplementation>> {
        self.implementations.iter().find(|imp| imp.matches(rate, ms))
    }
}

/// Registry of codec interfaces keyed by name
#[derive(Debug, Default)]
pub struct CodecRegistry {
    interfaces: DashMap<String, Arc<CodecInterface>>,
}

impl CodecRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in codecs
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        for interface in codecs::builtin_interfaces() {
            registry.register(interface);
        }
        registry
    }

    /// Register an interface, replacing any interface with the same name
    pub fn register(&self, interface: CodecInterface) {
        let name = interface.name.clone();
        let previous = self.interfaces.insert(name.clone(), Arc::new(interface));
        if previous.is_some() {
            warn!(codec = %name, "Replaced codec interface");
        } else {
            debug!(codec = %name, "Registered codec interface");
        }
    }

    /// Look up an interface by name
    pub fn get(&self, name: &str) -> Option<Arc<CodecInterface>> {
        self.interfaces.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Names of all registered interfaces
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.interfaces.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Negotiate a codec.
    ///
    /// The first implementation whose rate and frame duration match wins;
    /// `None` matches any value. The codec gets its own child pool of `parent`.
    ///
    /// # Errors
    ///
    /// - [`CodecError::CodecNotFound`] for an unknown name
    /// - [`CodecError::NoImplementation`] when nothing matches
    /// - [`CodecError::Memory`] when `parent` refuses the child pool
    pub fn init_codec(
        &self,
        name: &str,
        rate: Option<u32>,
        ms: Option<u32>,
        flags: CodecFlags,
        parent: &Arc<MemoryPool>,
    ) -> Result<Arc<Codec>> {
        let interface = self.get(name).ok_or_else(|| CodecError::not_found(name))?;
        let implementation = interface.find(rate, ms).cloned().ok_or_else(|| {
            CodecError::NoImplementation {
                name: name.to_string(),
                rate,
                ms,
            }
        })?;

        let pool = parent.child(format!("codec:{}", name))?;
        let state = implementation.backend.init(&implementation, flags)?;

        debug!(
            codec = %name,
            rate = implementation.samples_per_second,
            ms = implementation.milliseconds_per_frame(),
            "Codec initialized"
        );
        Ok(Arc::new(Codec::new(name, implementation, flags, pool, state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let registry = CodecRegistry::with_builtin();
        let pool = MemoryPool::new("test");

        let codec = registry
            .init_codec("L16", None, None, CodecFlags::BOTH, &pool)
            .unwrap();
        assert_eq!(codec.implementation().samples_per_second, 8000);
        assert_eq!(codec.implementation().milliseconds_per_frame(), 10);

        let codec = registry
            .init_codec("L16", Some(16000), Some(20), CodecFlags::BOTH, &pool)
            .unwrap();
        assert_eq!(codec.native_frame_bytes(), 640);
    }

    #[test]
    fn test_lookup_failures() {
        let registry = CodecRegistry::with_builtin();
        let pool = MemoryPool::new("test");

        let err = registry
            .init_codec("G729", None, None, CodecFlags::BOTH, &pool)
            .unwrap_err();
        assert!(matches!(err, CodecError::CodecNotFound { .. }));

        let err = registry
            .init_codec("PCMU", Some(16000), None, CodecFlags::BOTH, &pool)
            .unwrap_err();
        assert!(matches!(err, CodecError::NoImplementation { rate: Some(16000), .. }));
    }

    #[test]
    fn test_codec_pool_is_child_of_parent() {
        let registry = CodecRegistry::with_builtin();
        let parent = MemoryPool::new("parent");
        let codec = registry
            .init_codec("PCMA", Some(8000), Some(20), CodecFlags::BOTH, &parent)
            .unwrap();

        assert!(Arc::ptr_eq(codec.pool().parent().unwrap(), &parent));
        codec.destroy();
        assert!(codec.pool().is_destroyed());
        assert!(!parent.is_destroyed());
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(CodecRegistry::new());
        let template = CodecRegistry::with_builtin().get("PCMU").unwrap();

        let workers: Vec<_> = (0..4)
            .map(|n| {
                let registry = Arc::clone(&registry);
                let mut interface = (*template).clone();
                interface.name = format!("X{}", n);
                std::thread::spawn(move || registry.register(interface))
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let mut replacement = (*template).clone();
        replacement.name = "X0".to_string();
        replacement.implementations.truncate(1);
        registry.register(replacement);

        assert_eq!(registry.names(), vec!["X0", "X1", "X2", "X3"]);
        assert_eq!(registry.get("X0").unwrap().implementations.len(), 1);
    }
}
