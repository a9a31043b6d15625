//! Registry of loadable interfaces: endpoints, codecs, timers, dialplans and applications

use crate::channel::CallerExtension;
use crate::endpoint::Endpoint;
use crate::session::Session;
use crate::timer::{SoftTimer, TimerInterface};
use dashmap::DashMap;
use softswitch_codec_core::{CodecInterface, CodecRegistry};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes a ringing session to a caller extension
pub trait Dialplan: Send + Sync {
    /// Registry name, matched against [`CallerProfile::dialplan`](crate::CallerProfile::dialplan)
    fn name(&self) -> &str;

    /// Find the extension to execute, if any
    fn hunt(&self, session: &Session) -> Option<CallerExtension>;
}

/// Function invoked for one `name(data)` step of an extension
pub type ApplicationFunction = Arc<dyn Fn(&Session, &str) + Send + Sync>;

/// A named application
#[derive(Clone)]
pub struct ApplicationInterface {
    pub name: String,
    pub function: ApplicationFunction,
}

impl fmt::Debug for ApplicationInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationInterface").field("name", &self.name).finish()
    }
}

/// Interfaces available to the core, looked up by name from any thread
#[derive(Default)]
pub struct ModuleRegistry {
    endpoints: DashMap<String, Arc<dyn Endpoint>>,
    codecs: CodecRegistry,
    timers: DashMap<String, Arc<dyn TimerInterface>>,
    dialplans: DashMap<String, Arc<dyn Dialplan>>,
    applications: DashMap<String, ApplicationInterface>,
}

fn log_registration(kind: &str, name: &str, replaced: bool) {
    if replaced {
        warn!(kind, name, "Replaced interface");
    } else {
        debug!(kind, name, "Registered interface");
    }
}

impl ModuleRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in codecs and the `soft` timer
    pub fn with_builtin() -> Self {
        let registry = Self {
            codecs: CodecRegistry::with_builtin(),
            ..Default::default()
        };
        registry.register_timer(Arc::new(SoftTimer));
        registry
    }

    pub fn register_endpoint(&self, endpoint: Arc<dyn Endpoint>) {
        let name = endpoint.name().to_string();
        let replaced = self.endpoints.insert(name.clone(), endpoint).is_some();
        log_registration("endpoint", &name, replaced);
    }

    pub fn endpoint(&self, name: &str) -> Option<Arc<dyn Endpoint>> {
        self.endpoints.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn register_codec(&self, interface: CodecInterface) {
        self.codecs.register(interface);
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn register_timer(&self, timer: Arc<dyn TimerInterface>) {
        let name = timer.name().to_string();
        let replaced = self.timers.insert(name.clone(), timer).is_some();
        log_registration("timer", &name, replaced);
    }

    pub fn timer(&self, name: &str) -> Option<Arc<dyn TimerInterface>> {
        self.timers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn register_dialplan(&self, dialplan: Arc<dyn Dialplan>) {
        let name = dialplan.name().to_string();
        let replaced = self.dialplans.insert(name.clone(), dialplan).is_some();
        log_registration("dialplan", &name, replaced);
    }

    pub fn dialplan(&self, name: &str) -> Option<Arc<dyn Dialplan>> {
        self.dialplans.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Register an application function under `name`
    pub fn register_application<F>(&self, name: impl Into<String>, function: F)
    where
        F: Fn(&Session, &str) + Send + Sync + 'static,
    {
        let name = name.into();
        let interface = ApplicationInterface {
            name: name.clone(),
            function: Arc::new(function),
        };
        let replaced = self.applications.insert(name.clone(), interface).is_some();
        log_registration("application", &name, replaced);
    }

    pub fn application(&self, name: &str) -> Option<ApplicationInterface> {
        self.applications.get(name).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::SOFT_TIMER;

    #[test]
    fn test_builtin_contents() {
        let registry = ModuleRegistry::with_builtin();
        assert!(registry.timer(SOFT_TIMER).is_some());
        assert_eq!(registry.codecs().names(), vec!["L16", "PCMA", "PCMU"]);
        assert!(registry.endpoint("sofia").is_none());
    }

    #[test]
    fn test_application_replacement() {
        let registry = ModuleRegistry::new();
        registry.register_application("echo", |_, _| {});
        registry.register_application("echo", |_, _| {});
        assert_eq!(registry.application("echo").unwrap().name, "echo");
        assert!(registry.application("playback").is_none());
    }
}
