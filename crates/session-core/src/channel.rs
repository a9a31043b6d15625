//! Channel: the lifecycle facet of a session
//!
//! The channel owns the current [`ChannelState`] together with the condition
//! variable the state machine sleeps on. Every accepted state change wakes
//! the state machine; checks and waits happen under the same lock, so a
//! change can never slip in between "state is unchanged" and "go to sleep".

use crate::state_machine::StateHandler;
use parking_lot::{Condvar, Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lifecycle states of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelState {
    /// Just created, waiting for first instructions
    New,
    /// Basic setup
    Init,
    /// Looking for something to do in the dialplan
    Ring,
    /// Running the caller extension's applications
    Execute,
    /// Looping media back to its source
    Loopback,
    /// Exchanging media with another channel
    Transmit,
    /// Tearing down
    Hangup,
    /// Terminal; the state machine exits
    Done,
}

impl ChannelState {
    /// Upper-case name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Init => "INIT",
            Self::Ring => "RING",
            Self::Execute => "EXECUTE",
            Self::Loopback => "LOOPBACK",
            Self::Transmit => "TRANSMIT",
            Self::Hangup => "HANGUP",
            Self::Done => "DONE",
        }
    }

    /// Whether this is the terminal state
    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media direction flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelFlags {
    /// Channel sends audio
    pub send_audio: bool,
    /// Channel receives audio
    pub recv_audio: bool,
}

impl ChannelFlags {
    /// Both directions enabled
    pub const fn both() -> Self {
        Self {
            send_audio: true,
            recv_audio: true,
        }
    }
}

/// Who is calling and where to, as supplied by the endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerProfile {
    /// Name of the dialplan that routes this call
    pub dialplan: String,
    pub caller_id_name: String,
    pub caller_id_number: String,
    pub network_addr: String,
    pub destination_number: String,
}

impl CallerProfile {
    /// Profile routed by `dialplan` towards `destination_number`
    pub fn new(dialplan: impl Into<String>, destination_number: impl Into<String>) -> Self {
        Self {
            dialplan: dialplan.into(),
            destination_number: destination_number.into(),
            ..Default::default()
        }
    }

    /// Set caller id name and number
    pub fn with_caller_id(mut self, name: impl Into<String>, number: impl Into<String>) -> Self {
        self.caller_id_name = name.into();
        self.caller_id_number = number.into();
        self
    }
}

/// One `name(data)` step of a caller extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerApplication {
    pub name: String,
    pub data: String,
}

/// Ordered applications chosen by the dialplan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerExtension {
    pub name: String,
    pub number: String,
    applications: Vec<CallerApplication>,
    current: usize,
}

impl CallerExtension {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
            ..Default::default()
        }
    }

    /// Append an application
    pub fn add_application(&mut self, name: impl Into<String>, data: impl Into<String>) {
        self.applications.push(CallerApplication {
            name: name.into(),
            data: data.into(),
        });
    }

    /// Builder form of [`add_application`](Self::add_application)
    pub fn with_application(mut self, name: impl Into<String>, data: impl Into<String>) -> Self {
        self.add_application(name, data);
        self
    }

    pub fn applications(&self) -> &[CallerApplication] {
        &self.applications
    }

    /// Application the cursor points at
    pub fn current_application(&self) -> Option<&CallerApplication> {
        self.applications.get(self.current)
    }

    /// Return the current application and move the cursor past it
    pub fn next_application(&mut self) -> Option<CallerApplication> {
        let app = self.applications.get(self.current).cloned()?;
        self.current += 1;
        Some(app)
    }
}

/// Lifecycle state, caller data and the application-tier handler of one session
pub struct Channel {
    state: Mutex<ChannelState>,
    changed: Condvar,
    flags: Mutex<ChannelFlags>,
    caller_profile: RwLock<Option<CallerProfile>>,
    caller_extension: Mutex<Option<CallerExtension>>,
    state_handler: RwLock<Option<Arc<dyn StateHandler>>>,
}

impl Channel {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ChannelState::New),
            changed: Condvar::new(),
            flags: Mutex::new(ChannelFlags::both()),
            caller_profile: RwLock::new(None),
            caller_extension: Mutex::new(None),
            state_handler: RwLock::new(None),
        }
    }

    /// Current state
    pub fn state(&self) -> ChannelState {
        *self.state.lock()
    }

    /// Request a state change and wake the state machine.
    ///
    /// `DONE` is terminal and from `HANGUP` only `DONE` is accepted; other
    /// requests are ignored. Returns whether the state changed.
    pub fn set_state(&self, next: ChannelState) -> bool {
        let mut state = self.state.lock();
        self.apply(&mut state, next)
    }

    /// Change to `next` only if the current state is `expected`
    pub fn advance_from(&self, expected: ChannelState, next: ChannelState) -> bool {
        let mut state = self.state.lock();
        if *state != expected {
            return false;
        }
        self.apply(&mut state, next)
    }

    fn apply(&self, state: &mut ChannelState, next: ChannelState) -> bool {
        let current = *state;
        if current == next {
            return false;
        }
        if current == ChannelState::Done
            || (current == ChannelState::Hangup && next != ChannelState::Done)
        {
            warn!(from = %current, to = %next, "Ignoring state change");
            return false;
        }
        *state = next;
        debug!(from = %current, to = %next, "Channel state changed");
        self.changed.notify_all();
        true
    }

    /// Wake the state machine without changing state
    pub fn notify(&self) {
        let _state = self.state.lock();
        self.changed.notify_all();
    }

    /// Block until the state differs from `from` or a notification arrives.
    ///
    /// Returns immediately when the state already differs.
    pub fn wait_for_change(&self, from: ChannelState) {
        let mut state = self.state.lock();
        if *state == from {
            self.changed.wait(&mut state);
        }
    }

    pub fn flags(&self) -> ChannelFlags {
        *self.flags.lock()
    }

    pub fn set_flags(&self, flags: ChannelFlags) {
        *self.flags.lock() = flags;
    }

    pub fn caller_profile(&self) -> Option<CallerProfile> {
        self.caller_profile.read().clone()
    }

    pub fn set_caller_profile(&self, profile: CallerProfile) {
        *self.caller_profile.write() = Some(profile);
    }

    pub fn caller_extension(&self) -> Option<CallerExtension> {
        self.caller_extension.lock().clone()
    }

    pub fn set_caller_extension(&self, extension: CallerExtension) {
        *self.caller_extension.lock() = Some(extension);
    }

    /// Advance the caller extension's cursor
    pub(crate) fn next_application(&self) -> Option<CallerApplication> {
        self.caller_extension.lock().as_mut()?.next_application()
    }

    /// Install the application-tier state handler
    pub fn set_state_handler(&self, handler: Arc<dyn StateHandler>) {
        *self.state_handler.write() = Some(handler);
    }

    /// The application-tier state handler, if any
    pub fn state_handler(&self) -> Option<Arc<dyn StateHandler>> {
        self.state_handler.read().clone()
    }

    pub(crate) fn clear_state_handler(&self) {
        self.state_handler.write().take();
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("state", &self.state())
            .field("flags", &self.flags())
            .field("caller_profile", &self.caller_profile())
            .finish()
    }
}
