// Shared fixtures for the session core integration tests
#![allow(dead_code)]

use parking_lot::Mutex;
use softswitch_session_core::{
    CallerExtension, CallerProfile, ChannelState, CodecFlags, CoreConfig, Dialplan, Endpoint,
    Frame, Result, Session, Signal, StateHandler, StateOutcome, SwitchCore, SwitchError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const ENDPOINT_NAME: &str = "mock";
pub const DIALPLAN_NAME: &str = "test";

pub fn test_core() -> SwitchCore {
    SwitchCore::new(CoreConfig::default()).unwrap()
}

/// Endpoint that serves queued frames and records everything written to it
#[derive(Default)]
pub struct MockEndpoint {
    pub inbound: Mutex<VecDeque<Frame>>,
    pub written: Mutex<Vec<Frame>>,
    pub answers: AtomicUsize,
    pub answer_supported: bool,
    pub fail_writes: AtomicBool,
    pub kills: Mutex<Vec<Signal>>,
    pub dtmf: Mutex<Vec<String>>,
    pub killed: AtomicBool,
    pub driver: Option<Arc<RecordingHandler>>,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self {
            answer_supported: true,
            ..Default::default()
        }
    }

    pub fn without_answer() -> Self {
        Self::default()
    }

    pub fn with_driver(driver: Arc<RecordingHandler>) -> Self {
        Self {
            answer_supported: true,
            driver: Some(driver),
            ..Default::default()
        }
    }

    pub fn push_inbound(&self, frame: Frame) {
        self.inbound.lock().push_back(frame);
    }

    pub fn written_len(&self) -> usize {
        self.written.lock().len()
    }
}

impl Endpoint for MockEndpoint {
    fn name(&self) -> &str {
        ENDPOINT_NAME
    }

    fn state_handler(&self) -> Option<&dyn StateHandler> {
        self.driver.as_deref().map(|driver| driver as &dyn StateHandler)
    }

    fn outgoing_channel(&self, core: &SwitchCore, profile: &CallerProfile) -> Result<Arc<Session>> {
        let session = core.request_session(Arc::new(MockEndpoint::new()), None)?;
        session.channel().set_caller_profile(profile.clone());
        Ok(session)
    }

    fn answer_channel(&self, _session: &Session) -> Result<()> {
        if !self.answer_supported {
            return Err(SwitchError::unsupported("answer_channel"));
        }
        self.answers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_frame(&self, _session: &Session, timeout: Option<Duration>) -> Result<Frame> {
        if let Some(frame) = self.inbound.lock().pop_front() {
            return Ok(frame);
        }
        if self.killed.load(Ordering::SeqCst) {
            return Err(SwitchError::failed("channel killed"));
        }
        let wait = timeout.unwrap_or(Duration::from_millis(5)).min(Duration::from_millis(5));
        std::thread::sleep(wait);
        Err(SwitchError::Timeout)
    }

    fn write_frame(&self, _session: &Session, frame: &Frame, _timeout: Option<Duration>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SwitchError::failed("write refused"));
        }
        self.written.lock().push(frame.clone());
        Ok(())
    }

    fn kill_channel(&self, _session: &Session, signal: Signal) -> Result<()> {
        self.killed.store(true, Ordering::SeqCst);
        self.kills.lock().push(signal);
        Ok(())
    }

    fn send_dtmf(&self, _session: &Session, digits: &str) -> Result<()> {
        self.dtmf.lock().push(digits.to_string());
        Ok(())
    }
}

/// What a [`RecordingHandler`] does when it sees a state
#[derive(Debug, Clone, Copy)]
pub enum Reaction {
    /// Return `NotHandled`
    Pass,
    /// Return `Handled`
    Claim,
    /// Return `Veto(next)`
    Veto(ChannelState),
    /// Set the state and return `NotHandled`
    Move(ChannelState),
    /// Set the state and fail
    Fail(ChannelState),
}

/// State handler that logs `tier:STATE` for every call it receives
pub struct RecordingHandler {
    tier: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    reactions: HashMap<ChannelState, Reaction>,
}

impl RecordingHandler {
    pub fn new(tier: &'static str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            tier,
            log,
            reactions: HashMap::new(),
        }
    }

    pub fn on(mut self, state: ChannelState, reaction: Reaction) -> Self {
        self.reactions.insert(state, reaction);
        self
    }

    fn react(&self, session: &Session, state: ChannelState) -> Result<StateOutcome> {
        self.log.lock().push(format!("{}:{}", self.tier, state));
        match self.reactions.get(&state).copied().unwrap_or(Reaction::Pass) {
            Reaction::Pass => Ok(StateOutcome::NotHandled),
            Reaction::Claim => Ok(StateOutcome::Handled),
            Reaction::Veto(next) => Ok(StateOutcome::Veto(next)),
            Reaction::Move(next) => {
                session.channel().set_state(next);
                Ok(StateOutcome::NotHandled)
            }
            Reaction::Fail(next) => {
                session.channel().set_state(next);
                Err(SwitchError::failed(format!("{} refused {}", self.tier, state)))
            }
        }
    }
}

impl StateHandler for RecordingHandler {
    fn on_init(&self, session: &Session) -> Result<StateOutcome> {
        self.react(session, ChannelState::Init)
    }

    fn on_ring(&self, session: &Session) -> Result<StateOutcome> {
        self.react(session, ChannelState::Ring)
    }

    fn on_execute(&self, session: &Session) -> Result<StateOutcome> {
        self.react(session, ChannelState::Execute)
    }

    fn on_loopback(&self, session: &Session) -> Result<StateOutcome> {
        self.react(session, ChannelState::Loopback)
    }

    fn on_transmit(&self, session: &Session) -> Result<StateOutcome> {
        self.react(session, ChannelState::Transmit)
    }

    fn on_hangup(&self, session: &Session) -> Result<StateOutcome> {
        self.react(session, ChannelState::Hangup)
    }
}

/// Dialplan returning a fixed extension for one destination
pub struct TestDialplan {
    pub destination: String,
    pub extension: CallerExtension,
    pub hunts: AtomicUsize,
}

impl TestDialplan {
    pub fn new(destination: &str, extension: CallerExtension) -> Self {
        Self {
            destination: destination.to_string(),
            extension,
            hunts: AtomicUsize::new(0),
        }
    }
}

impl Dialplan for TestDialplan {
    fn name(&self) -> &str {
        DIALPLAN_NAME
    }

    fn hunt(&self, session: &Session) -> Option<CallerExtension> {
        self.hunts.fetch_add(1, Ordering::SeqCst);
        let profile = session.channel().caller_profile()?;
        (profile.destination_number == self.destination).then(|| self.extension.clone())
    }
}

pub fn new_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

pub fn codec(core: &SwitchCore, name: &str, ms: u32) -> Arc<softswitch_session_core::Codec> {
    core.codec_init(name, Some(8000), Some(ms), CodecFlags::BOTH).unwrap()
}
