//! Channel state machine
//!
//! Each state is dispatched through three tiers: the endpoint's driver-tier
//! handler, the channel's application-tier handler, then the built-in
//! behaviour. A tier that fails, claims the state or changes the channel
//! state stops the dispatch; the remaining tiers are skipped.

mod standard;

use crate::channel::ChannelState;
use crate::errors::Result;
use crate::session::Session;
use tracing::{debug, warn};

/// What a handler did with the state it was given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOutcome {
    /// Nothing decisive; later tiers run unless the state changed meanwhile
    NotHandled,
    /// The state was fully handled; later tiers are skipped
    Handled,
    /// Move to this state; later tiers are skipped
    Veto(ChannelState),
}

/// Overridable per-state behaviour.
///
/// Every method defaults to [`StateOutcome::NotHandled`]. An `Err` is logged
/// and treated like [`StateOutcome::Handled`]: the dispatch stops, and the
/// handler is expected to have moved the channel on (typically to `HANGUP`).
pub trait StateHandler: Send + Sync {
    fn on_init(&self, _session: &Session) -> Result<StateOutcome> {
        Ok(StateOutcome::NotHandled)
    }

    /// The built-in tier hunts the dialplan and, on a match, advances the
    /// channel from `RING` to `EXECUTE` itself. Return `Handled` to keep it out.
    fn on_ring(&self, _session: &Session) -> Result<StateOutcome> {
        Ok(StateOutcome::NotHandled)
    }

    fn on_execute(&self, _session: &Session) -> Result<StateOutcome> {
        Ok(StateOutcome::NotHandled)
    }

    fn on_loopback(&self, _session: &Session) -> Result<StateOutcome> {
        Ok(StateOutcome::NotHandled)
    }

    fn on_transmit(&self, _session: &Session) -> Result<StateOutcome> {
        Ok(StateOutcome::NotHandled)
    }

    fn on_hangup(&self, _session: &Session) -> Result<StateOutcome> {
        Ok(StateOutcome::NotHandled)
    }
}

fn invoke(handler: &dyn StateHandler, state: ChannelState, session: &Session) -> Result<StateOutcome> {
    match state {
        ChannelState::Init => handler.on_init(session),
        ChannelState::Ring => handler.on_ring(session),
        ChannelState::Execute => handler.on_execute(session),
        ChannelState::Loopback => handler.on_loopback(session),
        ChannelState::Transmit => handler.on_transmit(session),
        ChannelState::Hangup => handler.on_hangup(session),
        ChannelState::New | ChannelState::Done => Ok(StateOutcome::NotHandled),
    }
}

/// Run one tier; returns whether the next tier may run
fn run_tier(
    session: &Session,
    state: ChannelState,
    tier: &'static str,
    handler: Option<&dyn StateHandler>,
) -> bool {
    let Some(handler) = handler else {
        return true;
    };
    let channel = session.channel();

    match invoke(handler, state, session) {
        Ok(StateOutcome::NotHandled) => {
            let current = channel.state();
            if current != state {
                debug!(tier, %state, %current, "State changed by handler, skipping remaining tiers");
                return false;
            }
            true
        }
        Ok(StateOutcome::Handled) => {
            debug!(tier, %state, "State handled");
            false
        }
        Ok(StateOutcome::Veto(next)) => {
            debug!(tier, %state, %next, "State vetoed");
            channel.advance_from(state, next);
            false
        }
        Err(err) => {
            warn!(tier, %state, error = %err, "State handler failed");
            false
        }
    }
}

fn dispatch(session: &Session, state: ChannelState) {
    debug!(session = %session.name(), %state, "State {}", state);
    if matches!(state, ChannelState::New | ChannelState::Done) {
        return;
    }

    let endpoint = session.endpoint();
    if !run_tier(session, state, "driver", endpoint.state_handler()) {
        return;
    }
    let application = session.channel().state_handler();
    if !run_tier(session, state, "application", application.as_deref()) {
        return;
    }
    standard::run(session, state);
}

/// Drive the channel until it reaches `DONE`.
///
/// A state is dispatched once each time the channel enters it; between
/// transitions the loop sleeps on the channel's condition variable.
pub(crate) fn run(session: &Session) {
    let channel = session.channel();
    let mut last: Option<ChannelState> = None;

    loop {
        let state = channel.state();
        if state == ChannelState::Done {
            break;
        }

        if last != Some(state) {
            dispatch(session, state);
            if state == ChannelState::Hangup {
                channel.set_state(ChannelState::Done);
            }
            last = Some(state);
        }

        channel.wait_for_change(state);
    }

    debug!(session = %session.name(), "State machine finished");
}
