//! The endpoint interface
//!
//! An endpoint is the protocol-facing collaborator behind a session: it
//! produces and consumes frames and carries out channel control. Every
//! routine is optional; the defaults report [`SwitchError::Unsupported`].
//!
//! Timeouts are `None` to wait indefinitely.

use crate::channel::CallerProfile;
use crate::core::SwitchCore;
use crate::errors::{Result, SwitchError};
use crate::frame::Frame;
use crate::session::Session;
use crate::state_machine::StateHandler;
use std::sync::Arc;
use std::time::Duration;

/// Signals delivered through [`Session::kill_channel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Signal {
    /// Stop whatever the channel is blocked on
    Kill,
}

/// Frame I/O and channel control supplied by a protocol module
pub trait Endpoint: Send + Sync {
    /// Registry name
    fn name(&self) -> &str;

    /// Driver-tier state handler
    fn state_handler(&self) -> Option<&dyn StateHandler> {
        None
    }

    /// Create a new outbound session towards `profile`
    fn outgoing_channel(&self, _core: &SwitchCore, _profile: &CallerProfile) -> Result<Arc<Session>> {
        Err(SwitchError::unsupported("outgoing_channel"))
    }

    fn answer_channel(&self, _session: &Session) -> Result<()> {
        Err(SwitchError::unsupported("answer_channel"))
    }

    fn read_frame(&self, _session: &Session, _timeout: Option<Duration>) -> Result<Frame> {
        Err(SwitchError::unsupported("read_frame"))
    }

    fn write_frame(&self, _session: &Session, _frame: &Frame, _timeout: Option<Duration>) -> Result<()> {
        Err(SwitchError::unsupported("write_frame"))
    }

    fn kill_channel(&self, _session: &Session, _signal: Signal) -> Result<()> {
        Err(SwitchError::unsupported("kill_channel"))
    }

    fn waitfor_read(&self, _session: &Session, _timeout: Option<Duration>) -> Result<()> {
        Err(SwitchError::unsupported("waitfor_read"))
    }

    fn waitfor_write(&self, _session: &Session, _timeout: Option<Duration>) -> Result<()> {
        Err(SwitchError::unsupported("waitfor_write"))
    }

    fn send_dtmf(&self, _session: &Session, _digits: &str) -> Result<()> {
        Err(SwitchError::unsupported("send_dtmf"))
    }
}
