//! Endpoint routines with their hook chains, and frame I/O through the transcoding pipeline

use super::media::Outbound;
use super::Session;
use crate::channel::CallerProfile;
use crate::endpoint::Signal;
use crate::errors::{Result, SwitchError};
use crate::frame::Frame;
use crate::hooks::{
    run_chain, AnswerChannelHook, EventHooks, HookChain, KillChannelHook, OutgoingChannelHook,
    ReadFrameHook, SendDtmfHook, WaitForHook, WriteFrameHook,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

impl Session {
    fn add_hook<H: Clone>(
        &self,
        hook: H,
        chain: impl FnOnce(&mut EventHooks) -> &mut HookChain<H>,
    ) -> Result<()> {
        self.ensure_live()?;
        self.pool().charge(std::mem::size_of::<H>())?;
        let mut hooks = self.hooks.write();
        chain(&mut *hooks).push(hook);
        Ok(())
    }

    pub fn add_outgoing_channel_hook<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Session, &CallerProfile, &Arc<Session>) -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook::<OutgoingChannelHook>(Arc::new(hook), |h| &mut h.outgoing_channel)
    }

    pub fn add_answer_channel_hook<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Session) -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook::<AnswerChannelHook>(Arc::new(hook), |h| &mut h.answer_channel)
    }

    pub fn add_read_frame_hook<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Session, &mut Frame, Option<Duration>) -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook::<ReadFrameHook>(Arc::new(hook), |h| &mut h.read_frame)
    }

    pub fn add_write_frame_hook<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Session, &Frame, Option<Duration>) -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook::<WriteFrameHook>(Arc::new(hook), |h| &mut h.write_frame)
    }

    pub fn add_kill_channel_hook<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Session, Signal) -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook::<KillChannelHook>(Arc::new(hook), |h| &mut h.kill_channel)
    }

    pub fn add_waitfor_read_hook<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Session, Option<Duration>) -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook::<WaitForHook>(Arc::new(hook), |h| &mut h.waitfor_read)
    }

    pub fn add_waitfor_write_hook<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Session, Option<Duration>) -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook::<WaitForHook>(Arc::new(hook), |h| &mut h.waitfor_write)
    }

    pub fn add_send_dtmf_hook<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Session, &str) -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook::<SendDtmfHook>(Arc::new(hook), |h| &mut h.send_dtmf)
    }

    /// Create an outbound session through the endpoint registered as `endpoint_name`
    pub fn outgoing_channel(&self, endpoint_name: &str, profile: &CallerProfile) -> Result<Arc<Session>> {
        let core = self.core().ok_or_else(|| SwitchError::SessionDestroyed {
            name: self.name().to_string(),
        })?;
        let endpoint = core
            .modules()
            .endpoint(endpoint_name)
            .ok_or_else(|| SwitchError::EndpointNotFound {
                name: endpoint_name.to_string(),
            })?;

        let new_session = endpoint.outgoing_channel(&core, profile)?;
        let hooks = self.hooks.read().outgoing_channel.snapshot();
        run_chain(&hooks, |hook| hook(self, profile, &new_session))?;
        Ok(new_session)
    }

    /// Answer the channel. An endpoint without an answer routine counts as answered.
    pub fn answer_channel(&self) -> Result<()> {
        match self.endpoint().answer_channel(self) {
            Ok(()) => {}
            Err(SwitchError::Unsupported { .. }) => return Ok(()),
            Err(err) => return Err(err),
        }
        let hooks = self.hooks.read().answer_channel.snapshot();
        run_chain(&hooks, |hook| hook(self))
    }

    /// Read one frame, delivered in the read codec.
    ///
    /// Returns `Ok(None)` while the adaptive buffer is still collecting a full
    /// native frame.
    pub fn read_frame(&self, timeout: Option<Duration>) -> Result<Option<Frame>> {
        self.ensure_live()?;
        let mut frame = self.endpoint().read_frame(self, timeout)?;
        let hooks = self.hooks.read().read_frame.snapshot();
        run_chain(&hooks, |hook| hook(self, &mut frame, timeout))?;

        trace!(session = %self.name(), bytes = frame.len(), codec = ?frame.codec_name(), "Frame read");
        self.read_path.lock().transcode_inbound(frame)
    }

    /// Write one frame given in any codec.
    ///
    /// Returns the number of frames handed to the endpoint, which is zero while
    /// the adaptive buffer is collecting and may exceed one when a backlog
    /// drains. Stops at the first endpoint or hook failure; a unit the
    /// endpoint refused stays buffered for the next write.
    pub fn write_frame(&self, frame: &Frame, timeout: Option<Duration>) -> Result<usize> {
        self.ensure_live()?;
        let outbound = self.write_path.lock().transcode_outbound(frame)?;

        match outbound {
            Outbound::Direct => {
                self.perform_write(frame, timeout)?;
                Ok(1)
            }
            Outbound::Encoded(encoded) => {
                self.perform_write(&encoded, timeout)?;
                Ok(1)
            }
            Outbound::Buffered => {
                let other = frame.codec.as_deref().map(|c| c.implementation().as_ref());
                let mut forwarded = 0;
                loop {
                    let next = self.write_path.lock().next_outbound(other)?;
                    let Some((encoded, unit)) = next else {
                        return Ok(forwarded);
                    };
                    if let Err(err) = self.endpoint().write_frame(self, &encoded, timeout) {
                        self.write_path.lock().requeue(unit);
                        return Err(err);
                    }
                    forwarded += 1;
                    let hooks = self.hooks.read().write_frame.snapshot();
                    run_chain(&hooks, |hook| hook(self, &encoded, timeout))?;
                }
            }
        }
    }

    fn perform_write(&self, frame: &Frame, timeout: Option<Duration>) -> Result<()> {
        self.endpoint().write_frame(self, frame, timeout)?;
        let hooks = self.hooks.read().write_frame.snapshot();
        run_chain(&hooks, |hook| hook(self, frame, timeout))
    }

    /// Deliver `signal` to the endpoint
    pub fn kill_channel(&self, signal: Signal) -> Result<()> {
        self.endpoint().kill_channel(self, signal)?;
        let hooks = self.hooks.read().kill_channel.snapshot();
        run_chain(&hooks, |hook| hook(self, signal))
    }

    /// Wait until the endpoint is ready to be read from
    pub fn waitfor_read(&self, timeout: Option<Duration>) -> Result<()> {
        self.endpoint().waitfor_read(self, timeout)?;
        let hooks = self.hooks.read().waitfor_read.snapshot();
        run_chain(&hooks, |hook| hook(self, timeout))
    }

    /// Wait until the endpoint is ready to be written to
    pub fn waitfor_write(&self, timeout: Option<Duration>) -> Result<()> {
        self.endpoint().waitfor_write(self, timeout)?;
        let hooks = self.hooks.read().waitfor_write.snapshot();
        run_chain(&hooks, |hook| hook(self, timeout))
    }

    /// Send DTMF digits
    pub fn send_dtmf(&self, digits: &str) -> Result<()> {
        self.endpoint().send_dtmf(self, digits)?;
        let hooks = self.hooks.read().send_dtmf.snapshot();
        run_chain(&hooks, |hook| hook(self, digits))
    }
}
