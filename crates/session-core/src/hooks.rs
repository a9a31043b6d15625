//! Per-session event hook chains
//!
//! Each endpoint routine has a matching chain of hooks. A chain runs only
//! after the endpoint routine succeeded, in registration order, and stops at
//! the first hook that fails; that failure is what the caller sees.

use crate::channel::CallerProfile;
use crate::endpoint::Signal;
use crate::errors::Result;
use crate::frame::Frame;
use crate::session::Session;
use std::sync::Arc;
use std::time::Duration;

pub type OutgoingChannelHook =
    Arc<dyn Fn(&Session, &CallerProfile, &Arc<Session>) -> Result<()> + Send + Sync>;
pub type AnswerChannelHook = Arc<dyn Fn(&Session) -> Result<()> + Send + Sync>;
pub type ReadFrameHook = Arc<dyn Fn(&Session, &mut Frame, Option<Duration>) -> Result<()> + Send + Sync>;
pub type WriteFrameHook = Arc<dyn Fn(&Session, &Frame, Option<Duration>) -> Result<()> + Send + Sync>;
pub type KillChannelHook = Arc<dyn Fn(&Session, Signal) -> Result<()> + Send + Sync>;
pub type WaitForHook = Arc<dyn Fn(&Session, Option<Duration>) -> Result<()> + Send + Sync>;
pub type SendDtmfHook = Arc<dyn Fn(&Session, &str) -> Result<()> + Send + Sync>;

/// Insertion-ordered list of hooks of one kind
pub struct HookChain<H> {
    entries: Vec<H>,
}

impl<H> Default for HookChain<H> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<H: Clone> HookChain<H> {
    /// Append at the tail
    pub fn push(&mut self, hook: H) {
        self.entries.push(hook);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the entries, so hooks run without the table locked
    pub fn snapshot(&self) -> Vec<H> {
        self.entries.clone()
    }
}

/// Hook chains of one session, one per event kind
#[derive(Default)]
pub struct EventHooks {
    pub outgoing_channel: HookChain<OutgoingChannelHook>,
    pub answer_channel: HookChain<AnswerChannelHook>,
    pub read_frame: HookChain<ReadFrameHook>,
    pub write_frame: HookChain<WriteFrameHook>,
    pub kill_channel: HookChain<KillChannelHook>,
    pub waitfor_read: HookChain<WaitForHook>,
    pub waitfor_write: HookChain<WaitForHook>,
    pub send_dtmf: HookChain<SendDtmfHook>,
}

/// Run `hooks` in order, stopping at the first failure
pub(crate) fn run_chain<H>(hooks: &[H], mut call: impl FnMut(&H) -> Result<()>) -> Result<()> {
    hooks.iter().try_for_each(|hook| call(hook))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SwitchError;
    use parking_lot::Mutex;

    #[test]
    fn test_chain_stops_at_first_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut chain: HookChain<Arc<dyn Fn(u32) -> Result<()> + Send + Sync>> = HookChain::default();

        for (index, fails) in [(1, false), (2, true), (3, false)] {
            let calls = Arc::clone(&calls);
            chain.push(Arc::new(move |_| {
                calls.lock().push(index);
                if fails {
                    Err(SwitchError::failed("hook refused"))
                } else {
                    Ok(())
                }
            }));
        }

        let result = run_chain(&chain.snapshot(), |hook| hook(0));
        assert!(matches!(result, Err(SwitchError::Failed(_))));
        assert_eq!(*calls.lock(), vec![1, 2]);
        assert_eq!(chain.len(), 3);
    }
}
