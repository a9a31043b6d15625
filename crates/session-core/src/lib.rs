//! # Softswitch session core
//!
//! The call/media session engine. Each session couples a [`Channel`] (the
//! lifecycle state machine), two media paths that reconcile the session
//! codecs with whatever the endpoint produces or the application writes,
//! per-event hook chains, and a memory pool released in one step when the
//! session ends.
//!
//! A session is requested from the [`SwitchCore`], launched onto its own
//! thread, and from then on driven through
//! `NEW → INIT → RING → EXECUTE → (LOOPBACK | TRANSMIT) → HANGUP → DONE`.
//! At every state the endpoint's driver-tier [`StateHandler`] runs first,
//! then the channel's application-tier handler, then the built-in behaviour;
//! any tier can stop the cascade.
//!
//! ```rust,no_run
//! use softswitch_session_core::{
//!     CallerProfile, ChannelState, CoreConfig, Endpoint, SwitchCore,
//! };
//! use std::sync::Arc;
//!
//! struct Null;
//!
//! impl Endpoint for Null {
//!     fn name(&self) -> &str {
//!         "null"
//!     }
//! }
//!
//! let core = SwitchCore::new(CoreConfig::default())?;
//! let session = core.request_session(Arc::new(Null), None)?;
//! session
//!     .channel()
//!     .set_caller_profile(CallerProfile::new("default", "1000"));
//! session.channel().set_state(ChannelState::Init);
//!
//! let handle = core.launch_session(session)?;
//! handle.kill()?;
//! # Ok::<(), softswitch_session_core::SwitchError>(())
//! ```

pub mod buffer;
pub mod channel;
pub mod config;
pub mod core;
pub mod endpoint;
pub mod errors;
pub mod frame;
pub mod hooks;
pub mod modules;
pub mod session;
pub mod state_machine;
pub mod thread;
pub mod timer;

pub use buffer::FrameBuffer;
pub use channel::{
    CallerApplication, CallerExtension, CallerProfile, Channel, ChannelFlags, ChannelState,
};
pub use config::{CoreConfig, LogSettings};
pub use crate::core::SwitchCore;
pub use endpoint::{Endpoint, Signal};
pub use errors::{ErrorCategory, Result, SwitchError};
pub use frame::Frame;
pub use hooks::EventHooks;
pub use modules::{ApplicationFunction, ApplicationInterface, Dialplan, ModuleRegistry};
pub use session::{Direction, MediaStats, Session};
pub use state_machine::{StateHandler, StateOutcome};
pub use thread::{ServiceHandle, SessionHandle};
pub use timer::{SoftTimer, Timer, TimerInterface, TimerSpec, TimerState, SOFT_TIMER};

pub use softswitch_codec_core::{Codec, CodecFlags};
