//! Built-in behaviour, run when neither the driver nor the application claimed a state

use crate::channel::ChannelState;
use crate::errors::SwitchError;
use crate::session::Session;
use tracing::{debug, info, warn};

pub(super) fn run(session: &Session, state: ChannelState) {
    match state {
        ChannelState::Init => debug!(session = %session.name(), "Standard INIT"),
        ChannelState::Ring => on_ring(session),
        ChannelState::Execute => on_execute(session),
        ChannelState::Loopback => on_loopback(session),
        ChannelState::Transmit => debug!(session = %session.name(), "Standard TRANSMIT"),
        ChannelState::Hangup => debug!(session = %session.name(), "Standard HANGUP"),
        ChannelState::New | ChannelState::Done => {}
    }
}

/// Hunt the profile's dialplan for an extension and move on to EXECUTE
fn on_ring(session: &Session) {
    debug!(session = %session.name(), "Standard RING");
    let channel = session.channel();

    let Some(profile) = channel.caller_profile() else {
        warn!(session = %session.name(), "No caller profile");
        channel.set_state(ChannelState::Hangup);
        return;
    };

    let dialplan = session
        .core()
        .and_then(|core| core.modules().dialplan(&profile.dialplan));
    let Some(dialplan) = dialplan else {
        warn!(session = %session.name(), dialplan = %profile.dialplan, "Dialplan not found");
        channel.set_state(ChannelState::Hangup);
        return;
    };

    match dialplan.hunt(session) {
        Some(extension) => {
            info!(
                session = %session.name(),
                extension = %extension.name,
                applications = extension.applications().len(),
                "Extension found"
            );
            channel.set_caller_extension(extension);
            channel.advance_from(ChannelState::Ring, ChannelState::Execute);
        }
        None => {
            info!(
                session = %session.name(),
                destination = %profile.destination_number,
                "No extension matched"
            );
            channel.set_state(ChannelState::Hangup);
        }
    }
}

/// Run the extension's applications in order while the channel stays in EXECUTE
fn on_execute(session: &Session) {
    debug!(session = %session.name(), "Standard EXECUTE");
    let channel = session.channel();

    if channel.caller_extension().is_none() {
        warn!(session = %session.name(), "No extension");
        channel.set_state(ChannelState::Hangup);
        return;
    }
    let Some(core) = session.core() else {
        channel.set_state(ChannelState::Hangup);
        return;
    };

    while channel.state() == ChannelState::Execute {
        let Some(app) = channel.next_application() else {
            break;
        };
        let Some(interface) = core.modules().application(&app.name) else {
            warn!(session = %session.name(), application = %app.name, "Invalid application");
            channel.set_state(ChannelState::Hangup);
            return;
        };
        info!(session = %session.name(), "Execute {}({})", app.name, app.data);
        (interface.function)(session, &app.data);
    }

    channel.advance_from(ChannelState::Execute, ChannelState::Hangup);
}

/// Echo every frame read back to the endpoint
fn on_loopback(session: &Session) {
    debug!(session = %session.name(), "Standard LOOPBACK");
    let channel = session.channel();

    while channel.state() == ChannelState::Loopback {
        match session.read_frame(None) {
            Ok(Some(frame)) => {
                if let Err(err) = session.write_frame(&frame, None) {
                    debug!(session = %session.name(), error = %err, "Loopback write failed");
                }
            }
            Ok(None) | Err(SwitchError::Timeout) => {}
            Err(err) => {
                warn!(session = %session.name(), error = %err, "Loopback read failed");
                channel.set_state(ChannelState::Hangup);
            }
        }
    }
}
