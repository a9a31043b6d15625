// Tests for per-session hook chains around the endpoint routines

mod common;

use common::*;
use pretty_assertions::assert_eq;
use softswitch_session_core::{CallerProfile, Frame, Signal, SwitchError};
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[test]
fn test_answer_hooks_run_in_registration_order() {
    let core = test_core();
    let endpoint = Arc::new(MockEndpoint::new());
    let session = core.request_session(endpoint.clone(), None).unwrap();
    let log = new_log();

    for tag in ["first", "second", "third"] {
        let log = log.clone();
        session
            .add_answer_channel_hook(move |_| {
                log.lock().push(tag.to_string());
                Ok(())
            })
            .unwrap();
    }

    session.answer_channel().unwrap();
    assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    assert_eq!(endpoint.answers.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failing_hook_stops_chain_and_is_returned() {
    let core = test_core();
    let session = core
        .request_session(Arc::new(MockEndpoint::new()), None)
        .unwrap();
    let log = new_log();

    let first = log.clone();
    session
        .add_send_dtmf_hook(move |_, digits| {
            first.lock().push(format!("first:{}", digits));
            Err(SwitchError::failed("dtmf refused"))
        })
        .unwrap();
    let second = log.clone();
    session
        .add_send_dtmf_hook(move |_, digits| {
            second.lock().push(format!("second:{}", digits));
            Ok(())
        })
        .unwrap();

    let err = session.send_dtmf("123#").unwrap_err();
    assert!(matches!(err, SwitchError::Failed(ref message) if message == "dtmf refused"));
    assert_eq!(*log.lock(), vec!["first:123#"]);
}

#[test]
fn test_unsupported_answer_succeeds_without_hooks() {
    let core = test_core();
    let session = core
        .request_session(Arc::new(MockEndpoint::without_answer()), None)
        .unwrap();
    let log = new_log();
    let hook_log = log.clone();
    session
        .add_answer_channel_hook(move |_| {
            hook_log.lock().push("answer".to_string());
            Ok(())
        })
        .unwrap();

    session.answer_channel().unwrap();
    assert!(log.lock().is_empty());
}

#[test]
fn test_unsupported_read_fails() {
    struct Silent;
    impl softswitch_session_core::Endpoint for Silent {
        fn name(&self) -> &str {
            "silent"
        }
    }

    let core = test_core();
    let session = core.request_session(Arc::new(Silent), None).unwrap();
    assert!(matches!(
        session.read_frame(None),
        Err(SwitchError::Unsupported { operation: "read_frame" })
    ));
    assert!(matches!(
        session.waitfor_read(None),
        Err(SwitchError::Unsupported { .. })
    ));
}

#[test]
fn test_read_hook_can_rewrite_frame() {
    let core = test_core();
    let endpoint = Arc::new(MockEndpoint::new());
    let session = core.request_session(endpoint.clone(), None).unwrap();
    session
        .add_read_frame_hook(|_, frame, _| {
            frame.data = vec![0xAAu8; frame.len()].into();
            Ok(())
        })
        .unwrap();

    endpoint.push_inbound(Frame::raw(vec![0u8; 8]));
    let frame = session.read_frame(None).unwrap().unwrap();
    assert_eq!(frame.data.as_ref(), &[0xAAu8; 8][..]);
}

#[test]
fn test_write_hook_runs_per_forwarded_frame() {
    let core = test_core();
    let endpoint = Arc::new(MockEndpoint::new());
    let session = core.request_session(endpoint.clone(), None).unwrap();
    session.set_write_codec(Some(codec(&core, "PCMU", 10)));

    let sizes = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen = sizes.clone();
    session
        .add_write_frame_hook(move |_, frame, _| {
            seen.lock().push(frame.len());
            Ok(())
        })
        .unwrap();

    assert_eq!(session.write_frame(&Frame::raw(vec![0u8; 480]), None).unwrap(), 3);
    assert_eq!(*sizes.lock(), vec![80, 80, 80]);
    assert_eq!(endpoint.written_len(), 3);
}

#[test]
fn test_kill_hooks_receive_signal() {
    let core = test_core();
    let endpoint = Arc::new(MockEndpoint::new());
    let session = core.request_session(endpoint.clone(), None).unwrap();
    let signals = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen = signals.clone();
    session
        .add_kill_channel_hook(move |_, signal| {
            seen.lock().push(signal);
            Ok(())
        })
        .unwrap();

    session.kill_channel(Signal::Kill).unwrap();
    assert_eq!(*endpoint.kills.lock(), vec![Signal::Kill]);
    assert_eq!(*signals.lock(), vec![Signal::Kill]);
}

#[test]
fn test_outgoing_channel_hooks_see_new_session() {
    let core = test_core();
    core.modules().register_endpoint(Arc::new(MockEndpoint::new()));
    let session = core
        .request_session(Arc::new(MockEndpoint::new()), None)
        .unwrap();

    let destinations = new_log();
    let seen = destinations.clone();
    session
        .add_outgoing_channel_hook(move |_, profile, peer| {
            let peer_profile = peer.channel().caller_profile().unwrap();
            assert_eq!(&peer_profile, profile);
            seen.lock().push(profile.destination_number.clone());
            Ok(())
        })
        .unwrap();

    let profile = CallerProfile::new(DIALPLAN_NAME, "5551234");
    let peer = session.outgoing_channel(ENDPOINT_NAME, &profile).unwrap();
    assert_eq!(peer.endpoint().name(), ENDPOINT_NAME);
    assert_eq!(*destinations.lock(), vec!["5551234"]);

    assert!(matches!(
        session.outgoing_channel("sofia", &profile),
        Err(SwitchError::EndpointNotFound { .. })
    ));
}

#[test]
fn test_hooks_are_charged_to_session_pool() {
    let core = test_core();
    let session = core
        .request_session(Arc::new(MockEndpoint::new()), None)
        .unwrap();
    let before = session.pool().used();
    session.add_waitfor_write_hook(|_, _| Ok(())).unwrap();
    assert!(session.pool().used() > before);
}
