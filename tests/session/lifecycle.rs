//! Tests for session initialization, teardown, stream destruction and pooling

use std::cell::RefCell;
use std::rc::Rc;

use bytes::Bytes;
use h2_mux::{error_code, frame_type, EngineError, Role, SessionConfig, SessionError, WriteError};

use crate::support::*;

type Statuses = Rc<RefCell<Vec<(u32, Result<(), WriteError>)>>>;

fn record(statuses: &Statuses, tag: u32) -> impl FnOnce(Result<(), WriteError>) + 'static {
    let statuses = statuses.clone();
    move |status| statuses.borrow_mut().push((tag, status))
}

#[test]
fn test_initialize_registers_tick() {
    let (session, event_loop) = server();
    assert_eq!(event_loop.active.len(), 1);
    assert!(event_loop.closed.is_empty());
    assert_eq!(session.role(), Role::Server);
    assert!(!session.is_closed());
}

#[test]
fn test_engine_construction_failure_propagates() {
    let mut event_loop = TestLoop::default();
    let options = MockOptions {
        fail_construction: true,
        ..MockOptions::default()
    };
    let result = TestSession::initialize(
        &mut event_loop,
        Role::Client,
        SessionConfig::default(),
        options,
        Recorder::default(),
        Sink::default(),
    );

    match result {
        Err(SessionError::Engine(err)) => {
            assert_eq!(err.code, EngineError::NOMEM);
            assert!(err.is_fatal());
        }
        Err(other) => panic!("Expected engine error, got {:?}", other),
        Ok(_) => panic!("Expected construction to fail"),
    }
    assert!(event_loop.active.is_empty(), "No tick without an engine");
}

#[test]
fn test_teardown_cancels_streams_and_sends_goaway() {
    let (mut session, mut event_loop) = server();
    let statuses = Statuses::default();
    feed(&mut session, &post_request(1));
    feed(&mut session, &post_request(3));
    for id in [1, 3] {
        session
            .stream(id)
            .unwrap()
            .write(vec![Bytes::from_static(b"pending")], record(&statuses, id as u32))
            .unwrap();
    }

    session.teardown(&mut event_loop).unwrap();

    let mut cancelled = statuses.borrow().clone();
    cancelled.sort_by_key(|(tag, _)| *tag);
    assert_eq!(cancelled, vec![(1, Err(WriteError::Cancelled)), (3, Err(WriteError::Cancelled))]);
    assert_eq!(session.stream_count(), 0);
    assert!(session.is_closed());
    assert!(session.engine().is_none());

    let frames = session.transport().frames();
    let last = frames.last().expect("GOAWAY flushed");
    assert_eq!(last.frame_type, frame_type::GOAWAY);
    assert_eq!(&last.payload[..4], &3u32.to_be_bytes());
    assert_eq!(&last.payload[4..], &error_code::NO_ERROR.to_be_bytes());

    assert!(event_loop.active.is_empty());
    assert_eq!(event_loop.closed.len(), 1);
}

#[test]
fn test_session_freed_after_tick_closes() {
    let (mut session, mut event_loop) = server();
    session.teardown(&mut event_loop).unwrap();
    assert!(
        !session.handler().events.contains(&Event::SessionFreed),
        "Freed is reported from a later loop iteration"
    );

    session.on_tick_closed();
    session.on_tick_closed();
    let freed = session
        .handler()
        .events
        .iter()
        .filter(|e| **e == Event::SessionFreed)
        .count();
    assert_eq!(freed, 1);
}

#[test]
fn test_tick_closed_before_teardown_is_ignored() {
    let (mut session, _loop) = server();
    session.on_tick_closed();
    assert!(session.handler().events.is_empty());
}

#[test]
fn test_torn_down_session_rejects_work() {
    let (mut session, mut event_loop) = server();
    session.teardown(&mut event_loop).unwrap();

    assert!(matches!(session.teardown(&mut event_loop), Err(SessionError::Closed)));
    assert!(matches!(session.write(&[get_request(1).as_slice()]), Err(SessionError::Closed)));
    assert!(matches!(session.submit_shutdown_notice(), Err(SessionError::Closed)));
    assert!(matches!(session.submit_settings(&[]), Err(SessionError::Closed)));
    assert_eq!(session.send_pending_data().unwrap(), 0);
    assert_eq!(session.tick().unwrap(), 0);
    assert_eq!(event_loop.closed.len(), 1);
}

#[test]
fn test_destroy_twice_is_harmless() {
    let (mut session, _loop) = server();
    let statuses = Statuses::default();
    feed(&mut session, &post_request(1));
    session
        .stream(1)
        .unwrap()
        .write(vec![Bytes::from_static(b"a")], record(&statuses, 1))
        .unwrap();

    assert!(session.destroy_stream(1));
    assert!(!session.destroy_stream(1));
    assert_eq!(*statuses.borrow(), vec![(1, Err(WriteError::Cancelled))]);
    assert!(session.stream(1).is_none());
}

#[test]
fn test_destroy_via_handle() {
    let (mut session, _loop) = server();
    feed(&mut session, &post_request(1));
    assert!(session.stream(1).unwrap().destroy());
    assert!(session.find_stream(1).is_none());
    assert!(!session.destroy_stream(1));
}

#[test]
fn test_streams_are_recycled() {
    let (mut session, _loop) = server();
    feed(&mut session, &get_request(1));
    feed(&mut session, &rst_frame(1, error_code::CANCEL));
    assert_eq!(session.pool_stats().streams, 1);

    feed(&mut session, &get_request(3));
    assert_eq!(session.pool_stats().streams, 0, "Stream 3 reused the parked stream");
    let stream = session.find_stream(3).unwrap();
    assert_eq!(stream.id(), 3);
    assert!(stream.is_writable());
    assert!(!stream.is_closed());
    assert_eq!(stream.code(), error_code::NO_ERROR);
}

#[test]
fn test_zero_pool_capacity_keeps_nothing() {
    let config = SessionConfig::default().with_pool_capacity(0);
    let (mut session, _loop) = session_with(Role::Server, config, MockOptions::default());
    feed(&mut session, &post_request(1));
    feed(&mut session, &data_frame(1, 0, b"body"));
    feed(&mut session, &rst_frame(1, error_code::CANCEL));

    let stats = session.pool_stats();
    assert_eq!((stats.streams, stats.data_chunks, stats.header_lists), (0, 0, 0));
}

#[test]
fn test_streams_iterates_registry() {
    let (mut session, _loop) = server();
    feed(&mut session, &get_request(1));
    feed(&mut session, &get_request(3));
    let mut ids: Vec<_> = session.streams().map(|s| s.id()).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 3]);
}
