//! Tests for inbound dispatch: headers, data, settings, priority and resets

use h2_mux::{error_code, flags, frame_type, settings_id, EngineError, HeadersCategory, SessionError};

use crate::support::*;

fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
    list.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect()
}

#[test]
fn test_request_headers_delivered_in_order() {
    let (mut session, _loop) = server();
    feed(&mut session, &get_request(1));

    assert_eq!(session.handler().events, vec![Event::Headers {
        stream_id: 1,
        category: HeadersCategory::Request,
        flags: flags::END_HEADERS | flags::END_STREAM,
        fields: pairs(&[(":method", "GET"), (":path", "/"), (":scheme", "https"), (":authority", "example.com")]),
    }]);

    let stream = session.find_stream(1).expect("stream registered");
    assert!(stream.headers().is_empty(), "Accumulated headers are released after delivery");
    assert_eq!(session.pool_stats().header_lists, 1);
}

#[test]
fn test_custom_headers_keep_arrival_order() {
    let (mut session, _loop) = server();
    let list = [(":method", "GET"), (":path", "/"), ("x-b", "2"), ("x-a", "1"), ("x-b", "3")];
    feed(&mut session, &headers_frame(1, flags::END_STREAM, &list));

    match &session.handler().events[0] {
        Event::Headers { fields, .. } => assert_eq!(*fields, pairs(&list)),
        other => panic!("Expected headers, got {:?}", other),
    }
}

#[test]
fn test_trailing_headers_are_trailers() {
    let (mut session, _loop) = server();
    feed(&mut session, &post_request(1));
    feed(&mut session, &data_frame(1, flags::NONE, b"abc"));
    feed(&mut session, &headers_frame(1, flags::END_STREAM, &[("grpc-status", "0")]));

    let headers = session.handler().headers();
    assert_eq!(headers.len(), 2);
    match headers[1] {
        Event::Headers { stream_id, category, fields, .. } => {
            assert_eq!(*stream_id, 1);
            assert_eq!(*category, HeadersCategory::Trailers);
            assert_eq!(*fields, pairs(&[("grpc-status", "0")]));
        }
        other => panic!("Expected headers, got {:?}", other),
    }
}

#[test]
fn test_data_chunks_batched_per_frame() {
    let (mut session, _loop) = server();
    feed(&mut session, &post_request(1));

    let frame = data_frame(1, flags::NONE, b"hello world");
    feed(&mut session, &frame[..12]);
    feed(&mut session, &frame[12..16]);
    assert_eq!(session.handler().events.len(), 1, "No delivery before the frame completes");
    assert_eq!(session.find_stream(1).map(|s| s.data_chunks().len()), Some(2));

    feed(&mut session, &frame[16..]);
    assert_eq!(session.handler().events[1], Event::Data {
        stream_id: 1,
        chunks: vec![b"hel".to_vec(), b"lo w".to_vec(), b"orld".to_vec()],
        flags: flags::NONE,
    });
    assert!(session.find_stream(1).map(|s| s.data_chunks().is_empty()).unwrap_or(false));
    assert_eq!(session.pool_stats().data_chunks, 3);
}

#[test]
fn test_chunks_are_recycled_across_frames() {
    let (mut session, _loop) = server();
    feed(&mut session, &post_request(1));
    feed(&mut session, &data_frame(1, flags::NONE, b"one"));
    assert_eq!(session.pool_stats().data_chunks, 1);
    feed(&mut session, &data_frame(1, flags::NONE, b"two"));
    assert_eq!(session.pool_stats().data_chunks, 1, "The parked chunk was reused");
}

#[test]
fn test_empty_data_frame_still_delivered() {
    let (mut session, _loop) = server();
    feed(&mut session, &post_request(1));
    feed(&mut session, &data_frame(1, flags::END_STREAM, b""));

    assert_eq!(session.handler().events[1], Event::Data {
        stream_id: 1,
        chunks: vec![],
        flags: flags::END_STREAM,
    });
}

#[test]
fn test_data_for_unknown_stream_ignored() {
    let (mut session, _loop) = server();
    let frame = data_frame(5, flags::NONE, b"orphan");
    assert_eq!(session.write(&[frame.as_slice()]).unwrap(), frame.len());
    assert!(session.handler().events.is_empty());
    assert_eq!(session.stream_count(), 0);
}

#[test]
fn test_write_consumes_every_buffer() {
    let (mut session, _loop) = server();
    let first = get_request(1);
    let second = get_request(3);
    let consumed = session.write(&[first.as_slice(), second.as_slice()]).unwrap();

    assert_eq!(consumed, first.len() + second.len());
    assert_eq!(session.stream_count(), 2);
    assert_eq!(session.handler().headers().len(), 2);
}

#[test]
fn test_settings_notifies_for_non_ack_only() {
    let (mut session, _loop) = server();
    feed(&mut session, &settings_frame(flags::NONE, &[(settings_id::MAX_CONCURRENT_STREAMS, 100)]));
    assert_eq!(session.handler().events, vec![Event::Settings]);

    let acks: Vec<_> = session
        .transport()
        .frames()
        .into_iter()
        .filter(|f| f.frame_type == frame_type::SETTINGS && f.flags == flags::ACK)
        .collect();
    assert_eq!(acks.len(), 1, "The engine's ACK is flushed by the same write");

    feed(&mut session, &settings_frame(flags::ACK, &[]));
    assert_eq!(session.handler().events, vec![Event::Settings]);
}

#[test]
fn test_priority_forwarded() {
    let (mut session, _loop) = server();
    feed(&mut session, &priority_frame(3, 1, 32, true));

    assert_eq!(session.handler().events, vec![Event::Priority {
        stream_id: 3,
        parent: 1,
        weight: 32,
        exclusive: true,
    }]);
}

#[test]
fn test_priority_on_connection_ignored() {
    let (mut session, _loop) = server();
    feed(&mut session, &priority_frame(0, 0, 16, false));
    assert!(session.handler().events.is_empty());
}

#[test]
fn test_rst_stream_closes_and_destroys() {
    let (mut session, _loop) = server();
    feed(&mut session, &get_request(1));
    feed(&mut session, &rst_frame(1, error_code::CANCEL));

    assert_eq!(session.handler().closes(), vec![(1, error_code::CANCEL)]);
    assert!(session.find_stream(1).is_none());
    assert_eq!(session.stream_count(), 0);
    assert_eq!(session.pool_stats().streams, 1);
}

#[test]
fn test_rst_for_unknown_stream_ignored() {
    let (mut session, _loop) = server();
    feed(&mut session, &rst_frame(7, error_code::CANCEL));
    assert!(session.handler().closes().is_empty());
}

#[test]
fn test_protocol_error_is_returned() {
    let (mut session, _loop) = server();
    let frame = headers_frame(0, flags::NONE, &[(":method", "GET")]);

    match session.write(&[frame.as_slice()]) {
        Err(SessionError::Engine(err)) => {
            assert_eq!(err.code, EngineError::PROTOCOL);
            assert!(!err.is_fatal());
        }
        other => panic!("Expected engine error, got {:?}", other),
    }
    assert!(session.handler().events.is_empty());
}

#[test]
fn test_client_receives_response_category() {
    let (mut session, _loop) = client();
    let id = session
        .submit_request(None, &fields(&[(":method", "GET"), (":path", "/")]), true)
        .unwrap();
    session.tick().unwrap();
    feed(&mut session, &headers_frame(id, flags::END_STREAM, &[(":status", "200")]));

    assert_eq!(session.handler().events, vec![
        Event::Headers {
            stream_id: id,
            category: HeadersCategory::Response,
            flags: flags::END_HEADERS | flags::END_STREAM,
            fields: pairs(&[(":status", "200")]),
        },
        Event::StreamClose {
            stream_id: id,
            code: error_code::NO_ERROR,
        },
    ]);
    assert!(session.find_stream(id).is_none());
}

#[test]
fn test_client_registers_promised_stream() {
    let (mut session, _loop) = client();
    let id = session
        .submit_request(None, &fields(&[(":method", "GET"), (":path", "/")]), true)
        .unwrap();
    session.tick().unwrap();
    feed(&mut session, &push_promise_frame(id, 2, &[(":method", "GET"), (":path", "/style.css")]));

    match &session.handler().events[0] {
        Event::Headers { stream_id, category, fields, .. } => {
            assert_eq!(*stream_id, 2);
            assert_eq!(*category, HeadersCategory::PushPromise);
            assert_eq!(*fields, pairs(&[(":method", "GET"), (":path", "/style.css")]));
        }
        other => panic!("Expected headers, got {:?}", other),
    }
    let pushed = session.find_stream(2).expect("promised stream registered");
    assert_eq!(pushed.headers_category(), HeadersCategory::PushPromise);
}

#[test]
fn test_request_body_then_close_scenario() {
    let (mut session, _loop) = server();
    feed(&mut session, &headers_frame(1, flags::NONE, &[(":method", "GET"), (":path", "/")]));

    let frame = data_frame(1, flags::NONE, b"0123456789");
    feed(&mut session, &frame[..14]);
    feed(&mut session, &frame[14..]);
    feed(&mut session, &rst_frame(1, error_code::NO_ERROR));

    let events = &session.handler().events;
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], Event::Headers { stream_id: 1, category: HeadersCategory::Request, .. }));
    match &events[1] {
        Event::Data { stream_id, chunks, .. } => {
            assert_eq!(*stream_id, 1);
            assert_eq!(chunks.len(), 2);
            assert_eq!(chunks.concat(), b"0123456789".to_vec());
        }
        other => panic!("Expected data, got {:?}", other),
    }
    assert_eq!(events[2], Event::StreamClose {
        stream_id: 1,
        code: error_code::NO_ERROR,
    });
    assert!(session.find_stream(1).is_none());
}
