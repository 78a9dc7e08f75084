//! Connection Tests
//!
//! These tests verify:
//! - Request bytes written for queries and verbs
//! - Responses assembled across many reads
//! - Peer close and transport failures reported as resets
//! - State transitions after fatal errors

#[path = "../common/mod.rs"]
mod common;

use std::io::ErrorKind;

use common::{binary_frame, string_frame, MockStream, NOT_FOUND, OKAY};
use serde::{Deserialize, Serialize};
use skyhash::network::ConnectionState;
use skyhash::protocol::{Element, ParseError, Query, RespCode};
use skyhash::{Bincode, Config, Connection, SkyError};

fn connection(stream: MockStream) -> Connection<MockStream> {
    Connection::new(stream, &Config::default())
}

// =============================================================================
// Core Query Tests
// =============================================================================

#[test]
fn test_run_query_writes_frame_and_reads_element() {
    let mut conn = connection(MockStream::with_responses([string_frame("hi")]));
    let element = conn.run_query(&Query::new().arg("get").arg("P")).unwrap();

    assert_eq!(element, Element::String("hi".to_string()));
    assert_eq!(conn.get_ref().written, b"*1\n~2\n3\nget\n1\nP\n");
    assert_eq!(conn.state(), ConnectionState::Ready);
    assert_eq!(conn.buffered(), 0);
}

#[test]
fn test_response_delivered_byte_by_byte() {
    let frame = b"*1\n&2\n+3\nfoo\n_1\n+3\nbar\n";
    let mut whole = connection(MockStream::with_responses([&frame[..]]));
    let mut split = connection(MockStream::byte_by_byte(frame));

    let query = Query::new().arg("lskeys");
    assert_eq!(
        split.run_query(&query).unwrap(),
        whole.run_query(&query).unwrap()
    );
}

#[test]
fn test_small_read_chunks() {
    let config = Config::builder().read_chunk_size(2).build();
    let mut conn = Connection::new(MockStream::with_responses([string_frame("hello")]), &config);
    assert_eq!(
        conn.run_query(&Query::new().arg("get").arg("k")).unwrap(),
        Element::String("hello".to_string())
    );
}

#[test]
fn test_consecutive_queries() {
    let mut conn = connection(MockStream::with_responses([OKAY, &b"*1\n:2\n"[..]]));
    assert!(conn.run_query(&Query::new().arg("set").arg("a").arg("1")).unwrap().is_okay());
    assert_eq!(
        conn.run_query(&Query::new().arg("dbsize")).unwrap(),
        Element::UnsignedInt64(2)
    );
}

// =============================================================================
// Usage Error Tests
// =============================================================================

#[test]
fn test_empty_query_rejected_before_write() {
    let mut conn = connection(MockStream::with_responses([OKAY]));
    assert!(matches!(
        conn.run_query(&Query::new()),
        Err(SkyError::EmptyQuery)
    ));
    assert!(conn.get_ref().written.is_empty());
    assert_eq!(conn.get_ref().remaining_chunks(), 1);
    assert_eq!(conn.state(), ConnectionState::Ready);
}

#[test]
fn test_pipelined_response_is_fatal() {
    let mut conn = connection(MockStream::with_responses([&b"*2\n!4\nOkay\n!4\nOkay\n"[..]]));

    assert!(matches!(
        conn.run_query(&Query::new().arg("heya")),
        Err(SkyError::Parse(ParseError::PipelinedResponse(2)))
    ));
    assert_eq!(conn.state(), ConnectionState::Desynchronized);
    assert_eq!(conn.buffered(), 0);
}

// =============================================================================
// Connection-Level Error Tests
// =============================================================================

#[test]
fn test_peer_close_mid_frame_is_reset() {
    let mut conn = connection(MockStream::with_responses([&b"*1\n+10\nhel"[..]]));
    assert!(matches!(
        conn.run_query(&Query::new().arg("get").arg("k")),
        Err(SkyError::ConnectionReset)
    ));
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(conn.buffered(), 0);
}

#[test]
fn test_closed_connection_reports_not_connected() {
    let mut conn = connection(MockStream::new());
    assert!(matches!(
        conn.run_query(&Query::new().arg("heya")),
        Err(SkyError::ConnectionReset)
    ));

    let written = conn.get_ref().written.len();
    assert!(matches!(
        conn.run_query(&Query::new().arg("heya")),
        Err(SkyError::NotConnected)
    ));
    assert_eq!(conn.get_ref().written.len(), written);
    assert!(!conn.is_connected());
}

#[test]
fn test_transport_reset_error_maps_to_reset() {
    let mut stream = MockStream::with_responses([OKAY]);
    stream.fail_read(0, ErrorKind::ConnectionReset);
    let mut conn = connection(stream);

    assert!(matches!(
        conn.run_query(&Query::new().arg("heya")),
        Err(SkyError::ConnectionReset)
    ));
}

#[test]
fn test_interrupted_read_is_retried() {
    let mut stream = MockStream::with_responses([OKAY]);
    stream.fail_read(0, ErrorKind::Interrupted);
    let mut conn = connection(stream);

    assert!(conn.run_query(&Query::new().arg("heya")).unwrap().is_okay());
}

#[test]
fn test_other_io_error_closes_connection() {
    let mut stream = MockStream::with_responses([OKAY]);
    stream.fail_read(0, ErrorKind::TimedOut);
    let mut conn = connection(stream);

    assert!(matches!(
        conn.run_query(&Query::new().arg("heya")),
        Err(SkyError::Io(_))
    ));
    assert_eq!(conn.state(), ConnectionState::Closed);
}

// =============================================================================
// Protocol Error Tests
// =============================================================================

#[test]
fn test_protocol_error_desynchronizes() {
    let mut conn = connection(MockStream::with_responses([&b"*1\n+3a\nfoo\n"[..], OKAY]));

    assert!(matches!(
        conn.run_query(&Query::new().arg("get").arg("k")),
        Err(SkyError::Parse(ParseError::DataTypeParseError))
    ));
    assert_eq!(conn.state(), ConnectionState::Desynchronized);
    assert!(!conn.is_healthy());
    assert!(conn.is_connected());
    assert_eq!(conn.buffered(), 0);
}

#[test]
fn test_desynchronized_connection_refuses_requests() {
    // The tail of the broken reply arrives after the error was reported
    let mut conn = connection(MockStream::with_responses([
        &b"*1\n+3a\n"[..],
        &b"*1\n:5\n"[..],
        OKAY,
    ]));

    assert!(matches!(
        conn.run_query(&Query::new().arg("get").arg("k")),
        Err(SkyError::Parse(ParseError::DataTypeParseError))
    ));

    let written = conn.get_ref().written.len();
    assert!(matches!(
        conn.run_query(&Query::new().arg("heya")),
        Err(SkyError::Desynchronized)
    ));
    assert!(matches!(conn.get::<u64>("k"), Err(SkyError::Desynchronized)));

    // Nothing was sent and the stale frame was never read as an answer
    assert_eq!(conn.get_ref().written.len(), written);
    assert_eq!(conn.get_ref().remaining_chunks(), 2);
    assert_eq!(conn.state(), ConnectionState::Desynchronized);
    assert!(!conn.is_healthy());
}

// =============================================================================
// Action Tests
// =============================================================================

#[test]
fn test_get_string() {
    let mut conn = connection(MockStream::with_responses([string_frame("value")]));
    let value: String = conn.get("key").unwrap();
    assert_eq!(value, "value");
    assert_eq!(conn.get_ref().written, b"*1\n~2\n3\nget\n3\nkey\n");
}

#[test]
fn test_get_missing_key() {
    let mut conn = connection(MockStream::with_responses([NOT_FOUND, NOT_FOUND]));

    let missing: Option<String> = conn.get("nope").unwrap();
    assert_eq!(missing, None);

    match conn.get::<String>("nope") {
        Err(SkyError::Response(code)) => assert_eq!(code.code(), RespCode::NotFound),
        other => panic!("Expected NotFound response, got {:?}", other),
    }
    // A server answer is not a connection failure
    assert!(conn.is_healthy());
}

#[test]
fn test_set_update_del_requests() {
    let mut conn = connection(MockStream::with_responses([OKAY, OKAY, &b"*1\n:1\n"[..]]));

    assert!(conn.set("k", "v").unwrap().is_okay());
    assert!(conn.update("k", &7u64).unwrap().is_okay());
    assert_eq!(conn.del("k").unwrap(), Element::UnsignedInt64(1));

    let mut expected = Vec::new();
    expected.extend_from_slice(b"*1\n~3\n3\nset\n1\nk\n1\nv\n");
    expected.extend_from_slice(b"*1\n~3\n4\nuset\n1\nk\n1\n7\n");
    expected.extend_from_slice(b"*1\n~2\n3\ndel\n1\nk\n");
    assert_eq!(conn.get_ref().written, expected);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    id: u64,
    user: String,
}

#[test]
fn test_pop_bincode_record() {
    let session = Session {
        id: 7,
        user: "ferris".to_string(),
    };
    let payload = bincode::serialize(&session).unwrap();
    let mut conn = connection(MockStream::with_responses([binary_frame(&payload)]));

    let Bincode(popped) = conn.pop::<Bincode<Session>>("session").unwrap();
    assert_eq!(popped, session);
    assert_eq!(conn.get_ref().written, b"*1\n~2\n3\npop\n7\nsession\n");
}

#[test]
fn test_use_entity_records_on_okay() {
    let mut conn = connection(MockStream::with_responses([OKAY]));
    assert_eq!(conn.entity(), "default:default");

    assert!(conn.use_entity("app", "users").unwrap().is_okay());
    assert_eq!(conn.entity(), "app:users");
    assert_eq!(conn.get_ref().written, b"*1\n~2\n3\nuse\n9\napp:users\n");
}

#[test]
fn test_use_entity_keeps_entity_on_error() {
    let mut conn = connection(MockStream::with_responses([&b"*1\n!19\ncontainer-not-found\n"[..]]));

    let response = conn.use_entity("app", "missing").unwrap();
    assert_eq!(response.as_resp_code().unwrap().code(), RespCode::OtherError);
    assert_eq!(conn.entity(), "default:default");
}
