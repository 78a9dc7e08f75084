//! Codec Tests
//!
//! Tests for decoding Skyhash response frames.

use skyhash::protocol::{
    decode_response, Element, ParseError, Parser, RespCode, ResponseCode, TypedArray,
};

fn decode(bytes: &[u8]) -> Result<Element, ParseError> {
    decode_response(bytes).map(|(element, _)| element)
}

// =============================================================================
// Scalar Tests
// =============================================================================

#[test]
fn test_decode_string() {
    let (element, consumed) = decode_response(b"*1\n+2\nhi\n").unwrap();
    assert_eq!(element, Element::String("hi".to_string()));
    assert_eq!(consumed, 9);
}

#[test]
fn test_decode_empty_string() {
    assert_eq!(decode(b"*1\n+0\n\n").unwrap(), Element::String(String::new()));
}

#[test]
fn test_decode_string_containing_linefeed() {
    assert_eq!(
        decode(b"*1\n+5\nab\ncd\n").unwrap(),
        Element::String("ab\ncd".to_string())
    );
}

#[test]
fn test_decode_u64() {
    let (element, consumed) = decode_response(b"*1\n:12345\n").unwrap();
    assert_eq!(element, Element::UnsignedInt64(12345));
    assert_eq!(consumed, 10);
}

#[test]
fn test_decode_u64_max() {
    assert_eq!(
        decode(b"*1\n:18446744073709551615\n").unwrap(),
        Element::UnsignedInt64(u64::MAX)
    );
}

#[test]
fn test_decode_binary_string_is_opaque() {
    // Contains a linefeed and bytes that are not valid UTF-8
    assert_eq!(
        decode(b"*1\n?3\n\x00\n\xff\n").unwrap(),
        Element::BinaryString(vec![0x00, b'\n', 0xff])
    );
}

// =============================================================================
// Response Code Tests
// =============================================================================

#[test]
fn test_decode_resp_code_by_name() {
    assert_eq!(
        decode(b"*1\n!4\nOkay\n").unwrap(),
        Element::RespCode(ResponseCode::new(RespCode::Okay))
    );
    assert_eq!(
        decode(b"*1\n!9\nWrongType\n").unwrap(),
        Element::RespCode(ResponseCode::new(RespCode::WrongType))
    );
}

#[test]
fn test_decode_resp_code_by_number() {
    assert_eq!(
        decode(b"*1\n!1\n1\n").unwrap(),
        Element::RespCode(ResponseCode::new(RespCode::NotFound))
    );
}

#[test]
fn test_decode_resp_code_error_description() {
    let element = decode(b"*1\n!23\ndefault-container-unset\n").unwrap();
    let code = element.as_resp_code().unwrap();
    assert_eq!(code.code(), RespCode::OtherError);
    assert_eq!(code.message(), Some("default-container-unset"));
}

#[test]
fn test_decode_unknown_resp_code_fails() {
    assert_eq!(
        decode(b"*1\n!6\nFooBar\n"),
        Err(ParseError::UnknownResponseCode("FooBar".to_string()))
    );
}

// =============================================================================
// Array Tests
// =============================================================================

#[test]
fn test_decode_array() {
    assert_eq!(
        decode(b"*1\n&2\n+3\nfoo\n:7\n").unwrap(),
        Element::Array(vec![
            Element::String("foo".to_string()),
            Element::UnsignedInt64(7),
        ])
    );
}

#[test]
fn test_decode_nested_array() {
    let element = decode(b"*1\n&2\n&1\n+1\na\n_1\n+1\nb\n").unwrap();
    assert_eq!(
        element,
        Element::Array(vec![
            Element::Array(vec![Element::String("a".to_string())]),
            Element::FlatArray(vec!["b".to_string()]),
        ])
    );
}

#[test]
fn test_decode_empty_array() {
    assert_eq!(decode(b"*1\n&0\n").unwrap(), Element::Array(vec![]));
}

#[test]
fn test_decode_flat_array() {
    assert_eq!(
        decode(b"*1\n_2\n+3\nfoo\n+3\nbar\n").unwrap(),
        Element::FlatArray(vec!["foo".to_string(), "bar".to_string()])
    );
}

#[test]
fn test_decode_flat_array_rejects_other_tags() {
    assert_eq!(
        decode(b"*1\n_2\n+3\nfoo\n:3\n"),
        Err(ParseError::UnknownDataType)
    );
}

#[test]
fn test_decode_typed_string_array() {
    assert_eq!(
        decode(b"*1\n@+2\n3\nfoo\n3\nbar\n").unwrap(),
        Element::TypedArray(TypedArray::String(vec![
            "foo".to_string(),
            "bar".to_string()
        ]))
    );
}

#[test]
fn test_decode_typed_binary_array() {
    assert_eq!(
        decode(b"*1\n@?2\n1\n\x00\n0\n\n").unwrap(),
        Element::TypedArray(TypedArray::Binary(vec![vec![0x00], vec![]]))
    );
}

#[test]
fn test_decode_typed_array_unknown_tag() {
    assert_eq!(
        decode(b"*1\n@X2\n3\nfoo\n3\nbar\n"),
        Err(ParseError::UnknownDataType)
    );
}

// =============================================================================
// Metaframe Tests
// =============================================================================

#[test]
fn test_zero_datagroups_is_bad_packet() {
    assert_eq!(decode(b"*0\n"), Err(ParseError::BadPacket));
}

#[test]
fn test_multiple_datagroups_unsupported() {
    assert_eq!(
        decode(b"*2\n+1\na\n+1\nb\n"),
        Err(ParseError::PipelinedResponse(2))
    );
}

#[test]
fn test_missing_metaframe_is_unexpected_byte() {
    assert_eq!(decode(b"+2\nhi\n"), Err(ParseError::UnexpectedByte));
}

#[test]
fn test_empty_buffer() {
    assert_eq!(decode(b""), Err(ParseError::Empty));
}

#[test]
fn test_next_metaframe_may_follow() {
    let (element, consumed) = decode_response(b"*1\n+2\nhi\n*1\n+1").unwrap();
    assert_eq!(element, Element::String("hi".to_string()));
    assert_eq!(consumed, 9);
}

#[test]
fn test_trailing_garbage_is_unexpected_byte() {
    assert_eq!(decode(b"*1\n+2\nhi\nX"), Err(ParseError::UnexpectedByte));
}

#[test]
fn test_missing_terminator_is_unexpected_byte() {
    assert_eq!(decode(b"*1\n+2\nhix"), Err(ParseError::UnexpectedByte));
}

// =============================================================================
// Field Parsing Tests
// =============================================================================

#[test]
fn test_non_digit_length_is_data_type_error() {
    assert_eq!(decode(b"*1\n+3a\nfoo\n"), Err(ParseError::DataTypeParseError));
}

#[test]
fn test_non_digit_length_fails_before_linefeed() {
    assert_eq!(decode(b"*1\n+3a"), Err(ParseError::DataTypeParseError));
    assert_eq!(decode(b"*x"), Err(ParseError::DataTypeParseError));
    assert_eq!(decode(b"*1\n:12z"), Err(ParseError::DataTypeParseError));
}

#[test]
fn test_overlong_digit_run_fails_before_linefeed() {
    assert_eq!(
        decode(b"*1\n:123456789012345678901"),
        Err(ParseError::DataTypeParseError)
    );
}

#[test]
fn test_empty_length_is_data_type_error() {
    assert_eq!(decode(b"*1\n+\nfoo\n"), Err(ParseError::DataTypeParseError));
    assert_eq!(decode(b"*\n+1\na\n"), Err(ParseError::DataTypeParseError));
}

#[test]
fn test_overflowing_length_is_data_type_error() {
    assert_eq!(
        decode(b"*1\n+99999999999999999999\nfoo\n"),
        Err(ParseError::DataTypeParseError)
    );
}

#[test]
fn test_overflowing_u64_is_data_type_error() {
    assert_eq!(
        decode(b"*1\n:18446744073709551616\n"),
        Err(ParseError::DataTypeParseError)
    );
}

#[test]
fn test_invalid_utf8_string_is_data_type_error() {
    assert_eq!(decode(b"*1\n+2\n\xff\xfe\n"), Err(ParseError::DataTypeParseError));
}

#[test]
fn test_unknown_tsymbol() {
    assert_eq!(decode(b"*1\n#2\nhi\n"), Err(ParseError::UnknownDataType));
}

// =============================================================================
// Incomplete Frame Tests
// =============================================================================

#[test]
fn test_every_prefix_is_not_enough() {
    let frames: [&[u8]; 6] = [
        b"*1\n+2\nhi\n",
        b"*1\n:12345\n",
        b"*1\n?3\n\x00\n\xff\n",
        b"*1\n&2\n+3\nfoo\n&1\n:7\n",
        b"*1\n_2\n+3\nfoo\n+3\nbar\n",
        b"*1\n@?2\n1\n\x00\n0\n\n",
    ];

    for frame in frames {
        for end in 1..frame.len() {
            assert_eq!(
                decode(&frame[..end]),
                Err(ParseError::NotEnough),
                "prefix {:?}",
                String::from_utf8_lossy(&frame[..end])
            );
        }
        assert!(decode(frame).is_ok());
    }
}

#[test]
fn test_decoding_does_not_mutate_buffer() {
    let buffer = b"*1\n+2\nhi\n".to_vec();
    let before = buffer.clone();
    let _ = decode_response(&buffer[..5]);
    let _ = decode_response(&buffer);
    assert_eq!(buffer, before);
}

// =============================================================================
// Depth Ceiling Tests
// =============================================================================

fn nested(depth: usize) -> Vec<u8> {
    let mut frame = b"*1\n".to_vec();
    for _ in 0..depth {
        frame.extend_from_slice(b"&1\n");
    }
    frame.extend_from_slice(b":1\n");
    frame
}

#[test]
fn test_default_depth_ceiling() {
    assert!(decode(&nested(64)).is_ok());
    assert_eq!(decode(&nested(65)), Err(ParseError::BadPacket));
}

#[test]
fn test_custom_depth_ceiling() {
    let frame = nested(3);
    assert!(Parser::new(&frame).with_max_depth(3).parse().is_ok());
    assert_eq!(
        Parser::new(&frame).with_max_depth(2).parse(),
        Err(ParseError::BadPacket)
    );
}

#[test]
fn test_huge_declared_count_is_not_enough() {
    // Declared count far beyond what is buffered must not be trusted
    assert_eq!(decode(b"*1\n&1000000000000\n"), Err(ParseError::NotEnough));
}
