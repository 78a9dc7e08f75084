//! Protocol codec
//!
//! Incremental decoder for Skyhash response frames.
//!
//! ## Response Format
//! ```text
//! *<datagroups>\n            metaframe (only 1 datagroup supported)
//! +<len>\n<bytes>\n          String
//! :<digits>\n                UnsignedInt64
//! &<count>\n<elem>*          Array (recursive)
//! !<len>\n<code>\n           RespCode
//! _<count>\n(+<len>\n<bytes>\n)*      FlatArray
//! ?<len>\n<bytes>\n          BinaryString
//! @+<count>\n(<len>\n<bytes>\n)*      TypedArray of strings
//! @?<count>\n(<len>\n<bytes>\n)*      TypedArray of binary strings
//! ```
//!
//! The decoder borrows the accumulation buffer and walks it with a local
//! cursor. It never mutates the buffer; the caller advances it by the number
//! of bytes reported on success. No progress is kept across `NotEnough`
//! returns: a retry re-scans from the start of the buffer.

use thiserror::Error;

use super::element::{Element, ResponseCode, TypedArray};

pub const SKYHASH_HEADER: u8 = b'*';
pub const SKYHASH_LINEFEED: u8 = b'\n';
pub const SKYHASH_STRING: u8 = b'+';
pub const SKYHASH_U64: u8 = b':';
pub const SKYHASH_ARRAY: u8 = b'&';
pub const SKYHASH_RESPCODE: u8 = b'!';
pub const SKYHASH_FLATARRAY: u8 = b'_';
pub const SKYHASH_BINARYSTRING: u8 = b'?';
pub const SKYHASH_TYPEDARRAY: u8 = b'@';

/// Default ceiling for nested `&` arrays
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Digits in `u64::MAX`
const MAX_DIGITS: usize = 20;

/// Result type for the decoder
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Errors that can be returned by the parser
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The buffer holds a well-formed but incomplete frame; read more bytes
    #[error("not enough bytes to complete the frame")]
    NotEnough,

    /// The frame is structurally invalid; parsing cannot continue
    #[error("unexpected byte in frame")]
    UnexpectedByte,

    /// Degenerate packet, e.g. a datagroup count of zero
    #[error("bad packet")]
    BadPacket,

    /// A size, integer or string field failed to parse
    #[error("failed to parse data type")]
    DataTypeParseError,

    /// A tsymbol this client does not know
    #[error("unknown data type")]
    UnknownDataType,

    /// No bytes at all
    #[error("empty buffer")]
    Empty,

    /// More than one datagroup in the response metaframe
    #[error("pipelined responses are not supported ({0} datagroups)")]
    PipelinedResponse(usize),

    /// A `!` token that maps to no response code
    #[error("unknown response code: {0:?}")]
    UnknownResponseCode(String),
}

/// Decode exactly one top-level response frame.
///
/// Returns the element and the number of bytes it occupied.
pub fn decode_response(buffer: &[u8]) -> ParseResult<(Element, usize)> {
    Parser::new(buffer).parse()
}

/// A parser over a borrowed view of the accumulation buffer
pub struct Parser<'a> {
    buffer: &'a [u8],
    cursor: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            cursor: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the nesting ceiling for recursive arrays
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse one frame, returning the element and the bytes consumed
    pub fn parse(mut self) -> ParseResult<(Element, usize)> {
        if self.buffer.is_empty() {
            return Err(ParseError::Empty);
        }

        match self.parse_metaframe()? {
            0 => return Err(ParseError::BadPacket),
            1 => {}
            datagroups => return Err(ParseError::PipelinedResponse(datagroups)),
        }

        let element = self.parse_next_element(0)?;

        // Either nothing is pending or the next frame starts right here
        match self.buffer.get(self.cursor) {
            None | Some(&SKYHASH_HEADER) => Ok((element, self.cursor)),
            Some(_) => Err(ParseError::UnexpectedByte),
        }
    }

    // =========================================================================
    // Metaframe
    // =========================================================================

    /// Read `*<n>\n` and return the datagroup count
    fn parse_metaframe(&mut self) -> ParseResult<usize> {
        if self.buffer[0] != SKYHASH_HEADER {
            return Err(ParseError::UnexpectedByte);
        }
        self.cursor = 1;
        self.read_size()
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn parse_next_element(&mut self, depth: usize) -> ParseResult<Element> {
        let tsymbol = self.next_byte()?;
        match tsymbol {
            SKYHASH_STRING => self.parse_next_string().map(Element::String),
            SKYHASH_U64 => self.parse_next_u64().map(Element::UnsignedInt64),
            SKYHASH_ARRAY => self.parse_next_array(depth).map(Element::Array),
            SKYHASH_RESPCODE => self.parse_next_resp_code().map(Element::RespCode),
            SKYHASH_FLATARRAY => self.parse_next_flat_array().map(Element::FlatArray),
            SKYHASH_BINARYSTRING => self.parse_next_chunk().map(|b| Element::BinaryString(b.to_vec())),
            SKYHASH_TYPEDARRAY => self.parse_next_typed_array().map(Element::TypedArray),
            _ => Err(ParseError::UnknownDataType),
        }
    }

    fn parse_next_array(&mut self, depth: usize) -> ParseResult<Vec<Element>> {
        if depth >= self.max_depth {
            return Err(ParseError::BadPacket);
        }
        let size = self.read_size()?;
        let mut elements = Vec::with_capacity(self.capacity_hint(size));
        for _ in 0..size {
            elements.push(self.parse_next_element(depth + 1)?);
        }
        Ok(elements)
    }

    fn parse_next_flat_array(&mut self) -> ParseResult<Vec<String>> {
        let size = self.read_size()?;
        let mut elements = Vec::with_capacity(self.capacity_hint(size));
        for _ in 0..size {
            if self.next_byte()? != SKYHASH_STRING {
                return Err(ParseError::UnknownDataType);
            }
            elements.push(self.parse_next_string()?);
        }
        Ok(elements)
    }

    fn parse_next_typed_array(&mut self) -> ParseResult<TypedArray> {
        match self.next_byte()? {
            SKYHASH_STRING => {
                let size = self.read_size()?;
                let mut elements = Vec::with_capacity(self.capacity_hint(size));
                for _ in 0..size {
                    // no tsymbol, just sizes and elements
                    elements.push(self.parse_next_string()?);
                }
                Ok(TypedArray::String(elements))
            }
            SKYHASH_BINARYSTRING => {
                let size = self.read_size()?;
                let mut elements = Vec::with_capacity(self.capacity_hint(size));
                for _ in 0..size {
                    elements.push(self.parse_next_chunk()?.to_vec());
                }
                Ok(TypedArray::Binary(elements))
            }
            _ => Err(ParseError::UnknownDataType),
        }
    }

    fn parse_next_resp_code(&mut self) -> ParseResult<ResponseCode> {
        let chunk = self.parse_next_chunk()?;
        let token = std::str::from_utf8(chunk).map_err(|_| ParseError::DataTypeParseError)?;
        ResponseCode::from_token(token)
    }

    fn parse_next_string(&mut self) -> ParseResult<String> {
        let chunk = self.parse_next_chunk()?;
        std::str::from_utf8(chunk)
            .map(str::to_owned)
            .map_err(|_| ParseError::DataTypeParseError)
    }

    fn parse_next_u64(&mut self) -> ParseResult<u64> {
        let line = self.read_digit_line()?;
        parse_u64(line)
    }

    /// Read `<len>\n<bytes>\n` and return the bytes
    fn parse_next_chunk(&mut self) -> ParseResult<&'a [u8]> {
        let size = self.read_size()?;
        let chunk = self.read_exact(size)?;
        self.expect_linefeed()?;
        Ok(chunk)
    }

    // =========================================================================
    // Cursor primitives
    // =========================================================================

    fn next_byte(&mut self) -> ParseResult<u8> {
        let byte = *self.buffer.get(self.cursor).ok_or(ParseError::NotEnough)?;
        self.cursor += 1;
        Ok(byte)
    }

    /// Digits up to (not including) the next linefeed, which is skipped.
    ///
    /// A non-digit, or more digits than a u64 can hold, fails as soon as it
    /// is seen, without waiting for the linefeed.
    fn read_digit_line(&mut self) -> ParseResult<&'a [u8]> {
        let rest = &self.buffer[self.cursor..];
        for (end, &byte) in rest.iter().enumerate() {
            if byte == SKYHASH_LINEFEED {
                self.cursor += end + 1;
                return Ok(&rest[..end]);
            }
            if !byte.is_ascii_digit() || end >= MAX_DIGITS {
                return Err(ParseError::DataTypeParseError);
            }
        }
        Err(ParseError::NotEnough)
    }

    fn read_size(&mut self) -> ParseResult<usize> {
        let line = self.read_digit_line()?;
        parse_size(line)
    }

    fn read_exact(&mut self, len: usize) -> ParseResult<&'a [u8]> {
        let end = self
            .cursor
            .checked_add(len)
            .ok_or(ParseError::DataTypeParseError)?;
        if end > self.buffer.len() {
            return Err(ParseError::NotEnough);
        }
        let chunk = &self.buffer[self.cursor..end];
        self.cursor = end;
        Ok(chunk)
    }

    fn expect_linefeed(&mut self) -> ParseResult<()> {
        match self.buffer.get(self.cursor) {
            None => Err(ParseError::NotEnough),
            Some(&SKYHASH_LINEFEED) => {
                self.cursor += 1;
                Ok(())
            }
            Some(_) => Err(ParseError::UnexpectedByte),
        }
    }

    /// A declared count can never exceed the bytes left, so don't
    /// pre-allocate beyond that
    fn capacity_hint(&self, declared: usize) -> usize {
        declared.min(self.buffer.len() - self.cursor)
    }
}

// =============================================================================
// Integer fields
// =============================================================================

fn parse_size(bytes: &[u8]) -> ParseResult<usize> {
    let value = parse_u64(bytes)?;
    usize::try_from(value).map_err(|_| ParseError::DataTypeParseError)
}

fn parse_u64(bytes: &[u8]) -> ParseResult<u64> {
    if bytes.is_empty() {
        return Err(ParseError::DataTypeParseError);
    }
    bytes.iter().try_fold(0u64, |acc, &digit| {
        if !digit.is_ascii_digit() {
            return Err(ParseError::DataTypeParseError);
        }
        acc.checked_mul(10)
            .and_then(|n| n.checked_add(u64::from(digit - b'0')))
            .ok_or(ParseError::DataTypeParseError)
    })
}
