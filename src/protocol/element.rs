//! Element definitions
//!
//! The value types every decoded response is expressed in.

use std::fmt;

use super::codec::{ParseError, ParseResult};

/// A decoded response value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// A unicode string; tsymbol `+`
    String(String),

    /// An unsigned 64-bit integer; tsymbol `:`
    UnsignedInt64(u64),

    /// A recursive array; tsymbol `&`
    Array(Vec<Element>),

    /// A non-recursive array of strings; tsymbol `_`
    FlatArray(Vec<String>),

    /// Raw bytes, not interpreted as text; tsymbol `?`
    BinaryString(Vec<u8>),

    /// A response code; tsymbol `!`
    RespCode(ResponseCode),

    /// A homogeneous array whose element type is declared once; tsymbol `@`
    TypedArray(TypedArray),
}

/// Payload of a typed array
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedArray {
    /// `@+`
    String(Vec<String>),

    /// `@?`
    Binary(Vec<Vec<u8>>),
}

/// The kinds of arrays the protocol can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayType {
    /// Nested elements, each individually tagged (`&`)
    Recursive,
    /// One level of tagged strings (`_`)
    Flat,
    /// Untagged unicode strings (`@+`)
    String,
    /// Untagged binary strings (`@?`)
    Binary,
}

impl Element {
    /// Short name of the variant, for logs and mapping errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::String(_) => "string",
            Element::UnsignedInt64(_) => "u64",
            Element::Array(_) => "array",
            Element::FlatArray(_) => "flat array",
            Element::BinaryString(_) => "binary string",
            Element::RespCode(_) => "response code",
            Element::TypedArray(TypedArray::String(_)) => "typed string array",
            Element::TypedArray(TypedArray::Binary(_)) => "typed binary array",
        }
    }

    pub fn array_type(&self) -> Option<ArrayType> {
        match self {
            Element::Array(_) => Some(ArrayType::Recursive),
            Element::FlatArray(_) => Some(ArrayType::Flat),
            Element::TypedArray(TypedArray::String(_)) => Some(ArrayType::String),
            Element::TypedArray(TypedArray::Binary(_)) => Some(ArrayType::Binary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Element::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Element::UnsignedInt64(n) => Some(*n),
            _ => None,
        }
    }

    /// Payload bytes of a string or binary string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Element::String(s) => Some(s.as_bytes()),
            Element::BinaryString(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_resp_code(&self) -> Option<&ResponseCode> {
        match self {
            Element::RespCode(code) => Some(code),
            _ => None,
        }
    }

    /// True for a bare `Okay` response code
    pub fn is_okay(&self) -> bool {
        matches!(self, Element::RespCode(code) if code.is_okay())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::String(s) => write!(f, "{:?}", s),
            Element::UnsignedInt64(n) => write!(f, "{}", n),
            Element::BinaryString(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
            Element::RespCode(code) => write!(f, "({})", code),
            Element::Array(elements) => write_list(f, elements.iter()),
            Element::FlatArray(strings) => write_list(f, strings.iter().map(|s| format!("{:?}", s))),
            Element::TypedArray(TypedArray::String(strings)) => {
                write_list(f, strings.iter().map(|s| format!("{:?}", s)))
            }
            Element::TypedArray(TypedArray::Binary(blobs)) => write_list(
                f,
                blobs.iter().map(|b| format!("{:?}", String::from_utf8_lossy(b))),
            ),
        }
    }
}

fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str("]")
}

// =============================================================================
// Response Codes
// =============================================================================

/// Response codes returned by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RespCode {
    /// The query succeeded but carries no data
    Okay = 0,
    /// No element exists for the key
    NotFound = 1,
    /// The key already exists
    OverwriteError = 2,
    /// The action did not expect the arguments sent
    ActionError = 3,
    /// The packet contained invalid data
    PacketError = 4,
    /// The server failed internally
    ServerError = 5,
    /// Some other error; the server may attach a description
    OtherError = 6,
    /// The value has a different type than the action expects
    WrongType = 7,
}

impl RespCode {
    const ALL: [RespCode; 8] = [
        RespCode::Okay,
        RespCode::NotFound,
        RespCode::OverwriteError,
        RespCode::ActionError,
        RespCode::PacketError,
        RespCode::ServerError,
        RespCode::OtherError,
        RespCode::WrongType,
    ];

    /// Canonical name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            RespCode::Okay => "Okay",
            RespCode::NotFound => "NotFound",
            RespCode::OverwriteError => "OverwriteError",
            RespCode::ActionError => "ActionError",
            RespCode::PacketError => "PacketError",
            RespCode::ServerError => "ServerError",
            RespCode::OtherError => "OtherError",
            RespCode::WrongType => "WrongType",
        }
    }

    /// Look up a canonical name or its numeric form
    pub fn from_name(name: &str) -> Option<Self> {
        if let [digit @ b'0'..=b'7'] = name.as_bytes() {
            return Some(Self::ALL[usize::from(digit - b'0')]);
        }
        Self::ALL.iter().copied().find(|code| code.as_str() == name)
    }
}

impl fmt::Display for RespCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response code plus the server's description, if it sent one
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseCode {
    code: RespCode,
    message: Option<String>,
}

impl ResponseCode {
    pub fn new(code: RespCode) -> Self {
        Self { code, message: None }
    }

    /// An `OtherError` carrying a server-supplied description
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            code: RespCode::OtherError,
            message: Some(message.into()),
        }
    }

    /// Map a `!` token to a response code.
    ///
    /// Canonical names and their numeric forms map directly. A kebab-case
    /// server error description (`default-container-unset`) becomes an
    /// `OtherError` carrying the text. Anything else is rejected.
    pub fn from_token(token: &str) -> ParseResult<Self> {
        if let Some(code) = RespCode::from_name(token) {
            return Ok(Self::new(code));
        }
        if is_error_description(token) {
            return Ok(Self::other(token));
        }
        Err(ParseError::UnknownResponseCode(token.to_string()))
    }

    pub fn code(&self) -> RespCode {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_okay(&self) -> bool {
        self.code == RespCode::Okay
    }
}

impl From<RespCode> for ResponseCode {
    fn from(code: RespCode) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}({})", self.code, message),
            None => write!(f, "{}", self.code),
        }
    }
}

fn is_error_description(token: &str) -> bool {
    token.contains('-')
        && !token.starts_with('-')
        && !token.ends_with('-')
        && token
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
