//! Protocol Module
//!
//! Defines the Skyhash wire protocol spoken with the server.
//!
//! The protocol is asymmetric: requests are flat lists of length-prefixed
//! byte strings, responses are typed, self-describing trees.
//!
//! ### Request Format
//! ```text
//! *1\n ~<argCount>\n { <len>\n <argBytes>\n }*
//! ```
//!
//! ### Response Format
//! ```text
//! *<datagroups>\n <tsymbol><element>
//! ```
//!
//! ### tsymbols
//! - `+`: String
//! - `:`: UnsignedInt64
//! - `&`: Array (recursive)
//! - `!`: RespCode
//! - `_`: FlatArray
//! - `?`: BinaryString
//! - `@`: TypedArray (followed by `+` or `?`)

mod codec;
mod element;
mod query;

pub use codec::{
    decode_response, ParseError, ParseResult, Parser, DEFAULT_MAX_DEPTH, SKYHASH_ARRAY,
    SKYHASH_BINARYSTRING, SKYHASH_FLATARRAY, SKYHASH_HEADER, SKYHASH_LINEFEED, SKYHASH_RESPCODE,
    SKYHASH_STRING, SKYHASH_TYPEDARRAY, SKYHASH_U64,
};
pub use element::{ArrayType, Element, RespCode, ResponseCode, TypedArray};
pub use query::{Pipeline, Query};
