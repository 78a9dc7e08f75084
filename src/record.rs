//! Record mapping
//!
//! Conversions between user values and the payloads carried by queries and
//! responses. A type opts in by implementing [`FromElement`] (response side)
//! and/or [`ToArgument`] (request side). Any serde type can be carried as a
//! binary payload through [`Bincode`].

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SkyError};
use crate::protocol::{Element, RespCode, ResponseCode, TypedArray};

/// Build a value from a decoded response element
pub trait FromElement: Sized {
    fn from_element(element: Element) -> Result<Self>;
}

/// Turn a value into one query argument
pub trait ToArgument {
    fn to_argument(&self) -> Result<Vec<u8>>;
}

/// Error for an element that cannot become the requested type.
///
/// A response code other than `Okay` is reported as the server's answer
/// rather than as a type mismatch.
fn mismatch(element: Element, expected: &str) -> SkyError {
    match element {
        Element::RespCode(code) if !code.is_okay() => SkyError::Response(code),
        other => SkyError::UnexpectedResponse(format!(
            "expected {}, got {}",
            expected,
            other.type_name()
        )),
    }
}

// =============================================================================
// FromElement
// =============================================================================

impl FromElement for Element {
    fn from_element(element: Element) -> Result<Self> {
        Ok(element)
    }
}

impl FromElement for ResponseCode {
    fn from_element(element: Element) -> Result<Self> {
        match element {
            Element::RespCode(code) => Ok(code),
            other => Err(mismatch(other, "response code")),
        }
    }
}

impl FromElement for String {
    fn from_element(element: Element) -> Result<Self> {
        match element {
            Element::String(s) => Ok(s),
            Element::BinaryString(bytes) => {
                String::from_utf8(bytes).map_err(|e| SkyError::Serialization(e.to_string()))
            }
            Element::UnsignedInt64(n) => Ok(n.to_string()),
            other => Err(mismatch(other, "string")),
        }
    }
}

impl FromElement for Vec<u8> {
    fn from_element(element: Element) -> Result<Self> {
        match element {
            Element::BinaryString(bytes) => Ok(bytes),
            Element::String(s) => Ok(s.into_bytes()),
            other => Err(mismatch(other, "binary string")),
        }
    }
}

impl FromElement for u64 {
    fn from_element(element: Element) -> Result<Self> {
        match element {
            Element::UnsignedInt64(n) => Ok(n),
            // Values stored through `set` come back as strings
            Element::String(ref s) => s
                .parse()
                .map_err(|_| mismatch(element.clone(), "u64")),
            other => Err(mismatch(other, "u64")),
        }
    }
}

impl FromElement for Vec<String> {
    fn from_element(element: Element) -> Result<Self> {
        match element {
            Element::FlatArray(strings) | Element::TypedArray(TypedArray::String(strings)) => {
                Ok(strings)
            }
            Element::Array(elements) => elements.into_iter().map(String::from_element).collect(),
            other => Err(mismatch(other, "string array")),
        }
    }
}

impl<T: FromElement> FromElement for Option<T> {
    /// `NotFound` becomes `None`
    fn from_element(element: Element) -> Result<Self> {
        match element {
            Element::RespCode(ref code) if code.code() == RespCode::NotFound => Ok(None),
            other => T::from_element(other).map(Some),
        }
    }
}

// =============================================================================
// ToArgument
// =============================================================================

impl ToArgument for str {
    fn to_argument(&self) -> Result<Vec<u8>> {
        Ok(self.as_bytes().to_vec())
    }
}

impl ToArgument for String {
    fn to_argument(&self) -> Result<Vec<u8>> {
        Ok(self.as_bytes().to_vec())
    }
}

impl ToArgument for [u8] {
    fn to_argument(&self) -> Result<Vec<u8>> {
        Ok(self.to_vec())
    }
}

impl ToArgument for Vec<u8> {
    fn to_argument(&self) -> Result<Vec<u8>> {
        Ok(self.clone())
    }
}

impl ToArgument for u64 {
    fn to_argument(&self) -> Result<Vec<u8>> {
        Ok(self.to_string().into_bytes())
    }
}

impl<T: ToArgument + ?Sized> ToArgument for &T {
    fn to_argument(&self) -> Result<Vec<u8>> {
        (**self).to_argument()
    }
}

// =============================================================================
// Bincode records
// =============================================================================

/// A serde value carried as a bincode-encoded binary payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bincode<T>(pub T);

impl<T> Bincode<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize> ToArgument for Bincode<T> {
    fn to_argument(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.0).map_err(|e| SkyError::Serialization(e.to_string()))
    }
}

impl<T: DeserializeOwned> FromElement for Bincode<T> {
    fn from_element(element: Element) -> Result<Self> {
        let bytes = match element {
            Element::BinaryString(bytes) => bytes,
            Element::String(s) => s.into_bytes(),
            other => return Err(mismatch(other, "binary record")),
        };
        bincode::deserialize(&bytes)
            .map(Bincode)
            .map_err(|e| SkyError::Serialization(e.to_string()))
    }
}
