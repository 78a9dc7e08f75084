//! Query definitions
//!
//! Requests are flat lists of byte-string arguments. Arguments are never
//! tagged with a type; the server decides how to interpret them.
//!
//! ## Request Format
//! ```text
//! *1\n ~<argCount>\n { <len>\n <argBytes>\n }*
//! ```

use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SkyError};

/// A single simple query.
///
/// Encoding borrows the query, so a frame is always built from one fixed
/// argument list. The returned `Bytes` is an owned snapshot: pushing more
/// arguments afterwards only affects frames encoded later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Number of arguments pushed so far
    size_count: usize,

    /// Already length-prefixed arguments: `<len>\n<bytes>\n` each
    holding_buffer: BytesMut,
}

impl Query {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an argument into the query.
    ///
    /// Frames already produced by [`Query::encode`] are not changed.
    pub fn push(&mut self, argument: impl AsRef<[u8]>) -> &mut Self {
        let argument = argument.as_ref();
        put_length_line(&mut self.holding_buffer, argument.len());
        self.holding_buffer.put_slice(argument);
        self.holding_buffer.put_u8(b'\n');
        self.size_count += 1;
        self
    }

    /// Builder-style [`Query::push`]
    pub fn arg(mut self, argument: impl AsRef<[u8]>) -> Self {
        self.push(argument);
        self
    }

    pub fn argument_count(&self) -> usize {
        self.size_count
    }

    pub fn is_empty(&self) -> bool {
        self.size_count == 0
    }

    /// Append the full frame (`*1\n` + datagroup) to `buffer`
    pub fn encode_into(&self, buffer: &mut BytesMut) -> Result<()> {
        self.ensure_not_empty()?;
        buffer.reserve(self.encoded_len());
        buffer.put_slice(b"*1\n");
        self.encode_datagroup_into(buffer);
        Ok(())
    }

    /// Serialize the full frame into a fresh buffer
    pub fn encode(&self) -> Result<Bytes> {
        let mut buffer = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buffer)?;
        Ok(buffer.freeze())
    }

    /// Write the full frame to a transport in one go
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let frame = self.encode()?;
        writer.write_all(&frame)?;
        writer.flush()?;
        Ok(())
    }

    /// Append `~<argCount>\n` and the arguments, without a metaframe
    pub(crate) fn encode_datagroup_into(&self, buffer: &mut BytesMut) {
        buffer.put_u8(b'~');
        put_length_line(buffer, self.size_count);
        buffer.put_slice(&self.holding_buffer);
    }

    fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(SkyError::EmptyQuery);
        }
        Ok(())
    }

    /// Upper bound used to reserve space before encoding
    fn encoded_len(&self) -> usize {
        // "*1\n" + "~" + digits + "\n"
        3 + 1 + 20 + 1 + self.holding_buffer.len()
    }
}

impl<A: AsRef<[u8]>> Extend<A> for Query {
    fn extend<I: IntoIterator<Item = A>>(&mut self, iter: I) {
        for argument in iter {
            self.push(argument);
        }
    }
}

impl<A: AsRef<[u8]>> FromIterator<A> for Query {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        let mut query = Query::new();
        query.extend(iter);
        query
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Several queries batched into one request frame.
///
/// Only the request side is batched: the server answers a pipeline with one
/// datagroup per query, and multi-datagroup responses are not decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    queries: Vec<Query>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a query to the pipeline
    pub fn push(&mut self, query: Query) -> &mut Self {
        self.queries.push(query);
        self
    }

    /// Builder-style [`Pipeline::push`]
    pub fn add(mut self, query: Query) -> Self {
        self.queries.push(query);
        self
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Append `*<n>\n` followed by every query's datagroup
    pub fn encode_into(&self, buffer: &mut BytesMut) -> Result<()> {
        if self.queries.is_empty() {
            return Err(SkyError::EmptyPipeline);
        }
        if self.queries.iter().any(Query::is_empty) {
            return Err(SkyError::EmptyQuery);
        }
        buffer.put_u8(b'*');
        put_length_line(buffer, self.queries.len());
        for query in &self.queries {
            query.encode_datagroup_into(buffer);
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Bytes> {
        let mut buffer = BytesMut::new();
        self.encode_into(&mut buffer)?;
        Ok(buffer.freeze())
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let frame = self.encode()?;
        writer.write_all(&frame)?;
        writer.flush()?;
        Ok(())
    }
}

impl FromIterator<Query> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Query>>(iter: I) -> Self {
        Self {
            queries: iter.into_iter().collect(),
        }
    }
}

fn put_length_line(buffer: &mut BytesMut, len: usize) {
    buffer.put_slice(len.to_string().as_bytes());
    buffer.put_u8(b'\n');
}
