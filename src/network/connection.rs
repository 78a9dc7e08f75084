//! Blocking Connection
//!
//! Drives the read loop on the calling thread over any `Read + Write`
//! transport. Reads block until data, an error, or peer close.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};

use crate::actions::{self, DEFAULT_ENTITY};
use crate::config::Config;
use crate::error::{Result, SkyError};
use crate::protocol::{Element, Query};
use crate::record::{FromElement, ToArgument};

use super::driver::{DriveState, ReadDriver};

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Ready for the next request
    Ready,

    /// A fatal protocol error left the stream possibly misaligned.
    ///
    /// Bytes of the broken reply may still be in flight, so further
    /// requests are refused with `SkyError::Desynchronized`. Close it and
    /// reconnect.
    Desynchronized,

    /// The transport is gone; every call fails with `NotConnected`
    Closed,
}

/// A database connection over Skyhash
pub struct Connection<S = TcpStream> {
    /// Byte transport (TCP, or anything wrapping it)
    stream: S,

    /// Accumulation buffer and decoder policy
    driver: ReadDriver,

    /// Scratch space for a single transport read
    read_buf: Vec<u8>,

    /// Currently selected `keyspace:table`
    entity: String,

    state: ConnectionState,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection<TcpStream> {
    /// Open a TCP connection described by `config`
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let stream = TcpStream::connect(config.addr())?;
        stream.set_nodelay(config.nodelay)?;
        stream.set_read_timeout(config.read_timeout())?;
        stream.set_write_timeout(config.write_timeout())?;

        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| config.addr());
        tracing::debug!("Connected to {}", peer_addr);

        Ok(Self::new(stream, config).with_peer_addr(peer_addr))
    }

    /// Shut the socket down; later calls fail with `NotConnected`
    pub fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.mark_closed();
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl<S: Read + Write> Connection<S> {
    /// Wrap an already established transport
    pub fn new(stream: S, config: &Config) -> Self {
        Self {
            stream,
            driver: ReadDriver::new(config),
            read_buf: vec![0u8; config.read_chunk_size.max(1)],
            entity: DEFAULT_ENTITY.to_string(),
            state: ConnectionState::Ready,
            peer_addr: "unknown".to_string(),
        }
    }

    /// Label used in log lines
    pub fn with_peer_addr(mut self, peer_addr: impl Into<String>) -> Self {
        self.peer_addr = peer_addr.into();
        self
    }

    // =========================================================================
    // Core
    // =========================================================================

    /// Send a query and read back its response element
    pub fn run_query(&mut self, query: &Query) -> Result<Element> {
        let frame = query.encode()?;
        self.run(&frame)
    }

    /// Run a query and convert the response
    pub fn run_as<T: FromElement>(&mut self, query: &Query) -> Result<T> {
        T::from_element(self.run_query(query)?)
    }

    fn run(&mut self, frame: &[u8]) -> Result<Element> {
        match self.state {
            ConnectionState::Ready => {}
            ConnectionState::Desynchronized => return Err(SkyError::Desynchronized),
            ConnectionState::Closed => return Err(SkyError::NotConnected),
        }

        let result = self.exchange(frame);
        match &result {
            Ok(_) => self.state = ConnectionState::Ready,
            Err(SkyError::Parse(e)) => {
                tracing::warn!("Protocol error from {}: {}", self.peer_addr, e);
                self.state = ConnectionState::Desynchronized;
            }
            Err(e) if e.is_connection_error() => {
                tracing::debug!("Connection to {} lost: {}", self.peer_addr, e);
                self.mark_closed();
            }
            Err(_) => {}
        }
        result
    }

    fn exchange(&mut self, frame: &[u8]) -> Result<Element> {
        self.stream.write_all(frame).map_err(map_io_error)?;
        self.stream.flush().map_err(map_io_error)?;
        tracing::trace!("Sent {} bytes to {}", frame.len(), self.peer_addr);

        loop {
            let read = match self.stream.read(&mut self.read_buf) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io_error(e)),
            };

            match self.driver.advance(&self.read_buf[..read])? {
                DriveState::AwaitingData => continue,
                DriveState::FrameComplete(element) => return Ok(element),
            }
        }
    }

    fn mark_closed(&mut self) {
        self.state = ConnectionState::Closed;
        self.driver.reset();
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Get the value stored under `key`
    pub fn get<T: FromElement>(&mut self, key: impl AsRef<[u8]>) -> Result<T> {
        self.run_as(&actions::get(key))
    }

    /// Set `key` to `value`; the server refuses to overwrite
    pub fn set<V: ToArgument + ?Sized>(&mut self, key: impl AsRef<[u8]>, value: &V) -> Result<Element> {
        self.run_query(&actions::set(key, value)?)
    }

    /// Set or overwrite `key`
    pub fn update<V: ToArgument + ?Sized>(
        &mut self,
        key: impl AsRef<[u8]>,
        value: &V,
    ) -> Result<Element> {
        self.run_query(&actions::update(key, value)?)
    }

    pub fn del(&mut self, key: impl AsRef<[u8]>) -> Result<Element> {
        self.run_query(&actions::del(key))
    }

    /// Get and delete the value stored under `key`
    pub fn pop<T: FromElement>(&mut self, key: impl AsRef<[u8]>) -> Result<T> {
        self.run_as(&actions::pop(key))
    }

    /// Switch to `keyspace:table`; the entity is only recorded on `Okay`
    pub fn use_entity(&mut self, keyspace: &str, table: &str) -> Result<Element> {
        let response = self.run_query(&actions::use_entity(keyspace, table))?;
        if response.is_okay() {
            self.entity = actions::entity_name(keyspace, table);
        }
        Ok(response)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the connection can be handed to another caller
    pub fn is_healthy(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    pub fn is_connected(&self) -> bool {
        self.state != ConnectionState::Closed
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Bytes received but not consumed by a frame
    pub fn buffered(&self) -> usize {
        self.driver.buffered()
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Transport failures that mean the peer is gone surface as a reset
pub(crate) fn map_io_error(e: std::io::Error) -> SkyError {
    match e.kind() {
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => SkyError::ConnectionReset,
        _ => SkyError::Io(e),
    }
}
