//! Async Connection
//!
//! The same read loop as [`Connection`](super::Connection), driven by an
//! event loop: the task suspends at the transport read and resumes when
//! bytes arrive. Ordering and error semantics are identical.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::actions::{self, DEFAULT_ENTITY};
use crate::config::Config;
use crate::error::{Result, SkyError};
use crate::protocol::{Element, Query};
use crate::record::{FromElement, ToArgument};

use super::connection::{map_io_error, ConnectionState};
use super::driver::{DriveState, ReadDriver};

/// A database connection over Skyhash, driven by tokio
pub struct AsyncConnection<S = TcpStream> {
    stream: S,
    driver: ReadDriver,
    read_buf: Vec<u8>,
    entity: String,
    state: ConnectionState,
    peer_addr: String,
}

impl AsyncConnection<TcpStream> {
    /// Open a TCP connection described by `config`
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let stream = TcpStream::connect(config.addr()).await?;
        stream.set_nodelay(config.nodelay)?;

        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| config.addr());
        tracing::debug!("Connected to {}", peer_addr);

        Ok(Self::new(stream, config).with_peer_addr(peer_addr))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncConnection<S> {
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

    pub fn with_peer_addr(mut self, peer_addr: impl Into<String>) -> Self {
        self.peer_addr = peer_addr.into();
        self
    }

    /// Send a query and read back its response element
    pub async fn run_query(&mut self, query: &Query) -> Result<Element> {
        let frame = query.encode()?;
        self.run(&frame).await
    }

    pub async fn run_as<T: FromElement>(&mut self, query: &Query) -> Result<T> {
        T::from_element(self.run_query(query).await?)
    }

    async fn run(&mut self, frame: &[u8]) -> Result<Element> {
        match self.state {
            ConnectionState::Ready => {}
            ConnectionState::Desynchronized => return Err(SkyError::Desynchronized),
            ConnectionState::Closed => return Err(SkyError::NotConnected),
        }

        let result = self.exchange(frame).await;
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

    async fn exchange(&mut self, frame: &[u8]) -> Result<Element> {
        self.stream.write_all(frame).await.map_err(map_io_error)?;
        self.stream.flush().await.map_err(map_io_error)?;
        tracing::trace!("Sent {} bytes to {}", frame.len(), self.peer_addr);

        loop {
            let read = match self.stream.read(&mut self.read_buf).await {
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

    /// Shut the transport down; later calls fail with `NotConnected`
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.mark_closed();
        match self.stream.shutdown().await {
            Err(e) if e.kind() != ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn mark_closed(&mut self) {
        self.state = ConnectionState::Closed;
        self.driver.reset();
    }

    // =========================================================================
    // Actions
    // =========================================================================

    pub async fn get<T: FromElement>(&mut self, key: impl AsRef<[u8]>) -> Result<T> {
        self.run_as(&actions::get(key)).await
    }

    pub async fn set<V: ToArgument + ?Sized>(
        &mut self,
        key: impl AsRef<[u8]>,
        value: &V,
    ) -> Result<Element> {
        let query = actions::set(key, value)?;
        self.run_query(&query).await
    }

    pub async fn update<V: ToArgument + ?Sized>(
        &mut self,
        key: impl AsRef<[u8]>,
        value: &V,
    ) -> Result<Element> {
        let query = actions::update(key, value)?;
        self.run_query(&query).await
    }

    pub async fn del(&mut self, key: impl AsRef<[u8]>) -> Result<Element> {
        self.run_query(&actions::del(key)).await
    }

    pub async fn pop<T: FromElement>(&mut self, key: impl AsRef<[u8]>) -> Result<T> {
        self.run_as(&actions::pop(key)).await
    }

    /// Switch to `keyspace:table`; the entity is only recorded on `Okay`
    pub async fn use_entity(&mut self, keyspace: &str, table: &str) -> Result<Element> {
        let response = self.run_query(&actions::use_entity(keyspace, table)).await?;
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

    pub fn is_healthy(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    pub fn is_connected(&self) -> bool {
        self.state != ConnectionState::Closed
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn buffered(&self) -> usize {
        self.driver.buffered()
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}
