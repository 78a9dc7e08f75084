//! Connection Pool
//!
//! Shares a bounded set of physical connections between threads. A
//! connection is checked out for one request/response cycle at a time, so
//! there is never more than one in-flight request per connection.
//!
//! ## Concurrency Model
//! - Idle connections sit in a lock-free `ArrayQueue`
//! - The live count is guarded by a `parking_lot::Mutex`; waiters park on a
//!   `Condvar` until a connection is returned or discarded
//! - Unhealthy connections are dropped on return, never handed out again

use std::fmt;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::ops::{Deref, DerefMut};

use crossbeam::queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};

use crate::config::Config;
use crate::error::Result;

use super::connection::Connection;

type Connector<S> = Box<dyn Fn(&Config) -> Result<Connection<S>> + Send + Sync>;

/// A bounded pool of connections
pub struct Pool<S = TcpStream> {
    config: Config,

    /// Opens a new physical connection
    connector: Connector<S>,

    /// Connections ready to be checked out
    idle: ArrayQueue<Connection<S>>,

    /// Connections currently alive (idle + checked out)
    live: Mutex<usize>,

    /// Signalled whenever a connection is returned or discarded
    available: Condvar,
}

impl Pool<TcpStream> {
    /// Create a pool that opens TCP connections on demand
    pub fn new(config: Config) -> Result<Self> {
        Self::with_connector(config, Connection::connect)
    }
}

impl<S: Read + Write> Pool<S> {
    /// Create a pool using a custom connection factory
    pub fn with_connector<F>(config: Config, connector: F) -> Result<Self>
    where
        F: Fn(&Config) -> Result<Connection<S>> + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            idle: ArrayQueue::new(config.pool_size),
            connector: Box::new(connector),
            live: Mutex::new(0),
            available: Condvar::new(),
            config,
        })
    }

    /// Check out a connection, blocking while the pool is exhausted
    pub fn get(&self) -> Result<PooledConnection<'_, S>> {
        loop {
            if let Some(conn) = self.try_get()? {
                return Ok(conn);
            }
            let mut live = self.live.lock();
            // Re-check under the lock so a return between try_get and here
            // is not missed
            while *live >= self.config.pool_size && self.idle.is_empty() {
                tracing::trace!("Pool exhausted, waiting for a connection");
                self.available.wait(&mut live);
            }
        }
    }

    /// Check out a connection without blocking
    pub fn try_get(&self) -> Result<Option<PooledConnection<'_, S>>> {
        if let Some(conn) = self.idle.pop() {
            return Ok(Some(self.wrap(conn)));
        }

        {
            let mut live = self.live.lock();
            if *live >= self.config.pool_size {
                return Ok(None);
            }
            *live += 1;
        }

        match (self.connector)(&self.config) {
            Ok(conn) => {
                tracing::debug!("Pool opened connection to {}", conn.peer_addr());
                Ok(Some(self.wrap(conn)))
            }
            Err(e) => {
                self.release_slot();
                Err(e)
            }
        }
    }

    /// Connections alive right now (idle and checked out)
    pub fn live(&self) -> usize {
        *self.live.lock()
    }

    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn wrap(&self, conn: Connection<S>) -> PooledConnection<'_, S> {
        PooledConnection {
            pool: self,
            conn: Some(conn),
        }
    }

    fn put_back(&self, conn: Connection<S>) {
        if !conn.is_healthy() {
            tracing::debug!(
                "Discarding {:?} connection to {}",
                conn.state(),
                conn.peer_addr()
            );
            drop(conn);
            self.release_slot();
            return;
        }

        // The queue holds pool_size entries and live never exceeds that
        if let Err(conn) = self.idle.push(conn) {
            drop(conn);
            self.release_slot();
            return;
        }
        let _live = self.live.lock();
        self.available.notify_one();
    }

    fn release_slot(&self) {
        let mut live = self.live.lock();
        *live = live.saturating_sub(1);
        self.available.notify_one();
    }
}

impl<S> fmt::Debug for Pool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("addr", &self.config.addr())
            .field("pool_size", &self.config.pool_size)
            .field("idle", &self.idle.len())
            .finish()
    }
}

/// A connection checked out of a [`Pool`].
///
/// Dereferences to [`Connection`]; returned to the pool on drop, or
/// discarded if a fatal error left it unusable.
pub struct PooledConnection<'a, S: Read + Write = TcpStream> {
    pool: &'a Pool<S>,
    conn: Option<Connection<S>>,
}

impl<S: Read + Write> PooledConnection<'_, S> {
    /// Take the connection out of the pool for good
    pub fn detach(mut self) -> Option<Connection<S>> {
        let conn = self.conn.take();
        self.pool.release_slot();
        conn
    }
}

impl<S: Read + Write> Deref for PooledConnection<'_, S> {
    type Target = Connection<S>;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl<S: Read + Write> DerefMut for PooledConnection<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl<S: Read + Write> Drop for PooledConnection<'_, S> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(conn);
        }
    }
}
