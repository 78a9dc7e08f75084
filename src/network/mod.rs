//! Network Module
//!
//! Transports and the loop that turns bytes into response elements.
//!
//! ## Architecture
//! - `ReadDriver`: transport-free state machine over the accumulation buffer
//! - `Connection`: blocking driver (one thread per in-flight request)
//! - `AsyncConnection`: cooperative driver on tokio (feature `async`)
//! - `Pool`: bounded checkout/return of blocking connections
//!
//! A connection, its buffer and its cursor are owned by whoever is driving
//! it; no locks are taken on the request path.

mod connection;
mod driver;
mod pool;
#[cfg(feature = "async")]
mod async_connection;

pub use connection::{Connection, ConnectionState};
pub use driver::{DriveState, ReadDriver};
pub use pool::{Pool, PooledConnection};
#[cfg(feature = "async")]
pub use async_connection::AsyncConnection;
