//! # Skyhash
//!
//! A client-side driver for the Skyhash wire protocol:
//! - Incremental frame decoder that tolerates arbitrary read boundaries
//! - Query encoder for flat, binary-safe argument lists
//! - Read-drive loop over blocking or async (tokio) transports
//! - Bounded connection pool
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Actions (get / set / update / del / pop / use)    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Query
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │        Connection / AsyncConnection  (checked out of Pool)   │
//! └──────────┬───────────────────────────────────┬──────────────┘
//!            │ encoded frame                     │ chunks read
//!            ▼                                   ▼
//!   ┌─────────────────┐                 ┌─────────────────┐
//!   │   Transport     │ ──── bytes ───▶ │  ReadDriver     │
//!   │ (TCP / wrapper) │                 │ (accum. buffer) │
//!   └─────────────────┘                 └────────┬────────┘
//!                                                │
//!                                                ▼
//!                                       ┌─────────────────┐
//!                                       │  Frame Codec    │
//!                                       │  → Element      │
//!                                       └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod actions;
pub mod record;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{SkyError, Result};
pub use config::Config;
pub use protocol::{Element, ParseError, Pipeline, Query, RespCode, ResponseCode};
pub use network::{Connection, Pool, PooledConnection};
#[cfg(feature = "async")]
pub use network::AsyncConnection;
pub use record::{Bincode, FromElement, ToArgument};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
