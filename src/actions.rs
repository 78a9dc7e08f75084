//! Action queries
//!
//! Builders for the per-verb queries the connections expose. Each verb is a
//! plain [`Query`]; running it is the connection's job.

use crate::error::Result;
use crate::protocol::Query;
use crate::record::ToArgument;

/// Entity selected on a fresh connection
pub const DEFAULT_ENTITY: &str = "default:default";

/// `GET <key>`
pub fn get(key: impl AsRef<[u8]>) -> Query {
    Query::new().arg("get").arg(key)
}

/// `SET <key> <value>`; fails server-side if the key exists
pub fn set<V: ToArgument + ?Sized>(key: impl AsRef<[u8]>, value: &V) -> Result<Query> {
    Ok(Query::new().arg("set").arg(key).arg(value.to_argument()?))
}

/// `USET <key> <value>`; sets or overwrites
pub fn update<V: ToArgument + ?Sized>(key: impl AsRef<[u8]>, value: &V) -> Result<Query> {
    Ok(Query::new().arg("uset").arg(key).arg(value.to_argument()?))
}

/// `DEL <key>`
pub fn del(key: impl AsRef<[u8]>) -> Query {
    Query::new().arg("del").arg(key)
}

/// `POP <key>`; get and delete
pub fn pop(key: impl AsRef<[u8]>) -> Query {
    Query::new().arg("pop").arg(key)
}

/// `USE <keyspace>:<table>`
pub fn use_entity(keyspace: &str, table: &str) -> Query {
    Query::new().arg("use").arg(entity_name(keyspace, table))
}

pub fn entity_name(keyspace: &str, table: &str) -> String {
    format!("{}:{}", keyspace, table)
}
