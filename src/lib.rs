//! Native client for a distributed, sharded, wide-column store.
//!
//! Connects to a cluster coordinator and a metadata shard (discovered
//! through a pluggable [`NodeSource`]) to learn which data-shard server
//! currently owns each row's region, then routes point and batch
//! operations directly to that server over a multiplexed RPC channel.
//! Handles shard relocation transparently: a region-moved response
//! evicts the stale cache entry, re-resolves, and retries, bounded by
//! [`Config::max_region_retries`].
//!
//! ```no_run
//! # async fn run(source: std::sync::Arc<dyn shardkv_client::NodeSource>) -> Result<(), shardkv_client::ClientError> {
//! use shardkv_client::{Client, Config, Row};
//!
//! let client = Client::connect(source, Config::default()).await?;
//! let mut row = Row::new(b"row-1".to_vec());
//! row.set("cf:greeting", b"hello".to_vec());
//! client.put("ns:table", &row).await?;
//! let fetched = client.get("ns:table", b"row-1", None, None).await?;
//! assert!(fetched.is_some());
//! # Ok(())
//! # }
//! ```

mod client;
mod client_pool;
mod config;
mod discovery;
mod error;
mod filters;
mod frame;
mod pb;
mod pool;
mod region;
mod region_manager;
mod rpc;
mod row;
mod service;
#[cfg(test)]
mod test_support;
mod varint;

pub use client::{Client, Scanner};
pub use client_pool::ClientPool;
pub use config::Config;
pub use discovery::NodeSource;
pub use error::{
    ClientError, DiscoveryError, ProtocolError, RegionErrorKind, RequestError, TransportError,
    ValidationError,
};
pub use filters::{CompareType, Comparator, Filter};
pub use pool::WorkerPool;
pub use row::{ColumnFamilyDescriptor, Row};
