//! Client configuration.

use crate::discovery::{COORDINATOR_PATH, META_REGION_PATH};
use std::time::Duration;

/// Tunables for a [`crate::Client`]. Construct with [`Config::default`]
/// and override only the fields that matter to you.
#[derive(Clone, Debug)]
pub struct Config {
    /// Identity presented in the connection preamble's `UserInformation`.
    pub effective_user: String,
    /// Coordination-service path at which the cluster coordinator
    /// publishes its address.
    pub coordinator_path: String,
    /// Coordination-service path at which the meta shard publishes its
    /// address.
    pub meta_region_path: String,
    /// Worker threads in the pool backing fan-out batch operations
    /// (`mget`, multi-row `put`).
    pub thread_pool_size: usize,
    /// Alternate per-connection worker pool sizing: thread count.
    pub num_threads_per_conn: usize,
    /// Max queued tasks per connection's worker pool before `submit`
    /// blocks.
    pub num_tasks_per_conn: usize,
    /// Rounds a fanned-out batch operation will retry rows that failed
    /// with a retryable (region) error before giving up on the
    /// remaining rows.
    pub fail_task_retry: usize,
    /// Upper bound on region-relocation retries for a single logical
    /// call, across both the data path and meta-shard lookups. An
    /// explicit bound is always required: the reference client's
    /// unbounded "sleep 3s and try again forever" loop is a livelock
    /// risk we don't carry forward.
    pub max_region_retries: usize,
    /// Retries against the coordination service while a node hasn't
    /// been published yet (cluster still electing/starting up).
    pub discovery_retries: usize,
    /// Deadline for a single socket read or write on a channel. A
    /// server that stops responding mid-call fails the call instead of
    /// hanging it forever.
    pub socket_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            effective_user: "shardkv-client".to_string(),
            coordinator_path: COORDINATOR_PATH.to_string(),
            meta_region_path: META_REGION_PATH.to_string(),
            thread_pool_size: 10,
            num_threads_per_conn: 5,
            num_tasks_per_conn: 100,
            fail_task_retry: 3,
            max_region_retries: 10,
            discovery_retries: 3,
            socket_timeout: Duration::from_secs(60),
        }
    }
}
