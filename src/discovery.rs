//! Endpoint resolution against the cluster's distributed lock service.
//!
//! The lock service itself (its wire protocol, session handshake, watch
//! mechanism) is an external collaborator this crate does not reimplement
//! — callers plug in a [`NodeSource`] that fetches the raw bytes stored at
//! a well-known path. What belongs to this crate is everything after
//! that: the byte-level layout those nodes use to publish a server
//! address, which we parse and validate ourselves.
//!
//! A node's payload is laid out as:
//! `(1B tag 0xFF)(4B BE meta_size)(meta_size B meta)(4B magic "PBUF")(MetaRegionServer)`.

use crate::error::DiscoveryError;
use crate::pb::MetaRegionServer;
use prost::Message;
use std::sync::Arc;
use std::time::Duration;

pub const COORDINATOR_PATH: &str = "/cluster/coordinator";
pub const META_REGION_PATH: &str = "/cluster/meta-region-server";

const TAG_BYTE: u8 = 0xff;
const MAGIC: &[u8; 4] = b"PBUF";
const MAX_META_SIZE: u32 = 65_000;
const RETRY_SLEEP: Duration = Duration::from_secs(3);

/// Fetches the raw bytes stored at a path in the lock service. The only
/// seam this module needs from the coordination layer; production
/// callers back this with a real client, tests with an in-memory double.
#[async_trait::async_trait]
pub trait NodeSource: Send + Sync {
    async fn get_node(&self, path: &str) -> Result<Vec<u8>, DiscoveryError>;
}

/// Resolves a well-known path to the `(host, port)` it currently
/// publishes, retrying while the node is absent (a coordinator or meta
/// shard that hasn't finished electing/registering yet).
#[derive(Clone)]
pub struct EndpointResolver {
    source: Arc<dyn NodeSource>,
    max_retries: usize,
}

impl EndpointResolver {
    pub fn new(source: Arc<dyn NodeSource>, max_retries: usize) -> Self {
        EndpointResolver { source, max_retries }
    }

    #[tracing::instrument(skip(self), fields(%path))]
    pub async fn resolve(&self, path: &str) -> Result<(String, u16), DiscoveryError> {
        let mut attempt = 0;
        loop {
            match self.source.get_node(path).await {
                Ok(bytes) => return parse_meta_region_server(&bytes),
                Err(DiscoveryError::NodeNotPresent(_)) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(attempt, "node not present yet, retrying");
                    tokio::time::sleep(RETRY_SLEEP).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn parse_meta_region_server(response: &[u8]) -> Result<(String, u16), DiscoveryError> {
    if response.len() < 5 {
        return Err(DiscoveryError::Protocol {
            path: String::new(),
            reason: format!("response too short: {} bytes", response.len()),
        });
    }

    let tag = response[0];
    if tag != TAG_BYTE {
        return Err(DiscoveryError::Protocol {
            path: String::new(),
            reason: format!("expected tag byte 0xFF, got {tag:#x}"),
        });
    }
    let meta_size = u32::from_be_bytes(response[1..5].try_into().unwrap());
    if meta_size == 0 || meta_size > MAX_META_SIZE {
        return Err(DiscoveryError::Protocol {
            path: String::new(),
            reason: format!("invalid meta size {meta_size}"),
        });
    }

    let magic_start = 5 + meta_size as usize;
    let magic_end = magic_start + 4;
    if response.len() < magic_end {
        return Err(DiscoveryError::Protocol {
            path: String::new(),
            reason: "response truncated before magic bytes".to_string(),
        });
    }
    if &response[magic_start..magic_end] != MAGIC {
        return Err(DiscoveryError::Protocol {
            path: String::new(),
            reason: format!("expected magic {MAGIC:?}, got {:?}", &response[magic_start..magic_end]),
        });
    }

    let meta = MetaRegionServer::decode(&response[magic_end..]).map_err(|source| {
        DiscoveryError::Protocol {
            path: String::new(),
            reason: format!("failed to decode MetaRegionServer: {source}"),
        }
    })?;

    let server = meta.server.ok_or_else(|| DiscoveryError::Protocol {
        path: String::new(),
        reason: "MetaRegionServer response had no server field".to_string(),
    })?;
    let port = server.port.unwrap_or(0) as u16;
    Ok((server.host_name, port))
}
