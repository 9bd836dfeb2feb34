//! Owns the region cache and the pool of data-shard service handles.
//!
//! Mirrors the reference client's `RegionManager`: one lock guarding both
//! the interval cache and the `(host, port) -> handle` map, a cache-miss
//! path that issues a one-row reverse scan against the meta shard, and a
//! bounded retry loop around that scan for the case where the meta shard
//! itself is mid-relocation.

use crate::error::{ClientError, ProtocolError, RequestError};
use crate::pb;
use crate::region::{self, Region, RegionCache};
use crate::service::ServiceHandle;
use prost::Message;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Fixed name of the single region holding the cluster's routing table.
const META_REGION_NAME: &[u8] = b"system:meta,,1";
const META_LOOKUP_RETRY_PAUSE: Duration = Duration::from_secs(3);

struct Inner {
    cache: RegionCache,
    data_shards: HashMap<(String, u16), Arc<ServiceHandle>>,
}

pub struct RegionManager {
    meta: ServiceHandle,
    effective_user: String,
    max_region_retries: usize,
    socket_timeout: Duration,
    inner: Mutex<Inner>,
}

impl RegionManager {
    pub fn new(
        meta: ServiceHandle,
        effective_user: String,
        max_region_retries: usize,
        socket_timeout: Duration,
    ) -> Self {
        RegionManager {
            meta,
            effective_user,
            max_region_retries,
            socket_timeout,
            inner: Mutex::new(Inner {
                cache: RegionCache::new(),
                data_shards: HashMap::new(),
            }),
        }
    }

    pub async fn close(&self) {
        self.meta.close().await;
        let mut inner = self.inner.lock().await;
        for (_, handle) in inner.data_shards.drain() {
            handle.close().await;
        }
    }

    /// Finds the region owning `(table, key)`, consulting the cache
    /// first unless `use_cache` is false.
    #[tracing::instrument(skip(self, key), fields(%table, use_cache))]
    pub async fn get_region(
        &self,
        table: &str,
        key: &[u8],
        use_cache: bool,
    ) -> Result<Region, ClientError> {
        let probe = region::probe_key(table, key);

        if use_cache {
            let inner = self.inner.lock().await;
            if let Some(region) = inner.cache.find(&probe) {
                return Ok(region.clone());
            }
        } else {
            let mut inner = self.inner.lock().await;
            inner.cache.remove_containing(&probe);
        }

        let region = self.lookup_region(table, key).await?;
        self.inner.lock().await.cache.insert(region.clone());
        Ok(region)
    }

    /// Evicts whatever cached region currently claims `(table, key)`,
    /// called after a data shard reports it no longer owns that range.
    pub async fn invalidate(&self, table: &str, key: &[u8]) {
        let probe = region::probe_key(table, key);
        self.inner.lock().await.cache.remove_containing(&probe);
    }

    /// Returns the (possibly newly built) handle for the data shard
    /// hosting `region`.
    pub async fn get_service(&self, region: &Region) -> Arc<ServiceHandle> {
        let key = (region.host.clone(), region.port);
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.data_shards.get(&key) {
            return handle.clone();
        }
        let handle = Arc::new(ServiceHandle::data_shard(
            self.effective_user.clone(),
            region.host.clone(),
            region.port,
            self.socket_timeout,
        ));
        inner.data_shards.insert(key, handle.clone());
        handle
    }

    async fn lookup_region(&self, table: &str, key: &[u8]) -> Result<Region, ClientError> {
        let req = pb::ScanRequest {
            region: Some(pb::RegionSpecifier::by_name(META_REGION_NAME)),
            scan: Some(pb::Scan {
                column: vec![pb::Column {
                    family: b"info".to_vec(),
                    qualifier: vec![],
                }],
                start_row: Some(region::meta_scan_start_row(table, key)),
                stop_row: None,
                filter: None,
                reversed: Some(true),
            }),
            scanner_id: None,
            number_of_rows: Some(1),
            close_scanner: None,
        };

        let resp: pb::ScanResponse = self.scan_meta_with_retry(&req).await?;
        let cells = resp
            .results
            .into_iter()
            .next()
            .map(|r| r.cell)
            .unwrap_or_default();
        if cells.is_empty() {
            return Err(RequestError::RegionLookupFailed(format!(
                "meta shard has no route for table '{table}'"
            ))
            .into());
        }

        decode_region_row(&cells)
    }

    /// The meta shard is itself a region and can be mid-move; retry the
    /// scan a bounded number of times rather than looping forever.
    async fn scan_meta_with_retry(&self, req: &pb::ScanRequest) -> Result<pb::ScanResponse, ClientError> {
        let mut attempts = 0;
        loop {
            match self.meta.request("Scan", req).await {
                Ok(resp) => return Ok(resp),
                Err(err) if err.as_region_kind().is_some() => {
                    if attempts >= self.max_region_retries {
                        return Err(RequestError::RegionRetriesExhausted { attempts }.into());
                    }
                    attempts += 1;
                    tracing::warn!(attempts, "meta shard region error, retrying");
                    tokio::time::sleep(META_LOOKUP_RETRY_PAUSE).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn decode_region_row(cells: &[pb::Cell]) -> Result<Region, ClientError> {
    let region_name = cells[0].row.clone();
    let mut server_info: Option<String> = None;
    let mut region_info: Option<pb::RegionInfo> = None;

    for cell in cells {
        match cell.qualifier.as_slice() {
            b"server" => {
                server_info = Some(String::from_utf8_lossy(&cell.value).into_owned());
            }
            b"regioninfo" => {
                if cell.value.len() < 8 || &cell.value[..4] != b"PBUF" {
                    return Err(ProtocolError::BadMagic {
                        expected: b"PBUF",
                        actual: cell.value.get(..4).unwrap_or(&cell.value).to_vec(),
                    }
                    .into());
                }
                let body = &cell.value[4..cell.value.len() - 4];
                region_info = Some(pb::RegionInfo::decode(body).map_err(ProtocolError::from)?);
            }
            _ => {}
        }
    }

    let server_info =
        server_info.ok_or(ProtocolError::Other("meta row missing server info"))?;
    let region_info =
        region_info.ok_or(ProtocolError::Other("meta row missing region info"))?;
    let table_name = region_info
        .table_name
        .ok_or(ProtocolError::Other("region info missing table name"))?;

    let (host, port_str) = server_info
        .rsplit_once(':')
        .ok_or(ProtocolError::Other("malformed server info"))?;
    let port: u16 = port_str
        .parse()
        .map_err(|_| ProtocolError::Other("malformed server info port"))?;

    let table = format!(
        "{}:{}",
        String::from_utf8_lossy(&table_name.namespace),
        String::from_utf8_lossy(&table_name.qualifier)
    );

    Ok(Region::new(
        region_name,
        table,
        region_info.start_key.unwrap_or_default(),
        region_info.end_key.unwrap_or_default(),
        host.to_string(),
        port,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use bytes::BytesMut;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    fn meta_row_cells(region_name: &[u8], table: &str, host_port: &str) -> Vec<pb::Cell> {
        let (namespace, qualifier) = table.split_once(':').unwrap();
        let region_info = pb::RegionInfo {
            region_id: 1,
            table_name: Some(pb::TableName {
                namespace: namespace.as_bytes().to_vec(),
                qualifier: qualifier.as_bytes().to_vec(),
            }),
            start_key: Some(b"".to_vec()),
            end_key: Some(b"".to_vec()),
            offline: Some(false),
            split: Some(false),
        };
        let mut encoded = BytesMut::new();
        region_info.encode(&mut encoded).unwrap();
        let mut regioninfo_value = BytesMut::new();
        regioninfo_value.extend_from_slice(b"PBUF");
        regioninfo_value.extend_from_slice(&encoded);
        regioninfo_value.extend_from_slice(&[0u8; 4]);

        vec![
            pb::Cell {
                row: region_name.to_vec(),
                family: b"info".to_vec(),
                qualifier: b"server".to_vec(),
                timestamp: None,
                value: host_port.as_bytes().to_vec(),
            },
            pb::Cell {
                row: region_name.to_vec(),
                family: b"info".to_vec(),
                qualifier: b"regioninfo".to_vec(),
                timestamp: None,
                value: regioninfo_value.to_vec(),
            },
        ]
    }

    /// A cache miss triggers a meta-shard reverse scan; a second lookup
    /// for the same row is served from the cache without another scan.
    #[tokio::test]
    async fn get_region_resolves_on_miss_and_caches_the_result() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock meta shard");
        let addr = listener.local_addr().expect("local addr");
        let scan_requests = Arc::new(AtomicUsize::new(0));
        let counted = scan_requests.clone();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept connection");
            test_support::read_preamble(&mut stream).await;
            loop {
                let Some(frame) = test_support::read_frame(&mut stream).await else {
                    break;
                };
                let req = test_support::decode_request(&frame);
                assert_eq!(req.method_name, "Scan");
                counted.fetch_add(1, Ordering::SeqCst);
                let cells = meta_row_cells(b"ns:t1,,1.abc.", "ns:t1", "data-host:9100");
                let body = test_support::encode_ok_response(
                    req.call_id,
                    &pb::ScanResponse {
                        scanner_id: None,
                        results: vec![pb::ResultPb { cell: cells }],
                        more_results: Some(false),
                        more_results_in_region: Some(false),
                    },
                );
                test_support::write_frame(&mut stream, &body).await;
            }
        });

        let meta = ServiceHandle::data_shard(
            "test-user".to_string(),
            addr.ip().to_string(),
            addr.port(),
            Duration::from_secs(5),
        );
        let manager = RegionManager::new(meta, "test-user".to_string(), 2, Duration::from_secs(5));

        let region = manager.get_region("ns:t1", b"row-1", true).await.expect("resolves region");
        assert_eq!(region.host, "data-host");
        assert_eq!(region.port, 9100);
        assert_eq!(region.table, "ns:t1");

        let cached = manager.get_region("ns:t1", b"row-1", true).await.expect("cache hit");
        assert_eq!(cached.host, "data-host");
        assert_eq!(scan_requests.load(Ordering::SeqCst), 1, "second lookup served from cache");
    }

    /// Bypassing the cache (`use_cache = false`) evicts the current entry
    /// and re-resolves even when one is already held.
    #[tokio::test]
    async fn get_region_with_cache_disabled_forces_a_fresh_lookup() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock meta shard");
        let addr = listener.local_addr().expect("local addr");
        let scan_requests = Arc::new(AtomicUsize::new(0));
        let counted = scan_requests.clone();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept connection");
            test_support::read_preamble(&mut stream).await;
            loop {
                let Some(frame) = test_support::read_frame(&mut stream).await else {
                    break;
                };
                let req = test_support::decode_request(&frame);
                counted.fetch_add(1, Ordering::SeqCst);
                let cells = meta_row_cells(b"ns:t1,,1.abc.", "ns:t1", "data-host:9100");
                let body = test_support::encode_ok_response(
                    req.call_id,
                    &pb::ScanResponse {
                        scanner_id: None,
                        results: vec![pb::ResultPb { cell: cells }],
                        more_results: Some(false),
                        more_results_in_region: Some(false),
                    },
                );
                test_support::write_frame(&mut stream, &body).await;
            }
        });

        let meta = ServiceHandle::data_shard(
            "test-user".to_string(),
            addr.ip().to_string(),
            addr.port(),
            Duration::from_secs(5),
        );
        let manager = RegionManager::new(meta, "test-user".to_string(), 2, Duration::from_secs(5));

        manager.get_region("ns:t1", b"row-1", true).await.expect("first resolve");
        manager.get_region("ns:t1", b"row-1", false).await.expect("forced fresh lookup");
        assert_eq!(scan_requests.load(Ordering::SeqCst), 2, "cache bypass re-scans meta");
    }
}
