//! The public client: connects to the cluster, routes requests to the
//! data shard currently owning a row's region, and retries on region
//! relocation.

mod admin_ops;
mod get;
mod mget;
mod mutate;
mod scan;

pub use scan::Scanner;

use crate::config::Config;
use crate::discovery::{EndpointResolver, NodeSource};
use crate::error::{ClientError, RequestError};
use crate::region::Region;
use crate::region_manager::RegionManager;
use crate::service::ServiceHandle;
use prost::Message;
use std::sync::Arc;
use std::time::Duration;

/// Pause between a region error and the re-route-and-retry it triggers.
const REGION_RETRY_PAUSE: Duration = Duration::from_secs(3);

/// A connected client. Cheap to share: wrap in `Arc` if you need to hand
/// it to multiple tasks (every internal handle is already
/// lock-protected).
pub struct Client {
    pub(crate) region_manager: RegionManager,
    pub(crate) coordinator: ServiceHandle,
    pub(crate) config: Config,
}

impl Client {
    /// Connects to the cluster. `source` is the caller's binding to the
    /// distributed lock service (see [`NodeSource`]).
    pub async fn connect(source: Arc<dyn NodeSource>, config: Config) -> Result<Self, ClientError> {
        let resolver = EndpointResolver::new(source, config.discovery_retries);
        let coordinator = ServiceHandle::coordinator(
            config.effective_user.clone(),
            resolver.clone(),
            config.coordinator_path.clone(),
            config.socket_timeout,
        );
        let meta = ServiceHandle::meta(
            config.effective_user.clone(),
            resolver,
            config.meta_region_path.clone(),
            config.socket_timeout,
        );
        let region_manager = RegionManager::new(
            meta,
            config.effective_user.clone(),
            config.max_region_retries,
            config.socket_timeout,
        );
        Ok(Client {
            region_manager,
            coordinator,
            config,
        })
    }

    pub async fn close(&self) {
        self.region_manager.close().await;
        self.coordinator.close().await;
    }

    async fn region_and_service(
        &self,
        table: &str,
        key: &[u8],
        use_cache: bool,
    ) -> Result<(Region, Arc<ServiceHandle>), ClientError> {
        let region = self.region_manager.get_region(table, key, use_cache).await?;
        let service = self.region_manager.get_service(&region).await;
        Ok((region, service))
    }

    /// Shared retry skeleton for every data-path operation: build a
    /// request against the currently-cached region, send it, and on a
    /// region-relocation error refresh the region (bypassing the cache)
    /// and retry, bounded by `config.max_region_retries`. Returns the
    /// region the call ultimately succeeded against along with the
    /// response, since a handful of callers (scan) need to keep routing
    /// against it afterwards.
    pub(crate) async fn region_call_with_retry<Req, Resp>(
        &self,
        table: &str,
        key: &[u8],
        method_name: &str,
        mut build_request: impl FnMut(&Region) -> Req,
    ) -> Result<(Region, Arc<ServiceHandle>, Resp), ClientError>
    where
        Req: Message,
        Resp: Message + Default,
    {
        let (mut region, mut service) = self.region_and_service(table, key, true).await?;
        let mut attempts = 0;

        loop {
            let request = build_request(&region);
            match service.request(method_name, &request).await {
                Ok(resp) => return Ok((region, service, resp)),
                Err(err) if err.as_region_kind().is_some() => {
                    if attempts >= self.config.max_region_retries {
                        return Err(RequestError::RegionRetriesExhausted { attempts }.into());
                    }
                    attempts += 1;
                    tracing::warn!(%table, attempts, "region error, refreshing route and retrying");
                    tokio::time::sleep(REGION_RETRY_PAUSE).await;
                    let (new_region, new_service) = self.region_and_service(table, key, false).await?;
                    region = new_region;
                    service = new_service;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub(crate) async fn call_with_region_retry<Req, Resp>(
        &self,
        table: &str,
        key: &[u8],
        method_name: &str,
        build_request: impl FnMut(&Region) -> Req,
    ) -> Result<Resp, ClientError>
    where
        Req: Message,
        Resp: Message + Default,
    {
        self.region_call_with_retry(table, key, method_name, build_request)
            .await
            .map(|(_, _, resp)| resp)
    }
}
