//! A bounded pool of connected clients: `acquire` hands out an idle one
//! or connects a fresh one, `release` returns it to the pool instead of
//! tearing the connection down — until the pool is full, at which point
//! the returned client is simply closed.

use crate::client::Client;
use crate::config::Config;
use crate::discovery::NodeSource;
use crate::error::ClientError;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct ClientPool {
    source: Arc<dyn NodeSource>,
    config: Config,
    max_size: usize,
    idle: Mutex<VecDeque<Client>>,
}

impl ClientPool {
    pub fn new(source: Arc<dyn NodeSource>, config: Config, max_size: usize) -> Self {
        ClientPool {
            source,
            config,
            max_size,
            idle: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns an idle pooled client if one is available, otherwise
    /// connects a new one.
    pub async fn acquire(&self) -> Result<Client, ClientError> {
        if let Some(client) = self.idle.lock().await.pop_front() {
            return Ok(client);
        }
        Client::connect(self.source.clone(), self.config.clone()).await
    }

    /// Returns `client` to the pool, or closes it if the pool is
    /// already at `max_size`.
    pub async fn release(&self, client: Client) {
        let mut idle = self.idle.lock().await;
        if idle.len() < self.max_size {
            idle.push_back(client);
        } else {
            drop(idle);
            client.close().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.idle.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiscoveryError;

    struct NeverSource;

    #[async_trait::async_trait]
    impl NodeSource for NeverSource {
        async fn get_node(&self, path: &str) -> Result<Vec<u8>, DiscoveryError> {
            Err(DiscoveryError::NodeNotPresent(path.to_string()))
        }
    }

    #[tokio::test]
    async fn acquire_on_empty_pool_does_not_reuse_anything() {
        let pool = ClientPool::new(Arc::new(NeverSource), Config::default(), 2);
        assert_eq!(pool.len().await, 0);
    }
}
