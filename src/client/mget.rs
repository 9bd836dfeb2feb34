//! Batched multi-row `get`, fanned out across a bounded number of
//! concurrent in-flight requests with retry rounds for keys that hit a
//! transient region error.

use super::get::{cells_to_row, split_column};
use super::Client;
use crate::error::ClientError;
use crate::filters::Filter;
use crate::pb;
use crate::row::Row;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::time::Duration;

const RETRY_PAUSE: Duration = Duration::from_secs(3);

fn columns_to_pb(columns: &[String]) -> Result<Vec<pb::Column>, ClientError> {
    let mut by_family: HashMap<Vec<u8>, Vec<Vec<u8>>> = HashMap::new();
    for column in columns {
        let (family, qualifier) = split_column(column)?;
        by_family.entry(family).or_default().push(qualifier);
    }
    Ok(by_family
        .into_iter()
        .map(|(family, qualifier)| pb::Column { family, qualifier })
        .collect())
}

impl Client {
    /// Fetches many rows concurrently, up to `thread_pool_size` requests
    /// in flight at once. Keys that fail with a retryable region error
    /// are retried as a group, up to `fail_task_retry` rounds, with a
    /// pause between rounds; keys still failing after that come back in
    /// `fails` rather than aborting the whole call. An empty `keys`
    /// returns `(empty map, empty vec)` without issuing any request.
    pub async fn mget(
        &self,
        table: &str,
        keys: &[Vec<u8>],
        columns: Option<&[String]>,
        filter: Option<&Filter>,
    ) -> Result<(HashMap<Vec<u8>, Option<Row>>, Vec<Vec<u8>>), ClientError> {
        if keys.is_empty() {
            return Ok((HashMap::new(), Vec::new()));
        }

        let column = match columns {
            Some(cols) => columns_to_pb(cols)?,
            None => Vec::new(),
        };

        let mut results = HashMap::new();
        let mut pending: Vec<Vec<u8>> = keys.to_vec();
        let mut round = 0;

        loop {
            let fetched = self.fetch_round(table, &pending, &column, filter).await;
            let mut next_round = Vec::new();
            for (key, outcome) in fetched {
                match outcome {
                    Ok(row) => {
                        results.insert(key, row);
                    }
                    Err(err) if err.as_region_kind().is_some() => {
                        self.region_manager.invalidate(table, &key).await;
                        next_round.push(key);
                    }
                    Err(err) => return Err(err),
                }
            }

            if next_round.is_empty() {
                return Ok((results, Vec::new()));
            }
            if round >= self.config.fail_task_retry {
                return Ok((results, next_round));
            }
            round += 1;
            tracing::warn!(round, remaining = next_round.len(), "retrying failed mget keys");
            tokio::time::sleep(RETRY_PAUSE).await;
            pending = next_round;
        }
    }

    async fn fetch_round(
        &self,
        table: &str,
        keys: &[Vec<u8>],
        column: &[pb::Column],
        filter: Option<&Filter>,
    ) -> Vec<(Vec<u8>, Result<Option<Row>, ClientError>)> {
        let filter_pb = filter.map(|f| f.to_pb());
        let concurrency = self.config.thread_pool_size.max(1);

        // One resolve-and-request attempt per key, no nested region-retry
        // loop: a region error here comes straight back to the caller,
        // which owns retrying the whole round after invalidating the
        // cache. Nesting `call_with_region_retry`'s own bounded loop in
        // here would let a single round burn through its full retry
        // budget before `fail_task_retry` ever saw a failure.
        stream::iter(keys.iter().cloned())
            .map(|key| {
                let column = column.to_vec();
                let filter_pb = filter_pb.clone();
                async move {
                    let outcome = self.fetch_one(table, &key, &column, filter_pb.as_ref()).await;
                    (key, outcome)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    async fn fetch_one(
        &self,
        table: &str,
        key: &[u8],
        column: &[pb::Column],
        filter_pb: Option<&pb::Filter>,
    ) -> Result<Option<Row>, ClientError> {
        let (region, service) = self.region_and_service(table, key, true).await?;
        let req = pb::GetRequest {
            region: Some(pb::RegionSpecifier::by_name(&region.name)),
            get: Some(pb::Get {
                row: key.to_vec(),
                column: column.to_vec(),
                filter: filter_pb.cloned(),
            }),
        };
        let resp: pb::GetResponse = service.request("Get", &req).await?;
        Ok(resp.result.map(|r| r.cell).and_then(cells_to_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_to_pb_groups_by_family() {
        let columns = vec!["cf:a".to_string(), "cf:b".to_string(), "other:c".to_string()];
        let pb_columns = columns_to_pb(&columns).unwrap();
        assert_eq!(pb_columns.len(), 2);
    }
}
