//! Namespace and table lifecycle, issued directly against the cluster
//! coordinator rather than through the region-retry path — these calls
//! aren't addressed to a region at all.

use super::Client;
use crate::error::{ClientError, RequestError};
use crate::pb;
use crate::row::ColumnFamilyDescriptor;
use exponential_backoff::Backoff;
use std::time::Duration;

fn table_name(table: &str) -> pb::TableName {
    match table.split_once(':') {
        Some((namespace, qualifier)) => pb::TableName {
            namespace: namespace.as_bytes().to_vec(),
            qualifier: qualifier.as_bytes().to_vec(),
        },
        None => pb::TableName {
            namespace: b"default".to_vec(),
            qualifier: table.as_bytes().to_vec(),
        },
    }
}

impl Client {
    /// Lists every namespace known to the cluster.
    pub async fn namespaces(&self) -> Result<Vec<String>, ClientError> {
        let resp: pb::ListNamespaceDescriptorsResponse = self
            .coordinator
            .request("ListNamespaceDescriptors", &pb::Empty {})
            .await?;
        Ok(resp
            .namespace_descriptor
            .into_iter()
            .map(|ns| ns.name)
            .collect())
    }

    /// Creates a namespace with no configuration attributes.
    pub async fn create_namespace(&self, name: &str) -> Result<(), ClientError> {
        let req = pb::CreateNamespaceRequest {
            namespace_descriptor: Some(pb::NamespaceDescriptor {
                name: name.to_string(),
                configuration: Vec::new(),
            }),
        };
        let _: pb::Empty = self.coordinator.request("CreateNamespace", &req).await?;
        Ok(())
    }

    pub async fn delete_namespace(&self, name: &str) -> Result<(), ClientError> {
        let req = pb::DeleteNamespaceRequest {
            namespace_name: name.to_string(),
        };
        let _: pb::Empty = self.coordinator.request("DeleteNamespace", &req).await?;
        Ok(())
    }

    /// Creates `table` with the given column families.
    pub async fn create_table(
        &self,
        table: &str,
        families: &[ColumnFamilyDescriptor],
    ) -> Result<(), ClientError> {
        let column_families = families
            .iter()
            .map(|cf| pb::ColumnFamilySchema {
                name: cf.name.clone(),
                attributes: cf
                    .attributes
                    .iter()
                    .map(|(k, v)| pb::BytesBytesPair {
                        first: k.clone(),
                        second: v.clone(),
                    })
                    .collect(),
            })
            .collect();

        let req = pb::CreateTableRequest {
            table_schema: Some(pb::TableSchema {
                table_name: Some(table_name(table)),
                column_families,
            }),
        };
        let resp: pb::ProcedureResponse = self.coordinator.request("CreateTable", &req).await?;
        self.wait_for_proc(resp.proc_id).await
    }

    pub async fn delete_table(&self, table: &str) -> Result<(), ClientError> {
        let req = pb::DeleteTableRequest {
            table_name: Some(table_name(table)),
        };
        let resp: pb::ProcedureResponse = self.coordinator.request("DeleteTable", &req).await?;
        self.wait_for_proc(resp.proc_id).await
    }

    pub async fn enable_table(&self, table: &str) -> Result<(), ClientError> {
        let req = pb::EnableTableRequest {
            table_name: Some(table_name(table)),
        };
        let resp: pb::ProcedureResponse = self.coordinator.request("EnableTable", &req).await?;
        self.wait_for_proc(resp.proc_id).await
    }

    pub async fn disable_table(&self, table: &str) -> Result<(), ClientError> {
        let req = pb::DisableTableRequest {
            table_name: Some(table_name(table)),
        };
        let resp: pb::ProcedureResponse = self.coordinator.request("DisableTable", &req).await?;
        self.wait_for_proc(resp.proc_id).await
    }

    /// Polls `GetProcedureResult` until the master procedure started by a
    /// table mutator finishes, backing off from one second up to a
    /// ten-second cap between polls. A `proc_id` of `None` means the
    /// mutator completed inline; nothing to wait for.
    async fn wait_for_proc(&self, proc_id: Option<u64>) -> Result<(), ClientError> {
        let Some(proc_id) = proc_id else {
            return Ok(());
        };
        let backoff = Backoff::new(u32::MAX, Duration::from_secs(1), Some(Duration::from_secs(10)));
        let req = pb::GetProcedureResultRequest { proc_id };

        for attempt in 1.. {
            let wait = backoff
                .next(attempt)
                .expect("unbounded backoff always yields a duration");
            tokio::time::sleep(wait).await;

            let resp: pb::GetProcedureResultResponse =
                self.coordinator.request("GetProcedureResult", &req).await?;
            match pb::ProcedureState::try_from(resp.state) {
                Ok(pb::ProcedureState::Finished) => return Ok(()),
                Ok(pb::ProcedureState::Running) => continue,
                Ok(pb::ProcedureState::NotFound) | Err(_) => {
                    return Err(RequestError::Generic(format!("procedure {proc_id} not found")).into())
                }
            }
        }
        unreachable!("attempt counter is unbounded")
    }

    /// Lists table names, optionally restricted to one namespace.
    pub async fn get_table_names(&self, namespace: Option<&str>) -> Result<Vec<String>, ClientError> {
        let req = pb::GetTableNamesRequest {
            namespace: namespace.map(|n| n.to_string()),
        };
        let resp: pb::GetTableNamesResponse = self.coordinator.request("GetTableNames", &req).await?;
        Ok(resp
            .table_names
            .into_iter()
            .map(|t| {
                format!(
                    "{}:{}",
                    String::from_utf8_lossy(&t.namespace),
                    String::from_utf8_lossy(&t.qualifier)
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_name_splits_namespace_and_qualifier() {
        let t = table_name("ns:t1");
        assert_eq!(t.namespace, b"ns");
        assert_eq!(t.qualifier, b"t1");
    }

    #[test]
    fn table_name_defaults_namespace_when_absent() {
        let t = table_name("t1");
        assert_eq!(t.namespace, b"default");
        assert_eq!(t.qualifier, b"t1");
    }
}
