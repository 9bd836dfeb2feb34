//! `put`, `check_and_put`, and `delete`.

use super::get::split_column;
use super::Client;
use crate::error::ClientError;
use crate::filters::{CompareType, Comparator};
use crate::pb;
use crate::region::Region;
use crate::row::Row;
use std::collections::HashMap;

fn row_to_column_values(row: &Row) -> Result<Vec<pb::ColumnValue>, ClientError> {
    let mut by_family: HashMap<Vec<u8>, Vec<pb::QualifierValue>> = HashMap::new();
    for (column, value) in row.columns() {
        let (family, qualifier) = split_column(column)?;
        by_family.entry(family).or_default().push(pb::QualifierValue {
            qualifier: Some(qualifier),
            value: Some(value.to_vec()),
        });
    }
    Ok(by_family
        .into_iter()
        .map(|(family, qualifier_value)| pb::ColumnValue {
            family,
            qualifier_value,
        })
        .collect())
}

impl Client {
    /// Writes `row`'s columns, replacing any prior values for those
    /// columns. Returns whether the server reports the mutation as
    /// processed.
    pub async fn put(&self, table: &str, row: &Row) -> Result<bool, ClientError> {
        let column_value = row_to_column_values(row)?;
        let key = row.key.clone();

        let resp: pb::MutateResponse = self
            .call_with_region_retry(table, &key, "Mutate", move |region| pb::MutateRequest {
                region: Some(pb::RegionSpecifier::by_name(&region.name)),
                mutation: Some(pb::MutationProto {
                    row: Some(key.clone()),
                    mutate_type: Some(pb::MutationType::Put as i32),
                    column_value: column_value.clone(),
                }),
                condition: None,
            })
            .await?;

        Ok(resp.processed.unwrap_or(false))
    }

    /// Writes `row` only if `check_column` currently compares as
    /// `compare_type` against `check_value` (an empty value if `None`).
    pub async fn check_and_put(
        &self,
        table: &str,
        row: &Row,
        check_column: &str,
        check_value: Option<&[u8]>,
        compare_type: CompareType,
    ) -> Result<bool, ClientError> {
        let column_value = row_to_column_values(row)?;
        let (check_family, check_qualifier) = split_column(check_column)?;
        let comparator = Comparator::binary(check_value.unwrap_or(&[]).to_vec());
        let key = row.key.clone();

        let resp: pb::MutateResponse = self
            .call_with_region_retry(table, &key, "Mutate", move |region| pb::MutateRequest {
                region: Some(pb::RegionSpecifier::by_name(&region.name)),
                mutation: Some(pb::MutationProto {
                    row: Some(key.clone()),
                    mutate_type: Some(pb::MutationType::Put as i32),
                    column_value: column_value.clone(),
                }),
                condition: Some(pb::Condition {
                    row: key.clone(),
                    family: check_family.clone(),
                    qualifier: check_qualifier.clone(),
                    compare_type: compare_type.as_i32(),
                    comparator: Some(comparator.to_pb()),
                }),
            })
            .await?;

        Ok(resp.processed.unwrap_or(false))
    }

    /// Deletes the row at `key` (all of its columns).
    ///
    /// Unlike `put`/`check_and_put`, a region error here gets exactly one
    /// re-route-and-retry, not the shared, configurably-bounded skeleton:
    /// if the request still fails against the freshly resolved region,
    /// that's surfaced as a fatal error rather than retried further.
    pub async fn delete(&self, table: &str, key: &[u8]) -> Result<bool, ClientError> {
        let build_request = |region: &Region| pb::MutateRequest {
            region: Some(pb::RegionSpecifier::by_name(&region.name)),
            mutation: Some(pb::MutationProto {
                row: Some(key.to_vec()),
                mutate_type: Some(pb::MutationType::Delete as i32),
                column_value: Vec::new(),
            }),
            condition: None,
        };

        let (region, service) = self.region_and_service(table, key, true).await?;
        let req = build_request(&region);
        let resp: Result<pb::MutateResponse, ClientError> = service.request("Mutate", &req).await;

        let resp = match resp {
            Ok(resp) => resp,
            Err(err) if err.as_region_kind().is_some() => {
                let (region, service) = self.region_and_service(table, key, false).await?;
                let req = build_request(&region);
                service.request("Mutate", &req).await?
            }
            Err(err) => return Err(err),
        };
        Ok(resp.processed.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_to_column_values_groups_by_family() {
        let mut row = Row::new(b"r1".to_vec());
        row.set("cf:a", b"1".to_vec());
        row.set("cf:b", b"2".to_vec());
        row.set("other:c", b"3".to_vec());

        let values = row_to_column_values(&row).unwrap();
        assert_eq!(values.len(), 2);
        let cf = values.iter().find(|v| v.family == b"cf").unwrap();
        assert_eq!(cf.qualifier_value.len(), 2);
    }
}
