//! `get` and the `get_one` sampling probe.

use super::Client;
use crate::error::{ClientError, ValidationError};
use crate::filters::Filter;
use crate::pb;
use crate::row::Row;
use std::collections::HashMap;

/// Column projection for `get`/scan calls: `"family:qualifier"` strings,
/// grouped by family on the wire.
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

pub(crate) fn split_column(column: &str) -> Result<(Vec<u8>, Vec<u8>), ClientError> {
    let mut parts = column.splitn(2, ':');
    match (parts.next(), parts.next()) {
        (Some(family), Some(qualifier)) if !family.is_empty() => {
            Ok((family.as_bytes().to_vec(), qualifier.as_bytes().to_vec()))
        }
        _ => Err(ValidationError::BadColumnName(column.to_string()).into()),
    }
}

pub(crate) fn cells_to_row(cells: Vec<pb::Cell>) -> Option<Row> {
    if cells.is_empty() {
        return None;
    }
    let mut row = Row::new(cells[0].row.clone());
    for cell in cells {
        let column = format!(
            "{}:{}",
            String::from_utf8_lossy(&cell.family),
            String::from_utf8_lossy(&cell.qualifier)
        );
        row.set(column, cell.value);
    }
    Some(row)
}

impl Client {
    /// Fetches one row by key. Returns `None` if the row doesn't exist.
    pub async fn get(
        &self,
        table: &str,
        key: &[u8],
        columns: Option<&[String]>,
        filter: Option<&Filter>,
    ) -> Result<Option<Row>, ClientError> {
        let column = match columns {
            Some(cols) => columns_to_pb(cols)?,
            None => Vec::new(),
        };
        let filter_pb = filter.map(|f| f.to_pb());

        let resp: pb::GetResponse = self
            .call_with_region_retry(table, key, "Get", |region| pb::GetRequest {
                region: Some(pb::RegionSpecifier::by_name(&region.name)),
                get: Some(pb::Get {
                    row: key.to_vec(),
                    column: column.clone(),
                    filter: filter_pb.clone(),
                }),
            })
            .await?;

        Ok(resp.result.map(|r| r.cell).and_then(cells_to_row))
    }

    /// Probes for a single row at or after `key` (empty key = table
    /// start), a cheap "does this table/region have any data" check.
    /// Implemented as a one-row reverse scan that's immediately closed.
    pub async fn get_one(
        &self,
        table: &str,
        key: Option<&[u8]>,
        columns: Option<&[String]>,
        filter: Option<&Filter>,
    ) -> Result<Option<Row>, ClientError> {
        let key = key.unwrap_or(b"");
        let column = match columns {
            Some(cols) => columns_to_pb(cols)?,
            None => Vec::new(),
        };
        let filter_pb = filter.map(|f| f.to_pb());

        let resp: pb::ScanResponse = self
            .call_with_region_retry(table, key, "Scan", |region| pb::ScanRequest {
                region: Some(pb::RegionSpecifier::by_name(&region.name)),
                scan: Some(pb::Scan {
                    column: column.clone(),
                    start_row: Some(key.to_vec()),
                    stop_row: None,
                    filter: filter_pb.clone(),
                    reversed: Some(true),
                }),
                scanner_id: None,
                number_of_rows: Some(1),
                close_scanner: None,
            })
            .await?;

        if let Some(scanner_id) = resp.scanner_id {
            let (region, service) = self.region_and_service(table, key, true).await?;
            let close_req = pb::ScanRequest {
                region: Some(pb::RegionSpecifier::by_name(&region.name)),
                scan: None,
                scanner_id: Some(scanner_id),
                number_of_rows: None,
                close_scanner: Some(true),
            };
            let _: Result<pb::ScanResponse, ClientError> =
                service.request("Scan", &close_req).await;
        }

        Ok(resp.results.into_iter().next().and_then(|r| cells_to_row(r.cell)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_well_formed_column_name() {
        let (family, qualifier) = split_column("cf:col").unwrap();
        assert_eq!(family, b"cf");
        assert_eq!(qualifier, b"col");
    }

    #[test]
    fn rejects_column_without_separator() {
        let err = split_column("nope").unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::BadColumnName(_))
        ));
    }

    #[test]
    fn cells_to_row_returns_none_for_empty_cells() {
        assert!(cells_to_row(vec![]).is_none());
    }

    #[test]
    fn cells_to_row_builds_family_qualifier_columns() {
        let cells = vec![
            pb::Cell {
                row: b"r1".to_vec(),
                family: b"cf".to_vec(),
                qualifier: b"a".to_vec(),
                timestamp: None,
                value: b"v1".to_vec(),
            },
            pb::Cell {
                row: b"r1".to_vec(),
                family: b"cf".to_vec(),
                qualifier: b"b".to_vec(),
                timestamp: None,
                value: b"v2".to_vec(),
            },
        ];
        let row = cells_to_row(cells).unwrap();
        assert_eq!(row.key, b"r1");
        assert_eq!(row.get("cf:a"), Some(&b"v1"[..]));
        assert_eq!(row.get("cf:b"), Some(&b"v2"[..]));
    }
}
