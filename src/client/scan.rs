//! Row scans: a cursor that walks one region at a time, re-opening a
//! new region's scanner as it crosses a region boundary.
//!
//! State machine: `Idle` (nothing open, holds the next region's start
//! key) -> `Open` (a scanner id is live on some data shard) -> back to
//! `Idle` for the next region, or `Done` once the end key (or the
//! table's end) is reached.

use super::get::{cells_to_row, columns_to_pb};
use super::Client;
use crate::error::ClientError;
use crate::filters::Filter;
use crate::pb;
use crate::region::Region;
use crate::row::Row;

enum ScanState {
    Idle { next_start_key: Option<Vec<u8>> },
    Open { region: Region, scanner_id: u64 },
    Done,
}

/// An open, server-side-stateful scan cursor. Fetches `num_rows` rows
/// per [`Scanner::next_batch`] call; returns `Ok(None)` once the scan is
/// exhausted.
pub struct Scanner<'a> {
    client: &'a Client,
    table: String,
    end_key: Option<Vec<u8>>,
    columns: Vec<String>,
    filter: Option<Filter>,
    num_rows: u32,
    state: ScanState,
}

impl<'a> Scanner<'a> {
    fn new(
        client: &'a Client,
        table: String,
        start_key: Vec<u8>,
        end_key: Option<Vec<u8>>,
        columns: Vec<String>,
        filter: Option<Filter>,
        num_rows: u32,
    ) -> Self {
        Scanner {
            client,
            table,
            end_key,
            columns,
            filter,
            num_rows,
            state: ScanState::Idle {
                next_start_key: Some(start_key),
            },
        }
    }

    /// Fetches the next batch of rows, opening or advancing the
    /// underlying region scanner as needed. `Ok(None)` means the scan is
    /// finished; the scanner has already closed itself server-side.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Row>>, ClientError> {
        match std::mem::replace(&mut self.state, ScanState::Done) {
            ScanState::Done => Ok(None),
            ScanState::Idle { next_start_key: None } => Ok(None),
            ScanState::Idle {
                next_start_key: Some(start_key),
            } => self.open_next_region(start_key).await,
            ScanState::Open { region, scanner_id } => self.continue_region(region, scanner_id).await,
        }
    }

    async fn open_next_region(&mut self, start_key: Vec<u8>) -> Result<Option<Vec<Row>>, ClientError> {
        let column = columns_to_pb(&self.columns)?;
        let filter_pb = self.filter.as_ref().map(|f| f.to_pb());
        let end_key = self.end_key.clone();
        let num_rows = self.num_rows;

        let (region, _service, resp): (_, _, pb::ScanResponse) = self
            .client
            .region_call_with_retry(&self.table, &start_key, "Scan", move |region| pb::ScanRequest {
                region: Some(pb::RegionSpecifier::by_name(&region.name)),
                scan: Some(pb::Scan {
                    column: column.clone(),
                    start_row: Some(start_key.clone()),
                    stop_row: end_key.clone(),
                    filter: filter_pb.clone(),
                    reversed: Some(false),
                }),
                scanner_id: None,
                number_of_rows: Some(num_rows),
                close_scanner: None,
            })
            .await?;

        let rows = resp.results.into_iter().filter_map(|r| cells_to_row(r.cell)).collect();

        self.state = match resp.scanner_id {
            Some(scanner_id) => ScanState::Open { region, scanner_id },
            None => self.advance_past(&region),
        };
        Ok(Some(rows))
    }

    async fn continue_region(
        &mut self,
        region: Region,
        scanner_id: u64,
    ) -> Result<Option<Vec<Row>>, ClientError> {
        let num_rows = self.num_rows;
        let (region, service, resp): (_, _, pb::ScanResponse) = self
            .client
            .region_call_with_retry(&self.table, &region.start_key.clone(), "Scan", move |region| {
                pb::ScanRequest {
                    region: Some(pb::RegionSpecifier::by_name(&region.name)),
                    scan: None,
                    scanner_id: Some(scanner_id),
                    number_of_rows: Some(num_rows),
                    close_scanner: None,
                }
            })
            .await?;

        let rows = resp.results.into_iter().filter_map(|r| cells_to_row(r.cell)).collect();

        self.state = if resp.more_results_in_region.unwrap_or(false) {
            ScanState::Open { region, scanner_id }
        } else {
            let close_req = pb::ScanRequest {
                region: Some(pb::RegionSpecifier::by_name(&region.name)),
                scan: None,
                scanner_id: Some(scanner_id),
                number_of_rows: None,
                close_scanner: Some(true),
            };
            let _: Result<pb::ScanResponse, ClientError> = service.request("Scan", &close_req).await;
            self.advance_past(&region)
        };
        Ok(Some(rows))
    }

    fn advance_past(&self, region: &Region) -> ScanState {
        let next_start_key = region.end_key.clone();
        let within_bound = self
            .end_key
            .as_ref()
            .map(|end| &next_start_key < end)
            .unwrap_or(true);
        if !next_start_key.is_empty() && within_bound {
            ScanState::Idle {
                next_start_key: Some(next_start_key),
            }
        } else {
            ScanState::Done
        }
    }

    /// Closes the scanner's server-side state early, before it's been
    /// exhausted naturally.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        if let ScanState::Open { region, scanner_id } =
            std::mem::replace(&mut self.state, ScanState::Done)
        {
            let service = self.client.region_manager.get_service(&region).await;
            let req = pb::ScanRequest {
                region: Some(pb::RegionSpecifier::by_name(&region.name)),
                scan: None,
                scanner_id: Some(scanner_id),
                number_of_rows: None,
                close_scanner: Some(true),
            };
            let _: pb::ScanResponse = service.request("Scan", &req).await?;
        }
        Ok(())
    }
}

impl Client {
    /// Starts a scan over `table` from `start_key` (inclusive, empty for
    /// the start of the table) up to `end_key` (exclusive, `None` for
    /// the end of the table).
    pub fn scan<'a>(
        &'a self,
        table: &str,
        start_key: Option<&[u8]>,
        end_key: Option<&[u8]>,
        columns: Option<&[String]>,
        filter: Option<Filter>,
        num_rows: u32,
    ) -> Scanner<'a> {
        Scanner::new(
            self,
            table.to_string(),
            start_key.unwrap_or(b"").to_vec(),
            end_key.map(|k| k.to_vec()),
            columns.map(|c| c.to_vec()).unwrap_or_default(),
            filter,
            num_rows,
        )
    }
}
