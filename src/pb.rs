//! Wire message types.
//!
//! In production this module is generated by `prost-build` from the
//! cluster's `.proto` schema; that schema is treated as an opaque,
//! externally-owned dependency (see `spec.md` §1 Out Of Scope) so we hand
//! author the subset of messages this client actually sends and receives,
//! shaped exactly like `prost-build` output would be. Nothing in here
//! contains client logic — it's pure data.

use prost::Message;

// -- connection preamble / RPC envelope -------------------------------------

#[derive(Clone, PartialEq, Message)]
pub struct UserInformation {
    #[prost(string, optional, tag = "1")]
    pub effective_user: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ConnectionHeader {
    #[prost(message, optional, tag = "1")]
    pub user_info: Option<UserInformation>,
    #[prost(string, optional, tag = "2")]
    pub service_name: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct RequestHeader {
    #[prost(uint32, tag = "1")]
    pub call_id: u32,
    #[prost(string, optional, tag = "2")]
    pub method_name: Option<String>,
    #[prost(bool, optional, tag = "3")]
    pub request_param: Option<bool>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ExceptionResponse {
    #[prost(string, optional, tag = "1")]
    pub exception_class_name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub stack_trace: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ResponseHeader {
    #[prost(uint32, tag = "1")]
    pub call_id: u32,
    #[prost(message, optional, tag = "2")]
    pub exception: Option<ExceptionResponse>,
}

// -- region addressing -------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
pub enum RegionSpecifierType {
    RegionName = 1,
    EncodedRegionName = 2,
}

#[derive(Clone, PartialEq, Message)]
pub struct RegionSpecifier {
    #[prost(enumeration = "RegionSpecifierType", tag = "1")]
    pub r#type: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

impl RegionSpecifier {
    pub fn by_name(region_name: &[u8]) -> Self {
        RegionSpecifier {
            r#type: RegionSpecifierType::RegionName as i32,
            value: region_name.to_vec(),
        }
    }
}

// -- get -----------------------------------------------------------------

#[derive(Clone, PartialEq, Message)]
pub struct Column {
    #[prost(bytes = "vec", tag = "1")]
    pub family: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub qualifier: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Filter {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub serialized_filter: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Get {
    #[prost(bytes = "vec", tag = "1")]
    pub row: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub column: Vec<Column>,
    #[prost(message, optional, tag = "4")]
    pub filter: Option<Filter>,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetRequest {
    #[prost(message, optional, tag = "1")]
    pub region: Option<RegionSpecifier>,
    #[prost(message, optional, tag = "2")]
    pub get: Option<Get>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Cell {
    #[prost(bytes = "vec", tag = "1")]
    pub row: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub family: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub qualifier: Vec<u8>,
    #[prost(uint64, optional, tag = "4")]
    pub timestamp: Option<u64>,
    #[prost(bytes = "vec", tag = "5")]
    pub value: Vec<u8>,
}

/// Named `ResultPb` to avoid colliding with `std::result::Result`.
#[derive(Clone, PartialEq, Message)]
pub struct ResultPb {
    #[prost(message, repeated, tag = "1")]
    pub cell: Vec<Cell>,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetResponse {
    #[prost(message, optional, tag = "1")]
    pub result: Option<ResultPb>,
}

// -- mutate (put / delete / check-and-put) ---------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
pub enum MutationType {
    Append = 0,
    Increment = 1,
    Put = 2,
    Delete = 3,
}

#[derive(Clone, PartialEq, Message)]
pub struct QualifierValue {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub qualifier: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub value: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ColumnValue {
    #[prost(bytes = "vec", tag = "1")]
    pub family: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub qualifier_value: Vec<QualifierValue>,
}

#[derive(Clone, PartialEq, Message)]
pub struct MutationProto {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub row: Option<Vec<u8>>,
    #[prost(enumeration = "MutationType", optional, tag = "2")]
    pub mutate_type: Option<i32>,
    #[prost(message, repeated, tag = "3")]
    pub column_value: Vec<ColumnValue>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
pub enum CompareType {
    Less = 0,
    LessOrEqual = 1,
    Equal = 2,
    NotEqual = 3,
    GreaterOrEqual = 4,
    Greater = 5,
    NoOp = 6,
}

#[derive(Clone, PartialEq, Message)]
pub struct Comparator {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub serialized_comparator: Option<Vec<u8>>,
}

/// The nested message a `BinaryComparator`'s `serialized_comparator`
/// bytes decode to.
#[derive(Clone, PartialEq, Message)]
pub struct ByteArrayComparable {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub value: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct BinaryComparator {
    #[prost(message, optional, tag = "1")]
    pub comparable: Option<ByteArrayComparable>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Condition {
    #[prost(bytes = "vec", tag = "1")]
    pub row: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub family: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub qualifier: Vec<u8>,
    #[prost(enumeration = "CompareType", tag = "4")]
    pub compare_type: i32,
    #[prost(message, optional, tag = "5")]
    pub comparator: Option<Comparator>,
}

#[derive(Clone, PartialEq, Message)]
pub struct MutateRequest {
    #[prost(message, optional, tag = "1")]
    pub region: Option<RegionSpecifier>,
    #[prost(message, optional, tag = "2")]
    pub mutation: Option<MutationProto>,
    #[prost(message, optional, tag = "3")]
    pub condition: Option<Condition>,
}

#[derive(Clone, PartialEq, Message)]
pub struct MutateResponse {
    #[prost(message, optional, tag = "1")]
    pub result: Option<ResultPb>,
    #[prost(bool, optional, tag = "2")]
    pub processed: Option<bool>,
}

// -- scan --------------------------------------------------------------

#[derive(Clone, PartialEq, Message)]
pub struct Scan {
    #[prost(message, repeated, tag = "1")]
    pub column: Vec<Column>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub start_row: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub stop_row: Option<Vec<u8>>,
    #[prost(message, optional, tag = "5")]
    pub filter: Option<Filter>,
    #[prost(bool, optional, tag = "15")]
    pub reversed: Option<bool>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ScanRequest {
    #[prost(message, optional, tag = "1")]
    pub region: Option<RegionSpecifier>,
    #[prost(message, optional, tag = "2")]
    pub scan: Option<Scan>,
    #[prost(uint64, optional, tag = "3")]
    pub scanner_id: Option<u64>,
    #[prost(uint32, optional, tag = "4")]
    pub number_of_rows: Option<u32>,
    #[prost(bool, optional, tag = "5")]
    pub close_scanner: Option<bool>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ScanResponse {
    #[prost(uint64, optional, tag = "1")]
    pub scanner_id: Option<u64>,
    #[prost(message, repeated, tag = "2")]
    pub results: Vec<ResultPb>,
    #[prost(bool, optional, tag = "3")]
    pub more_results: Option<bool>,
    #[prost(bool, optional, tag = "5")]
    pub more_results_in_region: Option<bool>,
}

// -- region / server descriptors (meta-shard cell payloads) ------------------

#[derive(Clone, PartialEq, Message)]
pub struct TableName {
    #[prost(bytes = "vec", tag = "1")]
    pub namespace: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub qualifier: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct RegionInfo {
    #[prost(uint64, tag = "1")]
    pub region_id: u64,
    #[prost(message, optional, tag = "2")]
    pub table_name: Option<TableName>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub start_key: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub end_key: Option<Vec<u8>>,
    #[prost(bool, optional, tag = "5")]
    pub offline: Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub split: Option<bool>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ServerName {
    #[prost(string, tag = "1")]
    pub host_name: String,
    #[prost(uint32, optional, tag = "2")]
    pub port: Option<u32>,
    #[prost(uint64, optional, tag = "3")]
    pub start_code: Option<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct MetaRegionServer {
    #[prost(message, optional, tag = "1")]
    pub server: Option<ServerName>,
    #[prost(int32, optional, tag = "2")]
    pub rpc_version: Option<i32>,
}

// -- admin (namespace / table lifecycle) -----------------------------------

/// Placeholder request/response body for RPCs that carry no fields
/// either way (e.g. `ListNamespaceDescriptors`'s request, or the
/// acknowledgement-only responses to the table/namespace mutators).
#[derive(Clone, PartialEq, Message)]
pub struct Empty {}


#[derive(Clone, PartialEq, Message)]
pub struct NameStringPair {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct NamespaceDescriptor {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub configuration: Vec<NameStringPair>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CreateNamespaceRequest {
    #[prost(message, optional, tag = "1")]
    pub namespace_descriptor: Option<NamespaceDescriptor>,
}

#[derive(Clone, PartialEq, Message)]
pub struct DeleteNamespaceRequest {
    #[prost(string, tag = "1")]
    pub namespace_name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ListNamespaceDescriptorsResponse {
    #[prost(message, repeated, tag = "1")]
    pub namespace_descriptor: Vec<NamespaceDescriptor>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ColumnFamilySchema {
    #[prost(bytes = "vec", tag = "1")]
    pub name: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub attributes: Vec<BytesBytesPair>,
}

#[derive(Clone, PartialEq, Message)]
pub struct BytesBytesPair {
    #[prost(bytes = "vec", tag = "1")]
    pub first: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub second: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TableSchema {
    #[prost(message, optional, tag = "1")]
    pub table_name: Option<TableName>,
    #[prost(message, repeated, tag = "2")]
    pub column_families: Vec<ColumnFamilySchema>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CreateTableRequest {
    #[prost(message, optional, tag = "1")]
    pub table_schema: Option<TableSchema>,
}

#[derive(Clone, PartialEq, Message)]
pub struct DeleteTableRequest {
    #[prost(message, optional, tag = "1")]
    pub table_name: Option<TableName>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EnableTableRequest {
    #[prost(message, optional, tag = "1")]
    pub table_name: Option<TableName>,
}

#[derive(Clone, PartialEq, Message)]
pub struct DisableTableRequest {
    #[prost(message, optional, tag = "1")]
    pub table_name: Option<TableName>,
}

/// Response shared by the table/namespace mutators that run as an
/// asynchronous master procedure rather than completing inline.
#[derive(Clone, PartialEq, Message)]
pub struct ProcedureResponse {
    #[prost(uint64, optional, tag = "1")]
    pub proc_id: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
pub enum ProcedureState {
    NotFound = 0,
    Running = 1,
    Finished = 2,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetProcedureResultRequest {
    #[prost(uint64, tag = "1")]
    pub proc_id: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetProcedureResultResponse {
    #[prost(enumeration = "ProcedureState", tag = "1")]
    pub state: i32,
    #[prost(uint64, optional, tag = "2")]
    pub start_time: Option<u64>,
    #[prost(uint64, optional, tag = "3")]
    pub last_update: Option<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetTableNamesRequest {
    #[prost(string, optional, tag = "1")]
    pub namespace: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetTableNamesResponse {
    #[prost(message, repeated, tag = "1")]
    pub table_names: Vec<TableName>,
}
