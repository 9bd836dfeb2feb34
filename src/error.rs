//! Layered error taxonomy for the client.
//!
//! Each layer gets its own `thiserror` enum so that callers can match on the
//! failure mode that's relevant to them; [`ClientError`] aggregates all of
//! them for the public operation surface.

/// Socket-level failures: connect, read, write, or a frame that was cut off
/// mid-stream.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write to {host}:{port}: {source}")]
    Write {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read from {host}:{port}: {source}")]
    Read {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("connection to {host}:{port} closed before a complete frame was read")]
    UnexpectedEof { host: String, port: u16 },
    #[error("socket operation against {host}:{port} timed out")]
    Timeout { host: String, port: u16 },
}

/// Malformed frames, bad magic bytes, or a varint that didn't terminate.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("varint exceeded 10 bytes without terminating")]
    VarintTooLong,
    #[error("buffer exhausted while decoding a varint")]
    VarintTruncated,
    #[error("frame header size {0} exceeds the frame's total size")]
    HeaderSizeOverflow(usize),
    #[error("failed to decode protobuf message: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("expected magic bytes {expected:?}, got {actual:?}")]
    BadMagic {
        expected: &'static [u8],
        actual: Vec<u8>,
    },
    #[error("{0}")]
    Other(&'static str),
}

/// Failures resolving a well-known node through the coordination service.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("coordination service has no node at path '{0}'")]
    NodeNotPresent(String),
    #[error("node data at '{path}' is malformed: {reason}")]
    Protocol { path: String, reason: String },
    #[error("underlying discovery transport error: {0}")]
    Transport(String),
}

/// The region-relocation sub-taxonomy. Always retried (with cache
/// invalidation) by the client operations layer; only surfaced to the
/// caller once the configured retry budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegionErrorKind {
    #[error("region moved to a new server")]
    Moved,
    #[error("server is not serving this region")]
    NotServing,
    #[error("region server has stopped")]
    ServerStopped,
    #[error("region is still opening")]
    Opening,
    #[error("region is too busy to serve the request")]
    TooBusy,
}

/// Generic and typed server-side request failures.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Region(RegionErrorKind),
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),
    #[error("namespace already exists: {0}")]
    NamespaceExists(String),
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("table already exists: {0}")]
    TableExists(String),
    #[error("server-side I/O error: {0}")]
    ServerIo(String),
    #[error("server returned exception class '{0}'")]
    Generic(String),
    #[error("failed to get region: {0}")]
    RegionLookupFailed(String),
    #[error("exhausted {attempts} region-error retries for this call")]
    RegionRetriesExhausted { attempts: usize },
}

impl RequestError {
    /// Maps a server-side exception class name to our error taxonomy, per
    /// the wire-level mapping table.
    pub fn from_exception_class_name(class_name: &str) -> RequestError {
        match class_name {
            "org.apache.hadoop.hbase.exceptions.RegionMovedException" => {
                RequestError::Region(RegionErrorKind::Moved)
            }
            "org.apache.hadoop.hbase.NotServingRegionException" => {
                RequestError::Region(RegionErrorKind::NotServing)
            }
            "org.apache.hadoop.hbase.regionserver.RegionServerStoppedException" => {
                RequestError::Region(RegionErrorKind::ServerStopped)
            }
            "org.apache.hadoop.hbase.exceptions.RegionOpeningException" => {
                RequestError::Region(RegionErrorKind::Opening)
            }
            "org.apache.hadoop.hbase.RegionTooBusyException" => {
                RequestError::Region(RegionErrorKind::TooBusy)
            }
            "org.apache.hadoop.hbase.NamespaceNotFoundException" => {
                RequestError::NamespaceNotFound(class_name.to_string())
            }
            "org.apache.hadoop.hbase.NamespaceExistException" => {
                RequestError::NamespaceExists(class_name.to_string())
            }
            "org.apache.hadoop.hbase.TableNotFoundException" => {
                RequestError::TableNotFound(class_name.to_string())
            }
            "org.apache.hadoop.hbase.TableExistsException" => {
                RequestError::TableExists(class_name.to_string())
            }
            "java.io.IOException" => RequestError::ServerIo(class_name.to_string()),
            other => RequestError::Generic(other.to_string()),
        }
    }

    /// Whether this is a region-relocation error that C7's retry skeleton
    /// should catch, evict the cached region, and re-route.
    pub fn region_kind(&self) -> Option<RegionErrorKind> {
        match self {
            RequestError::Region(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Malformed input caught before a request is ever sent.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid column name '{0}', expected 'family:qualifier'")]
    BadColumnName(String),
    #[error("batch size must be positive, got {0}")]
    NonPositiveBatchSize(i64),
    #[error("scanner does not belong to this client")]
    ForeignScanner,
    #[error("scanner has already been closed")]
    ScannerClosed,
}

/// Top-level error returned from every public client operation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ClientError {
    /// True if this error is a region relocation that's still within the
    /// retry budget (the caller of this function decides the budget; this
    /// just identifies the error shape).
    pub fn as_region_kind(&self) -> Option<RegionErrorKind> {
        match self {
            ClientError::Request(req) => req.region_kind(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
