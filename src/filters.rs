//! Filters and comparators, carried as opaque wire values.
//!
//! The reference client ships a small zoo of `Filter`/`Comparator`
//! subclasses, each responsible for encoding its own nested protobuf
//! message. We treat those nested messages the same way we treat every
//! other server-defined schema in this crate: as something callers
//! supply pre-encoded bytes for, not something we re-derive. The one
//! exception is [`Comparator::binary`], kept because `check_and_put`'s
//! default comparator is common enough to be worth not hand-encoding at
//! every call site.

use crate::pb;
use prost::Message;

/// `compare_type` values for [`crate::Client::check_and_put`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareType {
    Less,
    LessOrEqual,
    Equal,
    NotEqual,
    GreaterOrEqual,
    Greater,
    NoOp,
}

impl CompareType {
    pub(crate) fn as_i32(self) -> i32 {
        match self {
            CompareType::Less => 0,
            CompareType::LessOrEqual => 1,
            CompareType::Equal => 2,
            CompareType::NotEqual => 3,
            CompareType::GreaterOrEqual => 4,
            CompareType::Greater => 5,
            CompareType::NoOp => 6,
        }
    }
}

const FILTER_PATH: &str = "org.apache.cluster.filter.";
const COMPARATOR_PATH: &str = "org.apache.cluster.filter.";

/// An opaque server-side filter: a fully-qualified class name plus its
/// already-encoded parameters.
#[derive(Clone, Debug)]
pub struct Filter {
    pub(crate) name: String,
    pub(crate) serialized: Option<Vec<u8>>,
}

impl Filter {
    /// `short_name` is the filter class's simple name (e.g.
    /// `"KeyOnlyFilter"`); `serialized` is that filter's own encoded
    /// parameter message.
    pub fn new(short_name: &str, serialized: Vec<u8>) -> Self {
        Filter {
            name: format!("{FILTER_PATH}{short_name}"),
            serialized: Some(serialized),
        }
    }

    pub(crate) fn to_pb(&self) -> pb::Filter {
        pb::Filter {
            name: self.name.clone(),
            serialized_filter: self.serialized.clone(),
        }
    }
}

/// An opaque server-side comparator, used by `check_and_put`'s
/// condition.
#[derive(Clone, Debug)]
pub struct Comparator {
    pub(crate) name: String,
    pub(crate) serialized: Vec<u8>,
}

impl Comparator {
    pub fn new(short_name: &str, serialized: Vec<u8>) -> Self {
        Comparator {
            name: format!("{COMPARATOR_PATH}{short_name}"),
            serialized,
        }
    }

    /// The common case: compare against a fixed byte string.
    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        let comparable = pb::BinaryComparator {
            comparable: Some(pb::ByteArrayComparable {
                value: Some(value.into()),
            }),
        };
        Comparator::new("BinaryComparator", comparable.encode_to_vec())
    }

    pub(crate) fn to_pb(&self) -> pb::Comparator {
        pb::Comparator {
            name: self.name.clone(),
            serialized_comparator: Some(self.serialized.clone()),
        }
    }
}
