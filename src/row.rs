//! Row and column-family value types used by the public operation
//! surface.

use std::collections::BTreeMap;

/// A row: its key plus an ordered `family:qualifier -> value` map. Built
/// up by callers before a `put`, and returned by `get`/scan. Last write
/// for a given column wins, matching the reference client's plain dict
/// of `"family:qualifier" -> bytes`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    pub key: Vec<u8>,
    cells: BTreeMap<String, Vec<u8>>,
}

impl Row {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Row {
            key: key.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Sets `family:qualifier` to `value`, overwriting any prior value
    /// for that column.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.cells.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&[u8]> {
        self.cells.get(column).map(|v| v.as_slice())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

/// A column family, named and with server-side attributes (versions,
/// TTL, compression, etc.) carried opaquely as raw bytes — the same
/// "don't reinterpret the server's knobs" treatment given to filters.
#[derive(Clone, Debug, Default)]
pub struct ColumnFamilyDescriptor {
    pub name: Vec<u8>,
    pub attributes: Vec<(Vec<u8>, Vec<u8>)>,
}

impl ColumnFamilyDescriptor {
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        ColumnFamilyDescriptor {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_existing_column() {
        let mut row = Row::new(b"r1".to_vec());
        row.set("cf:a", b"v1".to_vec());
        row.set("cf:a", b"v2".to_vec());
        assert_eq!(row.get("cf:a"), Some(&b"v2"[..]));
        assert_eq!(row.len(), 1);
    }
}
