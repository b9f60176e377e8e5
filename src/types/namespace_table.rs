// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! A minimal namespace table, enough to resolve the URI of an `ExpandedNodeId` to an index.

/// The URI of namespace 0
pub const OPC_UA_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

/// Ordered list of namespace URIs, the position being the namespace index.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceTable {
    uris: Vec<String>,
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self {
            uris: vec![OPC_UA_NAMESPACE_URI.to_string()],
        }
    }
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a namespace URI, returning its index. A URI that is already present keeps its index.
    pub fn add(&mut self, uri: &str) -> u16 {
        if let Some(idx) = self.index_of(uri) {
            idx
        } else {
            self.uris.push(uri.to_string());
            (self.uris.len() - 1) as u16
        }
    }

    pub fn index_of(&self, uri: &str) -> Option<u16> {
        self.uris
            .iter()
            .position(|u| u == uri)
            .and_then(|idx| u16::try_from(idx).ok())
    }

    pub fn uri(&self, index: u16) -> Option<&str> {
        self.uris.get(index as usize).map(|u| u.as_str())
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }
}

#[test]
fn namespace_table() {
    let mut ns = NamespaceTable::new();
    assert_eq!(ns.index_of(OPC_UA_NAMESPACE_URI), Some(0));
    assert_eq!(ns.add("urn:a"), 1);
    assert_eq!(ns.add("urn:b"), 2);
    assert_eq!(ns.add("urn:a"), 1);
    assert_eq!(ns.uri(2), Some("urn:b"));
    assert_eq!(ns.uri(3), None);
    assert_eq!(ns.len(), 3);
}
