#![forbid(unsafe_code)]
//! Identifier newtypes and the heap snapshot type vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dense, zero-based index of a node within one [`crate::heap::HeapGraph`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct NodeIndex(pub u32);

/// Dense, zero-based index of an edge within one [`crate::heap::HeapGraph`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct EdgeIndex(pub u32);

/// Interned string identifier handed out by [`crate::primitives::dict::StringMap`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct StrId(pub u32);

impl NodeIndex {
    /// Returns the index as a `usize` for slice addressing.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl EdgeIndex {
    /// Returns the index as a `usize` for slice addressing.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeIndex {
    fn from(value: u32) -> Self {
        NodeIndex(value)
    }
}

impl From<NodeIndex> for u32 {
    fn from(value: NodeIndex) -> Self {
        value.0
    }
}

impl From<u32> for EdgeIndex {
    fn from(value: u32) -> Self {
        EdgeIndex(value)
    }
}

impl From<EdgeIndex> for u32 {
    fn from(value: EdgeIndex) -> Self {
        value.0
    }
}

/// Node kinds as encoded by V8 heap snapshots.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SnapshotNodeType {
    /// Internal VM object not visible to scripts.
    Hidden,
    /// Backing store of an array or object elements.
    Array,
    /// Flat string.
    String,
    /// JavaScript object.
    Object,
    /// Compiled code.
    Code,
    /// Function closure.
    Closure,
    /// Regular expression.
    RegExp,
    /// Boxed heap number.
    HeapNumber,
    /// Embedder-owned native object (DOM and friends).
    Native,
    /// Grouping node introduced by the snapshot format.
    Synthetic,
    /// Concatenated (rope) string.
    ConsString,
    /// Substring view over another string.
    SlicedString,
    /// Symbol.
    Symbol,
    /// Arbitrary precision integer.
    BigInt,
    /// Any code the vocabulary does not cover.
    Unknown(u8),
}

impl From<u8> for SnapshotNodeType {
    fn from(code: u8) -> Self {
        match code {
            0 => SnapshotNodeType::Hidden,
            1 => SnapshotNodeType::Array,
            2 => SnapshotNodeType::String,
            3 => SnapshotNodeType::Object,
            4 => SnapshotNodeType::Code,
            5 => SnapshotNodeType::Closure,
            6 => SnapshotNodeType::RegExp,
            7 => SnapshotNodeType::HeapNumber,
            8 => SnapshotNodeType::Native,
            9 => SnapshotNodeType::Synthetic,
            10 => SnapshotNodeType::ConsString,
            11 => SnapshotNodeType::SlicedString,
            12 => SnapshotNodeType::Symbol,
            13 => SnapshotNodeType::BigInt,
            other => SnapshotNodeType::Unknown(other),
        }
    }
}

impl SnapshotNodeType {
    /// Returns the wire code for this node type.
    pub const fn code(self) -> u8 {
        match self {
            SnapshotNodeType::Hidden => 0,
            SnapshotNodeType::Array => 1,
            SnapshotNodeType::String => 2,
            SnapshotNodeType::Object => 3,
            SnapshotNodeType::Code => 4,
            SnapshotNodeType::Closure => 5,
            SnapshotNodeType::RegExp => 6,
            SnapshotNodeType::HeapNumber => 7,
            SnapshotNodeType::Native => 8,
            SnapshotNodeType::Synthetic => 9,
            SnapshotNodeType::ConsString => 10,
            SnapshotNodeType::SlicedString => 11,
            SnapshotNodeType::Symbol => 12,
            SnapshotNodeType::BigInt => 13,
            SnapshotNodeType::Unknown(code) => code,
        }
    }
}

/// Edge kinds as encoded by V8 heap snapshots.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SnapshotEdgeType {
    /// Variable captured in a function context.
    ContextVariable,
    /// Array element, addressed by index.
    Element,
    /// Named property.
    Property,
    /// VM-internal reference (elements, table, properties, context, ...).
    Internal,
    /// Hidden reference that still counts toward retained size.
    Hidden,
    /// Shortcut edge introduced by the snapshot writer.
    Shortcut,
    /// Weak reference; does not retain its target.
    Weak,
    /// Any code the vocabulary does not cover.
    Unknown(u8),
}

impl From<u8> for SnapshotEdgeType {
    fn from(code: u8) -> Self {
        match code {
            0 => SnapshotEdgeType::ContextVariable,
            1 => SnapshotEdgeType::Element,
            2 => SnapshotEdgeType::Property,
            3 => SnapshotEdgeType::Internal,
            4 => SnapshotEdgeType::Hidden,
            5 => SnapshotEdgeType::Shortcut,
            6 => SnapshotEdgeType::Weak,
            other => SnapshotEdgeType::Unknown(other),
        }
    }
}

impl SnapshotEdgeType {
    /// Returns the wire code for this edge type.
    pub const fn code(self) -> u8 {
        match self {
            SnapshotEdgeType::ContextVariable => 0,
            SnapshotEdgeType::Element => 1,
            SnapshotEdgeType::Property => 2,
            SnapshotEdgeType::Internal => 3,
            SnapshotEdgeType::Hidden => 4,
            SnapshotEdgeType::Shortcut => 5,
            SnapshotEdgeType::Weak => 6,
            SnapshotEdgeType::Unknown(code) => code,
        }
    }

    /// Resolves how the `name_or_index` field of this edge kind is interpreted.
    ///
    /// Returns `None` for codes outside the known vocabulary.
    pub const fn edge_type(self) -> Option<EdgeType> {
        match self {
            SnapshotEdgeType::Element | SnapshotEdgeType::Hidden => Some(EdgeType::Index),
            SnapshotEdgeType::ContextVariable
            | SnapshotEdgeType::Internal
            | SnapshotEdgeType::Shortcut
            | SnapshotEdgeType::Weak
            | SnapshotEdgeType::Property => Some(EdgeType::Named),
            SnapshotEdgeType::Unknown(_) => None,
        }
    }
}

/// Interpretation of an edge's `name_or_index` field.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Raw numeric index (array elements, hidden slots).
    Index,
    /// Interned string name.
    Named,
}

/// Resolved `name_or_index` of an edge.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum IndexOrName<'a> {
    /// Numeric index.
    Index(u32),
    /// Property or variable name.
    Name(&'a str),
}

impl IndexOrName<'_> {
    /// Returns `true` when this is a named edge with exactly `name`.
    pub fn is_name(&self, name: &str) -> bool {
        matches!(self, IndexOrName::Name(n) if *n == name)
    }
}

impl fmt::Display for IndexOrName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOrName::Index(i) => write!(f, "{i}"),
            IndexOrName::Name(n) => write!(f, "{n}"),
        }
    }
}
