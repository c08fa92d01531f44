//! Field-name lists. Pure data; every stream carries one.
//!
//! A `Schema` is the ordered, duplicate-free list of column names that every
//! row of a stream exposes, in that order.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub names: Vec<String>,
}

impl Schema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::default();
        for name in names {
            schema.push(name);
        }
        schema
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Append `name` unless already present. Returns whether it was added.
    pub fn push(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Names of `self` that also appear in `other`, in `self` order.
    pub fn common(&self, other: &Schema) -> Vec<String> {
        self.names
            .iter()
            .filter(|n| other.contains(n))
            .cloned()
            .collect()
    }

    /// Names of `self` that do not appear in `other`, in `self` order.
    pub fn difference(&self, other: &Schema) -> Vec<String> {
        self.names
            .iter()
            .filter(|n| !other.contains(n))
            .cloned()
            .collect()
    }

    /// `self` followed by the names only `other` has.
    pub fn union(&self, other: &Schema) -> Schema {
        let mut out = self.clone();
        for name in &other.names {
            out.push(name.clone());
        }
        out
    }

    /// Fail with a schema error listing every name of `wanted` that is absent.
    pub fn require<'a, I>(&self, wanted: I, source_name: &str) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut missing: Vec<String> = wanted
            .into_iter()
            .filter(|n| !self.contains(n))
            .map(|n| n.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        missing.dedup();
        Err(Error::ColumnsNotFound {
            source_name: source_name.to_string(),
            columns: missing,
        })
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}
