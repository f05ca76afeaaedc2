//! Attribute schema and candidates.
//!
//! The schema fixes the attribute order for a run; a [`Candidate`] is an
//! immutable attribute vector in that order.  Validation happens here, at the
//! boundary: anything that reaches the engine is complete.

use std::collections::BTreeMap;

use crate::{Combo, Error, Result, MAX_ATTRIBUTES};

/// Ordered attribute names for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeSchema {
    names: Vec<String>,
}

impl AttributeSchema {
    /// Build a schema, rejecting empty, oversized or duplicate name lists.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(Error::EmptySchema);
        }
        if names.len() > MAX_ATTRIBUTES {
            return Err(Error::TooManyAttributes {
                count: names.len(),
                max: MAX_ATTRIBUTES,
            });
        }
        for (i, n) in names.iter().enumerate() {
            if names[..i].contains(n) {
                return Err(Error::DuplicateAttribute(n.clone()));
            }
        }
        Ok(Self { names })
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed schema; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Attribute names in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of attribute `i`.
    pub fn name(&self, i: usize) -> Option<&str> {
        self.names.get(i).map(String::as_str)
    }

    /// Index of the attribute called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Render a combination as `name=bool` pairs, for logs.
    pub fn describe(&self, combo: Combo) -> BTreeMap<&str, bool> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), combo.has(i)))
            .collect()
    }
}

/// One arriving candidate: an optional external id plus its attribute vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Candidate {
    /// Caller-assigned id (e.g. the position in the upstream stream).
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub id: Option<u64>,
    combo: Combo,
}

impl Candidate {
    /// Wrap an already-validated combination.
    pub fn new(combo: Combo) -> Self {
        Self { id: None, combo }
    }

    /// Parse `(name, present)` pairs against `schema`.
    ///
    /// Every schema attribute must appear; unknown names are rejected.  A name
    /// that appears twice keeps its last value.
    pub fn from_pairs<I, S>(schema: &AttributeSchema, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, bool)>,
        S: AsRef<str>,
    {
        let mut seen = Combo::EMPTY;
        let mut combo = Combo::EMPTY;
        for (name, present) in pairs {
            let name = name.as_ref();
            let i = schema.index_of(name).ok_or_else(|| Error::UnknownAttribute {
                name: name.to_string(),
            })?;
            seen = seen.with(i);
            combo = if present {
                combo.with(i)
            } else {
                combo.minus(Combo::EMPTY.with(i))
            };
        }
        if let Some(missing) = (0..schema.len()).find(|&i| !seen.has(i)) {
            return Err(Error::MalformedCandidate {
                missing: schema.names()[missing].clone(),
            });
        }
        Ok(Self { id: None, combo })
    }

    /// Build from presence flags in schema order; the length must match the schema.
    pub fn from_flags(schema: &AttributeSchema, flags: &[bool]) -> Result<Self> {
        if flags.len() != schema.len() {
            return Err(Error::SchemaMismatch {
                expected: schema.len(),
                got: flags.len(),
            });
        }
        Ok(Self::new(Combo::from_flags(flags)))
    }

    /// Attach an external id.
    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// The attribute combination.
    pub fn combo(&self) -> Combo {
        self.combo
    }

    /// Whether attribute `i` is present.
    pub fn has(&self, i: usize) -> bool {
        self.combo.has(i)
    }
}
