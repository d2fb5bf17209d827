// src/program/request.rs

//! Capability selectors and the Request algebra.
//!
//! A [`Request`] is the set of capability selectors a node needs from a
//! device. Devices advertise their own selector set and satisfy a request
//! when they carry a superset of it ([`Request::contains`]). Merging the
//! requirements of several nodes is the union of their selectors
//! ([`Request::meet`]).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known capability selector values.
pub mod capabilities {
    pub const MIXER: &str = "mixer";
    pub const INCUBATOR: &str = "incubator";
    pub const HUMAN: &str = "human";
    pub const PROMPTER: &str = "prompter";
    pub const PLATE_READER: &str = "plate-reader";
}

/// Selector name used for plain capability requirements.
pub const SELECTOR_CAPABILITY: &str = "capability";

/// One name/value capability requirement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub name: String,
    pub value: String,
}

impl Selector {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// A set of selectors a device must satisfy.
///
/// Stored as a `BTreeSet` so iteration and `Display` are stable, which
/// keeps error messages and device palettes deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    selectors: BTreeSet<Selector>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// A request carrying the single well-known capability selector `value`.
    pub fn capability(value: &str) -> Self {
        Self::new().with(SELECTOR_CAPABILITY, value)
    }

    /// Builder-style addition of one selector.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.selectors.insert(Selector::new(name, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn selectors(&self) -> impl Iterator<Item = &Selector> {
        self.selectors.iter()
    }

    /// Superset test: does `self` satisfy everything `other` asks for?
    pub fn contains(&self, other: &Request) -> bool {
        other.selectors.is_subset(&self.selectors)
    }

    /// Merge many requests into one: the union of all their selectors.
    ///
    /// A Bundle's effective requirement is the meet of its Command
    /// children's requests.
    pub fn meet<'a>(reqs: impl IntoIterator<Item = &'a Request>) -> Request {
        let mut out = Request::new();
        for r in reqs {
            out.selectors.extend(r.selectors.iter().cloned());
        }
        out
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, sel) in self.selectors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{sel}")?;
        }
        write!(f, "}}")
    }
}
