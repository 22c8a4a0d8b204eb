//! Addressing of library sections, artists, albums and tracks.
//!
//! Every entity can be referenced either by its opaque server-assigned
//! [`Key`], as obtained from a previous listing, or by name within the scope
//! of a parent reference. Only keys can currently be resolved: resolving a
//! name fails with [`ErrorKind::Unimplemented`] and is never downgraded to
//! some other lookup.
//!
//! [`ErrorKind::Unimplemented`]: crate::error::ErrorKind::Unimplemented

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Opaque identifier assigned by the server, called `ratingKey` on the wire.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Key {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolves a reference to the key the server expects.
pub trait Resolve {
    /// # Errors
    ///
    /// Returns `Unimplemented` for any reference that is not a key.
    fn resolve(&self) -> Result<&Key>;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SectionRef {
    ByKey(Key),
    ByName(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArtistRef {
    ByKey(Key),
    ByName { section: SectionRef, name: String },
}

/// Scope in which an album name is looked up.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AlbumScope {
    Artist(ArtistRef),
    Section(SectionRef),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AlbumRef {
    ByKey(Key),
    ByName { scope: Box<AlbumScope>, name: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TrackRef {
    ByKey(Key),
    ByName { album: Box<AlbumRef>, name: String },
}

impl Resolve for SectionRef {
    fn resolve(&self) -> Result<&Key> {
        match self {
            Self::ByKey(key) => Ok(key),
            Self::ByName(name) => Err(Error::unimplemented(format!(
                "resolving section \"{name}\" by name"
            ))),
        }
    }
}

impl Resolve for ArtistRef {
    fn resolve(&self) -> Result<&Key> {
        match self {
            Self::ByKey(key) => Ok(key),
            Self::ByName { name, .. } => Err(Error::unimplemented(format!(
                "resolving artist \"{name}\" by name"
            ))),
        }
    }
}

impl Resolve for AlbumRef {
    fn resolve(&self) -> Result<&Key> {
        match self {
            Self::ByKey(key) => Ok(key),
            Self::ByName { name, .. } => Err(Error::unimplemented(format!(
                "resolving album \"{name}\" by name"
            ))),
        }
    }
}

impl Resolve for TrackRef {
    fn resolve(&self) -> Result<&Key> {
        match self {
            Self::ByKey(key) => Ok(key),
            Self::ByName { name, .. } => Err(Error::unimplemented(format!(
                "resolving track \"{name}\" by name"
            ))),
        }
    }
}

/// Section references parse as keys: that is the only form the server
/// understands.
impl FromStr for SectionRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::invalid_argument("section key must not be empty"));
        }

        Ok(Self::ByKey(Key::from(s)))
    }
}

impl fmt::Display for SectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByKey(key) => write!(f, "section {key}"),
            Self::ByName(name) => write!(f, "section \"{name}\""),
        }
    }
}
