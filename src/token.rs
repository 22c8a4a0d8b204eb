//! Plex authentication token.
//!
//! The token grants full access to the Plex account, so it is redacted from
//! debug output and marked sensitive in request headers.

use std::{fs, path::Path, str::FromStr};

use veil::Redact;

use crate::error::{Error, Result};

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Redact)]
pub struct Token(#[redact] String);

impl Token {
    /// Secrets files should be tiny.
    const MAX_FILE_SIZE: u64 = 1024;

    /// Plex tokens are around 20 characters long. This is a sanity bound.
    const MAX_LENGTH: usize = 256;

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Loads the token from the `token` key of a TOML secrets file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is too large, is not valid
    /// TOML, or does not contain a valid token.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let attributes = fs::metadata(path)?;
        if attributes.len() > Self::MAX_FILE_SIZE {
            return Err(Error::invalid_argument(format!(
                "{} is too large",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let value = contents.parse::<toml::Table>()?;

        match value.get("token").and_then(toml::Value::as_str) {
            Some(token) => token.parse(),
            None => Err(Error::invalid_argument(format!(
                "{} does not contain a token",
                path.display()
            ))),
        }
    }
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::invalid_argument("token must not be empty"));
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(Error::invalid_argument(format!(
                "token should be at most {} characters long but is {}",
                Self::MAX_LENGTH,
                s.len()
            )));
        }

        if s.contains(|chr: char| chr.is_whitespace() || chr.is_control() || !chr.is_ascii()) {
            return Err(Error::invalid_argument(
                "token contains whitespace or non-ASCII characters",
            ));
        }

        Ok(Self(s.to_owned()))
    }
}
