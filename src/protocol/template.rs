//! URL templates for the Plex endpoints.
//!
//! A small subset of RFC 6570 level 3:
//!
//! * `literal` path segments, copied as-is
//! * `{name}` path segments, replaced by a required, percent-encoded value
//! * a trailing `{?a,b,c}` expression, expanded into a query string with only
//!   those variables that are defined and not `null`
//!
//! Variables are looked up in a JSON object, which is how endpoint parameters
//! are serialized.
//!
//! # Example
//!
//! ```rust
//! let template: Template = "/library/sections/{key}/all{?type,sort}".parse()?;
//! let url = template.expand(&base_url, &serde_json::json!({ "key": "1", "type": 9 }))?;
//! assert_eq!(url.as_str(), "http://plex:32400/library/sections/1/all?type=9");
//! ```

use std::{fmt, str::FromStr};

use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A parsed URL template.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Template {
    segments: Vec<Segment>,
    query: Vec<String>,
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|chr| chr.is_ascii_alphanumeric() || matches!(chr, '_' | '-' | '.'))
}

impl FromStr for Template {
    type Err = Error;

    fn from_str(template: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::internal(format!("template {template}: {reason}"));

        let (path, query) = match template.find("{?") {
            Some(start) => {
                let expression = &template[start..];
                let names = expression
                    .strip_prefix("{?")
                    .and_then(|rest| rest.strip_suffix('}'))
                    .ok_or_else(|| invalid("query expression must end the template"))?;

                let names = names
                    .split(',')
                    .map(|name| {
                        if is_valid_name(name) {
                            Ok(name.to_owned())
                        } else {
                            Err(invalid("invalid query variable name"))
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;

                (&template[..start], names)
            }
            None => (template, Vec::new()),
        };

        let path = path
            .strip_prefix('/')
            .ok_or_else(|| invalid("path must be absolute"))?;

        let segments = path
            .split('/')
            .map(|segment| {
                if let Some(name) = segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                {
                    if is_valid_name(name) {
                        Ok(Segment::Variable(name.to_owned()))
                    } else {
                        Err(invalid("invalid path variable name"))
                    }
                } else if segment.is_empty() || segment.contains(['{', '}']) {
                    Err(invalid("malformed path segment"))
                } else {
                    Ok(Segment::Literal(segment.to_owned()))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { segments, query })
    }
}

/// Renders a scalar JSON value as it should appear in a URL.
///
/// Returns `None` for `null`.
fn scalar(name: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(if *b { "1" } else { "0" }.to_owned())),
        Value::Array(_) | Value::Object(_) => Err(Error::invalid_argument(format!(
            "variable {name} is not a scalar"
        ))),
    }
}

impl Template {
    /// Expands the template against `vars`, relative to `base`.
    ///
    /// Any path of `base` is kept as a prefix, so servers behind a reverse
    /// proxy can be reached under a sub-path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if:
    /// * `vars` is not an object
    /// * a path variable is missing, `null` or empty
    /// * a variable is not a scalar
    /// * `base` cannot have path segments
    pub fn expand(&self, base: &Url, vars: &Value) -> Result<Url> {
        let vars = vars
            .as_object()
            .ok_or_else(|| Error::invalid_argument("template variables must be an object"))?;

        let mut url = base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::invalid_argument(format!("{base} cannot be a base URL")))?;
            path.pop_if_empty();

            for segment in &self.segments {
                match segment {
                    Segment::Literal(literal) => {
                        path.push(literal);
                    }
                    Segment::Variable(name) => {
                        let value = vars
                            .get(name)
                            .map(|value| scalar(name, value))
                            .transpose()?
                            .flatten()
                            .filter(|value| !value.is_empty())
                            .ok_or_else(|| {
                                Error::invalid_argument(format!("path variable {name} is missing"))
                            })?;
                        path.push(&value);
                    }
                }
            }
        }

        let mut pairs = Vec::with_capacity(self.query.len());
        for name in &self.query {
            if let Some(value) = vars.get(name) {
                if let Some(value) = scalar(name, value)? {
                    pairs.push((name.as_str(), value));
                }
            }
        }

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }

        Ok(url)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => write!(f, "/{literal}")?,
                Segment::Variable(name) => write!(f, "/{{{name}}}")?,
            }
        }

        if !self.query.is_empty() {
            write!(f, "{{?{}}}", self.query.join(","))?;
        }

        Ok(())
    }
}
