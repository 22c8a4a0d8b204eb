//! Protocol types for the Plex Media Server REST API.
//!
//! Every endpoint is described by a static contract: a name, a URL
//! [`template`], the shape of its parameters and the shape of its response.
//! The contract is implemented through the [`Endpoint`] trait so that URL
//! construction and payload validation live apart from the call sites.
//!
//! # Submodules
//!
//! * [`library`] - Library listing and rating endpoints
//! * [`template`] - URL template parsing and expansion
//!
//! # Registry
//!
//! Templates are looked up by endpoint name in a registry that parses each
//! of them once, on first use. An endpoint that is not registered, or whose
//! template does not parse, fails with `Internal` before any request is made.

pub mod library;
pub mod template;

use std::{collections::HashMap, fmt::Debug, sync::LazyLock};

use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::error::{Error, Result};

use library::{MetadataChildren, Rate, SectionAll};
use template::Template;

/// Parameters of an endpoint, validated before any request is made.
pub trait Parameters: Serialize + Debug {
    /// Checks constraints that the type system does not.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` or `OutOfRange` when the parameters do not
    /// match the shape that the endpoint declares.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Static contract of a REST endpoint.
pub trait Endpoint {
    /// Logical name of the operation, used for logging.
    const NAME: &'static str;

    /// URL template, relative to the server base URL.
    const TEMPLATE: &'static str;

    type Params: Parameters;
    type Response: DeserializeOwned + Debug;

    /// Validates `params` and expands the registered template with them.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` or `OutOfRange` if the parameters are
    /// invalid, and `Internal` if the endpoint is not registered or its
    /// template is malformed.
    fn url(base: &Url, params: &Self::Params) -> Result<Url> {
        params.validate()?;

        let template = template(Self::NAME)?;
        let vars = serde_json::to_value(params).map_err(|e| {
            Error::invalid_argument(format!("{}: cannot serialize parameters: {e}", Self::NAME))
        })?;

        template.expand(base, &vars)
    }
}

/// Names and templates of all endpoints.
const ENDPOINTS: &[(&str, &str)] = &[
    (SectionAll::NAME, SectionAll::TEMPLATE),
    (MetadataChildren::NAME, MetadataChildren::TEMPLATE),
    (Rate::NAME, Rate::TEMPLATE),
];

/// Parsed templates by endpoint name, or why they failed to parse.
static REGISTRY: LazyLock<HashMap<&'static str, std::result::Result<Template, String>>> =
    LazyLock::new(|| {
        ENDPOINTS
            .iter()
            .map(|&(name, template)| {
                let parsed = template.parse::<Template>().map_err(|e| e.to_string());
                (name, parsed)
            })
            .collect()
    });

/// The parsed template of the endpoint called `name`.
///
/// # Errors
///
/// Returns `Internal` if no such endpoint is registered, or its template is
/// malformed.
pub fn template(name: &str) -> Result<&'static Template> {
    match REGISTRY.get(name) {
        Some(Ok(template)) => Ok(template),
        Some(Err(e)) => Err(Error::internal(format!("{name}: {e}"))),
        None => Err(Error::internal(format!("{name} is not a registered endpoint"))),
    }
}

/// Parses and logs a JSON response body.
///
/// A zero-length body is returned as `None` without any validation, because
/// some endpoints answer writes with an empty body.
///
/// # Errors
///
/// Returns `UnexpectedResponse` if the body is not valid JSON, or does not
/// match the shape of `T`.
pub fn json<T>(body: &[u8], origin: &str) -> Result<Option<T>>
where
    T: DeserializeOwned + Debug,
{
    if body.is_empty() {
        trace!("{origin}: empty body");
        return Ok(None);
    }

    match serde_json::from_slice(body) {
        Ok(result) => {
            trace!("{origin}: {result:#?}");
            Ok(Some(result))
        }
        Err(e) => {
            if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
                trace!("{origin}: {json:#?}");
            } else {
                error!("{origin}: failed parsing response ({e})");
                trace!("{}", String::from_utf8_lossy(body));
            }
            Err(Error::unexpected_response(format!("{origin}: {e}")))
        }
    }
}
