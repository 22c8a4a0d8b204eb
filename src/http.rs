//! HTTP client with rate limiting for the Plex Media Server.
//!
//! This module provides a wrapper around `reqwest::Client` that adds:
//! * Request rate limiting so a full sync does not hammer the server
//! * Authentication and identification headers on every request
//! * Consistent keep-alive and connect timeouts
//!
//! There is deliberately no overall request timeout: a server that stops
//! answering blocks the run until it is interrupted.

use std::{future::Future, num::NonZeroU32, time::Duration};

use futures_util::{FutureExt, TryFutureExt};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{
    self,
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT},
    Method, Url,
};

use crate::{config::Config, error::Result};

/// HTTP client with built-in rate limiting.
pub struct Client {
    /// Direct access to underlying client without rate limiting.
    pub unlimited: reqwest::Client,

    rate_limiter: DefaultDirectRateLimiter,
}

impl Client {
    /// Rolling window during which at most `RATE_LIMIT_CALLS_PER_INTERVAL`
    /// calls are made.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(1);

    /// Maximum calls per interval. Bursts up to this size are allowed.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u8 = 20;

    /// Duration to keep idle connections alive.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Duration to wait for a connection to be established.
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Header carrying the authentication token.
    pub const TOKEN_HEADER: HeaderName = HeaderName::from_static("x-plex-token");

    /// Header identifying this client instance.
    pub const CLIENT_ID_HEADER: HeaderName = HeaderName::from_static("x-plex-client-identifier");

    /// Header with the product name.
    pub const PRODUCT_HEADER: HeaderName = HeaderName::from_static("x-plex-product");

    /// Header with the product version.
    pub const VERSION_HEADER: HeaderName = HeaderName::from_static("x-plex-version");

    /// The server answers in XML unless JSON is asked for.
    const JSON_CONTENT: HeaderValue = HeaderValue::from_static("application/json");

    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * the token or another header value is invalid
    /// * HTTP client creation fails
    ///
    /// # Panics
    ///
    /// Panics if rate limit parameters are zero.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, Self::JSON_CONTENT);

        let mut token = HeaderValue::from_str(config.token.as_str())?;
        token.set_sensitive(true);
        headers.insert(Self::TOKEN_HEADER, token);

        headers.insert(
            Self::CLIENT_ID_HEADER,
            HeaderValue::from_str(&config.client_id.to_string())?,
        );
        headers.insert(Self::PRODUCT_HEADER, HeaderValue::from_str(&config.app_name)?);
        headers.insert(
            Self::VERSION_HEADER,
            HeaderValue::from_str(&config.app_version)?,
        );

        let http_client = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .default_headers(headers)
            .user_agent(&config.user_agent);

        let replenish_interval =
            Self::RATE_LIMIT_INTERVAL / u32::from(Self::RATE_LIMIT_CALLS_PER_INTERVAL);
        let quota = Quota::with_period(replenish_interval)
            .expect("quota time interval is zero")
            .allow_burst(
                NonZeroU32::new(Self::RATE_LIMIT_CALLS_PER_INTERVAL.into())
                    .expect("calls per interval is zero"),
            );

        Ok(Self {
            unlimited: http_client.build()?,
            rate_limiter: governor::RateLimiter::direct(quota),
        })
    }

    /// Builds a request with specified method and URL.
    fn request(method: Method, url: Url) -> reqwest::Request {
        reqwest::Request::new(method, url)
    }

    /// Builds a GET request.
    #[must_use]
    pub fn get(&self, url: Url) -> reqwest::Request {
        Self::request(Method::GET, url)
    }

    /// Executes a request with rate limiting.
    ///
    /// # Errors
    ///
    /// Returns error if the request could not be delivered or no response
    /// was received. A non-success status is not an error at this level.
    pub fn execute(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<reqwest::Response>> + '_ {
        let throttle = self.rate_limiter.until_ready();
        throttle.then(|()| self.unlimited.execute(request).map_err(Into::into))
    }
}
