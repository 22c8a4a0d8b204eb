//! Library endpoints of the Plex Media Server.
//!
//! # Wire Format
//!
//! All listings answer with a media container:
//! ```json
//! {
//!     "MediaContainer": {
//!         "size": 1,
//!         "Metadata": [
//!             {
//!                 "ratingKey": "1234",
//!                 "type": "track",
//!                 "title": "Come Together",
//!                 "parentTitle": "Abbey Road",
//!                 "userRating": 8.0
//!             }
//!         ]
//!     }
//! }
//! ```
//!
//! `Metadata` is left out entirely when a container is empty. `type` is only
//! guaranteed for children listings, `userRating` only for rated items.

use std::fmt;

use serde::{de::IgnoredAny, Deserialize, Serialize};
use serde_repr::Serialize_repr;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::{
    error::{Error, Result},
    reference::Key,
};

use super::{Endpoint, Parameters};

/// Kinds of library items.
///
/// Serialized as the numeric `type` filter of section listings, deserialized
/// from the `type` discriminator of metadata objects.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize_repr, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum MediaType {
    Artist = 8,
    Album = 9,
    Track = 10,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artist => write!(f, "artist"),
            Self::Album => write!(f, "album"),
            Self::Track => write!(f, "track"),
        }
    }
}

/// Response of every library listing.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Response {
    #[serde(rename = "MediaContainer")]
    pub media_container: MediaContainer,
}

/// Envelope of a listing.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MediaContainer {
    /// Listed items. Left out by the server when there are none.
    #[serde(default, rename = "Metadata")]
    pub metadata: Vec<Metadata>,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Opaque identifier of the item.
    pub rating_key: Key,

    #[serde(default, rename = "type")]
    pub kind: Option<MediaType>,

    /// Display name. Always present, but may be empty.
    pub title: String,

    /// Display name of the artist of an album, or the album of a track.
    #[serde(default)]
    pub parent_title: Option<String>,

    /// Some servers send numbers as strings.
    #[serde(default)]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub user_rating: Option<f64>,
}

impl Metadata {
    /// The parent title, which must be present.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedResponse` if the server left `parentTitle` out.
    pub fn require_parent_title(&self) -> Result<&str> {
        self.parent_title.as_deref().ok_or_else(|| {
            Error::unexpected_response(format!(
                "{} has no parent title",
                self.describe()
            ))
        })
    }

    /// Checks the `type` discriminator.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedResponse` if the item is missing a type or has a
    /// different one.
    pub fn require_kind(&self, expected: MediaType) -> Result<()> {
        match self.kind {
            Some(kind) if kind == expected => Ok(()),
            Some(kind) => Err(Error::unexpected_response(format!(
                "{} is of type {kind}, expected {expected}",
                self.describe()
            ))),
            None => Err(Error::unexpected_response(format!(
                "{} has no type, expected {expected}",
                self.describe()
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("item {} (\"{}\")", self.rating_key, self.title)
    }
}

fn require_key(endpoint: &str, key: &Key) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_argument(format!("{endpoint}: key must not be empty")));
    }
    Ok(())
}

/// Lists the contents of a library section.
#[derive(Copy, Clone, Debug)]
pub struct SectionAll;

impl Endpoint for SectionAll {
    const NAME: &'static str = "list-section-contents";
    const TEMPLATE: &'static str =
        "/library/sections/{key}/all{?type,sort,X-Plex-Container-Start,X-Plex-Container-Size}";

    type Params = SectionAllParams;
    type Response = Response;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SectionAllParams {
    /// Key of the section.
    pub key: Key,

    /// Only list items of this kind.
    #[serde(rename = "type")]
    pub kind: Option<MediaType>,

    /// Sort field, such as `titleSort`.
    pub sort: Option<String>,

    /// Offset of the first item to list.
    #[serde(rename = "X-Plex-Container-Start")]
    pub container_start: Option<u32>,

    /// Maximum number of items to list.
    #[serde(rename = "X-Plex-Container-Size")]
    pub container_size: Option<u32>,
}

impl SectionAllParams {
    /// Lists every item of `kind` in the section.
    #[must_use]
    pub fn new(key: Key, kind: MediaType) -> Self {
        Self {
            key,
            kind: Some(kind),
            sort: None,
            container_start: None,
            container_size: None,
        }
    }

    /// Limits the listing to the first `size` items.
    #[must_use]
    pub fn first(mut self, size: u32) -> Self {
        self.container_start = Some(0);
        self.container_size = Some(size);
        self
    }

    /// Sorts the listing by `sort`.
    #[must_use]
    pub fn sorted_by(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

impl Parameters for SectionAllParams {
    fn validate(&self) -> Result<()> {
        require_key(SectionAll::NAME, &self.key)?;

        if self.container_size == Some(0) {
            return Err(Error::invalid_argument(format!(
                "{}: container size must not be zero",
                SectionAll::NAME
            )));
        }

        if self.sort.as_deref().is_some_and(str::is_empty) {
            return Err(Error::invalid_argument(format!(
                "{}: sort must not be empty",
                SectionAll::NAME
            )));
        }

        Ok(())
    }
}

/// Lists the children of a library item: albums of an artist, or tracks of
/// an album.
#[derive(Copy, Clone, Debug)]
pub struct MetadataChildren;

impl Endpoint for MetadataChildren {
    const NAME: &'static str = "list-item-children";
    const TEMPLATE: &'static str = "/library/metadata/{key}/children{?excludeAllLeaves}";

    type Params = MetadataChildrenParams;
    type Response = Response;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetadataChildrenParams {
    /// Key of the parent item.
    pub key: Key,

    /// Lists direct children only, without the "All tracks" pseudo-album.
    #[serde(rename = "excludeAllLeaves")]
    exclude_all_leaves: bool,
}

impl MetadataChildrenParams {
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self {
            key,
            exclude_all_leaves: true,
        }
    }
}

impl Parameters for MetadataChildrenParams {
    fn validate(&self) -> Result<()> {
        require_key(MetadataChildren::NAME, &self.key)
    }
}

/// Sets the user rating of a library item.
#[derive(Copy, Clone, Debug)]
pub struct Rate;

impl Rate {
    /// Plugin identifier that owns library items.
    pub const IDENTIFIER: &'static str = "com.plexapp.plugins.library";

    /// Highest rating that the endpoint accepts.
    pub const MAX_RATING: u8 = 10;
}

impl Endpoint for Rate {
    const NAME: &'static str = "rate-entity";
    const TEMPLATE: &'static str = "/:/rate{?identifier,key,rating}";

    type Params = RateParams;
    type Response = IgnoredAny;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RateParams {
    identifier: &'static str,

    /// Key of the item to rate.
    pub key: Key,

    /// Native rating from 0 to [`Rate::MAX_RATING`], where 0 clears it.
    pub rating: u8,
}

impl RateParams {
    #[must_use]
    pub fn new(key: Key, rating: u8) -> Self {
        Self {
            identifier: Rate::IDENTIFIER,
            key,
            rating,
        }
    }
}

impl Parameters for RateParams {
    fn validate(&self) -> Result<()> {
        require_key(Rate::NAME, &self.key)?;

        if self.rating > Rate::MAX_RATING {
            return Err(Error::out_of_range(format!(
                "{}: rating {} exceeds {}",
                Rate::NAME,
                self.rating,
                Rate::MAX_RATING
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use url::Url;

    fn base() -> Url {
        Url::parse("http://plex.local:32400").unwrap()
    }

    #[test]
    fn section_all_url() {
        let params = SectionAllParams::new(Key::from("1"), MediaType::Album);
        let url = SectionAll::url(&base(), &params).unwrap();
        assert_eq!(url.as_str(), "http://plex.local:32400/library/sections/1/all?type=9");
    }

    #[test]
    fn section_all_url_with_page_and_sort() {
        let params = SectionAllParams::new(Key::from("1"), MediaType::Artist)
            .sorted_by("titleSort")
            .first(50);
        let url = SectionAll::url(&base(), &params).unwrap();
        assert_eq!(
            url.as_str(),
            "http://plex.local:32400/library/sections/1/all?type=8&sort=titleSort&X-Plex-Container-Start=0&X-Plex-Container-Size=50"
        );
    }

    #[test]
    fn children_url_excludes_all_leaves() {
        let params = MetadataChildrenParams::new(Key::from("1234"));
        let url = MetadataChildren::url(&base(), &params).unwrap();
        assert_eq!(
            url.as_str(),
            "http://plex.local:32400/library/metadata/1234/children?excludeAllLeaves=1"
        );
    }

    #[test]
    fn rate_url() {
        let params = RateParams::new(Key::from("5678"), 8);
        let url = Rate::url(&base(), &params).unwrap();
        assert_eq!(
            url.as_str(),
            "http://plex.local:32400/:/rate?identifier=com.plexapp.plugins.library&key=5678&rating=8"
        );
    }

    #[test]
    fn rate_bounds_are_inclusive() {
        assert!(RateParams::new(Key::from("1"), 0).validate().is_ok());
        assert!(RateParams::new(Key::from("1"), 10).validate().is_ok());

        let err = RateParams::new(Key::from("1"), 11).validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfRange);
        let err = Rate::url(&base(), &RateParams::new(Key::from("1"), 11)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfRange);
    }

    #[test]
    fn empty_keys_are_invalid() {
        let err = MetadataChildrenParams::new(Key::from("")).validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);

        let err = SectionAllParams::new(Key::from(""), MediaType::Album)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn zero_page_size_is_invalid() {
        let params = SectionAllParams::new(Key::from("1"), MediaType::Artist).first(0);
        assert_eq!(params.validate().unwrap_err().kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn parses_media_container() {
        let body = r#"{
            "MediaContainer": {
                "size": 2,
                "Metadata": [
                    { "ratingKey": "1", "type": "track", "title": "Come Together",
                      "parentTitle": "Abbey Road", "userRating": 8.0 },
                    { "ratingKey": "2", "type": "track", "title": "Something",
                      "parentTitle": "Abbey Road" }
                ]
            }
        }"#;
        let response: Response = serde_json::from_str(body).unwrap();
        let metadata = &response.media_container.metadata;
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[0].kind, Some(MediaType::Track));
        assert_eq!(metadata[0].user_rating, Some(8.0));
        assert_eq!(metadata[1].user_rating, None);
        assert_eq!(metadata[1].require_parent_title().unwrap(), "Abbey Road");
    }

    #[test]
    fn accepts_ratings_as_strings() {
        let body = r#"{ "MediaContainer": { "size": "1", "Metadata": [
            { "ratingKey": "1", "type": "track", "title": "Something", "userRating": "6" }
        ] } }"#;
        let response: Response = serde_json::from_str(body).unwrap();
        assert_eq!(response.media_container.metadata[0].user_rating, Some(6.0));
    }

    #[test]
    fn title_is_required() {
        let result = serde_json::from_str::<Metadata>(
            r#"{ "ratingKey": "1", "type": "track", "parentTitle": "Abbey Road" }"#,
        );
        assert!(result.is_err());

        let metadata: Metadata =
            serde_json::from_str(r#"{ "ratingKey": "1", "type": "album", "title": "" }"#).unwrap();
        assert!(metadata.title.is_empty());
    }

    #[test]
    fn empty_container_has_no_metadata() {
        let response: Response =
            serde_json::from_str(r#"{ "MediaContainer": { "size": 0 } }"#).unwrap();
        assert!(response.media_container.metadata.is_empty());
    }

    #[test]
    fn missing_parent_title_is_unexpected() {
        let metadata: Metadata =
            serde_json::from_str(r#"{ "ratingKey": "1", "title": "Abbey Road" }"#).unwrap();
        let err = metadata.require_parent_title().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedResponse);
    }

    #[test]
    fn wrong_kind_is_unexpected() {
        let metadata: Metadata =
            serde_json::from_str(r#"{ "ratingKey": "1", "type": "album", "title": "x" }"#)
                .unwrap();
        assert!(metadata.require_kind(MediaType::Album).is_ok());
        assert_eq!(
            metadata.require_kind(MediaType::Track).unwrap_err().kind,
            ErrorKind::UnexpectedResponse
        );
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        let result = serde_json::from_str::<Metadata>(
            r#"{ "ratingKey": "1", "type": "photo", "title": "x" }"#,
        );
        assert!(result.is_err());
    }
}
