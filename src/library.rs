//! Typed client for the Plex Media Server library.
//!
//! Hides the REST dialect of the server behind a handful of operations:
//! * [`Library::list_artists`] - artists in a section, capped at
//!   [`Library::ARTIST_PAGE_SIZE`]
//! * [`Library::list_albums`] - every album in a section
//! * [`Library::list_artist_albums`] - albums of one artist
//! * [`Library::list_album_tracks`] - tracks of one album, with ratings
//! * [`Library::set_track_rating`] - rates one track
//!
//! Every operation resolves its reference first, validates its parameters
//! before touching the network, and validates the response against the
//! endpoint contract from [`protocol`].
//!
//! # Errors
//!
//! * `Unimplemented` - a reference by name was passed
//! * `InvalidArgument` / `OutOfRange` - parameters do not match the contract
//! * `Unavailable` - the request failed or the server answered with a
//!   non-success status
//! * `UnexpectedResponse` - the body does not match the contract, or an
//!   entry lacks its parent title

use url::Url;

use crate::{
    config::Config,
    error::{Error, Result},
    http::Client as HttpClient,
    protocol::{
        self,
        library::{
            self as endpoints, MediaType, Metadata, MetadataChildren, MetadataChildrenParams,
            Rate, RateParams, SectionAll, SectionAllParams,
        },
        Endpoint,
    },
    rating::Rating,
    reference::{AlbumRef, ArtistRef, Key, Resolve, SectionRef, TrackRef},
};

/// An artist as listed in a section.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtistEntry {
    /// Server-assigned key of the artist.
    pub key: Key,

    /// Display name of the artist.
    pub name: String,
}

/// An album as listed in a section or under an artist.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AlbumEntry {
    /// Server-assigned key of the album.
    pub key: Key,

    /// Display title. May be empty for malformed catalog entries.
    pub title: String,

    /// Display name of the album artist.
    pub artist: String,
}

/// A track as listed under an album.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackEntry {
    /// Server-assigned key of the track.
    pub key: Key,

    /// Display title.
    pub title: String,

    /// Display title of the album the track is on.
    pub album: String,

    /// Current Plex rating; unrated tracks are [`Rating::UNRATED`].
    pub rating: Rating,
}

impl From<Metadata> for ArtistEntry {
    fn from(metadata: Metadata) -> Self {
        Self {
            key: metadata.rating_key,
            name: metadata.title,
        }
    }
}

impl TryFrom<Metadata> for AlbumEntry {
    type Error = Error;

    fn try_from(metadata: Metadata) -> Result<Self> {
        let artist = metadata.require_parent_title()?.to_owned();
        Ok(Self {
            key: metadata.rating_key,
            title: metadata.title,
            artist,
        })
    }
}

impl TryFrom<Metadata> for TrackEntry {
    type Error = Error;

    fn try_from(metadata: Metadata) -> Result<Self> {
        let album = metadata.require_parent_title()?.to_owned();
        let rating = metadata
            .user_rating
            .map_or(Rating::UNRATED, Rating::from_remote);

        Ok(Self {
            key: metadata.rating_key,
            title: metadata.title,
            album,
            rating,
        })
    }
}

/// The library operations that a sync needs.
#[allow(async_fn_in_trait)]
pub trait RemoteLibrary {
    /// Lists every album in `section`.
    async fn list_albums(&self, section: &SectionRef) -> Result<Vec<AlbumEntry>>;

    /// Lists every track of `album`.
    async fn list_album_tracks(&self, album: &AlbumRef) -> Result<Vec<TrackEntry>>;

    /// Rates `track`.
    async fn set_track_rating(&self, track: &TrackRef, rating: Rating) -> Result<()>;
}

/// Client for the library of one Plex Media Server.
pub struct Library {
    /// Rate-limited client carrying the authentication headers.
    http_client: HttpClient,

    /// Server URL that endpoint templates are expanded against.
    base_url: Url,
}

impl Library {
    /// Maximum number of artists returned by [`Library::list_artists`].
    ///
    /// Artists are not paginated: larger sections only list this prefix.
    pub const ARTIST_PAGE_SIZE: u32 = 1000;

    /// Creates a new client for the server in `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created, for example
    /// because the token is not a valid header value.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::new(config)?,
            base_url: config.server_url.clone(),
        })
    }

    /// Calls endpoint `E` with `params`.
    ///
    /// Returns `None` if the server answered with an empty body.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * the parameters do not match the endpoint
    /// * the request cannot be delivered
    /// * the server answers with a non-success status
    /// * a non-empty body does not match the response shape
    pub async fn fetch<E: Endpoint>(&self, params: &E::Params) -> Result<Option<E::Response>> {
        let url = E::url(&self.base_url, params)?;
        debug!("{}: GET {url}", E::NAME);

        let request = self.http_client.get(url);
        let response = self.http_client.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            error!(
                "{}: server returned {status}: {}",
                E::NAME,
                String::from_utf8_lossy(&body)
            );
            return Err(Error::unavailable(format!(
                "{} returned {status}",
                E::NAME
            )));
        }

        protocol::json::<E::Response>(&body, E::NAME)
    }

    /// Calls a listing endpoint, which must answer with a media container.
    async fn list<E>(&self, params: &E::Params) -> Result<Vec<Metadata>>
    where
        E: Endpoint<Response = endpoints::Response>,
    {
        self.fetch::<E>(params)
            .await?
            .map(|response| response.media_container.metadata)
            .ok_or_else(|| Error::unexpected_response(format!("{}: empty body", E::NAME)))
    }

    /// Lists the artists in `section`, up to [`Library::ARTIST_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// See the [module documentation](self).
    pub async fn list_artists(&self, section: &SectionRef) -> Result<Vec<ArtistEntry>> {
        let key = section.resolve()?;
        let params = SectionAllParams::new(key.clone(), MediaType::Artist)
            .sorted_by("titleSort")
            .first(Self::ARTIST_PAGE_SIZE);

        let artists = self
            .list::<SectionAll>(&params)
            .await?
            .into_iter()
            .take(Self::ARTIST_PAGE_SIZE as usize)
            .map(ArtistEntry::from)
            .collect();

        Ok(artists)
    }

    /// Lists the albums of `artist`.
    ///
    /// # Errors
    ///
    /// See the [module documentation](self).
    pub async fn list_artist_albums(&self, artist: &ArtistRef) -> Result<Vec<AlbumEntry>> {
        let key = artist.resolve()?;
        let params = MetadataChildrenParams::new(key.clone());

        self.list::<MetadataChildren>(&params)
            .await?
            .into_iter()
            .map(|metadata| {
                metadata.require_kind(MediaType::Album)?;
                AlbumEntry::try_from(metadata)
            })
            .collect()
    }
}

impl RemoteLibrary for Library {
    async fn list_albums(&self, section: &SectionRef) -> Result<Vec<AlbumEntry>> {
        let key = section.resolve()?;
        let params = SectionAllParams::new(key.clone(), MediaType::Album);

        self.list::<SectionAll>(&params)
            .await?
            .into_iter()
            .map(AlbumEntry::try_from)
            .collect()
    }

    async fn list_album_tracks(&self, album: &AlbumRef) -> Result<Vec<TrackEntry>> {
        let key = album.resolve()?;
        let params = MetadataChildrenParams::new(key.clone());

        self.list::<MetadataChildren>(&params)
            .await?
            .into_iter()
            .map(|metadata| {
                metadata.require_kind(MediaType::Track)?;
                TrackEntry::try_from(metadata)
            })
            .collect()
    }

    async fn set_track_rating(&self, track: &TrackRef, rating: Rating) -> Result<()> {
        let key = track.resolve()?;
        let params = RateParams::new(key.clone(), rating.to_remote());

        self.fetch::<Rate>(&params).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn metadata(json: &str) -> Metadata {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn album_entries_need_an_artist() {
        let album = AlbumEntry::try_from(metadata(
            r#"{ "ratingKey": "1", "title": "Abbey Road", "parentTitle": "The Beatles" }"#,
        ))
        .unwrap();
        assert_eq!(album.artist, "The Beatles");

        let err = AlbumEntry::try_from(metadata(r#"{ "ratingKey": "1", "title": "Abbey Road" }"#))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedResponse);
    }

    #[test]
    fn track_entries_need_an_album() {
        let err = TrackEntry::try_from(metadata(
            r#"{ "ratingKey": "1", "type": "track", "title": "Come Together" }"#,
        ))
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedResponse);
    }

    #[test]
    fn unrated_tracks_default_to_zero() {
        let track = TrackEntry::try_from(metadata(
            r#"{ "ratingKey": "1", "type": "track", "title": "Come Together",
                 "parentTitle": "Abbey Road" }"#,
        ))
        .unwrap();
        assert_eq!(track.rating, Rating::UNRATED);
    }

    #[test]
    fn track_ratings_are_normalized() {
        let track = TrackEntry::try_from(metadata(
            r#"{ "ratingKey": "1", "type": "track", "title": "Come Together",
                 "parentTitle": "Abbey Road", "userRating": 6.0 }"#,
        ))
        .unwrap();
        assert_eq!(track.rating.stars(), 3);
    }
}
