//! Reconciliation of Apple Music ratings into Plex.
//!
//! A sync walks every album of a library section, then every track of each
//! album, and decides per track whether the Apple Music rating should be
//! copied to Plex. Ratings only ever flow from Apple Music to Plex.
//!
//! # Decisions
//!
//! The first matching row wins:
//!
//! | Condition                            | Decision                       |
//! |--------------------------------------|--------------------------------|
//! | not overwriting and Plex is rated    | [`Decision::AlreadyRated`]     |
//! | Apple Music is unrated               | [`Decision::Unrated`]          |
//! | both ratings are equal               | [`Decision::InSync`]           |
//! | Plex is unrated                      | [`Decision::Fill`]             |
//! | overwriting                          | [`Decision::Overwrite`]        |
//!
//! # Failures
//!
//! Listing and writing failures abort the whole run. Albums without a title
//! are skipped with a warning, and so are tracks without a title or artist:
//! Apple Music matches names by substring, and an empty name matches
//! everything. Ratings that cannot be read from Apple Music count as
//! unrated.

use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::{
    config::Config,
    error::{Error, Result},
    library::{AlbumEntry, RemoteLibrary, TrackEntry},
    music::{RatingSource, TrackQuery},
    rating::Rating,
    reference::{AlbumRef, SectionRef, TrackRef},
};

/// What to do with one track.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Plex already has a rating, and overwriting is disabled.
    AlreadyRated,
    /// Apple Music has no rating to copy.
    Unrated,
    /// Both ratings are equal.
    InSync,
    /// Write the rating to a track that Plex has no rating for.
    Fill(Rating),
    /// Write the rating over a differing Plex rating.
    Overwrite(Rating),
}

impl Decision {
    /// The rating to write, if any.
    #[must_use]
    pub fn rating(self) -> Option<Rating> {
        match self {
            Self::Fill(rating) | Self::Overwrite(rating) => Some(rating),
            Self::AlreadyRated | Self::Unrated | Self::InSync => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRated => write!(f, "already rated, not overwriting"),
            Self::Unrated => write!(f, "unrated in Apple Music"),
            Self::InSync => write!(f, "already in sync"),
            Self::Fill(rating) => write!(f, "filling in {rating}"),
            Self::Overwrite(rating) => write!(f, "overwriting with {rating}"),
        }
    }
}

/// Decides what to do with a track rated `ours` in Plex and `theirs` in
/// Apple Music.
///
/// # Errors
///
/// Returns `Internal` if no row of the decision table matches. Every
/// combination of inputs is covered, so this indicates a defect.
pub fn decide(ours: Rating, theirs: Rating, overwrite: bool) -> Result<Decision> {
    if !overwrite && ours.is_rated() {
        return Ok(Decision::AlreadyRated);
    }

    if !theirs.is_rated() {
        return Ok(Decision::Unrated);
    }

    if theirs == ours {
        return Ok(Decision::InSync);
    }

    if !ours.is_rated() {
        return Ok(Decision::Fill(theirs));
    }

    if overwrite {
        return Ok(Decision::Overwrite(theirs));
    }

    Err(Error::internal(format!(
        "no decision for ours={ours} theirs={theirs} overwrite={overwrite}"
    )))
}

/// Totals of a sync run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Summary {
    /// Albums listed in the section.
    pub albums: usize,

    /// Albums skipped for having no title.
    pub skipped_albums: usize,

    /// Tracks visited on the remaining albums.
    pub tracks: usize,

    /// Ratings written. In a dry run, the ratings that would have been.
    pub written: usize,

    /// Tracks left alone.
    pub skipped: usize,

    /// Wall-clock duration of the pass, without the announcement pause.
    pub elapsed: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} albums ({} skipped), {} tracks: {} written, {} skipped in {:.1}s",
            self.albums,
            self.skipped_albums,
            self.tracks,
            self.written,
            self.skipped,
            self.elapsed.as_secs_f32()
        )
    }
}

/// A sync run from a [`RatingSource`] into a [`RemoteLibrary`].
pub struct Engine<L, R> {
    /// Where ratings are written.
    library: L,

    /// Where candidate ratings are read.
    ratings: R,

    /// Section to walk.
    section: SectionRef,
    dry_run: bool,
    overwrite: bool,
    dry_run_delay: Duration,
    overwrite_delay: Duration,
}

impl<L, R> Engine<L, R>
where
    L: RemoteLibrary,
    R: RatingSource,
{
    /// Creates a run over the section and modes of `config`.
    #[must_use]
    pub fn new(config: &Config, library: L, ratings: R) -> Self {
        Self {
            library,
            ratings,

            section: config.section.clone(),
            dry_run: config.dry_run,
            overwrite: config.overwrite,
            dry_run_delay: config.dry_run_delay,
            overwrite_delay: config.overwrite_delay,
        }
    }

    #[cfg(test)]
    fn library(&self) -> &L {
        &self.library
    }

    /// Announces the mode, then gives the operator time to interrupt before
    /// anything is written.
    async fn announce(&self) {
        match (self.dry_run, self.overwrite) {
            (true, false) => info!("dry run: no ratings will be written"),
            (true, true) => {
                info!("dry run: would overwrite existing ratings, but none will be written");
            }
            (false, true) => warn!(
                "overwriting existing ratings; interrupt within {:.0}s to cancel",
                self.overwrite_delay.as_secs_f32()
            ),
            (false, false) => {}
        }

        tokio::time::sleep(self.pause()).await;
    }

    /// How long to wait after announcing the mode.
    ///
    /// Only real overwrites get the longer pause.
    fn pause(&self) -> Duration {
        if self.dry_run {
            self.dry_run_delay
        } else if self.overwrite {
            self.overwrite_delay
        } else {
            Duration::ZERO
        }
    }

    /// Runs one full pass over the section.
    ///
    /// # Errors
    ///
    /// Returns the first listing or writing error, aborting the pass. Also
    /// returns `Internal` should the decision table ever fall through.
    pub async fn run(&self) -> Result<Summary> {
        self.announce().await;

        let start = Instant::now();
        let mut summary = Summary::default();

        info!("syncing {}", self.section);
        let albums = self.library.list_albums(&self.section).await?;
        debug!("{} has {} albums", self.section, albums.len());

        for album in albums {
            summary.albums += 1;

            if album.title.is_empty() {
                warn!("skipping album {} by {}: no title", album.key, album.artist);
                summary.skipped_albums += 1;
                continue;
            }

            self.sync_album(&album, &mut summary).await?;
        }

        summary.elapsed = start.elapsed();
        info!("sync completed: {summary}");

        Ok(summary)
    }

    async fn sync_album(&self, album: &AlbumEntry, summary: &mut Summary) -> Result<()> {
        debug!("{} - {}", album.artist, album.title);

        let tracks = self
            .library
            .list_album_tracks(&AlbumRef::ByKey(album.key.clone()))
            .await?;

        for track in tracks {
            summary.tracks += 1;
            if self.sync_track(album, &track).await? {
                summary.written += 1;
            } else {
                summary.skipped += 1;
            }
        }

        Ok(())
    }

    /// Returns whether a rating was, or in a dry run would have been,
    /// written.
    async fn sync_track(&self, album: &AlbumEntry, track: &TrackEntry) -> Result<bool> {
        if track.title.is_empty() || album.artist.is_empty() {
            warn!(
                "skipping track {} on {}: no title or artist",
                track.key, album.title
            );
            return Ok(false);
        }

        let query = TrackQuery {
            artist: &album.artist,
            album: &track.album,
            track: &track.title,
        };

        let ours = track.rating;
        let theirs = self.ratings.rating(query).await;
        let decision = decide(ours, theirs, self.overwrite)?;

        let Some(rating) = decision.rating() else {
            debug!("{query}: {decision} (ours: {ours}, theirs: {theirs})");
            return Ok(false);
        };

        if self.dry_run {
            info!("{query}: would write {rating}: {decision} (ours: {ours})");
            return Ok(true);
        }

        info!("{query}: {decision} (ours: {ours})");
        self.library
            .set_track_rating(&TrackRef::ByKey(track.key.clone()), rating)
            .await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashMap};

    use url::Url;

    use super::*;
    use crate::{
        error::ErrorKind,
        music::{Bridge, LocalRatings},
        reference::Key,
        token::Token,
    };

    fn rating(stars: u8) -> Rating {
        Rating::new(stars).unwrap()
    }

    #[derive(Default)]
    struct FakeLibrary {
        albums: Vec<AlbumEntry>,
        tracks: HashMap<Key, Vec<TrackEntry>>,
        fail_tracks: bool,
        writes: RefCell<Vec<(Key, Rating)>>,
    }

    impl RemoteLibrary for FakeLibrary {
        async fn list_albums(&self, _section: &SectionRef) -> Result<Vec<AlbumEntry>> {
            Ok(self.albums.clone())
        }

        async fn list_album_tracks(&self, album: &AlbumRef) -> Result<Vec<TrackEntry>> {
            if self.fail_tracks {
                return Err(Error::unavailable("list-item-children returned 500"));
            }
            let AlbumRef::ByKey(key) = album else {
                return Err(Error::unimplemented("by name"));
            };
            Ok(self.tracks.get(key).cloned().unwrap_or_default())
        }

        async fn set_track_rating(&self, track: &TrackRef, rating: Rating) -> Result<()> {
            let TrackRef::ByKey(key) = track else {
                return Err(Error::unimplemented("by name"));
            };
            self.writes.borrow_mut().push((key.clone(), rating));
            Ok(())
        }
    }

    struct FakeRatings(HashMap<String, Rating>);

    impl RatingSource for FakeRatings {
        async fn rating(&self, query: TrackQuery<'_>) -> Rating {
            self.0.get(query.track).copied().unwrap_or(Rating::UNRATED)
        }
    }

    struct BrokenBridge;

    impl Bridge for BrokenBridge {
        async fn native_rating(&self, _query: TrackQuery<'_>) -> Result<u8> {
            Err(Error::unknown("osascript exited with exit status: 1"))
        }
    }

    /// Fails for "Come Together", rates everything else four stars.
    struct FlakyBridge;

    impl Bridge for FlakyBridge {
        async fn native_rating(&self, query: TrackQuery<'_>) -> Result<u8> {
            if query.track == "Come Together" {
                return Err(Error::unknown("osascript exited with exit status: 1"));
            }
            Ok(80)
        }
    }

    fn config(dry_run: bool, overwrite: bool) -> Config {
        let mut config = Config::new(
            Url::parse("http://plex.local:32400").unwrap(),
            "gXz4rT3yNqPk1LmW9a".parse::<Token>().unwrap(),
            SectionRef::ByKey(Key::from("1")),
        );
        config.dry_run = dry_run;
        config.overwrite = overwrite;
        config.dry_run_delay = Duration::ZERO;
        config.overwrite_delay = Duration::ZERO;
        config
    }

    fn abbey_road(ours: Rating) -> FakeLibrary {
        let album = AlbumEntry {
            key: Key::from("100"),
            title: "Abbey Road".to_owned(),
            artist: "The Beatles".to_owned(),
        };
        let untitled = AlbumEntry {
            key: Key::from("200"),
            title: String::new(),
            artist: "Unknown Artist".to_owned(),
        };
        let track = TrackEntry {
            key: Key::from("101"),
            title: "Come Together".to_owned(),
            album: "Abbey Road".to_owned(),
            rating: ours,
        };

        FakeLibrary {
            albums: vec![untitled, album],
            tracks: HashMap::from([(Key::from("100"), vec![track])]),
            ..FakeLibrary::default()
        }
    }

    fn track(key: &str, title: &str) -> TrackEntry {
        TrackEntry {
            key: Key::from(key),
            title: title.to_owned(),
            album: "Abbey Road".to_owned(),
            rating: Rating::UNRATED,
        }
    }

    fn come_together(theirs: Rating) -> FakeRatings {
        FakeRatings(HashMap::from([("Come Together".to_owned(), theirs)]))
    }

    #[test]
    fn decision_table_is_total() {
        for overwrite in [false, true] {
            for ours in 0..=Rating::MAX {
                for theirs in 0..=Rating::MAX {
                    let result = decide(rating(ours), rating(theirs), overwrite);
                    assert!(
                        result.is_ok(),
                        "no decision for ours={ours} theirs={theirs} overwrite={overwrite}"
                    );
                }
            }
        }
    }

    #[test]
    fn decision_table_precedence() {
        use Decision::*;

        // (ours, theirs, overwrite) -> decision
        let cases = [
            (0, 0, false, Unrated),
            (0, 0, true, Unrated),
            (0, 4, false, Fill(rating(4))),
            (0, 4, true, Fill(rating(4))),
            (3, 0, false, AlreadyRated),
            (3, 0, true, Unrated),
            (3, 3, false, AlreadyRated),
            (3, 3, true, InSync),
            (3, 5, false, AlreadyRated),
            (3, 5, true, Overwrite(rating(5))),
        ];

        for (ours, theirs, overwrite, expected) in cases {
            assert_eq!(
                decide(rating(ours), rating(theirs), overwrite).unwrap(),
                expected,
                "ours={ours} theirs={theirs} overwrite={overwrite}"
            );
        }
    }

    #[test]
    fn only_fill_and_overwrite_write() {
        assert_eq!(Decision::Fill(rating(2)).rating(), Some(rating(2)));
        assert_eq!(Decision::Overwrite(rating(5)).rating(), Some(rating(5)));
        assert_eq!(Decision::AlreadyRated.rating(), None);
        assert_eq!(Decision::Unrated.rating(), None);
        assert_eq!(Decision::InSync.rating(), None);
    }

    #[tokio::test]
    async fn fills_unrated_track_and_skips_untitled_album() {
        let sync = Engine::new(
            &config(false, false),
            abbey_road(Rating::UNRATED),
            come_together(rating(4)),
        );
        let summary = sync.run().await.unwrap();

        assert_eq!(summary.albums, 2);
        assert_eq!(summary.skipped_albums, 1);
        assert_eq!(summary.tracks, 1);
        assert_eq!(summary.written, 1);
        assert_eq!(
            *sync.library().writes.borrow(),
            vec![(Key::from("101"), rating(4))]
        );
    }

    #[tokio::test]
    async fn in_sync_track_is_not_written() {
        let sync = Engine::new(
            &config(false, false),
            abbey_road(rating(3)),
            come_together(rating(3)),
        );
        let summary = sync.run().await.unwrap();

        assert_eq!(summary.written, 0);
        assert_eq!(summary.skipped, 1);
        assert!(sync.library().writes.borrow().is_empty());
    }

    #[tokio::test]
    async fn overwrites_differing_rating() {
        let sync = Engine::new(
            &config(false, true),
            abbey_road(rating(3)),
            come_together(rating(5)),
        );
        sync.run().await.unwrap();

        assert_eq!(
            *sync.library().writes.borrow(),
            vec![(Key::from("101"), rating(5))]
        );
    }

    #[tokio::test]
    async fn keeps_differing_rating_without_overwrite() {
        let sync = Engine::new(
            &config(false, false),
            abbey_road(rating(3)),
            come_together(rating(5)),
        );
        sync.run().await.unwrap();

        assert!(sync.library().writes.borrow().is_empty());
    }

    #[tokio::test]
    async fn dry_run_never_writes() {
        let sync = Engine::new(
            &config(true, true),
            abbey_road(Rating::UNRATED),
            come_together(rating(4)),
        );
        let summary = sync.run().await.unwrap();

        assert_eq!(summary.written, 1);
        assert!(sync.library().writes.borrow().is_empty());
    }

    #[tokio::test]
    async fn bridge_failure_is_skipped_as_unrated() {
        let sync = Engine::new(
            &config(false, false),
            abbey_road(Rating::UNRATED),
            LocalRatings::new(BrokenBridge),
        );
        let summary = sync.run().await.unwrap();

        assert_eq!(summary.tracks, 1);
        assert_eq!(summary.skipped, 1);
        assert!(sync.library().writes.borrow().is_empty());
    }

    #[tokio::test]
    async fn bridge_failure_does_not_stop_the_run() {
        let mut library = abbey_road(Rating::UNRATED);
        library.tracks.insert(
            Key::from("100"),
            vec![track("101", "Come Together"), track("102", "Something")],
        );

        let sync = Engine::new(&config(false, false), library, LocalRatings::new(FlakyBridge));
        let summary = sync.run().await.unwrap();

        assert_eq!(summary.tracks, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.written, 1);
        assert_eq!(
            *sync.library().writes.borrow(),
            vec![(Key::from("102"), rating(4))]
        );
    }

    #[tokio::test]
    async fn skips_tracks_that_would_match_everything() {
        let mut library = abbey_road(Rating::UNRATED);
        library.tracks.insert(
            Key::from("100"),
            vec![track("101", ""), track("102", "Something")],
        );

        let anonymous = AlbumEntry {
            key: Key::from("300"),
            title: "Demos".to_owned(),
            artist: String::new(),
        };
        library.albums.push(anonymous);
        library
            .tracks
            .insert(Key::from("300"), vec![track("301", "Something")]);

        let ratings = FakeRatings(HashMap::from([
            (String::new(), rating(5)),
            ("Something".to_owned(), rating(4)),
        ]));

        let sync = Engine::new(&config(false, false), library, ratings);
        let summary = sync.run().await.unwrap();

        assert_eq!(summary.tracks, 3);
        assert_eq!(summary.skipped, 2);
        assert_eq!(
            *sync.library().writes.borrow(),
            vec![(Key::from("102"), rating(4))]
        );
    }

    #[test]
    fn dry_runs_do_not_pause_for_overwrites() {
        let mut config = config(true, true);
        config.dry_run_delay = Duration::from_secs(3);
        config.overwrite_delay = Duration::from_secs(10);

        let dry = Engine::new(&config, FakeLibrary::default(), come_together(rating(4)));
        assert_eq!(dry.pause(), Duration::from_secs(3));

        config.dry_run = false;
        let real = Engine::new(&config, FakeLibrary::default(), come_together(rating(4)));
        assert_eq!(real.pause(), Duration::from_secs(10));

        config.overwrite = false;
        let plain = Engine::new(&config, FakeLibrary::default(), come_together(rating(4)));
        assert_eq!(plain.pause(), Duration::ZERO);
    }

    #[tokio::test]
    async fn listing_failure_aborts() {
        let mut library = abbey_road(Rating::UNRATED);
        library.fail_tracks = true;

        let sync = Engine::new(&config(false, false), library, come_together(rating(4)));
        let err = sync.run().await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Unavailable);
        assert!(sync.library().writes.borrow().is_empty());
    }
}
