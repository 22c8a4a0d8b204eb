//! Track ratings from the Apple Music desktop application.
//!
//! Ratings are read through the AppleScript bridge by running `osascript`.
//! The lookup is best-effort: any failure is logged and reported as
//! [`Rating::UNRATED`], so a caller cannot tell "unrated" apart from "could
//! not be read".
//!
//! Tracks are matched by substring on track name and artist name, within the
//! "Library" playlist. The first match wins, so tracks with overlapping names
//! may pick up each other's ratings.

use std::{fmt, process::Stdio};

use tokio::process::Command;

use crate::{
    error::{Error, Result},
    rating::Rating,
};

/// Names identifying a track in the local library.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackQuery<'a> {
    /// Artist name, matched by substring.
    pub artist: &'a str,

    /// Album title. Only used in diagnostics.
    pub album: &'a str,

    /// Track name, matched by substring.
    pub track: &'a str,
}

impl fmt::Display for TrackQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} - {}", self.artist, self.album, self.track)
    }
}

/// Source of candidate ratings for the sync.
#[allow(async_fn_in_trait)]
pub trait RatingSource {
    /// The rating of a track, or [`Rating::UNRATED`] if it has none or
    /// cannot be found.
    async fn rating(&self, query: TrackQuery<'_>) -> Rating;
}

/// Boundary to the scripting bridge: names in, native rating or failure out.
#[allow(async_fn_in_trait)]
pub trait Bridge {
    /// The native rating of the first track matching `query`.
    ///
    /// # Errors
    ///
    /// Returns error if the bridge cannot be invoked, finds no match or
    /// answers with something else than a number.
    async fn native_rating(&self, query: TrackQuery<'_>) -> Result<u8>;
}

/// Escapes `s` for use inside an AppleScript string literal.
#[must_use]
pub fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for chr in s.chars() {
        match chr {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            chr if chr.is_control() => {}
            chr => escaped.push(chr),
        }
    }
    escaped
}

/// Reads ratings by running AppleScript through `osascript`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Osascript {
    /// Path or name of the AppleScript interpreter.
    program: String,
}

impl Osascript {
    /// Interpreter shipped with macOS.
    const PROGRAM: &'static str = "osascript";

    /// Scripting name of the Apple Music application.
    const APPLICATION: &'static str = "Music";

    /// Playlist holding every track of the local library.
    const PLAYLIST: &'static str = "Library";

    /// Creates a bridge that runs the system `osascript`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: Self::PROGRAM.to_owned(),
        }
    }

    /// Uses another interpreter than `osascript`.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The script that looks up the rating for `query`.
    #[must_use]
    pub fn script(query: TrackQuery<'_>) -> String {
        format!(
            r#"tell application "{application}"
	set results to (every track of playlist "{playlist}" whose name contains "{track}" and artist contains "{artist}")
	if results is {{}} then return ""
	return rating of item 1 of results
end tell"#,
            application = Self::APPLICATION,
            playlist = Self::PLAYLIST,
            track = escape(query.track),
            artist = escape(query.artist),
        )
    }

    /// Parses the output of the script into a native rating.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on empty output and `InvalidArgument` on anything
    /// that is not a number.
    pub fn parse(output: &str) -> Result<u8> {
        let output = output.trim();
        if output.is_empty() {
            return Err(Error::not_found("no matching track"));
        }

        output.parse::<u8>().map_err(|e| {
            Error::invalid_argument(format!("unexpected output \"{output}\": {e}"))
        })
    }
}

impl Default for Osascript {
    fn default() -> Self {
        Self::new()
    }
}

impl Bridge for Osascript {
    async fn native_rating(&self, query: TrackQuery<'_>) -> Result<u8> {
        let script = Self::script(query);
        trace!("{script}");

        let output = Command::new(&self.program)
            .arg("-e")
            .arg(&script)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::unknown(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Ratings from Apple Music, normalized to the shared scale.
#[derive(Clone, Debug, Default)]
pub struct LocalRatings<B = Osascript> {
    /// Bridge answering with native ratings.
    bridge: B,
}

impl<B: Bridge> LocalRatings<B> {
    /// Creates a rating source reading through `bridge`.
    #[must_use]
    pub fn new(bridge: B) -> Self {
        Self { bridge }
    }
}

impl<B: Bridge> RatingSource for LocalRatings<B> {
    async fn rating(&self, query: TrackQuery<'_>) -> Rating {
        match self
            .bridge
            .native_rating(query)
            .await
            .and_then(Rating::from_local)
        {
            Ok(rating) => {
                trace!("{query}: local rating {rating}");
                rating
            }
            Err(e) => {
                error!("{query}: could not read local rating: {e}");
                Rating::UNRATED
            }
        }
    }
}
