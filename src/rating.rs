//! Star ratings and their conversions between scales.
//!
//! Both systems are compared on a shared scale of 0 to 5 stars, where 0 means
//! "unrated". There is no way to represent "rated zero stars".
//!
//! * Apple Music stores ratings from 0 to 100 in steps of 20 per star.
//! * Plex stores `userRating` from 0 to 10 in steps of 2 per star.
//!
//! Reading from either system divides by the step size and rounds to the
//! nearest star. Writing to Plex multiplies by the step size again, so a
//! four-star rating is sent as `8`.

use std::fmt;

use crate::error::{Error, Result};

/// A rating on the shared 0 to 5 star scale.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    /// No rating.
    pub const UNRATED: Self = Self(0);

    /// Highest rating on the shared scale.
    pub const MAX: u8 = 5;

    /// Native Apple Music units per star.
    pub const LOCAL_STEP: u8 = 20;

    /// Highest native Apple Music rating.
    pub const LOCAL_MAX: u8 = Self::MAX * Self::LOCAL_STEP;

    /// Native Plex units per star.
    pub const REMOTE_STEP: u8 = 2;

    /// Highest native Plex rating.
    pub const REMOTE_MAX: u8 = Self::MAX * Self::REMOTE_STEP;

    /// Creates a rating on the shared scale.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `stars` exceeds [`Rating::MAX`].
    pub fn new(stars: u8) -> Result<Self> {
        if stars > Self::MAX {
            return Err(Error::out_of_range(format!(
                "rating {stars} exceeds {} stars",
                Self::MAX
            )));
        }

        Ok(Self(stars))
    }

    /// Converts a native Apple Music rating, rounding to the nearest star.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `native` exceeds [`Rating::LOCAL_MAX`].
    pub fn from_local(native: u8) -> Result<Self> {
        if native > Self::LOCAL_MAX {
            return Err(Error::out_of_range(format!(
                "native rating {native} exceeds {}",
                Self::LOCAL_MAX
            )));
        }

        Ok(Self(div_round(native, Self::LOCAL_STEP)))
    }

    /// Converts a Plex `userRating`, rounding to the nearest star.
    ///
    /// Plex sends user ratings as JSON numbers which may be fractional.
    /// Values outside of 0 to 10 are clamped.
    #[must_use]
    pub fn from_remote(user_rating: f64) -> Self {
        let stars = (user_rating / f64::from(Self::REMOTE_STEP)).round();
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let stars = stars.clamp(0.0, f64::from(Self::MAX)) as u8;
        Self(stars)
    }

    /// The rating in native Apple Music units.
    #[must_use]
    pub fn to_local(self) -> u8 {
        self.0 * Self::LOCAL_STEP
    }

    /// The rating in native Plex units.
    #[must_use]
    pub fn to_remote(self) -> u8 {
        self.0 * Self::REMOTE_STEP
    }

    #[must_use]
    pub fn stars(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_rated(self) -> bool {
        self.0 > 0
    }
}

/// Integer division rounding half away from zero.
fn div_round(value: u8, step: u8) -> u8 {
    let (value, step) = (u16::from(value), u16::from(step));
    u8::try_from((value + step / 2) / step).unwrap_or(u8::MAX)
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}
