//! Sync track star ratings from Apple Music into a Plex Media Server.
//!
//! * [`library`] talks to the Plex library over its REST API
//! * [`music`] reads ratings from Apple Music through AppleScript
//! * [`sync`] decides per track whether a rating is copied over
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod http;
pub mod library;
pub mod music;
pub mod protocol;
pub mod rating;
pub mod reference;
pub mod sync;
pub mod token;
