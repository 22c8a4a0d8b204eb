use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::{reference::SectionRef, token::Token};

/// Fully resolved configuration of a sync run.
///
/// Built by the command line interface; the library never looks at the
/// environment itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Config {
    /// Product name sent in `X-Plex-Product`.
    pub app_name: String,

    /// Product version sent in `X-Plex-Version`.
    pub app_version: String,

    /// HTTP user agent.
    pub user_agent: String,

    /// Stable client identifier sent in `X-Plex-Client-Identifier`. Derived
    /// from the machine id where available.
    pub client_id: Uuid,

    /// Base URL of the Plex Media Server, e.g. `http://localhost:32400`.
    pub server_url: Url,

    /// Authentication token sent in `X-Plex-Token`.
    pub token: Token,

    /// Library section to sync.
    pub section: SectionRef,

    /// Compute and log every decision, but write nothing.
    pub dry_run: bool,

    /// Overwrite existing Plex ratings that differ.
    pub overwrite: bool,

    /// Pause after announcing a dry run.
    pub dry_run_delay: Duration,

    /// Pause after announcing overwrite mode, long enough to interrupt.
    pub overwrite_delay: Duration,
}

impl Config {
    /// Default pause after announcing a dry run.
    pub const DEFAULT_DRY_RUN_DELAY: Duration = Duration::from_secs(3);
    /// Default pause after announcing overwrite mode.
    pub const DEFAULT_OVERWRITE_DELAY: Duration = Duration::from_secs(10);

    /// Creates a configuration for `section` on the server at `server_url`.
    ///
    /// Modes are off and delays are at their defaults.
    #[must_use]
    pub fn new(server_url: Url, token: Token, section: SectionRef) -> Self {
        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();

        let client_id = match machine_uid::get() {
            Ok(machine_id) => {
                let namespace = Uuid::new_v5(&Uuid::NAMESPACE_DNS, b"plex.tv");
                Uuid::new_v5(&namespace, machine_id.as_bytes())
            }
            Err(e) => {
                warn!("could not get machine id, using random client id: {e}");
                Uuid::new_v4()
            }
        };
        trace!("client id: {client_id}");

        let os_name = match std::env::consts::OS {
            "macos" => "osx",
            other => other,
        };
        let os_version = sysinfo::System::os_version().unwrap_or_else(|| String::from("0"));

        let user_agent = format!("{app_name}/{app_version} (Rust; {os_name}/{os_version})");
        trace!("user agent: {user_agent}");

        Self {
            app_name,
            app_version,

            user_agent,
            client_id,

            server_url,
            token,
            section,

            dry_run: false,
            overwrite: false,

            dry_run_delay: Self::DEFAULT_DRY_RUN_DELAY,
            overwrite_delay: Self::DEFAULT_OVERWRITE_DELAY,
        }
    }
}
