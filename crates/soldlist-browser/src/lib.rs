//! Chrome provisioning and the DevTools-backed [`soldlist_core::BrowserSession`].

mod cdp_session;
mod chrome_finder;
mod error;
mod launcher;
mod profile;

pub use cdp_session::ChromeSession;
pub use chrome_finder::ChromeFinder;
pub use error::{Error, Result};
pub use launcher::{ChromeLauncher, DEFAULT_DEBUGGING_PORT, LaunchOptions, USER_AGENTS};
pub use profile::ProfileManager;
