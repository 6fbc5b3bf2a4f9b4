//! photopick-gallery — The gallery side of photopick.
//!
//! Loads the account credentials, drives the gallery site over WebDriver,
//! downloads photos and runs the walk that marks every photo in which a
//! registered target appears.

pub mod credentials;
pub mod fetcher;
pub mod portal;
pub mod prompt;
pub mod site;
pub mod walk;
pub mod webdriver;

pub use credentials::{load_credentials, Credentials, CredentialsError};
pub use fetcher::{FetchError, HttpPhotoFetcher, PhotoFetcher};
pub use portal::{PortalConfig, WebDriverGallery};
pub use prompt::{Chooser, ConsolePrompt, PromptError};
pub use site::{Folder, GallerySite, PhotoEntry, Room, SiteError};
pub use walk::{GalleryWalk, WalkError, WalkSummary, DEFAULT_PACING};
pub use webdriver::{WebDriver, WebDriverError};
