//! Navigation capability of the photo gallery site.
//!
//! The walk only talks to this trait; element locators and click
//! mechanics live in the concrete binding ([`crate::portal`]).

use crate::webdriver::WebDriverError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("webdriver: {0}")]
    WebDriver(#[from] WebDriverError),
    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },
    #[error("unexpected page content: {0}")]
    UnexpectedPage(String),
}

/// An exhibition room listed after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub title: String,
    /// Order status text as shown by the site.
    pub status: String,
    pub link: String,
    /// Already bought; not worth walking again.
    pub purchased: bool,
}

/// A photo folder (album) inside a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub title: String,
    pub link: String,
}

/// One photo in the opened folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoEntry {
    /// Site-assigned id used to mark the photo.
    pub id: String,
    /// `None` when the listing carried no usable image URL.
    pub image_url: Option<String>,
}

#[async_trait]
pub trait GallerySite: Send {
    async fn authenticate(&mut self, login_id: &str, password: &str) -> Result<(), SiteError>;

    async fn list_rooms(&mut self) -> Result<Vec<Room>, SiteError>;

    async fn open_room(&mut self, room: &Room) -> Result<(), SiteError>;

    async fn list_folders(&mut self) -> Result<Vec<Folder>, SiteError>;

    async fn open_folder(&mut self, folder: &Folder) -> Result<(), SiteError>;

    async fn list_photos(&mut self) -> Result<Vec<PhotoEntry>, SiteError>;

    /// Flag a photo as an order candidate.
    async fn mark(&mut self, photo_id: &str) -> Result<(), SiteError>;

    /// Release the browser session. Safe to call more than once.
    async fn shutdown(&mut self) -> Result<(), SiteError>;
}
