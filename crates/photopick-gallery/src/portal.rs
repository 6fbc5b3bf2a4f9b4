//! WebDriver binding for the school-photo gallery portal.
//!
//! All element locators for the site live here. When the site's markup
//! changes, this is the only file that needs to follow.

use crate::site::{Folder, GallerySite, PhotoEntry, Room, SiteError};
use crate::webdriver::{ElementId, Locator, WebDriver};
use async_trait::async_trait;
use std::time::Duration;

const LOGIN_ID_FIELD: Locator<'static> = Locator::XPath(r#"//*[@id="mail"]"#);
const PASSWORD_FIELD: Locator<'static> = Locator::XPath(r#"//*[@id="password"]"#);
const LOGIN_BUTTON: Locator<'static> = Locator::XPath(r#"//*[@id="loginArea"]/div/div[6]/input"#);

const ROOM_TABLE: Locator<'static> = Locator::Css(".roomList");
const ROOM_ROW: Locator<'static> = Locator::Css("tr");
const ROOM_CELL: Locator<'static> = Locator::Css("td");
const ROOM_TITLE_LINK: Locator<'static> = Locator::Css("th[data-subtitle='展示室タイトル'] a");
const ROOM_ORDER_STATUS: Locator<'static> = Locator::Css("td[data-subtitle='ご注文状況'] span");
/// Order status text of a room that has already been bought.
const STATUS_PURCHASED: &str = "購入済";
/// Rows need more cells than this to carry an order status column.
const ROOM_MIN_CELLS: usize = 4;

const PHOTOS_BUTTON: Locator<'static> = Locator::XPath(r#"//*[@id="categoryBtn"]/span"#);
const DATE_BUTTON: Locator<'static> = Locator::XPath("//a[@class='active']");
const FOLDER_LINK: Locator<'static> = Locator::Css("a.open");

const PHOTO_LIST: Locator<'static> = Locator::Css("#photoListInner");
const PHOTO_BOX: Locator<'static> = Locator::Css(".photoBox.photo");
const PHOTO_FRAME: Locator<'static> = Locator::Css(".image-frame");

/// Timing knobs for the portal binding.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub login_url: String,
    /// Maximum wait for a required element.
    pub nav_timeout: Duration,
    /// Pause after submitting the login form.
    pub login_settle: Duration,
}

/// [`GallerySite`] backed by a live WebDriver session.
pub struct WebDriverGallery {
    driver: WebDriver,
    config: PortalConfig,
}

impl WebDriverGallery {
    pub async fn connect(webdriver_url: &str, config: PortalConfig) -> Result<Self, SiteError> {
        let driver = WebDriver::connect(webdriver_url, "chrome").await?;
        Ok(Self { driver, config })
    }

    async fn wait(&self, locator: Locator<'_>) -> Result<ElementId, SiteError> {
        self.driver
            .wait_for(locator, self.config.nav_timeout)
            .await?
            .ok_or_else(|| SiteError::Timeout {
                what: locator.to_string(),
                timeout: self.config.nav_timeout,
            })
    }

    async fn click(&self, locator: Locator<'_>) -> Result<(), SiteError> {
        let el = self.wait(locator).await?;
        self.driver.js_click(&el).await?;
        Ok(())
    }

    async fn href(&self, el: &ElementId) -> Result<String, SiteError> {
        self.driver
            .attribute(el, "href")
            .await?
            .ok_or_else(|| SiteError::UnexpectedPage("link without href".into()))
    }
}

#[async_trait]
impl GallerySite for WebDriverGallery {
    async fn authenticate(&mut self, login_id: &str, password: &str) -> Result<(), SiteError> {
        tracing::info!(url = %self.config.login_url, "opening login page");
        self.driver.goto(&self.config.login_url).await?;

        let id_field = self.wait(LOGIN_ID_FIELD).await?;
        let pw_field = self.driver.find(PASSWORD_FIELD).await?;
        self.driver.send_keys(&id_field, login_id).await?;
        self.driver.send_keys(&pw_field, password).await?;
        self.click(LOGIN_BUTTON).await?;

        tracing::info!(settle = ?self.config.login_settle, "login submitted");
        tokio::time::sleep(self.config.login_settle).await;
        Ok(())
    }

    async fn list_rooms(&mut self) -> Result<Vec<Room>, SiteError> {
        let table = self.wait(ROOM_TABLE).await?;
        let rows = self.driver.find_all_in(&table, ROOM_ROW).await?;

        let mut rooms = Vec::new();
        // First row is the header.
        for row in rows.iter().skip(1) {
            let cells = self.driver.find_all_in(row, ROOM_CELL).await?;
            if cells.len() < ROOM_MIN_CELLS {
                continue;
            }
            let title_el = self.driver.find_in(row, ROOM_TITLE_LINK).await?;
            let status_el = self.driver.find_in(row, ROOM_ORDER_STATUS).await?;

            let status = self.driver.text(&status_el).await?;
            rooms.push(Room {
                title: self.driver.text(&title_el).await?,
                link: self.href(&title_el).await?,
                purchased: status == STATUS_PURCHASED,
                status,
            });
        }
        tracing::debug!(count = rooms.len(), "rooms listed");
        Ok(rooms)
    }

    async fn open_room(&mut self, room: &Room) -> Result<(), SiteError> {
        tracing::info!(room = %room.title, "opening room");
        self.driver.goto(&room.link).await?;
        self.click(PHOTOS_BUTTON).await?;
        self.click(DATE_BUTTON).await?;
        Ok(())
    }

    async fn list_folders(&mut self) -> Result<Vec<Folder>, SiteError> {
        self.wait(FOLDER_LINK).await?;
        let mut folders = Vec::new();
        for el in self.driver.find_all(FOLDER_LINK).await? {
            folders.push(Folder {
                title: self.driver.text(&el).await?,
                link: self.href(&el).await?,
            });
        }
        Ok(folders)
    }

    async fn open_folder(&mut self, folder: &Folder) -> Result<(), SiteError> {
        tracing::info!(folder = %folder.title, "opening folder");
        self.driver.goto(&folder.link).await?;
        self.wait(PHOTO_LIST).await?;
        Ok(())
    }

    async fn list_photos(&mut self) -> Result<Vec<PhotoEntry>, SiteError> {
        let boxes = self.driver.find_all(PHOTO_BOX).await?;
        let mut photos = Vec::with_capacity(boxes.len());
        for photo_box in &boxes {
            let id = self.driver.attribute(photo_box, "id").await?.unwrap_or_default();
            let style = match self.driver.find_in(photo_box, PHOTO_FRAME).await {
                Ok(frame) => self.driver.attribute(&frame, "style").await?,
                Err(e) if e.is_no_such_element() => None,
                Err(e) => return Err(e.into()),
            };
            let image_url = style.as_deref().and_then(extract_background_url);
            photos.push(PhotoEntry { id, image_url });
        }
        Ok(photos)
    }

    async fn mark(&mut self, photo_id: &str) -> Result<(), SiteError> {
        let xpath = format!("//*[@id='cb1_{photo_id}']");
        self.click(Locator::XPath(&xpath)).await
    }

    async fn shutdown(&mut self) -> Result<(), SiteError> {
        self.driver.quit().await?;
        Ok(())
    }
}

/// Pull the URL out of an inline `background-image: url(...)` style.
///
/// Accepts double-quoted, single-quoted and bare forms.
pub fn extract_background_url(style: &str) -> Option<String> {
    let start = style.find("url(")? + "url(".len();
    let rest = style[start..].trim_start();

    let url = match rest.chars().next()? {
        quote @ ('"' | '\'') => {
            let inner = &rest[1..];
            &inner[..inner.find(quote)?]
        }
        _ => rest[..rest.find(')')?].trim_end(),
    };

    (!url.is_empty()).then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_double_quoted() {
        let style = r#"background-image: url("https://img.example/p/1.jpg?s=2");"#;
        assert_eq!(extract_background_url(style).as_deref(), Some("https://img.example/p/1.jpg?s=2"));
    }

    #[test]
    fn test_extract_single_quoted() {
        let style = "width: 10px; background-image:url('https://img.example/a b.png')";
        assert_eq!(extract_background_url(style).as_deref(), Some("https://img.example/a b.png"));
    }

    #[test]
    fn test_extract_bare() {
        let style = "background-image: url( https://img.example/x.jpg );";
        assert_eq!(extract_background_url(style).as_deref(), Some("https://img.example/x.jpg"));
    }

    #[test]
    fn test_extract_missing_or_broken() {
        assert_eq!(extract_background_url("color: red"), None);
        assert_eq!(extract_background_url(r#"background-image: url("unterminated"#), None);
        assert_eq!(extract_background_url("background-image: url()"), None);
    }
}
