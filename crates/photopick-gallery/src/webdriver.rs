//! Minimal W3C WebDriver client over `reqwest`.
//!
//! Covers what the gallery binding needs: sessions, navigation, element
//! lookup, text/attribute reads, typing and script-driven clicks. Talks to
//! any spec-compliant driver (chromedriver, geckodriver).

use reqwest::Method;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use thiserror::Error;

/// W3C web element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
/// Interval between element lookups while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Error, Debug)]
pub enum WebDriverError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{error}: {message}")]
    Command { error: String, message: String },
    #[error("malformed webdriver response: {0}")]
    Protocol(String),
    #[error("webdriver session already closed")]
    Closed,
}

impl WebDriverError {
    pub fn is_no_such_element(&self) -> bool {
        matches!(self, Self::Command { error, .. } if error == "no such element")
    }
}

/// Element lookup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator<'a> {
    Css(&'a str),
    XPath(&'a str),
}

impl Locator<'_> {
    fn to_json(self) -> Value {
        match self {
            Locator::Css(v) => json!({ "using": "css selector", "value": v }),
            Locator::XPath(v) => json!({ "using": "xpath", "value": v }),
        }
    }
}

impl std::fmt::Display for Locator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(v) => write!(f, "css `{v}`"),
            Locator::XPath(v) => write!(f, "xpath `{v}`"),
        }
    }
}

/// Opaque handle to an element in the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(String);

impl ElementId {
    fn reference(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }
}

/// One live browser session.
pub struct WebDriver {
    http: reqwest::Client,
    base_url: String,
    session_id: Option<String>,
}

impl WebDriver {
    /// Start a new browser session on the driver at `base_url`.
    pub async fn connect(base_url: &str, browser_name: &str) -> Result<Self, WebDriverError> {
        let http = reqwest::Client::builder().build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let body = json!({ "capabilities": { "alwaysMatch": { "browserName": browser_name } } });
        let response = http.post(format!("{base_url}/session")).json(&body).send().await?;
        let ok = response.status().is_success();
        let value = unwrap_value(ok, response.json().await?)?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Protocol(format!("no sessionId in {value}")))?
            .to_string();

        tracing::info!(driver = %base_url, session = %session_id, "webdriver session started");
        Ok(Self { http, base_url, session_id: Some(session_id) })
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, WebDriverError> {
        let session = self.session_id.as_deref().ok_or(WebDriverError::Closed)?;
        let url = format!("{}/session/{session}{path}", self.base_url);
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let ok = response.status().is_success();
        unwrap_value(ok, response.json().await?)
    }

    pub async fn goto(&self, url: &str) -> Result<(), WebDriverError> {
        tracing::debug!(url, "navigating");
        self.command(Method::POST, "/url", Some(json!({ "url": url }))).await?;
        Ok(())
    }

    pub async fn find(&self, locator: Locator<'_>) -> Result<ElementId, WebDriverError> {
        let value = self.command(Method::POST, "/element", Some(locator.to_json())).await?;
        element_id(&value)
    }

    pub async fn find_all(&self, locator: Locator<'_>) -> Result<Vec<ElementId>, WebDriverError> {
        let value = self.command(Method::POST, "/elements", Some(locator.to_json())).await?;
        element_ids(&value)
    }

    pub async fn find_in(&self, parent: &ElementId, locator: Locator<'_>) -> Result<ElementId, WebDriverError> {
        let path = format!("/element/{}/element", parent.0);
        let value = self.command(Method::POST, &path, Some(locator.to_json())).await?;
        element_id(&value)
    }

    pub async fn find_all_in(&self, parent: &ElementId, locator: Locator<'_>) -> Result<Vec<ElementId>, WebDriverError> {
        let path = format!("/element/{}/elements", parent.0);
        let value = self.command(Method::POST, &path, Some(locator.to_json())).await?;
        element_ids(&value)
    }

    /// Poll for an element until it appears or `timeout` elapses.
    ///
    /// Returns `Ok(None)` on timeout; other driver errors propagate.
    pub async fn wait_for(&self, locator: Locator<'_>, timeout: Duration) -> Result<Option<ElementId>, WebDriverError> {
        let deadline = deadline_after(timeout);
        loop {
            match self.find(locator).await {
                Ok(el) => return Ok(Some(el)),
                Err(e) if e.is_no_such_element() => {}
                Err(e) => return Err(e),
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn text(&self, el: &ElementId) -> Result<String, WebDriverError> {
        let value = self.command(Method::GET, &format!("/element/{}/text", el.0), None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn attribute(&self, el: &ElementId, name: &str) -> Result<Option<String>, WebDriverError> {
        let path = format!("/element/{}/attribute/{name}", el.0);
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_str().map(str::to_string))
    }

    pub async fn send_keys(&self, el: &ElementId, text: &str) -> Result<(), WebDriverError> {
        let path = format!("/element/{}/value", el.0);
        self.command(Method::POST, &path, Some(json!({ "text": text }))).await?;
        Ok(())
    }

    /// Click via script; survives overlays that intercept native clicks.
    pub async fn js_click(&self, el: &ElementId) -> Result<(), WebDriverError> {
        let body = json!({ "script": "arguments[0].click();", "args": [el.reference()] });
        self.command(Method::POST, "/execute/sync", Some(body)).await?;
        Ok(())
    }

    /// End the session. Later calls are no-ops.
    pub async fn quit(&mut self) -> Result<(), WebDriverError> {
        if self.session_id.is_none() {
            return Ok(());
        }
        let result = self.command(Method::DELETE, "", None).await;
        let session = self.session_id.take();
        tracing::info!(session = ?session, "webdriver session closed");
        result.map(|_| ())
    }
}

impl Drop for WebDriver {
    fn drop(&mut self) {
        if let Some(session) = &self.session_id {
            tracing::warn!(session = %session, "webdriver dropped without quit; browser may stay open");
        }
    }
}

/// `None` when the timeout is too large to represent; such waits never expire.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Extract `value` from a driver response, turning error payloads into errors.
fn unwrap_value(ok: bool, mut body: Value) -> Result<Value, WebDriverError> {
    let value = body
        .get_mut("value")
        .map(Value::take)
        .ok_or_else(|| WebDriverError::Protocol(format!("response without value: {body}")))?;

    if ok {
        return Ok(value);
    }
    let field = |k: &str| value.get(k).and_then(Value::as_str).unwrap_or_default().to_string();
    Err(WebDriverError::Command { error: field("error"), message: field("message") })
}

fn element_id(value: &Value) -> Result<ElementId, WebDriverError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementId(id.to_string()))
        .ok_or_else(|| WebDriverError::Protocol(format!("not an element reference: {value}")))
}

fn element_ids(value: &Value) -> Result<Vec<ElementId>, WebDriverError> {
    value
        .as_array()
        .ok_or_else(|| WebDriverError::Protocol(format!("expected element array: {value}")))?
        .iter()
        .map(element_id)
        .collect()
}
