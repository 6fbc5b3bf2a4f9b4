use std::path::PathBuf;
use std::time::Duration;

/// Gallery login page used when `PHOTOPICK_LOGIN_URL` is unset.
pub const DEFAULT_LOGIN_URL: &str = "https://ps.happysmile-inc.jp/sys/UserLogin";

/// Runtime configuration, loaded from environment variables.
pub struct Config {
    /// JSON file holding `login_id` and `password`.
    pub credentials_path: PathBuf,
    /// Directory of reference photos, one target per file.
    pub target_dir: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Maximum Euclidean distance for a positive match (inclusive).
    pub tolerance: f32,
    pub login_url: String,
    /// WebDriver endpoint (chromedriver by default).
    pub webdriver_url: String,
    /// Maximum wait for a page element, in seconds.
    pub nav_timeout_secs: u64,
    /// Pause after submitting the login form, in seconds.
    pub login_settle_secs: u64,
    /// Pause between photos, in milliseconds.
    pub pacing_ms: u64,
    /// Per-download timeout, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Config {
    /// Load configuration from `PHOTOPICK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("PHOTOPICK_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| photopick_core::default_model_dir());

        Self {
            credentials_path: env_path("PHOTOPICK_CREDENTIALS", "config.json"),
            target_dir: env_path("PHOTOPICK_TARGET_DIR", "images"),
            model_dir,
            tolerance: env_f32("PHOTOPICK_TOLERANCE", photopick_core::DEFAULT_TOLERANCE),
            login_url: std::env::var("PHOTOPICK_LOGIN_URL")
                .unwrap_or_else(|_| DEFAULT_LOGIN_URL.to_string()),
            webdriver_url: std::env::var("PHOTOPICK_WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".to_string()),
            nav_timeout_secs: env_u64("PHOTOPICK_NAV_TIMEOUT_SECS", 10),
            login_settle_secs: env_u64("PHOTOPICK_LOGIN_SETTLE_SECS", 10),
            pacing_ms: env_u64("PHOTOPICK_PACING_MS", 500),
            fetch_timeout_secs: env_u64("PHOTOPICK_FETCH_TIMEOUT_SECS", 30),
        }
    }

    pub fn portal(&self) -> photopick_gallery::PortalConfig {
        photopick_gallery::PortalConfig {
            login_url: self.login_url.clone(),
            nav_timeout: Duration::from_secs(self.nav_timeout_secs),
            login_settle: Duration::from_secs(self.login_settle_secs),
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
