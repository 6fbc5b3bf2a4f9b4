//! Gallery login credentials from a JSON file.
//!
//! ```json
//! { "login_id": "someone@example.com", "password": "..." }
//! ```

use serde::Deserialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Value shipped in the sample config for `login_id`.
pub const LOGIN_ID_PLACEHOLDER: &str = "YOUR_ID_HERE";
/// Value shipped in the sample config for `password`.
pub const PASSWORD_PLACEHOLDER: &str = "YOUR_PASSWORD_HERE";

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("credentials file not found: {0}")]
    NotFound(PathBuf),
    #[error("cannot read credentials file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("credentials file {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("credentials file {0} has no 'login_id' key")]
    MissingLoginId(PathBuf),
    #[error("credentials file {0} has no 'password' key")]
    MissingPassword(PathBuf),
    #[error("'{key}' in credentials file {path} is empty")]
    Empty { path: PathBuf, key: &'static str },
    #[error("'{key}' in credentials file {path} still holds the placeholder; set your real {key}")]
    Placeholder { path: PathBuf, key: &'static str },
}

#[derive(Deserialize)]
struct RawCredentials {
    login_id: Option<String>,
    password: Option<String>,
}

/// Validated gallery account. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login_id: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login_id", &self.login_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Read and validate the credentials file.
pub fn load_credentials(path: &Path) -> Result<Credentials, CredentialsError> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            CredentialsError::NotFound(path.to_path_buf())
        } else {
            CredentialsError::Read { path: path.to_path_buf(), source }
        }
    })?;
    parse_credentials(&text, path)
}

fn parse_credentials(text: &str, path: &Path) -> Result<Credentials, CredentialsError> {
    let raw: RawCredentials = serde_json::from_str(text)
        .map_err(|source| CredentialsError::Malformed { path: path.to_path_buf(), source })?;

    let login_id = raw
        .login_id
        .ok_or_else(|| CredentialsError::MissingLoginId(path.to_path_buf()))?;
    let password = raw
        .password
        .ok_or_else(|| CredentialsError::MissingPassword(path.to_path_buf()))?;

    for (key, value, placeholder) in [
        ("login_id", &login_id, LOGIN_ID_PLACEHOLDER),
        ("password", &password, PASSWORD_PLACEHOLDER),
    ] {
        if value.trim().is_empty() {
            return Err(CredentialsError::Empty { path: path.to_path_buf(), key });
        }
        if value.contains(placeholder) {
            return Err(CredentialsError::Placeholder { path: path.to_path_buf(), key });
        }
    }

    Ok(Credentials { login_id, password })
}
