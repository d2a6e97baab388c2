//! XML-backed credential list
//!
//! Authentication checks against a flat `users.xml` document:
//!
//! ```xml
//! <Users>
//!   <User>
//!     <Username>admin</Username>
//!     <Password>secret</Password>
//!   </User>
//! </Users>
//! ```
//!
//! The list is read once at startup and consulted read-only. Passwords are
//! compared as stored, matching the upstream credential file format.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("cannot read credential file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("credential file {path} is not valid XML: {source}")]
    Parse {
        path: PathBuf,
        source: quick_xml::DeError,
    },
}

/// An authenticated user. Only the name survives authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct UsersFile {
    #[serde(rename = "User", default)]
    users: Vec<UserEntry>,
}

#[derive(Debug, Deserialize, Clone)]
struct UserEntry {
    #[serde(rename = "Username", default)]
    username: String,
    #[serde(rename = "Password", default)]
    password: String,
}

/// Read-only username/password list.
pub struct CredentialStore {
    users: Vec<UserEntry>,
}

impl CredentialStore {
    /// Load the credential list from an XML file.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path).map_err(|source| AuthError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_xml(&content).map_err(|source| AuthError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), users = store.users.len(), "credential list loaded");
        Ok(store)
    }

    /// Parse the credential list from XML text.
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::DeError> {
        let file: UsersFile = quick_xml::de::from_str(xml)?;
        Ok(Self { users: file.users })
    }

    /// Look up a username/password pair. Returns the user on an exact match,
    /// `None` otherwise — callers decide how to fail.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        self.users
            .iter()
            .find(|u| u.username == username && u.password == password)
            .map(|u| User {
                username: u.username.clone(),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
<Users>
  <User>
    <Username>admin</Username>
    <Password>secret</Password>
  </User>
  <User>
    <Username>ana</Username>
    <Password>pass123</Password>
  </User>
</Users>
"#;

    #[test]
    fn authenticates_on_exact_match() {
        let store = CredentialStore::from_xml(SAMPLE).unwrap();
        let user = store.authenticate("ana", "pass123").unwrap();
        assert_eq!(user.username, "ana");
    }

    #[test]
    fn rejects_wrong_password_and_unknown_user() {
        let store = CredentialStore::from_xml(SAMPLE).unwrap();
        assert!(store.authenticate("ana", "wrong").is_none());
        assert!(store.authenticate("ANA", "pass123").is_none());
        assert!(store.authenticate("nobody", "pass123").is_none());
    }

    #[test]
    fn empty_user_list_authenticates_no_one() {
        let store = CredentialStore::from_xml("<Users></Users>").unwrap();
        assert!(store.is_empty());
        assert!(store.authenticate("", "").is_none());
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let store = CredentialStore::load(file.path()).unwrap();
        assert!(store.authenticate("admin", "secret").is_some());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = CredentialStore::load(Path::new("/no/such/users.xml")).unwrap_err();
        assert!(matches!(err, AuthError::Read { .. }));
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<Users><User>").unwrap();
        let err = CredentialStore::load(file.path()).unwrap_err();
        assert!(matches!(err, AuthError::Parse { .. }));
    }
}
