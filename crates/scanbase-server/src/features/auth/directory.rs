//! Directory authentication seam
//!
//! The server never stores passwords of its own; it asks an external
//! directory whether a name/password pair is valid. The config-backed
//! implementation below serves development and tests; production wires an
//! actual directory service behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// External credential check.
#[async_trait]
pub trait DirectoryAuthenticator: Send + Sync {
    /// Whether the name/password pair is valid. `Ok(false)` means rejected
    /// credentials; `Err` means the directory itself could not answer.
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, DirectoryError>;
}

/// Directory backed by configured name/password pairs.
pub struct ConfigDirectory {
    users: HashMap<String, String>,
}

impl ConfigDirectory {
    pub fn new(users: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }
}

#[async_trait]
impl DirectoryAuthenticator for ConfigDirectory {
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .users
            .get(username)
            .is_some_and(|stored| stored == password))
    }
}
