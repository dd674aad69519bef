//! Authentication feature
//!
//! Bearer-token sessions over a directory-authentication seam. Login checks
//! credentials against the [`DirectoryAuthenticator`] and issues an opaque
//! uuid token; every protected route resolves the token through the session
//! store. There are no cookies anywhere, so cross-site request forgery has
//! no ambient credential to ride on.

pub mod directory;
pub mod routes;
pub mod sessions;

pub use directory::{ConfigDirectory, DirectoryAuthenticator, DirectoryError};
pub use routes::{auth_routes, require_auth};
pub use sessions::{Session, SessionStore};
