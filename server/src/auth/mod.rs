pub mod credentials;
pub mod extractor;
pub mod session;

pub use credentials::{Argon2Hasher, CredentialHasher};
pub use extractor::CurrentUser;
pub use session::SessionStore;
