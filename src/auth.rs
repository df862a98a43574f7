//! Credentials, signing keys, client assertions, and bearer token issuance.

pub mod assertion;
pub mod credentials;
pub mod id;
pub mod issuer;
pub mod key;
pub mod secret;
pub mod token;

pub use assertion::*;
pub use credentials::*;
pub use id::*;
pub use issuer::*;
pub use key::*;
pub use secret::*;
pub use token::*;
