//! Authgate authentication core
//!
//! Password policy, Argon2 credential hashing, JWT session tokens, the
//! account and revocation store seams, and the session authority that ties
//! them together.

pub mod authority;
pub mod error;
pub mod jwt;
pub mod memory;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod store;

pub use authority::SessionAuthority;
pub use error::{AuthError, ErrorKind};
pub use jwt::{Claims, DEFAULT_TOKEN_TTL_MINUTES, SessionToken, TokenCodec, TokenConfig};
pub use memory::MemoryStore;
pub use middleware::{AuthenticatedSession, extract_bearer_token, require_auth};
pub use password::{CredentialHasher, HashCost};
pub use policy::{PolicyViolation, validate_password};
pub use store::{AccountStore, RevocationStore, StoreError};
