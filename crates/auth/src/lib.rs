//! `bikeshare-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. Tokens are
//! issued elsewhere; this crate only verifies them and answers permission
//! questions.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, CommandAuthorization, Principal, authorize, permissions_from_roles};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::PrincipalId;
pub use roles::Role;
