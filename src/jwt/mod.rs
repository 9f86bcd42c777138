mod identity;

pub use identity::{IdentityClaims, MIN_SECRET_LEN, PrincipalVerifier};
