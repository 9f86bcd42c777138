mod principal_auth;

pub use principal_auth::*;
