mod audit_log;
mod license;
mod principal;
mod redirect_token;

pub use audit_log::*;
pub use license::*;
pub use principal::*;
pub use redirect_token::*;
