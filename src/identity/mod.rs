//! Identity for the HTTP surface: who a request acts as, the bearer-token
//! store, and the one authorization rule tokens need.

mod authorizer;
mod principal;
mod tokens;

pub use authorizer::can_manage_tokens_for;
pub use principal::{Principal, ADMIN_ROLE, ANONYMOUS};
pub use tokens::{RevokeError, TokenStore};
