pub mod auth_error;
pub mod relay_error;

pub use auth_error::{AuthError, AuthResult};
pub use relay_error::{RelayError, RelayResult};
