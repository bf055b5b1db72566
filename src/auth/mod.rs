mod middleware;
mod password;

pub use middleware::{AuthError, CurrentUser, MaybeUser};
pub use password::{PasswordHasher, generate_auth_token};
