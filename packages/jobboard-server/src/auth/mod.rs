mod middleware;
mod password;
mod token;

pub use middleware::{
    authenticate, authorize, authorize_roles, Identity, ADMINS, APPLICANTS, PUBLISHERS,
};
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Claims, TokenError, TokenIssuer, TOKEN_COOKIE};
