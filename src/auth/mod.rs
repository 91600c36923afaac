// Public API - what other modules can use
pub use authenticator::{AuthenticatedConnection, ConnectionAuthenticator, CredentialSource};
pub use handlers::{login, me, register};
pub use middleware::jwt_auth;
pub use token::TokenConfig;
pub use types::{AuthResponse, LoginRequest, RegisterRequest, SessionClaims};

// Internal modules
mod authenticator;
mod generators;
mod handlers;
mod middleware;
mod password;
mod token;
mod types;
