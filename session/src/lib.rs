//! Sign-in session for the admin console: OAuth token handling against the
//! identity gateway, single-flight token refresh, and bearer-authenticated
//! API calls that retry once after the server rejects a token.

mod client;
mod config;
mod endpoint;
mod error;
pub mod jwt;
mod request;
mod session;
mod token;

pub use client::{ApiClient, ApiErrorDetail, ApiReturn, HttpError};
pub use config::SessionConfig;
pub use endpoint::{
    AuthorizationRequest, CallbackParams, IdTokenFields, OAuthTokenEndpoint, TokenEndpoint,
};
pub use error::{AuthError, AuthorizedError, EndpointError};
pub use request::RequestRejection;
pub use session::{Session, SessionState, SessionStatus};
pub use token::{TokenGrant, TokenSet};
