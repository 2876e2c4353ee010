//! # Session Module
//!
//! Owns the signed-in user's OpenID Connect credential:
//! - sign-in through the identity provider (authorization code flow)
//! - silent refresh before the ID token expires
//! - forced sign-out once a refresh fails

pub mod coordinator;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod refresher;
pub mod routes;
pub mod store;


pub use coordinator::RefreshCoordinator;
pub use extractors::{ActiveSession, SessionCookie};
pub use models::{Credential, ErrorState, Session, SessionError, SessionId, SessionState};
pub use refresher::{should_force_sign_out, SessionRefresher};
pub use routes::session_routes;
pub use store::{InMemorySessionStore, PendingSignIns, SessionStore};
