//! Identity system: who is the current user.
//!
//! The `IdentityResolver` is the single source of truth for the signed-in
//! principal. It restores a persisted session at startup, delegates
//! sign-in/sign-up to the authentication collaborator, and broadcasts a
//! snapshot on every change so the view router can re-evaluate.

pub mod model;
pub mod resolver;
pub mod session;

pub use model::{Identity, Role};
pub use resolver::{IdentityEvent, IdentityResolver, IdentitySnapshot};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
