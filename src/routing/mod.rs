//! View routing: from facts to exactly one visible region.
//!
//! `decide` is the pure decision table; `ViewRouter` wires it to the
//! identity resolver and onboarding gate so the active view is recomputed
//! on every input change and never cached across one.

pub mod region;
pub mod router;
pub mod routes;

pub use region::ViewRegion;
pub use router::{ActiveView, RouteFacts, ViewRouter, decide};
pub use routes::{AdminPage, RouteOutcome, UserPage, resolve_admin, resolve_user};
