//! Mock Bugzilla REST API.
//!
//! A strict contract checker rather than a permissive stub: it answers the
//! exact requests a duplicate-attach report makes and treats anything else
//! as integration drift.

pub mod fixtures;
pub mod routes;
pub mod server;

pub use fixtures::Fixtures;
pub use routes::{Condition, Effect, Expectations, IncomingRequest, Method, Route, RouteTable};
pub use server::{CommentFlag, MockBugzilla, UnexpectedRequestPolicy};
