//! DrKonqi Integration Harness
//!
//! Drives the DrKonqi crash reporting assistant through its accessibility
//! tree and checks the requests it makes against a mock Bugzilla REST API.
//!
//! # Features
//!
//! - **Accessibility driver**: exactly-one name lookups, press/focus/toggle
//!   actions with settle delays, and polling waits
//! - **Mock Bugzilla**: a strict, table driven REST responder that fails the
//!   run on any request it does not expect
//! - **Session management**: accessibility bus, stand-in crashed process and
//!   the assistant itself, all torn down when the run ends
//!
//! # Example
//!
//! ```no_run
//! use drkonqi_harness::{HarnessConfig, Session};
//! use drkonqi_harness::a11y::MemoryDesktop;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::from_env()?;
//! let mut session = Session::start(config)?;
//! // any accessibility backend implementing `Desktop` can drive the run
//! let desktop = MemoryDesktop::new();
//! session.run(&desktop)?;
//! session.teardown();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, FailureClass, Result};

// Accessibility tree access, lookups and actions
pub mod a11y;

// Mock Bugzilla REST server
pub mod bugzilla;

pub mod config;
pub mod process;
pub mod scenario;
pub mod session;

pub use a11y::{Accessible, Desktop, Driver, NameMatcher, SettleDelays, State};
pub use bugzilla::{Expectations, Fixtures, MockBugzilla, RouteTable, UnexpectedRequestPolicy};
pub use config::HarnessConfig;
pub use scenario::DuplicateAttach;
pub use session::Session;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settle_delays() {
        let settle = SettleDelays::default();
        assert_eq!(settle.press.as_millis(), 250);
        assert_eq!(settle.focus.as_millis(), 100);
        assert_eq!(settle.toggle.as_millis(), 100);
    }

    #[test]
    fn test_scenario_matches_server_expectations() {
        let config = HarnessConfig::default();
        let scenario = DuplicateAttach::from_config(&config);
        assert!(scenario.filler.contains(&config.expectations.comment_sentinel));
        assert_eq!(scenario.login, config.expectations.login);
        assert_eq!(scenario.bug_id, config.expectations.bug_id);
    }
}
