//! Harness configuration, mostly read from the environment.

use crate::a11y::{Driver, SettleDelays};
use crate::bugzilla::{Expectations, Fixtures, UnexpectedRequestPolicy};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Path of the crash reporting assistant binary
pub const ENV_ASSISTANT_PATH: &str = "DRKONQI_PATH";
/// Path of `at-spi-bus-launcher`
pub const ENV_BUS_LAUNCHER_PATH: &str = "AT_SPI_BUS_LAUNCHER_PATH";
/// Path of `at-spi2-registryd`
pub const ENV_REGISTRY_PATH: &str = "AT_SPI_REGISTRY_PATH";
/// Bug tracker endpoint override honoured by the assistant
pub const ENV_BUGZILLA_URL: &str = "DRKONQI_KDE_BUGZILLA_URL";

/// Forces Qt to expose its accessibility tree regardless of desktop settings
pub const ACCESSIBILITY_ENV: [(&str, &str); 2] = [
    ("QT_ACCESSIBILITY", "1"),
    ("QT_LINUX_ACCESSIBILITY_ALWAYS_ON", "1"),
];

/// Configuration for a harness session
///
/// The defaults mirror a CI run: the assistant is told the tracee died of
/// SIGSEGV, reports go to the KDE submission address, and UI steps settle
/// for 250ms (press) or 100ms (focus, toggle).
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// The application under test
    pub assistant_path: PathBuf,
    /// Accessibility bus launcher; `None` uses whatever bus is already running
    pub bus_launcher_path: Option<PathBuf>,
    /// Accessibility registry daemon; `None` uses whatever registry is already running
    pub registry_path: Option<PathBuf>,
    /// Address passed as `--bugaddress`
    pub bug_address: String,
    /// Signal number passed as `--signal`
    pub signal: i32,
    /// Program and arguments of the inert stand-in for the crashed process
    pub tracee_command: Vec<String>,
    pub settle: SettleDelays,
    /// Interval between attempts of polling waits
    pub poll_interval: Duration,
    /// How often to look for the assistant on the bus before giving up
    pub discovery_attempts: u32,
    /// Upper bound for backtrace generation
    pub trace_timeout: Duration,
    /// Upper bound for login and the bug listing to show up
    pub login_timeout: Duration,
    /// Directory with `product.json`, `bugs.json`, `comments.json`; built-in copies when `None`
    pub fixtures_dir: Option<PathBuf>,
    pub unexpected_requests: UnexpectedRequestPolicy,
    pub expectations: Expectations,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            assistant_path: PathBuf::from("drkonqi"),
            bus_launcher_path: None,
            registry_path: None,
            bug_address: "submit@bugs.kde.org".to_string(),
            signal: 11,
            tracee_command: vec!["sleep".to_string(), "999999999".to_string()],
            settle: SettleDelays::default(),
            poll_interval: Duration::from_secs(2),
            discovery_attempts: 8,
            trace_timeout: Duration::from_secs(300),
            login_timeout: Duration::from_secs(30),
            fixtures_dir: None,
            unexpected_requests: UnexpectedRequestPolicy::Abort,
            expectations: Expectations::default(),
        }
    }
}

impl HarnessConfig {
    /// Read binary paths from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read binary paths through `lookup`; everything else keeps its default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let assistant_path = non_empty(ENV_ASSISTANT_PATH)
            .map(PathBuf::from)
            .ok_or_else(|| Error::ConfigError(format!("{} is not set", ENV_ASSISTANT_PATH)))?;

        Ok(Self {
            assistant_path,
            bus_launcher_path: non_empty(ENV_BUS_LAUNCHER_PATH).map(PathBuf::from),
            registry_path: non_empty(ENV_REGISTRY_PATH).map(PathBuf::from),
            ..Default::default()
        })
    }

    /// Check that every configured binary exists before anything is started.
    pub fn validate(&self) -> Result<()> {
        require_file("drkonqi", &self.assistant_path)?;
        if let Some(path) = &self.bus_launcher_path {
            require_file("at-spi bus launcher", path)?;
        }
        if let Some(path) = &self.registry_path {
            require_file("at-spi registry", path)?;
        }
        if self.tracee_command.is_empty() {
            return Err(Error::ConfigError("tracee command is empty".into()));
        }
        if self.discovery_attempts == 0 {
            return Err(Error::ConfigError("discovery_attempts must be at least 1".into()));
        }
        Ok(())
    }

    pub fn fixtures(&self) -> Result<Fixtures> {
        match &self.fixtures_dir {
            Some(dir) => Fixtures::from_dir(dir),
            None => Ok(Fixtures::builtin()),
        }
    }

    pub fn driver(&self) -> Driver {
        Driver::new(self.settle, self.poll_interval)
    }
}

fn require_file(what: &'static str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::MissingBinary {
            what,
            path: path.display().to_string(),
        })
    }
}
