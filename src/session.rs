//! One complete harness run: bus, mock server, tracee, assistant.

use crate::a11y::Desktop;
use crate::bugzilla::{MockBugzilla, RouteTable};
use crate::config::HarnessConfig;
use crate::process::{spawn_assistant, spawn_tracee, AccessibilityBus, ChildGuard};
use crate::scenario::DuplicateAttach;
use crate::{Error, Result};
use log::{error, info};
use std::time::{Duration, Instant};

/// Everything started for a run, torn down again on drop.
pub struct Session {
    config: HarnessConfig,
    bus: AccessibilityBus,
    server: Option<MockBugzilla>,
    tracee: ChildGuard,
    assistant: ChildGuard,
}

impl Session {
    /// Validate the configuration, then start the bus, the server, the
    /// tracee and finally the assistant pointed at the server.
    pub fn start(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        let fixtures = config.fixtures()?;
        info!(
            "testing against {} with {:?} and {:?}",
            config.assistant_path.display(),
            config.bus_launcher_path,
            config.registry_path
        );

        let bus = AccessibilityBus::start(&config)?;
        let routes = RouteTable::duplicate_attach(&config.expectations, &fixtures);
        let server = MockBugzilla::start(routes, config.unexpected_requests)?;
        let tracee = spawn_tracee(&config)?;
        let tracee_pid = tracee.pid().ok_or_else(|| Error::SpawnError {
            what: "tracee".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "tracee has no pid"),
        })?;
        let assistant = spawn_assistant(&config, tracee_pid, &server.url())?;

        Ok(Self {
            config,
            bus,
            server: Some(server),
            tracee,
            assistant,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn server(&self) -> Option<&MockBugzilla> {
        self.server.as_ref()
    }

    pub fn assistant_running(&mut self) -> bool {
        self.assistant.is_running()
    }

    /// Drive the duplicate-attach workflow through `desktop`, then require
    /// that the server saw the attachment comment.
    pub fn run<D: Desktop>(&mut self, desktop: &D) -> Result<()> {
        let scenario = DuplicateAttach::from_config(&self.config);
        if let Err(e) = scenario.run(desktop, &self.config.driver()) {
            error!("scenario failed ({}); assistant running: {}", e, self.assistant_running());
            return Err(e);
        }
        self.verdict()
    }

    /// Wait until the comment arrives, the assistant exits, or `timeout` passes.
    ///
    /// For runs where a person, not the driver, clicks through the assistant.
    pub fn wait_for_comment(&mut self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        loop {
            if self.server.as_ref().is_some_and(MockBugzilla::comment_sent) {
                return self.verdict();
            }
            if !self.assistant_running() {
                // a final request may have landed while the assistant was closing
                return self.verdict();
            }
            if start.elapsed() >= timeout {
                return Err(Error::Timeout {
                    what: "the attachment comment".into(),
                    waited_ms: start.elapsed().as_millis() as u64,
                    last: self.server.as_ref().and_then(|s| s.violations().into_iter().next()),
                });
            }
            std::thread::sleep(Duration::from_millis(200));
        }
    }

    pub fn verdict(&self) -> Result<()> {
        match &self.server {
            Some(server) => server.verdict(),
            None => Err(Error::ServerError("mock server already stopped".into())),
        }
    }

    /// Kill the tracee and the assistant, stop the server and the bus.
    pub fn teardown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.tracee.kill();
        self.assistant.kill();
        if let Some(server) = self.server.take() {
            server.shutdown();
        }
        self.bus.stop();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}
