//! Child processes the harness starts and must clean up after.

use crate::config::{HarnessConfig, ACCESSIBILITY_ENV, ENV_BUGZILLA_URL};
use crate::{Error, Result};
use log::{debug, info, warn};
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// A child that is killed and reaped when dropped.
///
/// Cleanup is best effort: failures are logged and not retried.
#[derive(Debug)]
pub struct ChildGuard {
    what: String,
    child: Option<Child>,
}

impl ChildGuard {
    pub fn spawn(what: impl Into<String>, command: &mut Command) -> Result<Self> {
        let what = what.into();
        let child = command.spawn().map_err(|source| Error::SpawnError {
            what: what.clone(),
            source,
        })?;
        info!("started {} (pid {})", what, child.id());
        Ok(Self {
            what,
            child: Some(child),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// True while the child has not exited
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!("{} exited: {}", self.what, status);
                false
            }
            Some(Err(e)) => {
                warn!("cannot query {}: {}", self.what, e);
                false
            }
            None => false,
        }
    }

    /// Kill (SIGKILL) and reap the child.
    pub fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                warn!("failed to kill {}: {}", self.what, e);
            }
            match child.wait() {
                Ok(status) => debug!("{} reaped: {}", self.what, status),
                Err(e) => warn!("failed to reap {}: {}", self.what, e),
            }
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

/// The accessibility bus launcher and registry, when the harness owns them
#[derive(Debug, Default)]
pub struct AccessibilityBus {
    launcher: Option<ChildGuard>,
    registry: Option<ChildGuard>,
}

impl AccessibilityBus {
    /// Start whichever of the two daemons is configured.
    pub fn start(config: &HarnessConfig) -> Result<Self> {
        // The launcher gets no options beyond this one; some distributions crash on others.
        let launcher = config
            .bus_launcher_path
            .as_deref()
            .map(|path| ChildGuard::spawn("at-spi bus launcher", Command::new(path).arg("--launch-immediately")))
            .transpose()?;
        let registry = config
            .registry_path
            .as_deref()
            .map(|path| ChildGuard::spawn("at-spi registry", &mut Command::new(path)))
            .transpose()?;
        Ok(Self { launcher, registry })
    }

    pub fn is_owned(&self) -> bool {
        self.launcher.is_some() || self.registry.is_some()
    }

    pub fn stop(&mut self) {
        for guard in [self.launcher.as_mut(), self.registry.as_mut()].into_iter().flatten() {
            guard.kill();
        }
    }
}

/// Start the inert process the assistant pretends has crashed.
pub fn spawn_tracee(config: &HarnessConfig) -> Result<ChildGuard> {
    let (program, args) = config
        .tracee_command
        .split_first()
        .ok_or_else(|| Error::ConfigError("tracee command is empty".into()))?;
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).stdout(Stdio::null());
    ChildGuard::spawn("tracee", &mut command)
}

/// Arguments the assistant is launched with.
pub fn assistant_args(config: &HarnessConfig, tracee_pid: u32) -> Vec<String> {
    vec![
        "--signal".to_string(),
        config.signal.to_string(),
        "--pid".to_string(),
        tracee_pid.to_string(),
        "--bugaddress".to_string(),
        config.bug_address.clone(),
        "--dialog".to_string(),
    ]
}

/// Start the assistant against `tracee_pid`, talking to the tracker at `bugzilla_url`.
pub fn spawn_assistant(config: &HarnessConfig, tracee_pid: u32, bugzilla_url: &str) -> Result<ChildGuard> {
    let mut command = assistant_command(&config.assistant_path, &assistant_args(config, tracee_pid));
    command.env(ENV_BUGZILLA_URL, bugzilla_url);
    ChildGuard::spawn("drkonqi", &mut command)
}

fn assistant_command(path: &Path, args: &[String]) -> Command {
    let mut command = Command::new(path);
    command.args(args);
    for (key, value) in ACCESSIBILITY_ENV {
        command.env(key, value);
    }
    command
}
