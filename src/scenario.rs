//! The duplicate-attach workflow: report a crash, find it is already known
//! as bug 375161, and attach our information to that bug instead.

use crate::a11y::{child_at, find_in, find_in_with, snapshot, Accessible, Desktop, Driver, NameMatcher, State};
use crate::config::HarnessConfig;
use crate::{Error, Result};
use log::{debug, error, info};
use std::time::Duration;

const ASSISTANT_WINDOW: &str = "Crash Reporting Assistant";

/// Parameters of the duplicate-attach run
#[derive(Debug, Clone)]
pub struct DuplicateAttach {
    /// Name the assistant registers on the accessibility bus
    pub application: String,
    pub discovery_attempts: u32,
    pub discovery_interval: Duration,
    pub login: String,
    pub password: String,
    pub bug_id: u64,
    /// Appended to the crash description; must contain the server's comment sentinel
    pub filler: String,
    pub trace_timeout: Duration,
    pub login_timeout: Duration,
}

impl Default for DuplicateAttach {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

impl DuplicateAttach {
    pub fn from_config(config: &HarnessConfig) -> Self {
        let expect = &config.expectations;
        Self {
            application: "drkonqi".to_string(),
            discovery_attempts: config.discovery_attempts,
            discovery_interval: config.poll_interval,
            login: expect.login.clone(),
            password: expect.password.clone(),
            bug_id: expect.bug_id,
            filler: "y".repeat(128),
            trace_timeout: config.trace_timeout,
            login_timeout: config.login_timeout,
        }
    }

    /// Drive the assistant from its crash dialog to "Crash report sent".
    pub fn run<D: Desktop>(&self, desktop: &D, driver: &Driver) -> Result<()> {
        let app = driver.find_application(desktop, &self.application, self.discovery_attempts, self.discovery_interval)?;
        info!("found {} on the accessibility bus", self.application);

        let result = self.drive(&app, driver);
        if let Err(e) = &result {
            error!("duplicate-attach failed: {}", e);
            match snapshot(&app) {
                Ok(snap) => debug!("accessibility tree at failure:\n{}", snap.to_json()),
                Err(e) => debug!("no snapshot available: {}", e),
            }
        }
        result
    }

    fn drive<A: Accessible>(&self, app: &A, driver: &Driver) -> Result<()> {
        let dialog = app.children()?.pop().ok_or(Error::NullAccessible)?;
        driver.press(&find_in(&dialog, "Report Bug")?)?;

        find_in_with(app, ASSISTANT_WINDOW, |window| self.select_duplicate(window, driver))?;

        info!("step: mark as related");
        find_in_with(app, "Bug Description", |window| {
            driver.press(&find_in(window, "Suggest this crash is related")?)
        })?;

        find_in_with(app, "Related Bug Report", |window| {
            driver.toggle_on(&find_in(window, NameMatcher::pattern("^Completely sure: attach my information.+")?)?)?;
            driver.press(&find_in(window, "Continue")?)
        })?;

        find_in_with(app, ASSISTANT_WINDOW, |window| self.attach_and_send(window, driver))
    }

    fn select_duplicate<A: Accessible>(&self, window: &A, driver: &Driver) -> Result<()> {
        info!("step: describe the crash");
        driver.press(&find_in(window, "Next")?)?;
        driver.toggle_on(&find_in(window, "Yes")?)?;
        driver.toggle_on(&find_in(window, NameMatcher::pattern("^What I was doing when the application.+")?)?)?;
        driver.press(&find_in(window, "Next")?)?;

        info!("step: wait for the backtrace");
        let next = driver.wait_for_state(window, "Next", State::Sensitive, self.trace_timeout)?;
        driver.press(&next)?;

        info!("step: log in");
        driver.fill_if_empty(&find_in(window, "Username input")?, &self.login)?;
        // the line edit is a child of the labelled password input
        let password = child_at(&find_in(window, "Password input")?, 0)?;
        driver.fill_if_empty(&password, &self.password)?;
        driver.press(&find_in(window, "Login")?)?;

        info!("step: pick bug {}", self.bug_id);
        let row = driver.wait_for(window, self.bug_id.to_string(), self.login_timeout)?;
        driver.toggle_on(&row)?;
        driver.press(&find_in(window, "Open selected report")?)
    }

    fn attach_and_send<A: Accessible>(&self, window: &A, driver: &Driver) -> Result<()> {
        info!("step: attach and send");
        find_in(window, NameMatcher::pattern("^The report is going to be attached.+")?)?;
        driver.press(&find_in(window, "Next")?)?;

        driver.append_text(&find_in(window, "Information about the crash text")?, &self.filler)?;
        driver.press(&find_in(window, "Next")?)?;
        driver.press(&find_in(window, "Submit")?)?;

        driver.wait_for(window, NameMatcher::pattern(".*Crash report sent.*")?, self.login_timeout)?;
        driver.press(&find_in(window, "Finish")?)
    }
}
