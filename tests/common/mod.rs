//! A simulated crash reporting assistant built from in-memory accessibles.
//!
//! Its widgets react to actions the way the real dialogs do and talk to the
//! mock Bugzilla over HTTP, so a scenario run produces real traffic.

use drkonqi_harness::a11y::{Accessible, MemoryNode, State};
use drkonqi_harness::{Error, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Set `showing` on `node` and everything below it.
pub fn set_visible(node: &MemoryNode, showing: bool) {
    node.set_showing(showing);
    for child in node.children().unwrap() {
        set_visible(&child, showing);
    }
}

struct Api {
    client: Client,
    base: String,
}

impl Api {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str) -> Result<Value> {
        self.client
            .get(self.url(path))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| Error::Backend(format!("GET {}: {}", path, e)))
    }

    fn put(&self, path: &str, body: Value) -> Result<Value> {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| Error::Backend(format!("PUT {}: {}", path, e)))
    }

    fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| Error::Backend(format!("POST {}: {}", path, e)))
    }
}

/// Widgets of the simulated assistant that tests want to inspect
// not every test binary looks at every widget
#[allow(dead_code)]
pub struct Assistant {
    pub app: MemoryNode,
    pub window: MemoryNode,
    pub username: MemoryNode,
    pub password: MemoryNode,
    pub crash_text: MemoryNode,
    pub bug_list: MemoryNode,
    pub login_status: MemoryNode,
    pub finished: Rc<Cell<bool>>,
}

struct Sim {
    api: Api,
    page: Cell<usize>,
    window_open: Cell<bool>,
    sent: Cell<bool>,
    finished: Rc<Cell<bool>>,
    window: MemoryNode,
    pages: Vec<MemoryNode>,
    bug_description: MemoryNode,
    related: MemoryNode,
    bug_list: MemoryNode,
    username: MemoryNode,
    password: MemoryNode,
    crash_text: MemoryNode,
    login_status: MemoryNode,
    sent_widgets: Vec<MemoryNode>,
}

impl Sim {
    fn render(&self) {
        set_visible(&self.window, self.window_open.get());
        if self.window_open.get() {
            for (i, page) in self.pages.iter().enumerate() {
                set_visible(page, i == self.page.get());
            }
            for widget in &self.sent_widgets {
                set_visible(widget, self.sent.get() && self.page.get() == self.pages.len() - 1);
            }
        }
    }

    fn go_to(&self, page: usize) {
        self.page.set(page.min(self.pages.len() - 1));
        self.render();
    }

    fn login(&self) -> Result<()> {
        self.api.get("/rest/product/ruby")?;
        let user = self.username.text()?.unwrap_or_default();
        let password = self.password.text()?.unwrap_or_default();
        let query = format!("/rest/login?login={}&password={}", user, password);
        if self.api.get(&query).is_err() {
            self.login_status.set_name("Error: login failed");
            return Ok(());
        }
        self.login_status.set_name(format!("Logged in as {}", user));

        let bugs = self.api.get("/rest/bug?product=dolphin&status=CONFIRMED")?;
        self.bug_list.clear_children();
        for bug in bugs["bugs"].as_array().into_iter().flatten() {
            let id = bug["id"].as_u64().unwrap_or_default();
            self.bug_list
                .push_child(MemoryNode::new(id.to_string()).with_action("Toggle"));
        }
        self.render();
        Ok(())
    }

    fn selected_bug(&self) -> Option<String> {
        self.bug_list
            .children()
            .ok()?
            .into_iter()
            .find(|row| row.has_state(State::Checked).unwrap_or(false))
            .and_then(|row| row.name().ok())
    }

    fn open_report(&self) -> Result<()> {
        let Some(bug) = self.selected_bug() else {
            return Ok(());
        };
        self.api.get(&format!("/rest/bug/{}", bug))?;
        self.api.get(&format!("/rest/bug/{}/comment", bug))?;
        set_visible(&self.bug_description, true);
        Ok(())
    }

    fn submit(&self) -> Result<()> {
        let bug = self.selected_bug().unwrap_or_default();
        let user = self.username.text()?.unwrap_or_default();
        self.api.put(&format!("/rest/bug/{}", bug), json!({ "ids": [bug], "cc": { "add": [user] } }))?;
        let comment = self.crash_text.text()?.unwrap_or_default();
        self.api.post(
            &format!("/rest/bug/{}/attachment", bug),
            json!({
                "ids": [bug],
                "data": "QXBwbGljYXRpb246IGRvbHBoaW4=",
                "file_name": "drkonqi.txt",
                "summary": "New crash information added by DrKonqi",
                "content_type": "text/plain",
                "comment": comment,
            }),
        )?;
        self.sent.set(true);
        self.render();
        Ok(())
    }
}

/// Build the assistant and wire it to the tracker at `base_url` (with trailing slash).
///
/// `username` pre-fills the login field the way a saved wallet entry would.
#[allow(dead_code)]
pub fn simulated_assistant(base_url: &str, username: &str) -> Assistant {
    let next = MemoryNode::new("Next").with_action("Press");
    let username_input = MemoryNode::new("Username input").with_text(username);
    let password_edit = MemoryNode::new("").with_text("");
    let bug_list = MemoryNode::new("Reports list");
    let login_status = MemoryNode::new("Not logged in");
    let login = MemoryNode::new("Login").with_action("Press");
    let open = MemoryNode::new("Open selected report").with_action("Press");
    let crash_text = MemoryNode::new("Information about the crash text")
        .with_text("Renamed a file with F2 in the details view and pressed enter.\n");
    let submit = MemoryNode::new("Submit").with_action("Press");
    let sent_label = MemoryNode::new("<b>Crash report sent.</b> URL: https://bugs.kde.org/show_bug.cgi?id=375161");
    let finish = MemoryNode::new("Finish").with_action("Press");

    let pages = vec![
        MemoryNode::new("Introduction")
            .with_child(MemoryNode::new("This assistant will analyze the crash information")),
        MemoryNode::new("What do you know about the crash?")
            .with_child(MemoryNode::new("Yes").with_action("Toggle"))
            .with_child(MemoryNode::new("No").with_action("Toggle"))
            .with_child(MemoryNode::new("What I was doing when the application crashed").with_action("Toggle")),
        MemoryNode::new("Fetching the Backtrace (Automatic Crash Information)")
            .with_child(MemoryNode::new("The crash information was generated")),
        MemoryNode::new("Login into the bug tracking system")
            .with_child(username_input.clone())
            .with_child(MemoryNode::new("Password input").with_child(password_edit.clone()))
            .with_child(login.clone())
            .with_child(login_status.clone())
            .with_child(bug_list.clone())
            .with_child(open.clone()),
        MemoryNode::new("Conclusions")
            .with_child(MemoryNode::new("The report is going to be attached to bug 375161. Why not provide more details?")),
        MemoryNode::new("Information about the crash").with_child(crash_text.clone()),
        MemoryNode::new("Send the crash report")
            .with_child(submit.clone())
            .with_child(sent_label.clone())
            .with_child(finish.clone()),
    ];
    let window = MemoryNode::new("Crash Reporting Assistant")
        .with_children(pages.clone())
        .with_child(next.clone());

    let suggest = MemoryNode::new("Suggest this crash is related").with_action("Press");
    let bug_description = MemoryNode::new("Bug Description")
        .with_child(MemoryNode::new("Bug 375161: Dolphin crashes when renaming a file"))
        .with_child(suggest.clone());

    let sure = MemoryNode::new("Completely sure: attach my information to this report").with_action("Toggle");
    let continue_button = MemoryNode::new("Continue").with_action("Press");
    let related = MemoryNode::new("Related Bug Report")
        .with_child(MemoryNode::new("Maybe, I am not sure").with_action("Toggle"))
        .with_child(sure.clone())
        .with_child(continue_button.clone());

    let report = MemoryNode::new("Report Bug").with_action("Press");
    let crash_dialog = MemoryNode::new("The application closed unexpectedly")
        .with_child(MemoryNode::new("Dolphin closed unexpectedly."))
        .with_child(report.clone());

    let app = MemoryNode::new("drkonqi")
        .with_child(window.clone())
        .with_child(bug_description.clone())
        .with_child(related.clone())
        .with_child(crash_dialog);

    let finished = Rc::new(Cell::new(false));
    let sim = Rc::new(Sim {
        api: Api {
            client: Client::new(),
            base: base_url.to_string(),
        },
        page: Cell::new(0),
        window_open: Cell::new(false),
        sent: Cell::new(false),
        finished: finished.clone(),
        window: window.clone(),
        pages,
        bug_description: bug_description.clone(),
        related: related.clone(),
        bug_list: bug_list.clone(),
        username: username_input.clone(),
        password: password_edit.clone(),
        crash_text: crash_text.clone(),
        login_status: login_status.clone(),
        sent_widgets: vec![sent_label, finish.clone()],
    });
    sim.render();
    set_visible(&bug_description, false);
    set_visible(&related, false);

    let s = sim.clone();
    report.set_action("Press", move |_| {
        s.api.get("/rest/version")?;
        s.window_open.set(true);
        s.go_to(0);
        Ok(())
    });
    let s = sim.clone();
    next.set_action("Press", move |_| {
        s.go_to(s.page.get() + 1);
        Ok(())
    });
    let s = sim.clone();
    login.set_action("Press", move |_| s.login());
    let s = sim.clone();
    open.set_action("Press", move |_| s.open_report());
    let s = sim.clone();
    suggest.set_action("Press", move |_| {
        set_visible(&s.bug_description, false);
        set_visible(&s.related, true);
        Ok(())
    });
    let s = sim.clone();
    let sure_option = sure.clone();
    continue_button.set_action("Press", move |_| {
        if sure_option.has_state(State::Checked)? {
            set_visible(&s.related, false);
            s.go_to(4);
        }
        Ok(())
    });
    let s = sim.clone();
    submit.set_action("Press", move |_| s.submit());
    let s = sim;
    finish.set_action("Press", move |_| {
        s.window_open.set(false);
        s.render();
        s.finished.set(true);
        Ok(())
    });

    Assistant {
        app,
        window,
        username: username_input,
        password: password_edit,
        crash_text,
        bug_list,
        login_status,
        finished,
    }
}
