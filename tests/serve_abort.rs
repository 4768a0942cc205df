//! The `serve` binary under the default policy: any request outside the
//! route table ends the process with a failure status.

use reqwest::blocking::Client;
use serde_json::json;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

fn spawn_serve() -> (Child, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_drkonqi-harness"))
        .args(["serve", "--timeout", "30"])
        .env("RUST_LOG", "info")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn drkonqi-harness serve");

    let stdout = child.stdout.take().expect("stdout");
    let mut line = String::new();
    BufReader::new(stdout).read_line(&mut line).expect("read url line");
    let url = line
        .trim()
        .strip_prefix("DRKONQI_KDE_BUGZILLA_URL=")
        .unwrap_or_else(|| panic!("unexpected first line: {:?}", line))
        .to_string();
    (child, url)
}

fn wait_with_deadline(child: &mut Child, deadline: Duration) -> Option<std::process::ExitStatus> {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if let Some(status) = child.try_wait().expect("try_wait") {
            return Some(status);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    None
}

#[test]
fn test_unexpected_cc_update_aborts_the_server() {
    let (mut child, url) = spawn_serve();
    assert!(url.starts_with("http://127.0.0.1:"), "{}", url);

    let client = Client::new();
    let version = client.get(format!("{}rest/version", url)).send().expect("version");
    assert!(version.status().is_success());

    // the process may be gone before the reply is read
    if let Ok(resp) = client
        .put(format!("{}rest/bug/375161", url))
        .json(&json!({ "cc": { "add": ["zzz"] } }))
        .send()
    {
        assert_eq!(resp.status().as_u16(), 500);
    }

    let status = match wait_with_deadline(&mut child, Duration::from_secs(10)) {
        Some(status) => status,
        None => {
            let _ = child.kill();
            panic!("serve kept running after an unexpected request");
        }
    };
    assert!(!status.success(), "{:?}", status);
    assert_eq!(status.code(), Some(1));

    let mut stderr = String::new();
    child
        .stderr
        .take()
        .expect("stderr")
        .read_to_string(&mut stderr)
        .expect("read stderr");
    assert!(stderr.contains("ERROR Unexpected request PUT /rest/bug/375161"), "{}", stderr);
}
