//! The mock server: a `tiny_http` listener on an ephemeral localhost port
//! and one worker thread answering from a [`RouteTable`].

use super::routes::{Effect, IncomingRequest, Method, RouteTable};
use crate::{Error, Result};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tiny_http::{Header, Request, Response, Server};

/// What the server does with a request no route accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnexpectedRequestPolicy {
    /// Log the request and terminate the whole process with a failure status
    #[default]
    Abort,
    /// Answer 500 and keep the request for [`MockBugzilla::verdict`]
    Record,
}

/// Set once the expected attachment comment has been received.
///
/// Written only by the server worker, read by the driver once the workflow is over.
#[derive(Debug, Clone, Default)]
pub struct CommentFlag(Arc<AtomicBool>);

impl CommentFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise the flag; true only for the call that raised it.
    fn mark(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}

/// A running mock Bugzilla REST endpoint
pub struct MockBugzilla {
    server: Arc<Server>,
    addr: SocketAddr,
    flag: CommentFlag,
    violations: Arc<Mutex<Vec<String>>>,
    worker: Option<JoinHandle<()>>,
}

impl MockBugzilla {
    /// Bind `127.0.0.1:0` and start answering from `routes`.
    pub fn start(routes: RouteTable, policy: UnexpectedRequestPolicy) -> Result<Self> {
        let server = Server::http("127.0.0.1:0").map_err(|e| Error::ServerError(format!("bind failed: {}", e)))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| Error::ServerError("listener has no IP address".into()))?;
        let server = Arc::new(server);
        let flag = CommentFlag::default();
        let violations = Arc::new(Mutex::new(Vec::new()));

        let worker = {
            let server = server.clone();
            let flag = flag.clone();
            let violations = violations.clone();
            std::thread::Builder::new()
                .name("mock-bugzilla".into())
                .spawn(move || {
                    for request in server.incoming_requests() {
                        handle(request, &routes, &flag, &violations, policy);
                    }
                    debug!("mock bugzilla worker stopped");
                })
                .map_err(|e| Error::ServerError(format!("failed to spawn worker: {}", e)))?
        };

        info!("mock bugzilla listening on http://{}", addr);
        Ok(Self {
            server,
            addr,
            flag,
            violations,
            worker: Some(worker),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL with a trailing slash, as the assistant expects it
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn comment_flag(&self) -> CommentFlag {
        self.flag.clone()
    }

    pub fn comment_sent(&self) -> bool {
        self.flag.is_set()
    }

    /// Requests rejected so far under [`UnexpectedRequestPolicy::Record`]
    pub fn violations(&self) -> Vec<String> {
        self.violations.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Pass iff no unexpected request arrived and the comment was received.
    pub fn verdict(&self) -> Result<()> {
        if let Some(first) = self.violations().into_iter().next() {
            return Err(Error::ProtocolMismatch(first));
        }
        if !self.comment_sent() {
            return Err(Error::Assertion(
                "the server never received the attachment comment".into(),
            ));
        }
        Ok(())
    }

    /// Stop the worker and wait for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.server.unblock();
            if worker.join().is_err() {
                warn!("mock bugzilla worker panicked");
            }
        }
    }
}

impl Drop for MockBugzilla {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle(
    mut request: Request,
    routes: &RouteTable,
    flag: &CommentFlag,
    violations: &Mutex<Vec<String>>,
    policy: UnexpectedRequestPolicy,
) {
    let mut body = String::new();
    if let Err(e) = request.as_reader().read_to_string(&mut body) {
        warn!("failed to read request body: {}", e);
    }
    let incoming = IncomingRequest::new(Method::parse(request.method().as_str()), request.url(), body);

    match routes.dispatch(&incoming) {
        Some(route) => {
            debug!("{} => {}", incoming, route.status);
            if route.effect == Effect::MarkCommentSent && flag.mark() {
                info!("attachment comment received");
            }
            let mut response = Response::from_string(route.body.clone()).with_status_code(route.status);
            if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
                response.add_header(header);
            }
            if let Err(e) = request.respond(response) {
                warn!("failed to answer {}: {}", incoming, e);
            }
        }
        None => {
            error!("!!!!!!!!");
            error!("unexpected request {}", incoming);
            let mut response = Response::from_string("unexpected request").with_status_code(500);
            if let Ok(header) = Header::from_bytes(&b"Connection"[..], &b"close"[..]) {
                response.add_header(header);
            }
            match policy {
                UnexpectedRequestPolicy::Abort => {
                    let _ = request.respond(response);
                    eprintln!("ERROR Unexpected request {}", incoming);
                    std::process::exit(1);
                }
                UnexpectedRequestPolicy::Record => {
                    if let Ok(mut v) = violations.lock() {
                        v.push(incoming.to_string());
                    }
                    let _ = request.respond(response);
                }
            }
        }
    }
}
