//! Ordered request table for the mock Bugzilla REST API.
//!
//! Routes are tried in insertion order and the first one whose method, path
//! and condition all hold answers the request. A request no route accepts
//! is a protocol mismatch; there is no fallback route.

use super::Fixtures;
use serde_json::{json, Value};
use std::fmt;

/// Request methods the table distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Other(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "PUT" => Method::Put,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Put => f.write_str("PUT"),
            Method::Post => f.write_str("POST"),
            Method::Other(m) => f.write_str(m),
        }
    }
}

/// The parts of an HTTP request the table looks at
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    /// Path without the query string
    pub path: String,
    pub query: Option<String>,
    pub body: String,
}

impl IncomingRequest {
    /// Split a request target such as `/rest/login?login=a` into path and query.
    pub fn new(method: Method, target: &str, body: impl Into<String>) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            body: body.into(),
        }
    }

    fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

impl fmt::Display for IncomingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        if !self.body.is_empty() {
            write!(f, " body={}", self.body)?;
        }
        Ok(())
    }
}

/// Extra requirement a request must meet beyond method and path
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Always,
    /// Every listed `key=value` pair appears in the query string
    QueryPairs(Vec<(String, String)>),
    /// The JSON body holds an array at `pointer` containing the string `value`
    JsonArrayContains { pointer: String, value: String },
    /// The JSON body holds a string at `pointer` containing `needle`
    JsonTextContains { pointer: String, needle: String },
}

impl Condition {
    pub fn holds(&self, request: &IncomingRequest) -> bool {
        match self {
            Condition::Always => true,
            Condition::QueryPairs(expected) => {
                let query = request.query.as_deref().unwrap_or("");
                let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect();
                expected.iter().all(|e| pairs.contains(e))
            }
            Condition::JsonArrayContains { pointer, value } => request
                .json_body()
                .and_then(|body| body.pointer(pointer).and_then(Value::as_array).cloned())
                .is_some_and(|items| items.iter().any(|i| i.as_str() == Some(value.as_str()))),
            Condition::JsonTextContains { pointer, needle } => request
                .json_body()
                .and_then(|body| body.pointer(pointer).and_then(Value::as_str).map(str::to_string))
                .is_some_and(|text| text.contains(needle.as_str())),
        }
    }
}

/// Side effect of answering a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Raise the comment-sent flag
    MarkCommentSent,
}

/// One entry of the table
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub condition: Condition,
    pub status: u16,
    pub body: String,
    pub effect: Effect,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            condition: Condition::Always,
            status: 200,
            body: String::new(),
            effect: Effect::None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = value.to_string();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    pub fn accepts(&self, request: &IncomingRequest) -> bool {
        self.method == request.method && self.path == request.path && self.condition.holds(request)
    }
}

/// The values the mock recognises: credentials, ids and sentinels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectations {
    pub version: String,
    /// Product slug the application asks for
    pub product: String,
    pub login: String,
    pub password: String,
    pub token: String,
    pub user_id: String,
    pub bug_id: u64,
    /// Address expected in `cc.add` when subscribing to the bug
    pub cc: String,
    /// Substring the attachment comment must contain
    pub comment_sentinel: String,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            version: "5.0.6".to_string(),
            // product detection in the assistant lands on this slug
            product: "ruby".to_string(),
            login: "xxx".to_string(),
            password: "yyy".to_string(),
            token: "123".to_string(),
            user_id: "321".to_string(),
            bug_id: 375161,
            cc: "xxx".to_string(),
            comment_sentinel: "yyyyyyyyy".to_string(),
        }
    }
}

/// Routes evaluated in order, first match wins
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn dispatch(&self, request: &IncomingRequest) -> Option<&Route> {
        self.routes.iter().find(|r| r.accepts(request))
    }

    /// The API surface used while attaching a report to an existing bug.
    pub fn duplicate_attach(expect: &Expectations, fixtures: &Fixtures) -> Self {
        let bug = format!("/rest/bug/{}", expect.bug_id);
        Self::new()
            .route(Route::get("/rest/version").json(json!({ "version": expect.version })))
            .route(Route::get(format!("/rest/product/{}", expect.product)).body(fixtures.product.clone()))
            .route(
                Route::get("/rest/login")
                    .when(Condition::QueryPairs(vec![
                        ("login".to_string(), expect.login.clone()),
                        ("password".to_string(), expect.password.clone()),
                    ]))
                    .json(json!({ "token": expect.token, "id": expect.user_id })),
            )
            .route(Route::get("/rest/bug").body(fixtures.bugs.clone()))
            .route(Route::get(bug.clone()).body(fixtures.bugs.clone()))
            .route(Route::get(format!("{}/comment", bug)).body(fixtures.comments.clone()))
            .route(
                Route::put(bug.clone())
                    .when(Condition::JsonArrayContains {
                        pointer: "/cc/add".to_string(),
                        value: expect.cc.clone(),
                    })
                    .body(fixtures.bugs.clone()),
            )
            .route(
                Route::post(format!("{}/attachment", bug))
                    .when(Condition::JsonTextContains {
                        pointer: "/comment".to_string(),
                        needle: expect.comment_sentinel.clone(),
                    })
                    .json(json!({ "ids": [expect.bug_id] }))
                    .effect(Effect::MarkCommentSent),
            )
    }
}
