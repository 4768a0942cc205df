//! Canned response bodies served by the mock server.

use crate::{Error, Result};
use std::fs;
use std::path::Path;

pub const PRODUCT_FILE: &str = "product.json";
pub const BUGS_FILE: &str = "bugs.json";
pub const COMMENTS_FILE: &str = "comments.json";

/// Response bodies for the product, bug and comment endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixtures {
    pub product: String,
    pub bugs: String,
    pub comments: String,
}

impl Fixtures {
    /// The copies shipped with the crate.
    pub fn builtin() -> Self {
        Self {
            product: include_str!("../../data/product.json").to_string(),
            bugs: include_str!("../../data/bugs.json").to_string(),
            comments: include_str!("../../data/comments.json").to_string(),
        }
    }

    /// Load `product.json`, `bugs.json` and `comments.json` from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let read = |file: &str| {
            let path = dir.join(file);
            fs::read_to_string(&path).map_err(|e| Error::ConfigError(format!("fixture {}: {}", path.display(), e)))
        };
        Ok(Self {
            product: read(PRODUCT_FILE)?,
            bugs: read(BUGS_FILE)?,
            comments: read(COMMENTS_FILE)?,
        })
    }
}

impl Default for Fixtures {
    fn default() -> Self {
        Self::builtin()
    }
}
