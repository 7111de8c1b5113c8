use std::fmt;

use serde::{Deserialize, Serialize};

/// Page-scoped user id as accepted by the Send API.
///
/// The platform delivers ids as strings, but numeric ids are accepted on the way
/// out and are serialized as JSON numbers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(i64),
    Scoped(String),
}

impl From<i64> for UserId {
    fn from(v: i64) -> Self {
        UserId::Numeric(v)
    }
}

impl From<&str> for UserId {
    fn from(v: &str) -> Self {
        UserId::Scoped(v.to_string())
    }
}

impl From<String> for UserId {
    fn from(v: String) -> Self {
        UserId::Scoped(v)
    }
}

impl From<&String> for UserId {
    fn from(v: &String) -> Self {
        UserId::Scoped(v.clone())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(n) => write!(f, "{n}"),
            UserId::Scoped(s) => f.write_str(s),
        }
    }
}

/// Identity of the page the adapter acts for.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PageInfo {
    pub id: String,
    pub name: String,
}
