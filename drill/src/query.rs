use std::fmt;

/// A single step of a query: either a key into an unordered branch, or an
/// index into an ordered branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    Key(String),
    Index(isize),
}

impl Query {
    /// The name this step selects, if it is a key.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Query::Key(key) => Some(key),
            Query::Index(_) => None,
        }
    }
}

impl From<&str> for Query {
    fn from(key: &str) -> Self {
        Query::Key(key.to_string())
    }
}

impl From<String> for Query {
    fn from(key: String) -> Self {
        Query::Key(key)
    }
}

impl From<isize> for Query {
    fn from(i: isize) -> Self {
        Query::Index(i)
    }
}

impl From<i32> for Query {
    fn from(i: i32) -> Self {
        Query::Index(i as isize)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Key(key) => write!(f, "{:?}", key),
            Query::Index(i) => write!(f, "{}", i),
        }
    }
}
