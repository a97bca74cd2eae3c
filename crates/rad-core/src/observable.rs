//! Read-only state inspection for diagnostics.
//!
//! The injector, channel and player expose their counters through this so
//! the runner can log them without knowing each component's fields.

use std::fmt;

/// A dynamically-typed diagnostic value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v:#04X}"),
            Value::U16(v) => write!(f, "{v:#06X}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// A component whose counters can be queried by name.
///
/// Queries never change component state.
pub trait Observable {
    /// Query one property, `None` if the path is unknown.
    fn query(&self, path: &str) -> Option<Value>;

    /// Every path `query` answers.
    fn query_paths(&self) -> &'static [&'static str];

    /// All properties as `path=value` pairs, space separated.
    fn describe(&self) -> String {
        self.query_paths()
            .iter()
            .filter_map(|path| self.query(path).map(|value| format!("{path}={value}")))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        hits: u32,
        armed: bool,
    }

    impl Observable for Counter {
        fn query(&self, path: &str) -> Option<Value> {
            match path {
                "hits" => Some(self.hits.into()),
                "armed" => Some(self.armed.into()),
                _ => None,
            }
        }

        fn query_paths(&self) -> &'static [&'static str] {
            &["hits", "armed"]
        }
    }

    #[test]
    fn describe_lists_every_path() {
        let counter = Counter { hits: 3, armed: true };
        assert_eq!(counter.describe(), "hits=3 armed=true");
        assert_eq!(counter.query("missing"), None);
    }

    #[test]
    fn addresses_format_as_hex() {
        assert_eq!(Value::U16(0xFCE2).to_string(), "0xFCE2");
        assert_eq!(Value::U8(0x0A).to_string(), "0x0A");
    }
}
