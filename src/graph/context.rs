use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Session state threaded through every stage function call.
///
/// A Context belongs to exactly one executor for the session's lifetime;
/// there is no ambient shared state. Cloning is what makes executor steps
/// atomic: a stage runs against a clone and the original survives a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_remove() {
        let mut ctx = Context::new();
        ctx.set("question", "how do I patch this?");
        ctx.set("paths", json!(["src/lib.rs"]));

        assert_eq!(ctx.get_str("question"), Some("how do I patch this?"));
        assert!(ctx.contains("paths"));
        assert_eq!(ctx.len(), 2);

        ctx.remove("paths");
        assert!(!ctx.contains("paths"));
    }

    #[test]
    fn serializes_transparently() {
        let mut ctx = Context::new();
        ctx.set("answer", 42);
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(json, r#"{"answer":42}"#);

        let back: Context = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
    }
}
