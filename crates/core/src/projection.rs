//! Serialization projections: API response shapes selected by group name.

use serde::Serialize;
use serde_json::{Map, Value};

/// Field whitelist per serialization group.
pub trait Projection: Serialize {
    /// Fields included for `group`, in output order. `None` means the group
    /// is not declared and the full record is returned.
    fn projection_fields(group: &str) -> Option<&'static [&'static str]>;

    /// Derived values computed at serialization time, not stored.
    fn virtual_fields(&self, _group: &str) -> Vec<(&'static str, Value)> {
        Vec::new()
    }

    fn project(&self, group: &str) -> Value {
        let full = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(other) => return other,
            Err(e) => {
                tracing::warn!(error = %e, "projection serialization failed");
                return Value::Null;
            }
        };

        let mut out = match Self::projection_fields(group) {
            Some(fields) => {
                let mut picked = Map::new();
                for field in fields {
                    if let Some(v) = full.get(*field) {
                        picked.insert((*field).to_string(), v.clone());
                    }
                }
                picked
            }
            None => full,
        };
        for (key, value) in self.virtual_fields(group) {
            out.insert(key.to_string(), value);
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Role {
        id: u32,
        title: String,
        icon: Option<String>,
    }

    impl Projection for Role {
        fn projection_fields(group: &str) -> Option<&'static [&'static str]> {
            match group {
                "list" => Some(&["title", "id"]),
                _ => None,
            }
        }

        fn virtual_fields(&self, group: &str) -> Vec<(&'static str, Value)> {
            match group {
                "list" => vec![("has_icon", json!(self.icon.is_some()))],
                _ => vec![],
            }
        }
    }

    #[test]
    fn list_group_keeps_whitelisted_and_virtual_fields() {
        let role = Role { id: 7, title: "Guardian".into(), icon: None };
        let projected = role.project("list");
        assert_eq!(
            projected,
            json!({ "id": 7, "title": "Guardian", "has_icon": false })
        );
        let keys: Vec<&str> = projected
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["title", "id", "has_icon"]);
    }

    #[test]
    fn undeclared_group_returns_everything() {
        let role = Role { id: 7, title: "Guardian".into(), icon: Some("fa-user".into()) };
        assert_eq!(
            role.project("detail"),
            json!({ "id": 7, "title": "Guardian", "icon": "fa-user" })
        );
    }
}
