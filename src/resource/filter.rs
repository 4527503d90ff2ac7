//! Filter engine
//!
//! A [`Filter`] is an exact-match attribute mapping. For each list call the
//! engine decides whether the service can apply it (every key is a known
//! query filter for the resource type and every value is a scalar) or
//! whether it must run as a predicate over the fetched items.

use super::model::Resource;
use super::registry::ResourceDef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Exact-match attribute filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(BTreeMap<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition, builder style
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// True when every condition holds for `resource`
    pub fn matches(&self, resource: &Resource) -> bool {
        self.0.iter().all(|(key, expected)| {
            resource
                .get(key)
                .map(|actual| value_matches(actual, expected))
                .unwrap_or(false)
        })
    }

    /// Keep the matching items, preserving order
    pub fn apply(&self, items: Vec<Resource>) -> Vec<Resource> {
        if self.is_empty() {
            return items;
        }
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Exact match, where a string condition also matches a bool/number whose
/// rendered form is the same (`"true"` matches `true`).
fn value_matches(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (actual, expected) {
        (Value::Bool(_) | Value::Number(_), Value::String(s)) => actual.to_string() == *s,
        (Value::String(s), Value::Bool(_) | Value::Number(_)) => expected.to_string() == *s,
        _ => false,
    }
}

/// Render a scalar as a query-string value, `None` for arrays, objects and null
pub fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Where a filter runs for one list call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPlan {
    /// Query pairs sent with the list request
    pub query: Vec<(String, String)>,
    /// Predicate applied to the fetched items
    pub post: Option<Filter>,
}

impl FilterPlan {
    /// Plan a filter for a resource type
    pub fn for_resource(def: &ResourceDef, filters: Option<&Filter>) -> Self {
        let Some(filters) = filters.filter(|f| !f.is_empty()) else {
            return Self::default();
        };

        let query: Option<Vec<(String, String)>> = filters
            .iter()
            .map(|(key, value)| query_value(value).map(|v| (key.clone(), v)))
            .collect();

        match query {
            Some(query) if def.filters_server_side(filters.keys()) => {
                tracing::debug!("{}: filtering server-side on {:?}", def.plural, query);
                Self { query, post: None }
            }
            _ => {
                tracing::debug!("{}: filtering client-side", def.plural);
                Self {
                    query: Vec::new(),
                    post: Some(filters.clone()),
                }
            }
        }
    }

    pub fn apply(&self, items: Vec<Resource>) -> Vec<Resource> {
        match &self.post {
            Some(filter) => filter.apply(items),
            None => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::get_resource;
    use serde_json::json;

    fn resource(value: Value) -> Resource {
        Resource::from_value(value).unwrap()
    }

    #[test]
    fn test_matches_exact_values() {
        let net = resource(json!({"id": "1", "name": "test", "shared": false, "mtu": 1500}));

        assert!(Filter::new().with("name", "test").matches(&net));
        assert!(!Filter::new().with("name", "tes").matches(&net));
        assert!(Filter::new().with("shared", false).matches(&net));
        assert!(Filter::new().with("shared", "false").matches(&net));
        assert!(Filter::new().with("mtu", "1500").matches(&net));
        assert!(!Filter::new().with("missing", "x").matches(&net));
    }

    #[test]
    fn test_apply_preserves_order() {
        let items = vec![
            resource(json!({"id": "1", "name": "test"})),
            resource(json!({"id": "2", "name": "other"})),
            resource(json!({"id": "3", "name": "test"})),
        ];

        let kept = Filter::new().with("name", "test").apply(items);
        let ids: Vec<_> = kept.iter().filter_map(Resource::id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_plan_server_side_for_known_keys() {
        let networks = get_resource("networks").unwrap();
        let filter = Filter::new().with("name", "test").with("admin_state_up", true);

        let plan = FilterPlan::for_resource(networks, Some(&filter));

        assert!(plan.post.is_none());
        assert!(plan.query.contains(&("name".to_string(), "test".to_string())));
        assert!(plan.query.contains(&("admin_state_up".to_string(), "true".to_string())));
    }

    #[test]
    fn test_plan_client_side_for_unknown_key() {
        let networks = get_resource("networks").unwrap();
        let filter = Filter::new().with("name", "test").with("description", "x");

        let plan = FilterPlan::for_resource(networks, Some(&filter));

        assert!(plan.query.is_empty());
        assert_eq!(plan.post, Some(filter));
    }

    #[test]
    fn test_plan_client_side_for_structured_value() {
        let networks = get_resource("networks").unwrap();
        let filter = Filter::new().with("name", json!(["a", "b"]));

        let plan = FilterPlan::for_resource(networks, Some(&filter));
        assert!(plan.query.is_empty());
        assert!(plan.post.is_some());
    }

    #[test]
    fn test_plan_empty_filter() {
        let networks = get_resource("networks").unwrap();
        assert_eq!(
            FilterPlan::for_resource(networks, Some(&Filter::new())),
            FilterPlan::default()
        );
        assert_eq!(FilterPlan::for_resource(networks, None), FilterPlan::default());
    }
}
