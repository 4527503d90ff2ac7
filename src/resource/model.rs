//! Canonical resource representation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plain attribute mapping, the canonical form of every resource
pub type Attributes = Map<String, Value>;

/// One remote object as a flat attribute mapping.
///
/// Identity is the service-assigned `id`; `name` is not unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(Attributes);

impl Resource {
    pub fn new(attributes: Attributes) -> Self {
        Self(attributes)
    }

    /// Wrap a JSON value, `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.0
    }

    pub fn into_attributes(self) -> Attributes {
        self.0
    }

    /// True when `id` or `name` equals `name_or_id`
    pub fn is_named(&self, name_or_id: &str) -> bool {
        self.id() == Some(name_or_id) || self.name() == Some(name_or_id)
    }
}

impl From<Attributes> for Resource {
    fn from(attributes: Attributes) -> Self {
        Self(attributes)
    }
}

impl From<Resource> for Value {
    fn from(resource: Resource) -> Self {
        Value::Object(resource.0)
    }
}

impl PartialEq<Value> for Resource {
    fn eq(&self, other: &Value) -> bool {
        other.as_object() == Some(&self.0)
    }
}
