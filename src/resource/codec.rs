//! Resource codec
//!
//! Pure mapping between canonical attributes and a service's wire schema:
//! request paths, the singular/plural body wrappers, create-body assembly
//! and the namespace prefix of provider options. No network calls.

use super::model::{Attributes, Resource};
use super::registry::ResourceDef;
use super::translate::OpContext;
use crate::error::{CloudError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

const NEXT_LINK_BASE: &str = "http://placeholder.invalid/";

/// Join a namespace prefix and an attribute key (`provider:network_type`)
pub fn namespaced(prefix: &str, key: &str) -> String {
    format!("{}:{}", prefix, key)
}

fn suffix(def: &ResourceDef) -> &'static str {
    if def.json_suffix {
        ".json"
    } else {
        ""
    }
}

/// Path of the collection, e.g. `/v2.0/networks.json`
pub fn collection_path(def: &ResourceDef) -> String {
    format!("/{}{}", def.path, suffix(def))
}

/// Path of a single item, e.g. `/v2.0/networks/<id>.json`
pub fn item_path(def: &ResourceDef, id: &str) -> String {
    format!("/{}/{}{}", def.path, urlencoding::encode(id), suffix(def))
}

/// Wrap attributes under the singular key
pub fn wrap_single(def: &ResourceDef, attributes: Attributes) -> Value {
    let mut body = Attributes::new();
    body.insert(def.singular.clone(), Value::Object(attributes));
    Value::Object(body)
}

/// Take the item out of a single-item body
pub fn decode_single(def: &ResourceDef, body: Value, ctx: &OpContext) -> Result<Resource> {
    let Value::Object(mut body) = body else {
        return Err(CloudError::bad_response(format!(
            "Bad response {}: expected an object",
            ctx
        )));
    };

    body.remove(&def.singular)
        .and_then(Resource::from_value)
        .ok_or_else(|| {
            CloudError::bad_response(format!(
                "Bad response {}: missing '{}' object",
                ctx, def.singular
            ))
        })
}

/// One page of a list response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub items: Vec<Resource>,
    /// Query of the next page, when the service advertised one
    pub next: Option<Vec<(String, String)>>,
}

/// Take the items (and the next-page marker) out of a list body
pub fn decode_list(def: &ResourceDef, body: Value, ctx: &OpContext) -> Result<ListPage> {
    let next = next_page_query(def, &body, ctx)?;

    let Value::Object(mut body) = body else {
        return Err(CloudError::bad_response(format!(
            "Bad response {}: expected an object",
            ctx
        )));
    };

    let Some(Value::Array(raw_items)) = body.remove(&def.plural) else {
        return Err(CloudError::bad_response(format!(
            "Bad response {}: missing '{}' list",
            ctx, def.plural
        )));
    };

    let items = raw_items
        .into_iter()
        .map(|item| {
            Resource::from_value(item).ok_or_else(|| {
                CloudError::bad_response(format!(
                    "Bad response {}: '{}' contains a non-object item",
                    ctx, def.plural
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ListPage { items, next })
}

/// Query of the `rel: next` entry of `<plural>_links`, if any.
///
/// Relative hrefs are resolved against a placeholder base; only the query
/// is used.
fn next_page_query(
    def: &ResourceDef,
    body: &Value,
    ctx: &OpContext,
) -> Result<Option<Vec<(String, String)>>> {
    let href = body
        .get(format!("{}_links", def.plural))
        .and_then(Value::as_array)
        .and_then(|links| {
            links
                .iter()
                .find(|link| link.get("rel").and_then(Value::as_str) == Some("next"))
        })
        .and_then(|link| link.get("href"));

    let Some(href) = href else {
        return Ok(None);
    };
    let unparseable = |detail: String| {
        CloudError::bad_response(format!("Bad response {}: next link {}", ctx, detail))
    };
    let href = href
        .as_str()
        .ok_or_else(|| unparseable(format!("is not a string: {}", href)))?;

    Url::parse(NEXT_LINK_BASE)
        .and_then(|base| base.join(href))
        .map(|url| Some(url.query_pairs().into_owned().collect()))
        .map_err(|e| unparseable(format!("'{}' is unparseable: {}", href, e)))
}

/// Allow-listed provider options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderOptions(BTreeMap<String, Value>);

impl ProviderOptions {
    /// Validate untyped input and keep only allow-listed keys.
    ///
    /// Anything but a JSON object is rejected; unknown keys are dropped.
    pub fn from_value(value: &Value, allowed: &[String]) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(CloudError::validation("Parameter 'provider' must be a dict"));
        };

        let options = map
            .iter()
            .filter(|(key, _)| allowed.iter().any(|a| a == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<BTreeMap<_, _>>();

        let dropped = map.len() - options.len();
        if dropped > 0 {
            tracing::debug!("dropped {} provider option(s) outside the allow-list", dropped);
        }

        Ok(Self(options))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Options as namespaced wire attributes
    pub fn wire_attributes<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (String, Value)> + 'a {
        self.0
            .iter()
            .map(move |(key, value)| (namespaced(prefix, key), value.clone()))
    }
}

/// Arguments of a create call
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub name: String,
    /// Defaults to `true` on types with admin state
    pub admin_state_up: Option<bool>,
    pub project_id: Option<String>,
    pub external: bool,
    /// Untyped provider option bag, validated on assembly
    pub provider: Option<Value>,
    /// Additional wire attributes passed through as-is
    pub extra: Attributes,
}

impl CreateRequest {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn admin_state_up(mut self, up: bool) -> Self {
        self.admin_state_up = Some(up);
        self
    }

    pub fn project_id(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_string());
        self
    }

    pub fn external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    pub fn provider(mut self, provider: impl Into<Value>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

fn unsupported(parameter: &str, def: &ResourceDef) -> CloudError {
    CloudError::validation(format!(
        "Parameter '{}' is not supported for {}",
        parameter, def.plural
    ))
}

/// Assemble the canonical create attributes for a resource type.
///
/// Extra attributes go in first so the named parameters win on collisions.
pub fn create_attributes(def: &ResourceDef, request: &CreateRequest) -> Result<Attributes> {
    let provider = request
        .provider
        .as_ref()
        .map(|value| ProviderOptions::from_value(value, &def.provider.keys))
        .transpose()?;

    let mut attributes = request.extra.clone();
    attributes.insert("name".to_string(), Value::String(request.name.clone()));

    match (def.admin_state, request.admin_state_up) {
        (true, up) => {
            attributes.insert("admin_state_up".to_string(), Value::Bool(up.unwrap_or(true)));
        }
        (false, Some(_)) => return Err(unsupported("admin_state_up", def)),
        (false, None) => {}
    }

    if let Some(project_id) = &request.project_id {
        let attr = def
            .project_attr
            .as_ref()
            .ok_or_else(|| unsupported("project_id", def))?;
        attributes.insert(attr.clone(), Value::String(project_id.clone()));
    }

    if request.external {
        let attr = def
            .external_attr
            .as_ref()
            .ok_or_else(|| unsupported("external", def))?;
        attributes.insert(attr.clone(), Value::Bool(true));
    }

    if let Some(provider) = provider {
        attributes.extend(provider.wire_attributes(&def.provider.prefix));
    }

    if let Some(missing) = def.required.iter().find(|key| !attributes.contains_key(*key)) {
        return Err(CloudError::validation(format!(
            "Parameter '{}' is required to create a {}",
            missing, def.singular
        )));
    }

    Ok(attributes)
}
