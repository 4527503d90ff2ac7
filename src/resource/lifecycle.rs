//! Lifecycle engine
//!
//! Turns one logical operation into the sequence of transport calls it
//! needs. Every operation awaits its calls in order and holds no state
//! between calls; a [`CloudClient`] can be cloned and shared freely.

use super::codec::{self, CreateRequest};
use super::filter::{Filter, FilterPlan};
use super::model::{Attributes, Resource};
use super::registry::{find_resource, ResourceDef};
use super::translate::{translate, translate_body, Action, OpContext};
use crate::error::{CloudError, Result};
use crate::transport::{Method, Transport, TransportRequest, DEFAULT_INTERFACE};
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Upper bound on followed next-page links for one list call
const MAX_PAGES: usize = 1000;

/// Entry point of the engine
#[derive(Clone)]
pub struct CloudClient {
    transport: Arc<dyn Transport>,
    interface: String,
}

impl CloudClient {
    /// Create a client talking to the `public` interface
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            interface: DEFAULT_INTERFACE.to_string(),
        }
    }

    /// Use another endpoint interface (`internal`, `admin`, ...)
    pub fn with_interface(mut self, interface: &str) -> Self {
        self.interface = interface.to_string();
        self
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Operations on one resource type, by key (`networks`) or singular (`network`)
    pub fn resource(&self, name: &str) -> Result<ResourceClient<'_>> {
        let def = find_resource(name)
            .ok_or_else(|| CloudError::validation(format!("Unknown resource type '{}'", name)))?;
        Ok(ResourceClient { client: self, def })
    }

    /// List several resource types concurrently
    pub async fn list_many(&self, names: &[&str]) -> Result<Vec<(String, Vec<Resource>)>> {
        let clients = names
            .iter()
            .map(|name| self.resource(name))
            .collect::<Result<Vec<_>>>()?;

        try_join_all(clients.iter().map(|rc| async move {
            let items = rc.list(None).await?;
            Ok::<_, CloudError>((rc.def.plural.clone(), items))
        }))
        .await
    }

    // =========================================================================
    // Network shortcuts
    // =========================================================================

    pub async fn list_networks(&self, filters: Option<&Filter>) -> Result<Vec<Resource>> {
        self.resource("networks")?.list(filters).await
    }

    pub async fn search_networks(
        &self,
        name_or_id: Option<&str>,
        filters: Option<&Filter>,
    ) -> Result<Vec<Resource>> {
        self.resource("networks")?.search(name_or_id, filters).await
    }

    pub async fn get_network(&self, name_or_id: &str) -> Result<Option<Resource>> {
        self.resource("networks")?.get(name_or_id, None).await
    }

    pub async fn create_network(&self, request: CreateRequest) -> Result<Resource> {
        self.resource("networks")?.create(request).await
    }

    pub async fn update_network(&self, name_or_id: &str, attributes: Attributes) -> Result<Resource> {
        self.resource("networks")?.update(name_or_id, attributes).await
    }

    pub async fn delete_network(&self, name_or_id: &str) -> Result<bool> {
        self.resource("networks")?.delete(name_or_id).await
    }
}

/// Lifecycle operations bound to one resource type
#[derive(Clone, Copy)]
pub struct ResourceClient<'a> {
    client: &'a CloudClient,
    def: &'static ResourceDef,
}

impl<'a> ResourceClient<'a> {
    pub fn definition(&self) -> &'static ResourceDef {
        self.def
    }

    async fn call(
        &self,
        method: Method,
        path: String,
        query: Vec<(String, String)>,
        body: Option<Value>,
        ctx: &OpContext,
    ) -> Result<Option<Value>> {
        let mut request =
            TransportRequest::new(method, &self.def.service, &self.client.interface, path)
                .with_query(query);
        request.body = body;

        translate(self.client.transport.request(request).await, ctx)
    }

    /// List resources, optionally filtered.
    ///
    /// Items come back in server order. Next-page links are followed until
    /// the list is complete.
    pub async fn list(&self, filters: Option<&Filter>) -> Result<Vec<Resource>> {
        let ctx = OpContext::new(Action::List, &self.def.plural, None);
        let plan = FilterPlan::for_resource(self.def, filters);
        let path = codec::collection_path(self.def);

        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(plan.query.clone());
        while let Some(query) = next.take() {
            if seen.len() == MAX_PAGES {
                return Err(CloudError::bad_response(format!(
                    "Bad response {}: more than {} pages",
                    ctx, MAX_PAGES
                )));
            }
            if !seen.insert(page_key(&query)) {
                return Err(CloudError::bad_response(format!(
                    "Bad response {}: next link points back to an already fetched page",
                    ctx
                )));
            }

            let body = self
                .call(Method::GET, path.clone(), query, None, &ctx)
                .await?
                .ok_or_else(|| CloudError::bad_response(format!("Bad response {}: empty body", ctx)))?;
            let page = codec::decode_list(self.def, body, &ctx)?;
            items.extend(page.items);
            next = page.next;
        }

        tracing::debug!("listed {} {}", items.len(), self.def.plural);
        Ok(plan.apply(items))
    }

    /// List resources whose `id` or `name` equals `name_or_id`
    pub async fn search(
        &self,
        name_or_id: Option<&str>,
        filters: Option<&Filter>,
    ) -> Result<Vec<Resource>> {
        let items = self.list(filters).await?;
        Ok(match name_or_id {
            Some(name_or_id) => items
                .into_iter()
                .filter(|item| item.is_named(name_or_id))
                .collect(),
            None => items,
        })
    }

    /// Resolve `name_or_id` to one resource.
    ///
    /// An `id` match wins over a `name` match; among duplicate names the
    /// first in server order wins. Uses a direct lookup first when the
    /// service offers one and no filters are given.
    pub async fn get(&self, name_or_id: &str, filters: Option<&Filter>) -> Result<Option<Resource>> {
        if self.def.direct_lookup && filters.map_or(true, Filter::is_empty) {
            if let Some(found) = self.lookup(name_or_id).await? {
                return Ok(Some(found));
            }
        }

        let items = self.list(filters).await?;
        let found = items
            .iter()
            .position(|item| item.id() == Some(name_or_id))
            .or_else(|| items.iter().position(|item| item.name() == Some(name_or_id)));

        Ok(found.and_then(|idx| items.into_iter().nth(idx)))
    }

    /// `GET <path>/<id>`; a 404 means "not an id", not an error
    async fn lookup(&self, id: &str) -> Result<Option<Resource>> {
        let ctx = OpContext::new(Action::Get, &self.def.singular, Some(id));
        match self
            .call(Method::GET, codec::item_path(self.def, id), Vec::new(), None, &ctx)
            .await
        {
            Ok(Some(body)) => codec::decode_single(self.def, body, &ctx).map(Some),
            Ok(None) => Err(CloudError::bad_response(format!("Bad response {}: empty body", ctx))),
            Err(err) if err.status() == Some(404) => {
                tracing::debug!("direct lookup of {} '{}' missed, scanning", self.def.singular, id);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Create a resource with one call.
    ///
    /// All validation happens before the call is issued.
    pub async fn create(&self, request: CreateRequest) -> Result<Resource> {
        let attributes = codec::create_attributes(self.def, &request)?;
        let ctx = OpContext::new(Action::Create, &self.def.singular, Some(request.name.as_str()));
        tracing::info!("creating {} '{}'", self.def.singular, request.name);

        let request = TransportRequest::new(
            Method::POST,
            &self.def.service,
            &self.client.interface,
            codec::collection_path(self.def),
        )
        .with_body(codec::wrap_single(self.def, attributes));

        let body = translate_body(self.client.transport.request(request).await, &ctx)?;
        codec::decode_single(self.def, body, &ctx)
    }

    /// Update attributes of an existing resource
    pub async fn update(&self, name_or_id: &str, attributes: Attributes) -> Result<Resource> {
        if attributes.is_empty() {
            return Err(CloudError::validation(format!(
                "No attributes given to update {} {}",
                self.def.singular, name_or_id
            )));
        }

        let resource = self.get(name_or_id, None).await?.ok_or_else(|| {
            CloudError::not_found(format!("{} {} not found", self.def.singular, name_or_id))
        })?;
        let id = resource_id(self.def, &resource, name_or_id)?;

        let ctx = OpContext::new(Action::Update, &self.def.singular, Some(name_or_id));
        tracing::info!("updating {} '{}' ({})", self.def.singular, name_or_id, id);

        let body = self
            .call(
                Method::PUT,
                codec::item_path(self.def, &id),
                Vec::new(),
                Some(codec::wrap_single(self.def, attributes)),
                &ctx,
            )
            .await?
            .ok_or_else(|| CloudError::bad_response(format!("Bad response {}: empty body", ctx)))?;
        codec::decode_single(self.def, body, &ctx)
    }

    /// Idempotent delete.
    ///
    /// Returns `Ok(false)` when nothing matches `name_or_id`, `Ok(true)`
    /// after a successful delete. A failing delete call is an error, never
    /// `false`.
    pub async fn delete(&self, name_or_id: &str) -> Result<bool> {
        let Some(resource) = self.get(name_or_id, None).await? else {
            tracing::debug!("{} '{}' not found, nothing to delete", self.def.singular, name_or_id);
            return Ok(false);
        };
        let id = resource_id(self.def, &resource, name_or_id)?;

        let ctx = OpContext::new(Action::Delete, &self.def.singular, Some(name_or_id));
        tracing::info!("deleting {} '{}' ({})", self.def.singular, name_or_id, id);

        self.call(Method::DELETE, codec::item_path(self.def, &id), Vec::new(), None, &ctx)
            .await?;
        Ok(true)
    }
}

/// Order-insensitive identity of a page query
fn page_key(query: &[(String, String)]) -> BTreeSet<(String, String)> {
    query.iter().cloned().collect()
}

fn resource_id(def: &ResourceDef, resource: &Resource, name_or_id: &str) -> Result<String> {
    resource.id().map(str::to_string).ok_or_else(|| {
        CloudError::bad_response(format!(
            "Bad response: {} {} has no 'id'",
            def.singular, name_or_id
        ))
    })
}
