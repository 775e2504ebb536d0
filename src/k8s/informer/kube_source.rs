/**
 * Kubernetes-backed list/watch source
 *
 * Lists a collection page by page and opens raw watch streams from a
 * resourceVersion, translating kube watch events into informer raw events.
 */
use super::config::InformerConfig;
use super::errors::EXPIRED_CODE;
use super::resource::{Cursor, ResourceState, Selectors};
use super::source::{DeletedObject, ListerWatcher, Listing, RawEvent, WatchStream};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use kube::api::{Api, ListParams, WatchEvent, WatchParams};
use kube::core::{ApiResource, DynamicObject};
use kube::discovery::{Discovery, Scope};
use kube::Client;
use std::fmt;
use tracing::{debug, info};

/// Which collection to observe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionKind {
    /// A core/v1 resource by plural name, e.g. `pods` or `endpoints`
    Core(String),
    /// Any served resource by group, version and plural name
    Dynamic {
        group: String,
        version: String,
        resource: String,
    },
}

impl CollectionKind {
    #[must_use]
    pub fn core(plural: &str) -> Self {
        Self::Core(plural.to_string())
    }

    #[must_use]
    pub fn dynamic(group: &str, version: &str, resource: &str) -> Self {
        Self::Dynamic {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }

    fn parts(&self) -> (&str, &str, &str) {
        match self {
            Self::Core(plural) => ("", "v1", plural),
            Self::Dynamic { group, version, resource } => (group, version, resource),
        }
    }

    /// Resolve through API discovery to the served resource and its scope.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails or the resource is not served
    pub async fn resolve(&self, client: &Client) -> Result<(ApiResource, bool)> {
        let (group, version, plural) = self.parts();
        let discovery = Discovery::new(client.clone()).filter(&[group]).run().await?;
        for api_group in discovery.groups() {
            for (ar, caps) in api_group.versioned_resources(version) {
                if ar.plural == plural {
                    let namespaced = matches!(caps.scope, Scope::Namespaced);
                    debug!("🔎 Resolved {} to kind {} (namespaced: {})", self, ar.kind, namespaced);
                    return Ok((ar, namespaced));
                }
            }
        }
        Err(Error::Custom(format!("resource not served by the cluster: {self}")))
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parts() {
            ("", version, plural) => write!(f, "{version}/{plural}"),
            (group, version, plural) => write!(f, "{group}/{version}/{plural}"),
        }
    }
}

/// [`ListerWatcher`] over a kube `Api<DynamicObject>`
#[derive(Clone)]
pub struct KubeListerWatcher {
    api: Api<DynamicObject>,
    kind: String,
    list_page_size: Option<u32>,
    watch_timeout_secs: u32,
    allow_bookmarks: bool,
}

impl KubeListerWatcher {
    /// Scope to `namespace` when the resource is namespaced; otherwise watch cluster-wide
    #[must_use]
    pub fn new(
        client: Client,
        resource: &ApiResource,
        namespaced: bool,
        namespace: Option<&str>,
        config: &InformerConfig,
    ) -> Self {
        let api = match namespace {
            Some(ns) if namespaced => Api::namespaced_with(client, ns, resource),
            _ => Api::all_with(client, resource),
        };
        Self {
            api,
            kind: resource.kind.clone(),
            list_page_size: config.list_page_size,
            watch_timeout_secs: config.watch_timeout_secs,
            allow_bookmarks: config.allow_bookmarks,
        }
    }

    fn list_params(&self, selectors: &Selectors) -> ListParams {
        let mut lp = ListParams::default();
        if let Some(fields) = selectors.field() {
            lp = lp.fields(fields);
        }
        if let Some(labels) = selectors.label() {
            lp = lp.labels(labels);
        }
        if let Some(limit) = self.list_page_size {
            lp = lp.limit(limit);
        }
        lp
    }

    fn watch_params(&self, selectors: &Selectors) -> WatchParams {
        let mut wp = WatchParams::default().timeout(self.watch_timeout_secs);
        if let Some(fields) = selectors.field() {
            wp = wp.fields(fields);
        }
        if let Some(labels) = selectors.label() {
            wp = wp.labels(labels);
        }
        if !self.allow_bookmarks {
            wp = wp.disable_bookmarks();
        }
        wp
    }
}

#[async_trait]
impl ListerWatcher for KubeListerWatcher {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn list(&self, selectors: &Selectors) -> Result<Listing> {
        let base = self.list_params(selectors);
        let mut items = Vec::new();
        let mut continue_token: Option<String> = None;
        loop {
            let lp = match &continue_token {
                Some(token) => base.clone().continue_token(token),
                None => base.clone(),
            };
            let page = self.api.list(&lp).await?;
            for object in page.items {
                match ResourceState::from_object(&self.kind, object) {
                    Some(state) => items.push(state),
                    None => debug!("Skipping listed {} without a name", self.kind),
                }
            }
            continue_token = page.metadata.continue_.filter(|token| !token.is_empty());
            if continue_token.is_none() {
                let cursor = page
                    .metadata
                    .resource_version
                    .map(Cursor::new)
                    .ok_or_else(|| Error::Custom(format!("{} list returned no resourceVersion", self.kind)))?;
                info!("📋 Listed {} {} ({}) at {}", items.len(), self.kind, selectors, cursor);
                return Ok(Listing { items, cursor });
            }
        }
    }

    async fn watch(&self, selectors: &Selectors, cursor: &Cursor) -> Result<WatchStream> {
        let wp = self.watch_params(selectors);
        let stream = self.api.watch(&wp, cursor.as_str()).await?;
        debug!("👀 Watching {} from {}", self.kind, cursor);
        let kind = self.kind.clone();
        Ok(stream
            .map_err(Error::from)
            .and_then(move |event| futures::future::ready(translate(&kind, event)))
            .boxed())
    }
}

/// Map one kube watch event; non-expiry error events end the stream as errors
fn translate(kind: &str, event: WatchEvent<DynamicObject>) -> Result<RawEvent> {
    let named = |object: DynamicObject, wrap: fn(ResourceState) -> RawEvent| {
        ResourceState::from_object(kind, object).map_or_else(
            || RawEvent::Unrecognized(format!("{kind} event without metadata.name")),
            wrap,
        )
    };
    match event {
        WatchEvent::Added(object) => Ok(named(object, RawEvent::Added)),
        WatchEvent::Modified(object) => Ok(named(object, RawEvent::Modified)),
        WatchEvent::Deleted(object) => Ok(named(object, |state| RawEvent::Deleted(DeletedObject::Known(state)))),
        WatchEvent::Bookmark(bookmark) => Ok(RawEvent::Bookmark(Cursor::new(bookmark.metadata.resource_version))),
        WatchEvent::Error(response) if response.code == EXPIRED_CODE => Ok(RawEvent::Expired),
        WatchEvent::Error(response) => Err(Error::Kube(kube::Error::Api(response))),
    }
}
