//! Kubernetes informer: list a collection, watch it for changes, keep a
//! consistent local cache and hand every add/update/delete to a handler.

pub mod error;
pub mod k8s;

pub use error::{Error, Result};
pub use k8s::informer::{
    observe, CollectionKind, InformerConfig, InformerHandle, ResourceEventHandler, ResourceState,
    Selectors,
};
