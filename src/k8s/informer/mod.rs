pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod handler;
pub mod kube_source;
pub mod normalizer;
pub mod observer;
pub mod resource;
pub mod session;
pub mod source;
pub mod stats;
pub mod store;

pub use config::InformerConfig;
pub use dispatcher::Dispatcher;
pub use handler::{handler_fn, HandlerFn, ResourceEventHandler};
pub use kube_source::{CollectionKind, KubeListerWatcher};
pub use normalizer::Transition;
pub use observer::{observe, Informer, InformerHandle};
pub use resource::{Cursor, ResourceIdentity, ResourceState, SelectorError, Selectors};
pub use source::{DeletedObject, ListerWatcher, Listing, RawEvent, WatchStream};
pub use stats::{ConnectionStatus, InformerStats};
pub use store::ResourceStore;
