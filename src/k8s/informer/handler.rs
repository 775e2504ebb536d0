use super::resource::ResourceState;
use crate::error::Result;
use async_trait::async_trait;

/// Receives every transition as an `(old, new)` pair:
/// added is `(None, Some)`, updated is `(Some, Some)`, deleted is `(Some | None, None)`.
///
/// A deletion whose final state could not be recovered arrives as `(None, None)`.
/// Errors are logged by the informer and never stop it.
#[async_trait]
pub trait ResourceEventHandler: Send + Sync {
    async fn on_transition(
        &self,
        old: Option<&ResourceState>,
        new: Option<&ResourceState>,
    ) -> Result<()>;
}

/// Adapter turning a plain closure into a [`ResourceEventHandler`]
pub struct HandlerFn<F>(F);

/// Wrap a synchronous closure as a handler
pub const fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(Option<&ResourceState>, Option<&ResourceState>) -> Result<()> + Send + Sync,
{
    HandlerFn(f)
}

#[async_trait]
impl<F> ResourceEventHandler for HandlerFn<F>
where
    F: Fn(Option<&ResourceState>, Option<&ResourceState>) -> Result<()> + Send + Sync,
{
    async fn on_transition(
        &self,
        old: Option<&ResourceState>,
        new: Option<&ResourceState>,
    ) -> Result<()> {
        (self.0)(old, new)
    }
}

#[async_trait]
impl<H: ResourceEventHandler + ?Sized> ResourceEventHandler for std::sync::Arc<H> {
    async fn on_transition(
        &self,
        old: Option<&ResourceState>,
        new: Option<&ResourceState>,
    ) -> Result<()> {
        (**self).on_transition(old, new).await
    }
}
