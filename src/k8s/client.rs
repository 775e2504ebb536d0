// Client creation with custom user-agent support for kube 2.x
use super::{USER_AGENT, USER_AGENT_ENV};
use crate::error::Result;
use hyper::http::{HeaderName, HeaderValue};
use kube::{Client, Config};
use tracing::warn;

/// Resolve the user agent to send: env override, then the caller's value, then the crate default
#[must_use]
pub fn resolve_user_agent(custom_user_agent: Option<&str>) -> String {
    std::env::var(USER_AGENT_ENV)
        .ok()
        .filter(|ua| !ua.trim().is_empty())
        .or_else(|| custom_user_agent.map(str::to_string))
        .unwrap_or_else(|| USER_AGENT.to_string())
}

/// Push a user-agent header onto the config.
///
/// # Errors
///
/// Returns an error if `user_agent` is not a valid header value
pub fn add_user_agent_header(config: &mut Config, user_agent: &str) -> Result<()> {
    let header_value = HeaderValue::from_str(user_agent)?;
    config
        .headers
        .push((HeaderName::from_static("user-agent"), header_value));
    Ok(())
}

/// Create a new k8s client to interact with k8s cluster api.
///
/// An invalid user agent is logged and skipped; the client falls back to kube's default.
///
/// # Errors
///
/// Will return `Err` if the kube config can not be inferred or the client can not be built
pub async fn new(custom_user_agent: Option<&str>) -> Result<Client> {
    let mut config = Config::infer().await?;
    let user_agent = resolve_user_agent(custom_user_agent);
    if let Err(e) = add_user_agent_header(&mut config, &user_agent) {
        warn!("Ignoring invalid user agent {:?}: {}", user_agent, e);
    }
    Ok(Client::try_from(config)?)
}

/// Like [`new`], but an invalid user agent is an error.
///
/// # Errors
///
/// Will return `Err` if the user agent is invalid or the client can not be built
pub async fn new_strict(custom_user_agent: Option<&str>) -> Result<Client> {
    let mut config = Config::infer().await?;
    add_user_agent_header(&mut config, &resolve_user_agent(custom_user_agent))?;
    Ok(Client::try_from(config)?)
}
