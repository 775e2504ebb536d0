pub mod client;
pub mod informer;

/// Default user agent for `kinformer` - automatically uses the package version
///
/// All modules should use `client::new(Some(USER_AGENT))` for consistency.
/// User-agent can be overridden via `KINFORMER_USER_AGENT` environment variable.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Environment variable that overrides [`USER_AGENT`]
pub const USER_AGENT_ENV: &str = "KINFORMER_USER_AGENT";
