use anyhow::{bail, Result};
use clap::Parser;
use k8s_openapi::serde_json;
use kinformer::k8s::informer::{handler_fn, observe, CollectionKind, InformerConfig, ResourceState};
use kinformer::k8s::{client, USER_AGENT};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Resource to observe: a core plural (`pods`) or `group/version/resource`
    #[arg(short, long, default_value = "pods")]
    resource: String,

    /// Namespace to observe; all namespaces when omitted
    #[arg(short, long)]
    namespace: Option<String>,

    /// Field selector, e.g. `spec.nodeName=node-1`
    #[arg(long, default_value = "")]
    field_selector: String,

    /// Label selector, e.g. `app=web`
    #[arg(short = 'l', long, default_value = "")]
    label_selector: String,

    /// Print each transition as a JSON line instead of logging it
    #[arg(long)]
    json: bool,
}

fn parse_kind(resource: &str) -> Result<CollectionKind> {
    let parts: Vec<&str> = resource.split('/').collect();
    match parts.as_slice() {
        [plural] => Ok(CollectionKind::core(plural)),
        [version, plural] => Ok(CollectionKind::dynamic("", version, plural)),
        [group, version, plural] => Ok(CollectionKind::dynamic(group, version, plural)),
        _ => bail!("invalid resource: {resource} (expect pods, v1/pods or apps/v1/deployments)"),
    }
}

fn describe(state: Option<&ResourceState>) -> serde_json::Value {
    state.map_or(serde_json::Value::Null, |s| {
        serde_json::json!({ "id": s.id(), "resourceVersion": s.resource_version() })
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let kind = parse_kind(&args.resource)?;
    let json = args.json;
    let client = client::new(Some(USER_AGENT)).await?;

    let handler = handler_fn(move |old, new| -> kinformer::Result<()> {
        let event = match (old, new) {
            (None, Some(_)) => "added",
            (Some(_), Some(_)) => "updated",
            (_, None) => "deleted",
        };
        if json {
            let line = serde_json::json!({ "event": event, "old": describe(old), "new": describe(new) });
            println!("{}", serde_json::to_string(&line)?);
        } else {
            let id = new.or(old).map_or_else(|| "<unknown>".to_string(), |s| s.id().to_string());
            info!("{} {}", event, id);
        }
        Ok(())
    });

    let informer = observe(
        client,
        &kind,
        args.namespace.as_deref(),
        &args.field_selector,
        &args.label_selector,
        handler,
        InformerConfig::default(),
    )
    .await?;

    if informer.wait_for_sync().await {
        info!("Initial listing of {} delivered", kind);
    }
    tokio::signal::ctrl_c().await?;
    informer.stop().await;
    Ok(())
}
