//! Kubeconfig Context Resolution
//!
//! Chooses the source context and namespace for an export and builds the
//! client for that context.

use crate::error::{Error, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::time::Duration;
use tracing::{debug, info};

/// Read timeout applied to every API request
const API_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// The context and namespace an export runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetContext {
    pub context: String,
    pub namespace: String,
}

/// Resolve the target context.
///
/// The context is the flag, else the kubeconfig's current context. The
/// namespace is the context's own namespace when it has one, else the flag.
pub fn resolve_target(
    kubeconfig: &Kubeconfig,
    context_flag: Option<&str>,
    namespace_flag: Option<&str>,
) -> Result<TargetContext> {
    let context = context_flag
        .filter(|c| !c.is_empty())
        .or(kubeconfig.current_context.as_deref())
        .filter(|c| !c.is_empty())
        .ok_or(Error::NoContextSelected)?;

    let named = kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == context)
        .ok_or_else(|| Error::ContextNotFound(context.to_string()))?;

    let context_namespace = named
        .context
        .as_ref()
        .and_then(|c| c.namespace.as_deref())
        .filter(|ns| !ns.is_empty());

    if let (Some(ns), Some(flag)) = (context_namespace, namespace_flag) {
        if ns != flag {
            info!(
                "Context `{}` selects namespace {}, ignoring --namespace {}",
                context, ns, flag
            );
        }
    }

    let namespace = context_namespace
        .or(namespace_flag.filter(|ns| !ns.is_empty()))
        .ok_or_else(|| Error::NamespaceNotResolved {
            context: context.to_string(),
        })?;

    Ok(TargetContext {
        context: context.to_string(),
        namespace: namespace.to_string(),
    })
}

/// Build a client for the resolved context
pub async fn connect(kubeconfig: Kubeconfig, target: &TargetContext) -> Result<Client> {
    let mut config = Config::from_custom_kubeconfig(
        kubeconfig,
        &KubeConfigOptions {
            context: Some(target.context.clone()),
            ..Default::default()
        },
    )
    .await?;
    config.read_timeout = Some(API_READ_TIMEOUT);

    debug!("Connecting to {} (context {})", config.cluster_url, target.context);
    Ok(Client::try_from(config)?)
}
