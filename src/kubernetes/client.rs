// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context, Result, anyhow};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::Event;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, Resource, api::ListParams};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (doubles each retry)
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Create a client for the given kubeconfig context, or the inferred
/// configuration (in-cluster service account or current context) if None
///
/// Only the connect timeout is set: watches are long polls and must not be
/// cut off by a read timeout.
pub async fn connect(context: Option<&str>) -> Result<Client> {
    let mut config = match context {
        Some(context) => {
            let kubeconfig = Kubeconfig::read().context("Failed to read kubeconfig")?;
            if !kubeconfig.contexts.iter().any(|c| c.name == context) {
                return Err(anyhow!("Context '{}' not found in kubeconfig", context));
            }
            Config::from_custom_kubeconfig(
                kubeconfig,
                &KubeConfigOptions {
                    context: Some(context.to_string()),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("Failed to load kubeconfig for context '{}'", context))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    config.connect_timeout = Some(CONNECT_TIMEOUT);

    let cluster_url = config.cluster_url.clone();
    let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
    info!(cluster = %cluster_url, context = ?context, "Connected to Kubernetes");
    Ok(client)
}

/// Api for `K` in `namespace`, or across all namespaces if it is empty
pub fn scoped_api<K>(client: Client, namespace: &str) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    if namespace.is_empty() {
        Api::all(client)
    } else {
        Api::namespaced(client, namespace)
    }
}

/// Resource version of the Event collection at this moment
///
/// Only metadata of a single item is requested; the list's own resource
/// version is what matters.
pub async fn latest_resource_version(api: &Api<Event>) -> Result<String> {
    let params = ListParams::default().limit(1);
    let list = with_retry("list events", || api.list_metadata(&params))
        .await
        .map_err(|e| anyhow!("K8s API error: {}", e))?;

    let version = list.metadata.resource_version.unwrap_or_default();
    debug!(resource_version = %version, "Fetched latest event resource version");
    Ok(version)
}

/// Run `call` up to `MAX_RETRIES` times, backing off exponentially while it
/// fails with a retryable error
pub async fn with_retry<T, F, Fut>(operation: &str, mut call: F) -> kube::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = kube::Result<T>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < MAX_RETRIES && is_retryable_error(&e) => {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    max_attempts = MAX_RETRIES,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retryable error, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Check if an error is retryable (transient failures)
fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        // Network/connection errors are retryable
        kube::Error::HyperError(_) => true,
        // API errors: retry on 429 (rate limit), 503 (unavailable), 504 (timeout)
        kube::Error::Api(api_err) => matches!(api_err.code, 429 | 503 | 504),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: "Test".to_string(),
            code,
        })
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error(&api_error(429)));
        assert!(is_retryable_error(&api_error(503)));
        assert!(is_retryable_error(&api_error(504)));
        assert!(!is_retryable_error(&api_error(404)));
        assert!(!is_retryable_error(&api_error(403)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_recovers_from_transient_errors() {
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = with_retry("test", || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(api_error(503))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 100ms + 200ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_gives_up() {
        let attempts = AtomicU32::new(0);
        let result: kube::Result<()> = with_retry("test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(api_error(429)) }
        })
        .await;

        assert!(matches!(result, Err(kube::Error::Api(ref e)) if e.code == 429));
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_RETRIES);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_fails_fast_on_permanent_errors() {
        let attempts = AtomicU32::new(0);
        let result: kube::Result<()> = with_retry("test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(api_error(404)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
