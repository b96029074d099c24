use reqwest::{Client, Proxy};
use tracing::debug;

use crate::error::ConfigError;
use crate::models::PROBE_FAILED;

/// Builds an HTTP client that routes through `proxy`, or connects directly
/// when `proxy` is empty.
pub fn build_client(proxy: &str, owner: &str) -> Result<Client, ConfigError> {
    let mut builder = Client::builder();
    if !proxy.is_empty() {
        let proxy = Proxy::all(proxy).map_err(|source| ConfigError::Proxy {
            owner: owner.to_string(),
            source,
        })?;
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(|source| ConfigError::Proxy {
        owner: owner.to_string(),
        source,
    })
}

/// Issues one GET and reduces the outcome to a status code. Transport errors
/// become [`PROBE_FAILED`]; the response body is never read.
pub async fn probe(client: &Client, url: &str) -> i32 {
    match client.get(url).send().await {
        Ok(resp) => i32::from(resp.status().as_u16()),
        Err(e) => {
            debug!(url, error = %e, "probe transport failure");
            PROBE_FAILED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_response_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_client("", "test").unwrap();
        let code = probe(&client, &format!("{}/health", server.uri())).await;
        assert_eq!(code, 503);
    }

    #[tokio::test]
    async fn unreachable_target_yields_sentinel() {
        let client = build_client("", "test").unwrap();
        // Port 1 on loopback refuses connections.
        let code = probe(&client, "http://127.0.0.1:1/").await;
        assert_eq!(code, PROBE_FAILED);
    }

    #[tokio::test]
    async fn malformed_url_yields_sentinel() {
        let client = build_client("", "test").unwrap();
        assert_eq!(probe(&client, "not a url").await, PROBE_FAILED);
    }

    #[tokio::test]
    async fn routes_through_configured_proxy() {
        // Plain-HTTP proxying sends the absolute URL to the proxy, which
        // answers on its behalf.
        let proxy = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&proxy)
            .await;

        let client = build_client(&proxy.uri(), "test").unwrap();
        let code = probe(&client, "http://app.invalid/health").await;
        assert_eq!(code, 200);
    }

    #[test]
    fn rejects_malformed_proxy() {
        let err = build_client("::not a proxy::", "API").unwrap_err();
        assert!(matches!(err, ConfigError::Proxy { ref owner, .. } if owner == "API"));
    }
}
