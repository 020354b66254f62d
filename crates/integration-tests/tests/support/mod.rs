#![allow(dead_code)]

pub mod rag_backend;

use session_core::{ClientConfig, RagApiClient, StaleResponsePolicy};

/// Client configured the way the `ask` binary builds one, pointed at `base_url`.
pub fn client_for(base_url: &str) -> RagApiClient {
    let config = ClientConfig {
        api_base_url: format!("{base_url}/"),
        http_timeout_ms: 5_000,
        stale_responses: StaleResponsePolicy::Discard,
    };
    RagApiClient::from_config(&config).expect("test client should build")
}
