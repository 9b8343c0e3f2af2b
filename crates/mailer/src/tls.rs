//! Shared TLS client configuration for the Mailgun HTTPS client.

use once_cell::sync::OnceCell;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;

/// Built once per process; every `MailgunClient` clones the `Arc`.
static TLS_CONFIG: OnceCell<Arc<ClientConfig>> = OnceCell::new();

/// Get the shared TLS client configuration (webpki roots, ring provider).
pub fn get_shared_tls_config() -> Result<Arc<ClientConfig>, rustls::Error> {
    TLS_CONFIG
        .get_or_try_init(|| {
            let mut root_cert_store = RootCertStore::empty();
            root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

            let provider = Arc::new(rustls::crypto::ring::default_provider());
            let config = ClientConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()?
                .with_root_certificates(root_cert_store)
                .with_no_client_auth();

            Ok(Arc::new(config))
        })
        .cloned()
}
