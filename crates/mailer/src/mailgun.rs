//! Mail-sending capability and its Mailgun implementation.
//!
//! The dispatcher only knows the `MailSender` trait; `MailgunClient` talks to
//! the Mailgun v3 messages endpoint over HTTPS.

use crate::error::MailError;
use crate::tls::get_shared_tls_config;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use hyper::{Method, Request, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::future::Future;
use tracing::debug;

/// A plain-text message ready to hand to a mail service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// External capability that delivers one message for a sending domain.
///
/// Implementations must be safe to share across concurrent dispatches.
pub trait MailSender: Send + Sync + 'static {
    fn send_message(
        &self,
        domain: &str,
        mail: &OutgoingMail,
    ) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Mailgun API region
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MailgunRegion {
    #[default]
    Us,
    Eu,
}

impl MailgunRegion {
    pub fn base_url(&self) -> &'static str {
        match self {
            MailgunRegion::Us => "https://api.mailgun.net/v3",
            MailgunRegion::Eu => "https://api.eu.mailgun.net/v3",
        }
    }
}

type HttpClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

#[derive(Clone)]
pub struct MailgunClient {
    api_key: String,
    base_url: String,
    http: HttpClient,
}

impl std::fmt::Debug for MailgunClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailgunClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl MailgunClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, MailError> {
        Self::with_region(api_key, MailgunRegion::Us)
    }

    pub fn with_region(api_key: impl Into<String>, region: MailgunRegion) -> Result<Self, MailError> {
        Self::with_base_url(api_key, region.base_url())
    }

    /// Point the client at an arbitrary API root, e.g. a local stub. Plain
    /// `http://` roots are accepted.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, MailError> {
        let tls = get_shared_tls_config().map_err(|e| MailError::Request(e.to_string()))?;
        let connector = HttpsConnectorBuilder::new()
            .with_tls_config((*tls).clone())
            .https_or_http()
            .enable_http1()
            .build();
        let http = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn messages_uri(&self, domain: &str) -> Result<Uri, MailError> {
        format!("{}/{}/messages", self.base_url, domain)
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| MailError::Request(e.to_string()))
    }

    fn authorization(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("api:{}", self.api_key)))
    }
}

/// Encode the message as the form Mailgun's messages endpoint expects.
pub fn encode_form(mail: &OutgoingMail) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("from", &mail.from)
        .append_pair("to", &mail.to)
        .append_pair("subject", &mail.subject)
        .append_pair("text", &mail.text)
        .finish()
}

impl MailSender for MailgunClient {
    #[tracing::instrument(name = "mailgun_send_message", skip(self, mail), fields(to = %mail.to))]
    async fn send_message(&self, domain: &str, mail: &OutgoingMail) -> Result<(), MailError> {
        let req = Request::builder()
            .method(Method::POST)
            .uri(self.messages_uri(domain)?)
            .header(AUTHORIZATION, self.authorization())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(USER_AGENT, concat!("mailer-mailgun/", env!("CARGO_PKG_VERSION")))
            .body(Full::new(Bytes::from(encode_form(mail))))
            .map_err(|e| MailError::Request(e.to_string()))?;

        let response = self
            .http
            .request(req)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?
            .to_bytes();

        if !status.is_success() {
            return Err(MailError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        debug!(status = status.as_u16(), "Mailgun accepted message");
        Ok(())
    }
}
