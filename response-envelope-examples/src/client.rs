//! Client for the users service.
//!
//! Every call comes in two flavours. The classic method returns the payload
//! and turns non-2xx statuses into [`ClientError::Api`]. The
//! `*_with_response` method returns the envelope so callers can read the
//! status, headers and raw body alongside the payload.

use bytes::Bytes;
use http::{Method, Request, StatusCode, header};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use response_envelope::{
    EnvelopeOptions, NegotiatedDeserializer, PagedResponseEnvelope, PayloadError,
    ResponseEnvelope, StatusError, TransportError, TypedResponseEnvelope,
};

use crate::{ApiError, User};

/// Errors from [`UserServiceClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    #[error("request failed: {0}")]
    Http(#[from] hyper_util::client::legacy::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// The service answered with a non-2xx status.
    #[error("service returned {status}: {}", describe(.error))]
    Api {
        status: StatusCode,
        error: Option<ApiError>,
    },
}

fn describe(error: &Option<ApiError>) -> &str {
    error.as_ref().map_or("no error body", |e| e.message.as_str())
}

impl From<StatusError> for ClientError {
    fn from(err: StatusError) -> Self {
        ClientError::Api {
            status: err.status(),
            error: err.error_payload::<ApiError>().ok(),
        }
    }
}

impl ClientError {
    /// The HTTP status, for [`ClientError::Api`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Client for the users service.
#[derive(Debug, Clone)]
pub struct UserServiceClient {
    base_url: String,
    http: Client<HttpConnector, Full<Bytes>>,
    options: EnvelopeOptions,
}

impl UserServiceClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_options(base_url, EnvelopeOptions::default())
    }

    /// Create a client with custom envelope options.
    pub fn with_options(base_url: impl Into<String>, options: EnvelopeOptions) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::builder(TokioExecutor::new()).build_http();
        Self {
            base_url,
            http,
            options,
        }
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // Get

    /// Fetch a user.
    pub async fn get_user(&self, id: u64) -> Result<User, ClientError> {
        let envelope = self
            .get_user_with_response(id)
            .await?
            .into_envelope()
            .error_for_status()?;
        Ok(envelope.typed::<User>().into_payload()?)
    }

    /// Fetch a user, keeping the whole response.
    ///
    /// Non-2xx statuses are not errors here; inspect the envelope.
    pub async fn get_user_with_response(
        &self,
        id: u64,
    ) -> Result<TypedResponseEnvelope<User>, ClientError> {
        let envelope = self.send(Method::GET, &format!("/users/{id}")).await?;
        Ok(envelope.typed())
    }

    // Delete

    /// Delete a user.
    pub async fn delete_user(&self, id: u64) -> Result<(), ClientError> {
        self.delete_user_with_response(id).await?.error_for_status()?;
        Ok(())
    }

    /// Delete a user, keeping the whole response.
    pub async fn delete_user_with_response(
        &self,
        id: u64,
    ) -> Result<ResponseEnvelope, ClientError> {
        self.send(Method::DELETE, &format!("/users/{id}")).await
    }

    // List

    /// Fetch every user, following next links to the end.
    pub async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        let mut users = Vec::new();
        let mut page = self.list_users_with_response(None).await?;
        loop {
            let next = page.next_link().map(str::to_string);
            users.extend(page.into_items());
            match next {
                Some(link) => page = self.list_users_with_response(Some(link.as_str())).await?,
                None => return Ok(users),
            }
        }
    }

    /// Fetch one page of users.
    ///
    /// `link` is a next or delta link from an earlier page; `None` starts
    /// at the first page.
    pub async fn list_users_with_response(
        &self,
        link: Option<&str>,
    ) -> Result<PagedResponseEnvelope<User>, ClientError> {
        let envelope = self
            .send(Method::GET, link.unwrap_or("/users"))
            .await?
            .error_for_status()?;
        Ok(envelope.paged_with_format(self.options.get_page_format())?)
    }

    // Health

    /// Fetch the health string, decoded by content-type negotiation.
    pub async fn health(&self) -> Result<String, ClientError> {
        let envelope = self
            .send(Method::GET, "/health")
            .await?
            .error_for_status()?
            .with_deserializer(NegotiatedDeserializer);
        Ok(envelope.deserialize()?)
    }

    async fn send(&self, method: Method, path: &str) -> Result<ResponseEnvelope, ClientError> {
        let uri = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        };

        let request = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(header::ACCEPT, "application/json")
            .body(Full::new(Bytes::new()))?;

        let response: http::Response<Incoming> = self.http.request(request).await?;
        Ok(ResponseEnvelope::from_http_response(method, response, &self.options).await?)
    }
}
