use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    Error, OAuthParameters, RequestBuilder, Result, Secrets, SignedRequest, TransportError,
};

/// A response as seen by the signing and upload code.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Turns a non-2xx response into [`Error::Status`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(Error::Status(self.status, self.text()))
        }
    }
}

/// Sends a signed request and collects the complete response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: SignedRequest) -> std::result::Result<HttpResponse, TransportError>;
}

#[async_trait]
impl HttpTransport for reqwest::Client {
    async fn send(&self, request: SignedRequest) -> std::result::Result<HttpResponse, TransportError> {
        let SignedRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl<'t, T> HttpTransport for &'t T
where
    T: HttpTransport + ?Sized,
{
    async fn send(&self, request: SignedRequest) -> std::result::Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

pub trait OAuthClientProvider: HttpTransport + Sized {
    fn oauth1<'a>(self, secrets: Secrets<'a>) -> Client<'a, Self> {
        Client::new(self, secrets)
    }

    fn oauth1_with_params<'a>(
        self,
        secrets: Secrets<'a>,
        params: OAuthParameters<'a>,
    ) -> Client<'a, Self> {
        Client::with_params(self, secrets, params)
    }
}

impl<T> OAuthClientProvider for T where T: HttpTransport {}

/// A transport bound to the secrets every request is signed with.
#[derive(Debug)]
pub struct Client<'a, T> {
    transport: T,
    secrets: Secrets<'a>,
    parameters: OAuthParameters<'a>,
}

impl<'a, T> Client<'a, T>
where
    T: HttpTransport,
{
    /// Constructs a new `Client`.
    pub fn new(transport: T, secrets: Secrets<'a>) -> Self {
        Client::with_params(transport, secrets, OAuthParameters::new())
    }

    /// Constructs a new `Client` with fixed OAuth parameters.
    pub fn with_params(transport: T, secrets: Secrets<'a>, parameters: OAuthParameters<'a>) -> Self {
        Client {
            transport,
            secrets,
            parameters,
        }
    }

    pub fn secrets(&self) -> &Secrets<'a> {
        &self.secrets
    }

    pub fn parameters(&self) -> &OAuthParameters<'a> {
        &self.parameters
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Convenience method to make a `GET` request to a URL.
    ///
    /// # Errors
    ///
    /// Building the request fails whenever supplied `Url` cannot be parsed.
    pub fn get<U: AsRef<str>>(&self, url: U) -> RequestBuilder<'_, 'a, T> {
        self.request(Method::GET, url)
    }

    /// Convenience method to make a `POST` request to a URL.
    ///
    /// # Errors
    ///
    /// Building the request fails whenever supplied `Url` cannot be parsed.
    pub fn post<U: AsRef<str>>(&self, url: U) -> RequestBuilder<'_, 'a, T> {
        self.request(Method::POST, url)
    }

    /// Start building a request with the `Method` and `Url`.
    ///
    /// # Errors
    ///
    /// Building the request fails whenever supplied `Url` cannot be parsed.
    pub fn request<U: AsRef<str>>(&self, method: Method, url: U) -> RequestBuilder<'_, 'a, T> {
        RequestBuilder::new(self, method, url.as_ref())
    }

    /// Hands a signed request to the transport.
    pub async fn execute(&self, request: SignedRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "sending signed request");
        let response = self.transport.send(request).await?;
        debug!(status = %response.status, "received response");
        Ok(response)
    }
}
