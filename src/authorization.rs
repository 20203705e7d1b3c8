//! The three-legged authorization flow: temporary credential, resource owner
//! authorization and token credential.
//!
//! Presenting the authorization URL to the user is left to the caller.

use tracing::{debug, info};
use url::Url;

use crate::{
    Client, ClientCredential, HttpTransport, OAuthParameters, Result, Secrets, SignError,
    SignResult, SignedRequest, TemporaryCredential, TokenCredential, TokenReader,
    TokenReaderError, TokenReaderResult, OAUTH_TOKEN_KEY, OAUTH_VERIFIER_KEY,
};

pub const DEFAULT_REQUEST_TOKEN_ENDPOINT: &str = "https://api.twitter.com/oauth/request_token";
pub const DEFAULT_AUTHORIZE_ENDPOINT: &str = "https://api.twitter.com/oauth/authorize";
pub const DEFAULT_ACCESS_TOKEN_ENDPOINT: &str = "https://api.twitter.com/oauth/access_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationEndpoints {
    pub request_token: String,
    pub authorize: String,
    pub access_token: String,
}

impl Default for AuthorizationEndpoints {
    fn default() -> Self {
        AuthorizationEndpoints {
            request_token: DEFAULT_REQUEST_TOKEN_ENDPOINT.to_string(),
            authorize: DEFAULT_AUTHORIZE_ENDPOINT.to_string(),
            access_token: DEFAULT_ACCESS_TOKEN_ENDPOINT.to_string(),
        }
    }
}

/// What the service hands back through the callback url once the resource
/// owner approved the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub oauth_token: String,
    pub oauth_verifier: String,
}

impl AuthorizationResponse {
    /// Reads `oauth_token` and `oauth_verifier` out of a callback url.
    ///
    /// # Errors
    ///
    /// The url has to start with the client's registered callback url and
    /// carry both parameters.
    pub fn from_callback(client: &ClientCredential, callback: &Url) -> TokenReaderResult<Self> {
        if !callback
            .as_str()
            .starts_with(client.callback_url().as_str())
        {
            return Err(TokenReaderError::UnexpectedCallback(callback.to_string()));
        }
        let find = |key: &'static str| {
            callback
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .ok_or_else(|| {
                    TokenReaderError::TokenKeyNotFound(
                        key,
                        callback.query().unwrap_or_default().to_string(),
                    )
                })
        };
        Ok(AuthorizationResponse {
            oauth_token: find(OAUTH_TOKEN_KEY)?,
            oauth_verifier: find(OAUTH_VERIFIER_KEY)?,
        })
    }
}

/// Drives the authorization requests for one client application.
pub struct Authorization<'t, T> {
    transport: &'t T,
    client: &'t ClientCredential,
    endpoints: AuthorizationEndpoints,
}

impl<'t, T> Authorization<'t, T>
where
    T: HttpTransport,
{
    pub fn new(transport: &'t T, client: &'t ClientCredential) -> Self {
        Authorization {
            transport,
            client,
            endpoints: AuthorizationEndpoints::default(),
        }
    }

    pub fn endpoints(self, endpoints: AuthorizationEndpoints) -> Self {
        Authorization { endpoints, ..self }
    }

    /// Signed `POST` to the request token endpoint, carrying the callback url.
    pub fn temporary_credential_request(&self) -> SignResult<SignedRequest> {
        let params = OAuthParameters::new().callback(self.client.callback_url().as_str());
        Client::with_params(self.transport, Secrets::from_client(self.client), params)
            .post(&self.endpoints.request_token)
            .build()
    }

    /// Obtains a temporary credential.
    ///
    /// # Errors
    ///
    /// Besides transport and status failures, a response that does not
    /// confirm the callback is rejected with
    /// [`TokenReaderError::CallbackNotConfirmed`].
    pub async fn request_temporary_credential(&self) -> Result<TemporaryCredential> {
        let request = self.temporary_credential_request()?;
        debug!(url = %request.url, "requesting temporary credential");
        let credential = self
            .transport
            .send(request)
            .await?
            .parse_oauth_token()?
            .into_temporary_credential()?;
        if !credential.oauth_callback_confirmed {
            return Err(TokenReaderError::CallbackNotConfirmed.into());
        }
        info!("temporary credential issued");
        Ok(credential)
    }

    /// The url the resource owner has to visit to approve the client.
    pub fn authorize_url(&self, temporary: &TemporaryCredential) -> SignResult<Url> {
        let mut url = Url::parse(&self.endpoints.authorize)
            .map_err(|_| SignError::MalformedResourceUrl(self.endpoints.authorize.clone()))?;
        url.query_pairs_mut()
            .append_pair(OAUTH_TOKEN_KEY, &temporary.oauth_token);
        Ok(url)
    }

    /// Signed `POST` to the access token endpoint, using the temporary
    /// credential as token and the verifier from the callback.
    pub fn token_credential_request(
        &self,
        temporary: &TemporaryCredential,
        verifier: &str,
    ) -> SignResult<SignedRequest> {
        let secrets = Secrets::from_client(self.client).token(
            temporary.oauth_token.as_str(),
            temporary.oauth_token_secret.as_str(),
        );
        Client::with_params(self.transport, secrets, OAuthParameters::new().verifier(verifier))
            .post(&self.endpoints.access_token)
            .build()
    }

    /// Exchanges the approved temporary credential for a token credential.
    ///
    /// # Errors
    ///
    /// The callback has to carry the token of `temporary`; otherwise
    /// [`TokenReaderError::TokenMismatch`] is returned without contacting the
    /// server.
    pub async fn request_token_credential(
        &self,
        temporary: &TemporaryCredential,
        response: &AuthorizationResponse,
    ) -> Result<TokenCredential> {
        if response.oauth_token != temporary.oauth_token {
            return Err(TokenReaderError::TokenMismatch(response.oauth_token.clone()).into());
        }
        let request = self.token_credential_request(temporary, &response.oauth_verifier)?;
        debug!(url = %request.url, "requesting token credential");
        let credential = self
            .transport
            .send(request)
            .await?
            .parse_oauth_token()?
            .into_token_credential()?;
        info!(user_id = %credential.user_id, screen_name = %credential.screen_name, "token credential issued");
        Ok(credential)
    }
}
