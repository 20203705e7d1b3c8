use std::{
    borrow::Cow,
    time::{SystemTime, UNIX_EPOCH},
};

use http::Method;
use url::Url;
use uuid::Uuid;

use crate::header::authorization_header;
use crate::signature;
use crate::{
    ParameterSet, SecretsProvider, SignResult, OAUTH_CALLBACK_KEY, OAUTH_CONSUMER_KEY,
    OAUTH_NONCE_KEY, OAUTH_SIGNATURE_KEY, OAUTH_SIGNATURE_METHOD_KEY, OAUTH_TIMESTAMP_KEY,
    OAUTH_TOKEN_KEY, OAUTH_VERIFIER_KEY, OAUTH_VERSION_KEY,
};

const HMAC_SHA1: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

#[derive(Debug, Clone)]
pub struct Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    secrets: &'a TSecretsProvider,
    parameters: OAuthParameters<'a>,
}

impl<'a, TSecretsProvider> Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub fn new(secrets: &'a TSecretsProvider, parameters: OAuthParameters<'a>) -> Self {
        Signer {
            secrets,
            parameters,
        }
    }

    /// Signs a request and returns the complete `Authorization` header value.
    ///
    /// `base_url` is the resource URL without its query; every request
    /// parameter, whether it travels in the query or the body, is passed
    /// through `parameters`. A nonce and timestamp are generated for each call
    /// unless they were pinned on the [`OAuthParameters`].
    pub fn generate_signature(
        &self,
        method: &Method,
        base_url: &Url,
        parameters: &ParameterSet,
    ) -> SignResult<String> {
        let (consumer_key, consumer_secret) = self.secrets.get_consumer_key_pair();
        let (token, token_secret) = self.secrets.get_token_option_pair();
        let mut oauth_parameters = self.parameters.build_oauth_parameters(consumer_key, token);

        let sign = signature::compute(
            method.as_str(),
            base_url,
            &oauth_parameters,
            parameters,
            consumer_secret,
            token_secret.unwrap_or_default(),
        )?;
        oauth_parameters.insert(OAUTH_SIGNATURE_KEY.to_string(), sign);

        Ok(authorization_header(&oauth_parameters))
    }
}

#[derive(Debug, Clone)]
pub struct OAuthParameters<'a> {
    callback: Option<Cow<'a, str>>,
    nonce: Option<Cow<'a, str>>,
    timestamp: Option<u64>,
    verifier: Option<Cow<'a, str>>,
    version: bool,
}

impl Default for OAuthParameters<'_> {
    fn default() -> Self {
        OAuthParameters {
            callback: None,
            nonce: None,
            timestamp: None,
            verifier: None,
            version: true,
        }
    }
}

impl<'a> OAuthParameters<'a> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn callback<T>(self, callback: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// set the oauth_nonce value
    ///
    /// # Note
    /// A pinned nonce is sent with every request signed with these
    /// parameters. Leave it unset outside of tests.
    pub fn nonce<T>(self, nonce: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// set the oauth_timestamp value
    pub fn timestamp<T>(self, timestamp: T) -> Self
    where
        T: Into<u64>,
    {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// set the oauth_verifier value
    pub fn verifier<T>(self, verifier: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    /// set the oauth_version value (boolean)
    ///
    /// # Note
    /// When the version has value `true` (the default), oauth_version will be set with "1.0".
    /// Otherwise, oauth_version will not be included in your request.
    pub fn version<T>(self, version: T) -> Self
    where
        T: Into<bool>,
    {
        OAuthParameters {
            version: version.into(),
            ..self
        }
    }

    fn build_oauth_parameters(&self, consumer_key: &str, token: Option<&str>) -> ParameterSet {
        let nonce = match self.nonce {
            Some(ref nonce) => nonce.to_string(),
            None => generate_nonce(),
        };
        let timestamp = self.timestamp.unwrap_or_else(current_timestamp);

        let mut params = ParameterSet::new();
        params.insert(OAUTH_CONSUMER_KEY.to_string(), consumer_key.to_string());
        params.insert(OAUTH_NONCE_KEY.to_string(), nonce);
        params.insert(OAUTH_SIGNATURE_METHOD_KEY.to_string(), HMAC_SHA1.to_string());
        params.insert(OAUTH_TIMESTAMP_KEY.to_string(), timestamp.to_string());
        if self.version {
            params.insert(OAUTH_VERSION_KEY.to_string(), OAUTH_VERSION.to_string());
        }
        if let Some(token) = token {
            params.insert(OAUTH_TOKEN_KEY.to_string(), token.to_string());
        }
        if let Some(ref callback) = self.callback {
            params.insert(OAUTH_CALLBACK_KEY.to_string(), callback.to_string());
        }
        if let Some(ref verifier) = self.verifier {
            params.insert(OAUTH_VERIFIER_KEY.to_string(), verifier.to_string());
        }
        params
    }
}

fn generate_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
