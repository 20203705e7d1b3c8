use std::{collections::HashMap, future::Future};

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    Error, HttpResponse, Result, TokenCredential, TokenReaderError, TokenReaderResult, UserId,
};

const OAUTH_TOKEN_KEY: &str = "oauth_token";
const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";
const OAUTH_CALLBACK_CONFIRMED_KEY: &str = "oauth_callback_confirmed";
const USER_ID_KEY: &str = "user_id";
const SCREEN_NAME_KEY: &str = "screen_name";

/// Represents response of token acquisition.
#[derive(Deserialize, Debug, Clone)]
pub struct TokenResponse {
    /// OAuth Token
    pub oauth_token: String,
    /// OAuth Token Secret
    pub oauth_token_secret: String,
    /// Other contents
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

/// Request token issued by the first leg of the authorization flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryCredential {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    pub oauth_callback_confirmed: bool,
}

impl TokenResponse {
    /// Interprets the response of the temporary credential (request token) endpoint.
    pub fn into_temporary_credential(mut self) -> TokenReaderResult<TemporaryCredential> {
        let confirmed = self.take(OAUTH_CALLBACK_CONFIRMED_KEY)?;
        Ok(TemporaryCredential {
            oauth_token: self.oauth_token,
            oauth_token_secret: self.oauth_token_secret,
            oauth_callback_confirmed: confirmed == "true",
        })
    }

    /// Interprets the response of the token (access token) endpoint.
    pub fn into_token_credential(mut self) -> TokenReaderResult<TokenCredential> {
        let user_id = self.take(USER_ID_KEY)?;
        let screen_name = self.take(SCREEN_NAME_KEY)?;
        let user_id = user_id
            .parse::<i64>()
            .map_err(|_| TokenReaderError::InvalidUserId(user_id))?;
        Ok(TokenCredential {
            oauth_token: self.oauth_token,
            oauth_token_secret: self.oauth_token_secret,
            user_id: UserId(user_id),
            screen_name,
        })
    }

    fn take(&mut self, key: &'static str) -> TokenReaderResult<String> {
        match self.remain.remove(key) {
            Some(value) => Ok(value),
            None => {
                let mut keys = self.remain.keys().cloned().collect::<Vec<_>>();
                keys.sort();
                Err(TokenReaderError::TokenKeyNotFound(key, keys.join("&")))
            }
        }
    }
}

/// Add parse_oauth_token feature to HttpResponse.
// this trait is sealed
pub trait TokenReader: private::Sealed {
    fn parse_oauth_token(self) -> Result<TokenResponse>;
}

impl TokenReader for HttpResponse {
    fn parse_oauth_token(self) -> Result<TokenResponse> {
        let text = self.error_for_status()?.text();
        Ok(read_oauth_token(text)?)
    }
}

/// Add parse_oauth_token feature to Future of HttpResponse.
// this trait is also sealed
#[async_trait(?Send)]
pub trait TokenReaderFuture: private::SealedWrapper {
    async fn parse_oauth_token(self) -> Result<TokenResponse>;
}

#[async_trait(?Send)]
impl<T, E> TokenReaderFuture for T
where
    T: Future<Output = std::result::Result<HttpResponse, E>>,
    E: Into<Error> + 'static,
{
    async fn parse_oauth_token(self) -> Result<TokenResponse> {
        match self.await {
            Ok(resp) => resp.parse_oauth_token(),
            Err(err) => Err(err.into()),
        }
    }
}

fn read_oauth_token(text: String) -> TokenReaderResult<TokenResponse> {
    let mut destructured = text
        .split('&')
        .map(|e| e.splitn(2, '='))
        .map(|mut iter| {
            (
                iter.next().unwrap_or_default().to_string(),
                iter.next().unwrap_or_default().to_string(),
            )
        })
        .collect::<HashMap<String, String>>();
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenResponse {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured,
        }),
        (None, _) => Err(TokenReaderError::TokenKeyNotFound(OAUTH_TOKEN_KEY, text)),
        (_, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            text,
        )),
    }
}

mod private {
    use std::future::Future;

    use crate::{Error, HttpResponse};

    pub trait Sealed {}
    impl Sealed for HttpResponse {}
    pub trait SealedWrapper {}
    impl<T, E> SealedWrapper for T
    where
        T: Future<Output = Result<HttpResponse, E>>,
        E: Into<Error>,
    {
    }
}
