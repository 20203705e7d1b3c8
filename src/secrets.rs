use std::{borrow::Cow, collections::HashMap, fmt};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Identity of an authorized account, as issued by the token endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Credentials identifying the client application itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredential {
    consumer_key: String,
    consumer_secret: String,
    callback_url: Url,
}

impl ClientCredential {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret, callback_url: Url) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        ClientCredential {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            callback_url,
        }
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    pub fn consumer_secret(&self) -> &str {
        &self.consumer_secret
    }

    pub fn callback_url(&self) -> &Url {
        &self.callback_url
    }
}

/// Access token issued for one account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenCredential {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    pub user_id: UserId,
    pub screen_name: String,
}

pub trait SecretsProvider {
    fn get_consumer_key_pair<'a>(&'a self) -> (&'a str, &'a str);

    fn get_token_pair_option<'a>(&'a self) -> Option<(&'a str, &'a str)>;

    fn get_token_option_pair<'a>(&'a self) -> (Option<&'a str>, Option<&'a str>) {
        self.get_token_pair_option()
            .map(|s| (Some(s.0), Some(s.1)))
            .unwrap_or_else(|| (None, None))
    }
}

/// Looks up the token credential currently stored for an account.
///
/// Storage itself (keychain, database, ...) is up to the host application.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn current_credential(&self, account: UserId) -> Option<TokenCredential>;
}

#[async_trait]
impl CredentialProvider for HashMap<UserId, TokenCredential> {
    async fn current_credential(&self, account: UserId) -> Option<TokenCredential> {
        self.get(&account).cloned()
    }
}

/// The consumer pair plus, once issued, the token pair used for signing.
#[derive(Debug, Clone)]
pub struct Secrets<'a> {
    consumer_key: Cow<'a, str>,
    consumer_secret: Cow<'a, str>,
    token: Option<(Cow<'a, str>, Cow<'a, str>)>,
}

impl<'a> Secrets<'a> {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<Cow<'a, str>>,
        TSecret: Into<Cow<'a, str>>,
    {
        Secrets {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: None,
        }
    }

    pub fn token<TKey, TSecret>(self, token: TKey, token_secret: TSecret) -> Self
    where
        TKey: Into<Cow<'a, str>>,
        TSecret: Into<Cow<'a, str>>,
    {
        Secrets {
            token: Some((token.into(), token_secret.into())),
            ..self
        }
    }

    pub fn from_client(client: &'a ClientCredential) -> Self {
        Secrets::new(client.consumer_key(), client.consumer_secret())
    }

    pub fn from_credentials(client: &'a ClientCredential, credential: &'a TokenCredential) -> Self {
        Secrets::from_client(client).token(
            credential.oauth_token.as_str(),
            credential.oauth_token_secret.as_str(),
        )
    }

    /// Resolves the token of `account` through `provider`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::CredentialNotFound`] when the provider has no
    /// credential for the account.
    pub async fn for_account<P>(
        client: &'a ClientCredential,
        provider: &P,
        account: UserId,
    ) -> Result<Secrets<'a>>
    where
        P: CredentialProvider + ?Sized,
    {
        let credential = provider
            .current_credential(account)
            .await
            .ok_or(Error::CredentialNotFound(account.0))?;
        Ok(Secrets::from_client(client).token(credential.oauth_token, credential.oauth_token_secret))
    }
}

impl SecretsProvider for Secrets<'_> {
    fn get_consumer_key_pair<'a>(&'a self) -> (&'a str, &'a str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    fn get_token_pair_option<'a>(&'a self) -> Option<(&'a str, &'a str)> {
        self.token.as_ref().map(|(t, s)| (t.as_ref(), s.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static CONSUMER_KEY: &str = "<CONSUMER_KEY>";
    static CONSUMER_SECRET: &str = "<CONSUMER_SECRET>";
    static TOKEN: &str = "<ACCESS_TOKEN>";
    static TOKEN_SECRET: &str = "<ACCESS_TOKEN_SECRET>";

    fn client() -> ClientCredential {
        ClientCredential::new(
            CONSUMER_KEY,
            CONSUMER_SECRET,
            Url::parse("https://example.com/callback").unwrap(),
        )
    }

    fn credential() -> TokenCredential {
        TokenCredential {
            oauth_token: TOKEN.to_string(),
            oauth_token_secret: TOKEN_SECRET.to_string(),
            user_id: UserId(123),
            screen_name: "someone".to_string(),
        }
    }

    #[test]
    fn secret_builder() {
        let secrets = Secrets::new(CONSUMER_KEY, CONSUMER_SECRET);
        assert_eq!(secrets.get_consumer_key_pair(), (CONSUMER_KEY, CONSUMER_SECRET));
        assert_eq!(secrets.get_token_option_pair(), (None, None));

        let secrets = secrets.token(TOKEN, TOKEN_SECRET);
        assert_eq!(secrets.get_token_pair_option(), Some((TOKEN, TOKEN_SECRET)));
    }

    #[test]
    fn from_credentials() {
        let client = client();
        let credential = credential();
        let secrets = Secrets::from_credentials(&client, &credential);
        assert_eq!(secrets.get_consumer_key_pair(), (CONSUMER_KEY, CONSUMER_SECRET));
        assert_eq!(secrets.get_token_option_pair(), (Some(TOKEN), Some(TOKEN_SECRET)));
    }

    #[test]
    fn user_id_is_transparent() {
        let json = serde_json::to_string(&credential()).unwrap();
        assert!(json.contains("\"user_id\":123"));
        let parsed: TokenCredential = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, credential());
    }

    #[tokio::test]
    async fn resolve_through_provider() {
        let client = client();
        let mut store = HashMap::new();
        store.insert(UserId(123), credential());

        let secrets = Secrets::for_account(&client, &store, UserId(123))
            .await
            .unwrap();
        assert_eq!(secrets.get_token_pair_option(), Some((TOKEN, TOKEN_SECRET)));

        let missing = Secrets::for_account(&client, &store, UserId(7)).await;
        assert!(matches!(missing, Err(Error::CredentialNotFound(7))));
    }
}
