/*!
oauth1-media-upload: OAuth 1.0a signed requests and chunked media upload.

# Overview

This library signs requests with OAuth 1.0a (HMAC-SHA1) and uploads media to
a chunked upload endpoint (`INIT`, `APPEND`, `FINALIZE`, `STATUS`).
Requests are built as plain [`SignedRequest`] descriptors and sent through an
[`HttpTransport`]; [`reqwest::Client`] is one.

# How to use

## Basic usecase 1 - uploading media

```no_run
use oauth1_media_upload::{MediaUploader, OAuthClientProvider, Secrets};

# async fn run() -> Result<(), Box<dyn std::error::Error>> {
// prepare authorization info
let secrets = Secrets::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]")
    .token("[ACCESS_TOKEN]", "[TOKEN_SECRET]");

let client = reqwest::Client::new().oauth1(secrets);

let media = std::fs::read("cat.png")?;
let outcome = MediaUploader::new(&client, &media, "image/png", 0)
    .upload()
    .await?;
println!("uploaded as {}", outcome.media_id);
# Ok(())
# }
```

## Basic usecase 2 - sending a signed form

```no_run
use oauth1_media_upload::{OAuthClientProvider, Secrets};

# async fn run() -> oauth1_media_upload::Result<()> {
let secrets = Secrets::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]")
    .token("[ACCESS_TOKEN]", "[TOKEN_SECRET]");

let response = reqwest::Client::new()
    .oauth1(secrets)
    .post("https://api.twitter.com/1.1/statuses/update.json")
    .form(&[("status", "Hello, Twitter!")])
    .send()
    .await?
    .error_for_status()?;
println!("{}", response.text());
# Ok(())
# }
```

## Basic usecase 3 - acquiring OAuth token & secret

```no_run
use oauth1_media_upload::{Authorization, AuthorizationResponse, ClientCredential};
use url::Url;

# async fn run(callback_from_browser: Url) -> oauth1_media_upload::Result<()> {
let client = ClientCredential::new(
    "[CONSUMER_KEY]",
    "[CONSUMER_SECRET]",
    Url::parse("https://example.com/callback").unwrap(),
);
let transport = reqwest::Client::new();
let authorization = Authorization::new(&transport, &client);

// step 1: acquire request token & token secret
let temporary = authorization.request_temporary_credential().await?;

// step 2: let the user approve the client
println!("please access to: {}", authorization.authorize_url(&temporary)?);

// step 3: acquire access token
let approved = AuthorizationResponse::from_callback(&client, &callback_from_browser)?;
let credential = authorization
    .request_token_credential(&temporary, &approved)
    .await?;
println!("authorized as {}", credential.screen_name);
# Ok(())
# }
```
*/
mod authorization;
mod client;
mod encode;
mod error;
mod header;
#[cfg(test)]
mod mock;
mod request;
mod secrets;
mod signature;
mod signer;
mod token_reader;
mod upload;

// exposed to external program
pub use authorization::{
    Authorization, AuthorizationEndpoints, AuthorizationResponse, DEFAULT_ACCESS_TOKEN_ENDPOINT,
    DEFAULT_AUTHORIZE_ENDPOINT, DEFAULT_REQUEST_TOKEN_ENDPOINT,
};
pub use client::{Client, HttpResponse, HttpTransport, OAuthClientProvider};
pub use encode::percent_encode;
pub use error::{
    CommandError, Error, Result, SignError, SignResult, TokenReaderError, TokenReaderResult,
    TransportError, UploadError, UploadResult,
};
pub use header::authorization_header;
pub use request::{RequestBuilder, SignedRequest};
pub use secrets::{
    ClientCredential, CredentialProvider, Secrets, SecretsProvider, TokenCredential, UserId,
};
pub use signature::{compute, ParameterSet, Signature};
pub use signer::{OAuthParameters, Signer};
pub use token_reader::{TemporaryCredential, TokenReader, TokenReaderFuture, TokenResponse};
pub use upload::{
    chunk_ranges, MediaId, MediaUploader, ProcessingInfo, ProcessingResponse, ProcessingState,
    UploadOptions, UploadOutcome, DEFAULT_CHECK_AFTER, DEFAULT_CHUNK_SIZE,
    DEFAULT_UPLOAD_ENDPOINT,
};

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_nonce`.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";
/// Represents `oauth_timestamp`.
pub const OAUTH_TIMESTAMP_KEY: &str = "oauth_timestamp";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `oauth_version`.
pub const OAUTH_VERSION_KEY: &str = "oauth_version";

// crate-private constant variables
pub(crate) const OAUTH_SIGNATURE_KEY: &str = "oauth_signature";
pub(crate) const OAUTH_SIGNATURE_METHOD_KEY: &str = "oauth_signature_method";
pub(crate) const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
pub(crate) const OAUTH_TOKEN_KEY: &str = "oauth_token";
