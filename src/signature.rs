use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::Url;

use crate::encode::percent_encode;
use crate::{SignError, SignResult};

type HmacSha1 = Hmac<Sha1>;

/// Request parameters keyed by name. Iteration order is the ordinal order of
/// the keys, which is the order both the signature and the header need.
pub type ParameterSet = BTreeMap<String, String>;

/// The inputs of one HMAC-SHA1 signature.
///
/// Every intermediate string is exposed so the individual steps of
/// RFC 5849 section 3.4 can be inspected.
#[derive(Debug, Clone)]
pub struct Signature<'a> {
    http_method: &'a str,
    base_url: &'a Url,
    oauth_parameters: &'a ParameterSet,
    parameters: &'a ParameterSet,
    consumer_secret: &'a str,
    token_secret: &'a str,
}

impl<'a> Signature<'a> {
    /// Fails with [`SignError::InvalidBaseUrl`] when `base_url` carries a
    /// query or a fragment; parameters must be supplied separately.
    pub fn new(
        http_method: &'a str,
        base_url: &'a Url,
        oauth_parameters: &'a ParameterSet,
        parameters: &'a ParameterSet,
        consumer_secret: &'a str,
        token_secret: &'a str,
    ) -> SignResult<Self> {
        if base_url.query().is_some() || base_url.fragment().is_some() {
            return Err(SignError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Signature {
            http_method,
            base_url,
            oauth_parameters,
            parameters,
            consumer_secret,
            token_secret,
        })
    }

    pub fn parameter_string(&self) -> String {
        // request parameters win over oauth parameters on collision
        let mut merged: BTreeMap<&str, &str> = self
            .oauth_parameters
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        merged.extend(self.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        merged
            .into_iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn base_string(&self) -> String {
        format!(
            "{}&{}&{}",
            self.http_method.to_uppercase(),
            percent_encode(self.base_url.as_str()),
            percent_encode(&self.parameter_string())
        )
    }

    pub fn signing_key(&self) -> String {
        format!(
            "{}&{}",
            percent_encode(self.consumer_secret),
            percent_encode(self.token_secret)
        )
    }

    /// base64(HMAC-SHA1(signing key, base string))
    pub fn calculate(&self) -> SignResult<String> {
        let mut mac = HmacSha1::new_from_slice(self.signing_key().as_bytes())
            .map_err(|_| SignError::InvalidSigningKey)?;
        mac.update(self.base_string().as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// Computes the `oauth_signature` value for a request in one call.
pub fn compute(
    http_method: &str,
    base_url: &Url,
    oauth_parameters: &ParameterSet,
    parameters: &ParameterSet,
    consumer_secret: &str,
    token_secret: &str,
) -> SignResult<String> {
    Signature::new(
        http_method,
        base_url,
        oauth_parameters,
        parameters,
        consumer_secret,
        token_secret,
    )?
    .calculate()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ParameterSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn twitter_oauth_parameters() -> ParameterSet {
        params(&[
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            (
                "oauth_token",
                "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            ),
            ("oauth_version", "1.0"),
        ])
    }

    fn twitter_body_parameters() -> ParameterSet {
        params(&[
            ("include_entities", "true"),
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
        ])
    }

    const CONSUMER_SECRET: &str = "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw";
    const TOKEN_SECRET: &str = "PbKfYqSryyeKDWz4ebtY3o5ogNLG11WJuZBc9fQrQo";

    #[test]
    fn twitter_steps() {
        // https://developer.twitter.com/ja/docs/basics/authentication/guides/creating-a-signature
        let url = Url::parse("https://api.twitter.com/1.1/statuses/update.json").unwrap();
        let oauth = twitter_oauth_parameters();
        let body = twitter_body_parameters();
        let sig = Signature::new("post", &url, &oauth, &body, CONSUMER_SECRET, TOKEN_SECRET).unwrap();

        assert_eq!(
            sig.parameter_string(),
            "include_entities=true&oauth_consumer_key=xvz1evFS4wEEPTGEFPHBog&oauth_nonce=kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg&oauth_signature_method=HMAC-SHA1&oauth_timestamp=1318622958&oauth_token=370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb&oauth_version=1.0&status=Hello%20Ladies%20%2B%20Gentlemen%2C%20a%20signed%20OAuth%20request%21"
        );
        assert_eq!(
            sig.base_string(),
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1318622958%26oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26oauth_version%3D1.0%26status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        );
        assert_eq!(
            sig.signing_key(),
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw&PbKfYqSryyeKDWz4ebtY3o5ogNLG11WJuZBc9fQrQo"
        );
        assert_eq!(sig.calculate().unwrap(), "mIN3nXSuA/u41YrVEZlYxu4TftY=");
    }

    #[test]
    fn compute_is_deterministic() {
        let url = Url::parse("https://api.twitter.com/1.1/statuses/update.json").unwrap();
        let oauth = twitter_oauth_parameters();
        let body = twitter_body_parameters();
        let first = compute("POST", &url, &oauth, &body, CONSUMER_SECRET, TOKEN_SECRET).unwrap();
        let second = compute("POST", &url, &oauth, &body, CONSUMER_SECRET, TOKEN_SECRET).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "mIN3nXSuA/u41YrVEZlYxu4TftY=");
    }

    #[test]
    fn rfc5849_get() {
        // https://tools.ietf.org/html/rfc5849
        let url = Url::parse("http://photos.example.net/photos").unwrap();
        let oauth = params(&[
            ("oauth_consumer_key", "dpf43f3p2l4k3l03"),
            ("oauth_nonce", "chapoH"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "137131202"),
            ("oauth_token", "nnch734d00sl2jdk"),
        ]);
        let query = params(&[("file", "vacation.jpg"), ("size", "original")]);
        let sign = compute(
            "GET",
            &url,
            &oauth,
            &query,
            "kd94hf93k423kf44",
            "pfkkdhi9sl3r4s00",
        )
        .unwrap();
        assert_eq!(sign, "MdpQcU8iPSUjWoN/UDMsK2sui9I=");
    }

    #[test]
    fn body_parameter_wins_collision() {
        let url = Url::parse("https://example.com/resource").unwrap();
        let oauth = params(&[("oauth_nonce", "from-oauth"), ("a", "1")]);
        let body = params(&[("oauth_nonce", "from-body")]);
        let sig = Signature::new("GET", &url, &oauth, &body, "cs", "").unwrap();
        assert_eq!(sig.parameter_string(), "a=1&oauth_nonce=from-body");
        assert_eq!(sig.signing_key(), "cs&");
    }

    #[test]
    fn query_in_base_url_is_rejected() {
        let url = Url::parse("https://example.com/resource?a=1").unwrap();
        let empty = ParameterSet::new();
        let result = compute("GET", &url, &empty, &empty, "cs", "ts");
        assert_eq!(
            result,
            Err(SignError::InvalidBaseUrl(
                "https://example.com/resource?a=1".to_string()
            ))
        );
    }
}
