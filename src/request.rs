use http::{
    header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
    HeaderMap, HeaderValue, Method,
};
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::encode::percent_encode;
use crate::{
    Client, HttpResponse, HttpTransport, ParameterSet, Result, SignError, SignResult, Signer,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const MEDIA_FIELD: &str = "media";

/// A fully authenticated request, ready to be handed to a transport.
///
/// Every descriptor carries its own nonce and timestamp; build a new one
/// instead of resending an old one.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

pub struct RequestBuilder<'c, 'a, T> {
    client: &'c Client<'a, T>,
    method: Method,
    url: SignResult<Url>,
    query: ParameterSet,
    form: ParameterSet,
    media: Option<&'c [u8]>,
    error: Option<SignError>,
}

impl<'c, 'a, T> RequestBuilder<'c, 'a, T>
where
    T: HttpTransport,
{
    pub(crate) fn new(client: &'c Client<'a, T>, method: Method, url: &str) -> Self {
        let url = match Url::parse(url) {
            Ok(url) if !url.cannot_be_a_base() => Ok(url),
            _ => Err(SignError::MalformedResourceUrl(url.to_string())),
        };
        RequestBuilder {
            client,
            method,
            url,
            query: ParameterSet::new(),
            form: ParameterSet::new(),
            media: None,
            error: None,
        }
    }

    // ------------------------------------------------------------------------
    // Parameters

    /// Modify the query string of the URL.
    ///
    /// Query parameters are always part of the signature.
    ///
    /// # Errors
    /// `build` will fail if the object you provide cannot be serialized
    /// into a query string.
    pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Self {
        match serialize_pairs(query) {
            Ok(pairs) => self.query.extend(pairs),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Send a form body.
    ///
    /// Form parameters are signed, except when the request carries media;
    /// then they become trailing multipart fields and are left out of the
    /// signature.
    pub fn form<F: Serialize + ?Sized>(mut self, form: &F) -> Self {
        match serialize_pairs(form) {
            Ok(pairs) => self.form.extend(pairs),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Adds parameters where the method expects them: the query for
    /// `GET`, `HEAD` and `DELETE`, the body for everything else.
    pub fn parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = parameters.into_iter().map(|(k, v)| (k.into(), v.into()));
        if is_query_method(&self.method) {
            self.query.extend(pairs);
        } else {
            self.form.extend(pairs);
        }
        self
    }

    /// Turns the request into a `multipart/form-data` upload whose first part
    /// is `data`, sent as `application/octet-stream` under the `media` field.
    pub fn media(mut self, data: &'c [u8]) -> Self {
        self.media = Some(data);
        self
    }

    // ------------------------------------------------------------------------
    // Finish building the request

    /// Generates the OAuth signature and returns the request descriptor.
    ///
    /// # Errors
    ///
    /// Fails with [`SignError::MalformedResourceUrl`] when the URL could not
    /// be parsed, or with the serialization error of a `query`/`form` call.
    pub fn build(self) -> SignResult<SignedRequest> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut url = self.url?;

        // a query already on the resource url is signed like any other parameter
        let mut query: ParameterSet = url.query_pairs().into_owned().collect();
        query.extend(self.query);
        url.set_query(None);
        url.set_fragment(None);

        let mut signed_parameters = query.clone();
        let mut headers = HeaderMap::new();
        let body = match self.media {
            Some(data) => {
                let boundary = format!("oauth1-boundary-{}", Uuid::new_v4().simple());
                let body = multipart_body(&boundary, data, &self.form);
                headers.insert(
                    CONTENT_TYPE,
                    header_value(
                        "content-type",
                        &format!("multipart/form-data; boundary={}", boundary),
                    )?,
                );
                headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
                Some(body)
            }
            None if !self.form.is_empty() => {
                let body = encode_form(&self.form);
                signed_parameters.extend(self.form);
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
                Some(body.into_bytes())
            }
            None => None,
        };

        let authorization = Signer::new(self.client.secrets(), self.client.parameters().clone())
            .generate_signature(&self.method, &url, &signed_parameters)?;
        headers.insert(AUTHORIZATION, header_value("authorization", &authorization)?);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }

        Ok(SignedRequest {
            method: self.method,
            url,
            headers,
            body,
        })
    }

    /// Builds the request and sends it through the client's transport.
    ///
    /// # Errors
    ///
    /// This method fails if the request could not be signed or the transport
    /// failed. A response with an error status is still returned as `Ok`.
    pub async fn send(self) -> Result<HttpResponse> {
        let client = self.client;
        let request = self.build()?;
        client.execute(request).await
    }
}

fn is_query_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD || *method == Method::DELETE
}

fn serialize_pairs<S: Serialize + ?Sized>(value: &S) -> SignResult<Vec<(String, String)>> {
    let encoded =
        serde_urlencoded::to_string(value).map_err(|e| SignError::Serialize(e.to_string()))?;
    Ok(url::form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect())
}

fn header_value(name: &'static str, value: &str) -> SignResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| SignError::InvalidHeader(name))
}

fn encode_form(form: &ParameterSet) -> String {
    form.iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn multipart_body(boundary: &str, data: &[u8], fields: &ParameterSet) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{}\"\r\n", MEDIA_FIELD).as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);

    for (key, value) in fields {
        body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", key).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
    }

    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
