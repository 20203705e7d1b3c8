use crate::encode::percent_encode;
use crate::ParameterSet;

/// Renders `OAuth k1="v1", k2="v2", ...` with keys in ascending order.
pub fn authorization_header(oauth_parameters: &ParameterSet) -> String {
    let pairs = oauth_parameters
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>();
    format!("OAuth {}", pairs.join(", "))
}
