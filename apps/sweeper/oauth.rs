use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::{Rng, distr::Alphanumeric};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::Credentials;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as-is, everything else is encoded
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const NONCE_LEN: usize = 32;

fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Builds the `Authorization` header for one OAuth 1.0a request. `url` must
/// not carry a query string; query and form parameters go in `params`.
pub fn authorization_header(
    credentials: &Credentials,
    method: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String> {
    let nonce: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the unix epoch")?
        .as_secs();

    authorization_header_with(credentials, method, url, params, &nonce, timestamp)
}

pub(crate) fn authorization_header_with(
    credentials: &Credentials,
    method: &str,
    url: &str,
    params: &[(String, String)],
    nonce: &str,
    timestamp: u64,
) -> Result<String> {
    let mut oauth_params = vec![
        ("oauth_consumer_key".to_string(), credentials.consumer_key.clone()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_token".to_string(), credentials.access_token.clone()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];

    let all_params: Vec<(String, String)> =
        params.iter().chain(oauth_params.iter()).cloned().collect();
    let signature = sign(
        &credentials.consumer_secret,
        &credentials.access_token_secret,
        method,
        url,
        &all_params,
    )?;
    oauth_params.push(("oauth_signature".to_string(), signature));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {fields}"))
}

pub(crate) fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&param_string)
    )
}

pub(crate) fn sign(
    consumer_secret: &str,
    token_secret: &str,
    method: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).context("Invalid HMAC key")?;
    mac.update(signature_base_string(method, url, params).as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference request from Twitter's "Creating a signature" guide
    const URL: &str = "https://api.twitter.com/1.1/statuses/update.json";
    const CONSUMER_SECRET: &str = "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw";
    const TOKEN_SECRET: &str = "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE";

    fn reference_params() -> Vec<(String, String)> {
        [
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            ("oauth_version", "1.0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn credentials() -> Credentials {
        Credentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".to_string(),
            consumer_secret: CONSUMER_SECRET.to_string(),
            access_token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            access_token_secret: TOKEN_SECRET.to_string(),
        }
    }

    #[test]
    fn base_string_sorts_and_encodes_params() {
        let base = signature_base_string("post", URL, &reference_params());
        assert!(base.starts_with(
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26oauth_consumer_key"
        ));
        assert!(base.ends_with(
            "status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        ));
    }

    #[test]
    fn matches_reference_signature() {
        let signature =
            sign(CONSUMER_SECRET, TOKEN_SECRET, "POST", URL, &reference_params()).unwrap();
        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn header_carries_the_reference_signature() {
        let params = vec![
            (
                "status".to_string(),
                "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
            ),
            ("include_entities".to_string(), "true".to_string()),
        ];
        let header = authorization_header_with(
            &credentials(),
            "POST",
            URL,
            &params,
            "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
            1318622958,
        )
        .unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\", "));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(header.ends_with("oauth_version=\"1.0\""));
        assert!(!header.contains("status"));
    }

    #[test]
    fn fresh_nonce_per_header() {
        let first = authorization_header(&credentials(), "GET", URL, &[]).unwrap();
        let second = authorization_header(&credentials(), "GET", URL, &[]).unwrap();
        assert_ne!(first, second);
    }
}
