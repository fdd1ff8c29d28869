//! Bearer token claims
//!
//! Decodes the payload of a compact JWT and pulls out the identity facts the
//! proxy impersonates: the subject and its group memberships.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClaimsError, Result};

/// Claim carrying the caller's identity
pub const SUBJECT_CLAIM: &str = "sub";

/// Claim carrying the caller's group memberships
pub const GROUPS_CLAIM: &str = "groups";

/// Identity facts extracted from a bearer credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject (`sub`), never empty
    pub subject: String,
    /// Group memberships (`groups`), in token order
    pub groups: Vec<String>,
}

impl IdentityClaims {
    /// Extract identity from a decoded claim set
    ///
    /// `sub` must be a non-empty string. `groups` is optional: non-string
    /// entries are skipped, and a missing or non-array claim yields no groups.
    pub fn from_claims(claims: &Map<String, Value>) -> Result<Self> {
        let subject = claims
            .get(SUBJECT_CLAIM)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(ClaimsError::MissingSubject)?
            .to_string();

        let groups = match claims.get(GROUPS_CLAIM) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self { subject, groups })
    }
}

/// Decode a compact JWT's claim set without checking its signature
///
/// The header must still be well-formed JSON; the signature segment is
/// ignored entirely, and so are `exp`/`nbf`.
pub fn decode_unverified(token: &str) -> Result<Map<String, Value>> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(ClaimsError::Parse(
            "token contains an invalid number of segments".into(),
        ));
    };

    decode_segment(header, "header")?;
    decode_segment(payload, "payload")
}

fn decode_segment(segment: &str, part: &str) -> Result<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| ClaimsError::Parse(format!("malformed {} encoding: {}", part, e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| ClaimsError::Parse(format!("malformed {} JSON: {}", part, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    fn token_with(payload: Value) -> String {
        format!(
            "{}.{}.not-a-signature",
            encode(&json!({"alg": "RS256", "typ": "JWT"})),
            encode(&payload)
        )
    }

    fn extract(token: &str) -> Result<IdentityClaims> {
        IdentityClaims::from_claims(&decode_unverified(token)?)
    }

    #[test]
    fn test_extracts_subject_and_groups() {
        let token = token_with(json!({"sub": "u1", "groups": ["g1", "g2"]}));
        let claims = extract(&token).unwrap();

        assert_eq!(claims.subject, "u1");
        assert_eq!(claims.groups, vec!["g1", "g2"]);
    }

    #[test]
    fn test_missing_groups_is_empty() {
        let claims = extract(&token_with(json!({"sub": "alice"}))).unwrap();
        assert!(claims.groups.is_empty());
    }

    #[test]
    fn test_non_string_groups_are_skipped() {
        let token = token_with(json!({"sub": "alice", "groups": ["dev", 7, null, {"x": 1}, "ops"]}));
        let claims = extract(&token).unwrap();
        assert_eq!(claims.groups, vec!["dev", "ops"]);
    }

    #[test]
    fn test_scalar_groups_claim_is_ignored() {
        let claims = extract(&token_with(json!({"sub": "alice", "groups": "admins"}))).unwrap();
        assert!(claims.groups.is_empty());
    }

    #[test]
    fn test_missing_subject() {
        let err = extract(&token_with(json!({"groups": ["g1"]}))).unwrap_err();
        assert!(matches!(err, ClaimsError::MissingSubject));
        assert!(err.to_string().contains("sub claim"));
    }

    #[test]
    fn test_empty_subject() {
        let err = extract(&token_with(json!({"sub": ""}))).unwrap_err();
        assert!(matches!(err, ClaimsError::MissingSubject));
    }

    #[test]
    fn test_non_string_subject() {
        let err = extract(&token_with(json!({"sub": 42}))).unwrap_err();
        assert!(matches!(err, ClaimsError::MissingSubject));
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let token = token_with(json!({"sub": "alice", "exp": 1}));
        assert_eq!(extract(&token).unwrap().subject, "alice");
    }

    #[test]
    fn test_padded_segments_are_accepted() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"ab"}"#);
        let token = format!(
            "{}==.{}=.sig",
            encode(&json!({"alg": "none"})),
            payload
        );
        assert_eq!(extract(&token).unwrap().subject, "ab");
    }

    #[test]
    fn test_wrong_segment_count() {
        for token in ["", "abc", "a.b", "a.b.c.d"] {
            let err = decode_unverified(token).unwrap_err();
            assert!(matches!(err, ClaimsError::Parse(_)), "token {:?}", token);
        }
    }

    #[test]
    fn test_payload_not_base64() {
        let token = format!("{}.!!!.sig", encode(&json!({"alg": "RS256"})));
        assert!(matches!(
            decode_unverified(&token).unwrap_err(),
            ClaimsError::Parse(_)
        ));
    }

    #[test]
    fn test_payload_not_object() {
        let token = format!(
            "{}.{}.sig",
            encode(&json!({"alg": "RS256"})),
            encode(&json!(["sub", "alice"]))
        );
        let err = decode_unverified(&token).unwrap_err();
        assert!(err.to_string().contains("payload"));
    }

    #[test]
    fn test_header_must_be_json() {
        let token = format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(b"not json"),
            encode(&json!({"sub": "alice"}))
        );
        let err = decode_unverified(&token).unwrap_err();
        assert!(err.to_string().contains("header"));
    }
}
