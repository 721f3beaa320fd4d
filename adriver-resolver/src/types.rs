//! Resolver wire types

use adriver_core::AdriverId;
use serde::Deserialize;
use serde_json::Value;

/// Success body from the resolver. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResolverResponse {
    #[serde(default)]
    pub adriverid: Option<Value>,
}

impl ResolverResponse {
    /// Interpret the body by the truthiness of `adriverid`.
    ///
    /// Falsy values (absent, `null`, `false`, `0`, `""`) mean the service has
    /// no identifier for this user. A non-empty string is the identifier;
    /// `true` and non-zero numbers are stored in their textual form. Arrays
    /// and objects are rejected with the reason in `Err`.
    pub fn into_resolution(self) -> Result<Resolution, String> {
        let raw = match self.adriverid {
            None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(Resolution::Unassigned),
            Some(Value::String(s)) => s,
            Some(Value::Bool(true)) => "true".to_string(),
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => return Ok(Resolution::Unassigned),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => {
                return Err("adriverid must be a string or scalar".to_string())
            }
        };
        Ok(match AdriverId::parse(Some(&raw)) {
            Some(id) => Resolution::Assigned(id),
            None => Resolution::Unassigned,
        })
    }
}

/// Outcome of a successful resolver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The service assigned this identifier; persist it.
    Assigned(AdriverId),
    /// The service reports no identifier; purge any cached one.
    Unassigned,
}

impl Resolution {
    pub fn id(&self) -> Option<&AdriverId> {
        match self {
            Self::Assigned(id) => Some(id),
            Self::Unassigned => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Resolution, String> {
        serde_json::from_str::<ResolverResponse>(body)
            .expect("body should parse")
            .into_resolution()
    }

    fn assigned(id: &str) -> Result<Resolution, String> {
        Ok(Resolution::Assigned(AdriverId::parse(Some(id)).expect("non-empty")))
    }

    #[test]
    fn test_assigned() {
        assert_eq!(parse(r#"{"adriverid":"abc123"}"#), assigned("abc123"));
    }

    #[test]
    fn test_missing_field_is_unassigned() {
        assert_eq!(parse("{}"), Ok(Resolution::Unassigned));
        assert_eq!(parse("[]"), Ok(Resolution::Unassigned));
    }

    #[test]
    fn test_falsy_values_are_unassigned() {
        for body in [
            r#"{"adriverid":null}"#,
            r#"{"adriverid":""}"#,
            r#"{"adriverid":false}"#,
            r#"{"adriverid":0}"#,
            r#"{"adriverid":0.0}"#,
            r#"{"adriverid":-0}"#,
        ] {
            assert_eq!(parse(body), Ok(Resolution::Unassigned), "body {}", body);
        }
    }

    #[test]
    fn test_truthy_scalars_are_stringified() {
        assert_eq!(parse(r#"{"adriverid":42}"#), assigned("42"));
        assert_eq!(parse(r#"{"adriverid":1.5}"#), assigned("1.5"));
        assert_eq!(parse(r#"{"adriverid":true}"#), assigned("true"));
        assert_eq!(parse(r#"{"adriverid":"0"}"#), assigned("0"));
    }

    #[test]
    fn test_compound_values_are_rejected() {
        assert!(parse(r#"{"adriverid":[1]}"#).is_err());
        assert!(parse(r#"{"adriverid":{"id":"x"}}"#).is_err());
    }

    #[test]
    fn test_extra_fields_ignored() {
        assert_eq!(parse(r#"{"adriverid":"x","ttl":3600}"#), assigned("x"));
    }

    #[test]
    fn test_null_body_is_rejected() {
        assert!(serde_json::from_str::<ResolverResponse>("null").is_err());
    }
}
