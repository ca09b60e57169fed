//! Response envelope shared by every control endpoint

use serde::Deserialize;
use serde_json::Value;

use crate::{AcquisitionError, Result};

/// Status block of a control response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ResponseStatus {
    /// Zero on success; anything else is a refusal
    #[serde(default, alias = "code")]
    pub status_code: i64,
    #[serde(default)]
    pub message: String,
}

/// `{status: {status_code, message}, data: <endpoint-specific>}`
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub status: Option<ResponseStatus>,
    #[serde(default)]
    pub data: Value,
}

impl Response {
    pub fn new(status_code: i64, message: impl Into<String>, data: Value) -> Self {
        Self { status: Some(ResponseStatus { status_code, message: message.into() }), data }
    }

    /// Parse a response body, rejecting anything that is not an envelope object.
    pub fn from_slice(context: &str, body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| AcquisitionError::decode(context, format!("invalid envelope: {e}")))
    }

    pub fn status_code(&self) -> Option<i64> {
        self.status.as_ref().map(|status| status.status_code)
    }

    /// Device message, or an empty string when the response carried no status.
    pub fn message(&self) -> &str {
        self.status.as_ref().map(|status| status.message.as_str()).unwrap_or("")
    }

    /// Look up a field of `data` by JSON pointer, e.g. `/data_socket/port`.
    pub fn field(&self, context: &str, pointer: &str) -> Result<&Value> {
        self.data.pointer(pointer).ok_or_else(|| {
            AcquisitionError::decode(context, format!("missing field data{pointer}"))
        })
    }

    pub fn str_field(&self, context: &str, pointer: &str) -> Result<&str> {
        self.field(context, pointer)?.as_str().ok_or_else(|| {
            AcquisitionError::decode(context, format!("field data{pointer} is not a string"))
        })
    }

    pub fn u64_field(&self, context: &str, pointer: &str) -> Result<u64> {
        self.field(context, pointer)?.as_u64().ok_or_else(|| {
            AcquisitionError::decode(
                context,
                format!("field data{pointer} is not a non-negative integer"),
            )
        })
    }

    /// Integer field that may be absent, null, a number or a numeric string.
    pub fn optional_i64_field(&self, context: &str, pointer: &str) -> Result<Option<i64>> {
        match self.data.pointer(pointer) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().and_then(integral_f64_to_i64))
                .map(Some)
                .ok_or_else(|| {
                    AcquisitionError::decode(
                        context,
                        format!("field data{pointer} is not an integer in range: {number}"),
                    )
                }),
            Some(Value::String(text)) => text.trim().parse::<i64>().map(Some).map_err(|e| {
                AcquisitionError::decode(context, format!("field data{pointer}: {e}"))
            }),
            Some(other) => Err(AcquisitionError::decode(
                context,
                format!("field data{pointer} has unexpected type: {other}"),
            )),
        }
    }
}

/// Whole floats such as `12.0` convert; fractions, non-finite and out-of-range values do not.
fn integral_f64_to_i64(value: f64) -> Option<i64> {
    // 2^63 is exactly representable, so both bounds are exact.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if value.is_finite() && value.fract() == 0.0 && (-LIMIT..LIMIT).contains(&value) {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_envelope() {
        let body = br#"{"status":{"status_code":0,"message":"OK"},"data":{"name":"NIC-500 SDK"}}"#;
        let response = Response::from_slice("API", body).unwrap();

        assert_eq!(response.status_code(), Some(0));
        assert_eq!(response.message(), "OK");
        assert_eq!(response.str_field("API", "/name").unwrap(), "NIC-500 SDK");
    }

    #[test]
    fn status_is_optional_on_the_wire() {
        let response = Response::from_slice("API", br#"{"success": true}"#).unwrap();
        assert_eq!(response.status_code(), None);
        assert_eq!(response.message(), "");
    }

    #[test]
    fn non_object_body_is_decode_error() {
        for body in [&b"<html>busy</html>"[..], b"", b"[1,2,3]"] {
            let result = Response::from_slice("Power", body);
            assert!(matches!(result, Err(AcquisitionError::Decode { .. })), "{:?}", body);
        }
    }

    #[test]
    fn optional_integer_accepts_numbers_strings_and_null() {
        let response = Response::new(
            0,
            "OK",
            json!({"a": 1200, "b": "-4500", "c": null, "d": 12.0, "e": [1]}),
        );

        assert_eq!(response.optional_i64_field("t", "/a").unwrap(), Some(1200));
        assert_eq!(response.optional_i64_field("t", "/b").unwrap(), Some(-4500));
        assert_eq!(response.optional_i64_field("t", "/c").unwrap(), None);
        assert_eq!(response.optional_i64_field("t", "/missing").unwrap(), None);
        assert_eq!(response.optional_i64_field("t", "/d").unwrap(), Some(12));
        assert!(response.optional_i64_field("t", "/e").is_err());
    }

    #[test]
    fn optional_integer_rejects_fractional_and_huge_floats() {
        let response = Response::new(
            0,
            "OK",
            json!({"fraction": 12.7, "huge": -1e300, "edge": 9.3e18, "whole": -55000.0}),
        );

        for pointer in ["/fraction", "/huge", "/edge"] {
            assert!(
                matches!(
                    response.optional_i64_field("t", pointer),
                    Err(AcquisitionError::Decode { .. })
                ),
                "{pointer}"
            );
        }
        assert_eq!(response.optional_i64_field("t", "/whole").unwrap(), Some(-55_000));
    }

    #[test]
    fn missing_field_names_the_pointer() {
        let response = Response::new(0, "OK", json!({}));
        let error = response.u64_field("GPR Data Socket", "/data_socket/port").unwrap_err();
        assert!(error.to_string().contains("/data_socket/port"));
    }
}
