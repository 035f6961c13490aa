use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::account;

use super::errors::{PlatformError, Result};

/// Credentials and identity of an account, as handed to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// Upstream account identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// API key used for authentication.
    pub api_key: Option<String>,
}

impl AccountInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            api_key: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

// Keep API keys out of logs.
impl std::fmt::Debug for AccountInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl From<account::Model> for AccountInfo {
    fn from(model: account::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            api_key: model.api_key,
        }
    }
}

/// Response code as sent by the API: some endpoint families use integers,
/// others strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseCode {
    Int(i64),
    Text(String),
}

impl ResponseCode {
    fn as_i64(&self) -> Option<i64> {
        match self {
            ResponseCode::Int(n) => Some(*n),
            ResponseCode::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseCode::Int(n) => write!(f, "{}", n),
            ResponseCode::Text(s) => f.write_str(s),
        }
    }
}

/// Success-code family of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessCodes {
    /// `0` or `"0"`.
    Zero,
    /// `200` or `"200"`.
    Http200,
    /// `1` or `"1"`.
    One,
}

impl SuccessCodes {
    pub fn accepts(self, code: &ResponseCode) -> bool {
        let expected = match self {
            SuccessCodes::Zero => 0,
            SuccessCodes::Http200 => 200,
            SuccessCodes::One => 1,
        };
        code.as_i64() == Some(expected)
    }
}

const THROTTLE_CODE: i64 = 429;
const THROTTLE_HINTS: [&str; 3] = ["too many requests", "rate limit", "throttl"];

/// Envelope returned by every reporting endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub code: Option<ResponseCode>,
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub total: Option<Value>,
}

impl ApiResponse {
    /// Build a successful envelope around `data`.
    pub fn ok(code: ResponseCode, data: Value) -> Self {
        Self {
            code: Some(code),
            message: None,
            data,
            total: None,
        }
    }

    #[must_use]
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(Value::from(total));
        self
    }

    /// Check the response code against an endpoint's success family.
    ///
    /// Throttle codes and throttle messages map to
    /// [`PlatformError::RateLimited`].
    pub fn ensure_success(&self, codes: SuccessCodes) -> Result<()> {
        let message = self.message.clone().unwrap_or_default();
        let Some(code) = &self.code else {
            return Err(PlatformError::decode("response has no code"));
        };
        if codes.accepts(code) {
            return Ok(());
        }

        let lowered = message.to_lowercase();
        let throttled = code.as_i64() == Some(THROTTLE_CODE)
            || THROTTLE_HINTS.iter().any(|hint| lowered.contains(hint));
        if throttled {
            return Err(PlatformError::rate_limited(if message.is_empty() {
                format!("code {}", code)
            } else {
                message
            }));
        }

        Err(PlatformError::api(Some(code.to_string()), message))
    }

    /// Records carried by the response.
    ///
    /// `data` may be the list itself, an object holding the list under
    /// `records`, `list`, `rows` or `items`, or null.
    pub fn records(&self) -> Result<Vec<Value>> {
        match &self.data {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items.clone()),
            Value::Object(map) => {
                for field in ["records", "list", "rows", "items"] {
                    match map.get(field) {
                        Some(Value::Array(items)) => return Ok(items.clone()),
                        Some(Value::Null) => return Ok(Vec::new()),
                        _ => {}
                    }
                }
                Err(PlatformError::decode(
                    "response data object has no record list",
                ))
            }
            other => Err(PlatformError::decode(format!(
                "unexpected response data: {}",
                other
            ))),
        }
    }

    /// Upstream-reported total, from the envelope or from `data.total`.
    pub fn total(&self) -> Option<u64> {
        let nested = match &self.data {
            Value::Object(map) => map.get("total").or_else(|| map.get("count")),
            _ => None,
        };
        self.total
            .as_ref()
            .and_then(parse_count)
            .or_else(|| nested.and_then(parse_count))
    }
}

fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Authenticated client for the reporting API.
///
/// Implementations perform no retries; rate-limit responses surface as
/// [`PlatformError::RateLimited`].
#[async_trait]
pub trait ReportClient: Send + Sync {
    /// POST `body` to `path` on behalf of `account`.
    async fn post(&self, account: &AccountInfo, path: &str, body: &Value) -> Result<ApiResponse>;
}

#[async_trait]
impl<T: ReportClient + ?Sized> ReportClient for std::sync::Arc<T> {
    async fn post(&self, account: &AccountInfo, path: &str, body: &Value) -> Result<ApiResponse> {
        (**self).post(account, path, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_codes_accept_int_and_text() {
        assert!(SuccessCodes::Zero.accepts(&ResponseCode::Int(0)));
        assert!(SuccessCodes::Zero.accepts(&ResponseCode::Text("0".into())));
        assert!(SuccessCodes::Http200.accepts(&ResponseCode::Int(200)));
        assert!(SuccessCodes::Http200.accepts(&ResponseCode::Text("200".into())));
        assert!(SuccessCodes::One.accepts(&ResponseCode::Int(1)));
        assert!(!SuccessCodes::One.accepts(&ResponseCode::Int(0)));
        assert!(!SuccessCodes::Zero.accepts(&ResponseCode::Text("ok".into())));
    }

    #[test]
    fn test_deserialize_envelope_with_msg_alias() {
        let resp: ApiResponse = serde_json::from_value(json!({
            "code": "200",
            "msg": "success",
            "data": {"list": [{"id": 1}, {"id": 2}], "total": "7"}
        }))
        .unwrap();

        assert_eq!(resp.code, Some(ResponseCode::Text("200".into())));
        assert_eq!(resp.message.as_deref(), Some("success"));
        assert!(resp.ensure_success(SuccessCodes::Http200).is_ok());
        assert_eq!(resp.records().unwrap().len(), 2);
        assert_eq!(resp.total(), Some(7));
    }

    #[test]
    fn test_envelope_total_takes_precedence() {
        let resp = ApiResponse::ok(ResponseCode::Int(0), json!({"records": [], "total": 3}))
            .with_total(10);
        assert_eq!(resp.total(), Some(10));
        assert!(resp.records().unwrap().is_empty());
    }

    #[test]
    fn test_ensure_success_maps_throttling() {
        let resp = ApiResponse {
            code: Some(ResponseCode::Int(429)),
            ..Default::default()
        };
        assert!(
            resp.ensure_success(SuccessCodes::Zero)
                .unwrap_err()
                .is_rate_limited()
        );

        let resp = ApiResponse {
            code: Some(ResponseCode::Int(1)),
            message: Some("Request throttled, slow down".into()),
            ..Default::default()
        };
        assert!(
            resp.ensure_success(SuccessCodes::Zero)
                .unwrap_err()
                .is_rate_limited()
        );
    }

    #[test]
    fn test_ensure_success_reports_api_error_with_code() {
        let resp = ApiResponse {
            code: Some(ResponseCode::Int(500)),
            message: Some("internal".into()),
            ..Default::default()
        };
        let err = resp.ensure_success(SuccessCodes::Zero).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("code 500"));
        assert!(msg.contains("internal"));
    }

    #[test]
    fn test_missing_code_is_decode_error() {
        let resp = ApiResponse::default();
        assert!(matches!(
            resp.ensure_success(SuccessCodes::Zero),
            Err(PlatformError::Decode { .. })
        ));
    }

    #[test]
    fn test_records_rejects_unknown_shapes() {
        let resp = ApiResponse::ok(ResponseCode::Int(0), json!({"unexpected": true}));
        assert!(resp.records().is_err());
        let resp = ApiResponse::ok(ResponseCode::Int(0), json!(42));
        assert!(resp.records().is_err());
    }

    #[test]
    fn test_account_info_debug_hides_api_key() {
        let info = AccountInfo::new("acct-1", "Main").with_api_key("secret");
        let debug = format!("{:?}", info);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }
}
