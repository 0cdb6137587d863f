//! # Genova insurance API
//!
//! Endpoint catalogue, response envelope and the [`GenovaApi`] seam used by
//! step operations. Requests are form-urlencoded POSTs to
//! `{base_url}/{endpoint}`.

#[cfg(feature = "http")]
mod client;
mod operation;

#[cfg(feature = "http")]
pub use client::GenovaClient;
pub use operation::{DocumentLinkOperation, GenovaOperation};

use async_trait::async_trait;
use policyflow_core::OperationOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://loyaltyapis.loyaltyinsurancegh.com/genova";
pub const DEFAULT_DOCUMENT_BASE: &str = "https://loyalty.genovainsure.com/external/policy";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Form body of a Genova request
pub type GenovaForm = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenovaEndpoint {
    PolicyQuote,
    CreatePolicy,
    PolicySearch,
    GenerateDebitNote,
    PayPolicy,
    RenewPolicy,
    CustomerCreate,
    CustomerSearch,
    PushToMid,
}

impl GenovaEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            GenovaEndpoint::PolicyQuote => "policyQuote",
            GenovaEndpoint::CreatePolicy => "policy",
            GenovaEndpoint::PolicySearch => "policy-search",
            GenovaEndpoint::GenerateDebitNote => "generate-debit-note",
            GenovaEndpoint::PayPolicy => "pay-policy",
            GenovaEndpoint::RenewPolicy => "policy-renew",
            GenovaEndpoint::CustomerCreate => "customer-create",
            GenovaEndpoint::CustomerSearch => "customer-search",
            GenovaEndpoint::PushToMid => "push-to-mid",
        }
    }

    /// Fields a request cannot be sent without
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            GenovaEndpoint::PolicyQuote => &[
                "class",
                "product_id",
                "start_date",
                "Vehicle_registration_no",
                "customer_name",
                "prefcontact",
            ],
            GenovaEndpoint::CreatePolicy => &[
                "class",
                "start_date",
                "vehicle_registration_no",
                "customer_name",
                "prefcontact",
            ],
            GenovaEndpoint::PolicySearch => &[],
            GenovaEndpoint::GenerateDebitNote | GenovaEndpoint::PayPolicy => &["policy_id"],
            GenovaEndpoint::RenewPolicy => &["policy_no", "effective_date"],
            GenovaEndpoint::CustomerCreate => &["customer_name", "prefcontact"],
            GenovaEndpoint::CustomerSearch => &["phone_number"],
            GenovaEndpoint::PushToMid => &["policy_no"],
        }
    }
}

impl std::fmt::Display for GenovaEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Response envelope shared by every endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenovaResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub success: bool,
}

impl From<GenovaResponse> for OperationOutcome {
    fn from(response: GenovaResponse) -> Self {
        OperationOutcome {
            success: response.success,
            message: (!response.message.is_empty()).then_some(response.message),
            data: (!response.data.is_null()).then_some(response.data),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenovaError {
    #[error("Genova request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("Genova returned HTTP {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode Genova response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("invalid Genova request: {0}")]
    InvalidRequest(String),

    #[error("failed to build Genova client: {0}")]
    Build(String),
}

#[derive(Debug, Clone)]
pub struct GenovaConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GenovaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PolicySearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyIdRequest {
    pub policy_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyRenewalRequest {
    pub policy_no: String,
    pub effective_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerCreateRequest {
    pub customer_name: String,
    pub prefcontact: String,
    pub prefemail: String,
    pub user_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerSearchRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushToMidRequest {
    pub policy_no: String,
}

/// Transport seam for the Genova API (mocked in tests)
#[async_trait]
pub trait GenovaApi: Send + Sync + std::fmt::Debug {
    async fn post_form(
        &self,
        endpoint: GenovaEndpoint,
        form: &GenovaForm,
    ) -> Result<GenovaResponse, GenovaError>;

    /// Quote fields are passed through untouched; premiums are computed remotely
    async fn generate_quote(&self, form: &GenovaForm) -> Result<GenovaResponse, GenovaError> {
        self.post_form(GenovaEndpoint::PolicyQuote, form).await
    }

    async fn create_policy(&self, form: &GenovaForm) -> Result<GenovaResponse, GenovaError> {
        self.post_form(GenovaEndpoint::CreatePolicy, form).await
    }

    async fn search_policy(
        &self,
        request: &PolicySearchRequest,
    ) -> Result<GenovaResponse, GenovaError> {
        if request.policy_no.is_none() && request.vehicle_number.is_none() {
            return Err(GenovaError::InvalidRequest(
                "policy search needs a policy number or a vehicle number".into(),
            ));
        }
        self.post_form(GenovaEndpoint::PolicySearch, &to_form(request)?)
            .await
    }

    async fn generate_debit_note(
        &self,
        request: &PolicyIdRequest,
    ) -> Result<GenovaResponse, GenovaError> {
        self.post_form(GenovaEndpoint::GenerateDebitNote, &to_form(request)?)
            .await
    }

    async fn pay_policy(&self, request: &PolicyIdRequest) -> Result<GenovaResponse, GenovaError> {
        self.post_form(GenovaEndpoint::PayPolicy, &to_form(request)?)
            .await
    }

    async fn renew_policy(
        &self,
        request: &PolicyRenewalRequest,
    ) -> Result<GenovaResponse, GenovaError> {
        self.post_form(GenovaEndpoint::RenewPolicy, &to_form(request)?)
            .await
    }

    async fn create_customer(
        &self,
        request: &CustomerCreateRequest,
    ) -> Result<GenovaResponse, GenovaError> {
        self.post_form(GenovaEndpoint::CustomerCreate, &to_form(request)?)
            .await
    }

    async fn search_customer(
        &self,
        request: &CustomerSearchRequest,
    ) -> Result<GenovaResponse, GenovaError> {
        self.post_form(GenovaEndpoint::CustomerSearch, &to_form(request)?)
            .await
    }

    async fn push_to_mid(&self, request: &PushToMidRequest) -> Result<GenovaResponse, GenovaError> {
        self.post_form(GenovaEndpoint::PushToMid, &to_form(request)?)
            .await
    }
}

/// Flattens a request struct into form fields. Nested values are sent as
/// JSON text; nulls are dropped.
pub fn to_form<T: Serialize>(request: &T) -> Result<GenovaForm, GenovaError> {
    let value =
        serde_json::to_value(request).map_err(|e| GenovaError::InvalidRequest(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(GenovaError::InvalidRequest(
            "request must serialize to an object".into(),
        ));
    };
    Ok(map
        .into_iter()
        .filter_map(|(key, value)| form_value(&value).map(|v| (key, v)))
        .collect())
}

pub(crate) fn form_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Answers from a fixed table and records every request
    #[derive(Debug, Default)]
    pub struct MockGenovaApi {
        responses: Mutex<HashMap<GenovaEndpoint, GenovaResponse>>,
        calls: Mutex<Vec<(GenovaEndpoint, GenovaForm)>>,
    }

    impl MockGenovaApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, endpoint: GenovaEndpoint, response: GenovaResponse) -> Self {
            self.responses.lock().unwrap().insert(endpoint, response);
            self
        }

        pub fn calls(&self) -> Vec<(GenovaEndpoint, GenovaForm)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenovaApi for MockGenovaApi {
        async fn post_form(
            &self,
            endpoint: GenovaEndpoint,
            form: &GenovaForm,
        ) -> Result<GenovaResponse, GenovaError> {
            self.calls.lock().unwrap().push((endpoint, form.clone()));
            self.responses
                .lock()
                .unwrap()
                .get(&endpoint)
                .cloned()
                .ok_or_else(|| GenovaError::Status {
                    endpoint: endpoint.path().to_string(),
                    status: 404,
                    body: "not mocked".into(),
                })
        }
    }
}
