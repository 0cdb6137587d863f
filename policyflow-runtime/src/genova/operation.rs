use super::{GenovaApi, GenovaEndpoint, GenovaForm};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use policyflow_core::{OperationFuture, OperationOutcome, StepInput, StepOperation};
use serde_json::json;
use std::sync::Arc;

/// Posts one Genova endpoint as a step.
///
/// Required fields are resolved from earlier step outputs first, then from
/// run parameters, unless [`field_from`](Self::field_from) pins a field to
/// one step's output. A missing field fails the step without a request.
#[derive(Debug, Clone)]
pub struct GenovaOperation {
    api: Arc<dyn GenovaApi>,
    endpoint: GenovaEndpoint,
    optional: Vec<String>,
    pinned: Vec<(String, String)>,
}

impl GenovaOperation {
    pub fn new(api: Arc<dyn GenovaApi>, endpoint: GenovaEndpoint) -> Self {
        Self {
            api,
            endpoint,
            optional: Vec::new(),
            pinned: Vec::new(),
        }
    }

    /// Also sends these fields when they can be resolved
    pub fn forwarding<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Takes `field` only from the output of `step_id`, with no fallback to
    /// other outputs or run parameters
    pub fn field_from(mut self, field: impl Into<String>, step_id: impl Into<String>) -> Self {
        self.pinned.push((field.into(), step_id.into()));
        self
    }

    pub fn endpoint(&self) -> GenovaEndpoint {
        self.endpoint
    }

    fn resolve(&self, input: &StepInput, field: &str) -> Option<String> {
        let value = match self.pinned.iter().find(|(name, _)| name == field) {
            Some((_, step_id)) => input
                .output(step_id)
                .and_then(|output| output.get(field))
                .and_then(super::form_value),
            None => input.lookup_str(field),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    fn build_form(&self, input: &StepInput) -> Result<GenovaForm, String> {
        let mut form = GenovaForm::new();
        for field in self.endpoint.required_fields() {
            match self.resolve(input, field) {
                Some(value) => {
                    form.insert((*field).to_string(), value);
                }
                None => return Err(format!("Missing required field: {field}")),
            }
        }
        for field in &self.optional {
            if let Some(value) = input.lookup(field).and_then(super::form_value) {
                form.insert(field.clone(), value);
            }
        }
        Ok(form)
    }
}

impl StepOperation for GenovaOperation {
    fn invoke(&self, input: StepInput) -> OperationFuture {
        let api = self.api.clone();
        let endpoint = self.endpoint;
        let form = self.build_form(&input);
        Box::pin(async move {
            let form = match form {
                Ok(form) => form,
                Err(message) => {
                    tracing::warn!(trace_id = %input.trace_id, step = %input.step_id, endpoint = %endpoint, "{message}");
                    return Ok(OperationOutcome::failed(message));
                }
            };
            tracing::info!(trace_id = %input.trace_id, step = %input.step_id, endpoint = %endpoint, "calling Genova");
            let response = api.post_form(endpoint, &form).await?;
            Ok(response.into())
        })
    }
}

/// Builds the link to the printable policy documents.
///
/// The document service takes the policy number base64 encoded in the
/// `pno` query parameter.
#[derive(Debug, Clone)]
pub struct DocumentLinkOperation {
    document_base: String,
}

impl DocumentLinkOperation {
    pub fn new(document_base: impl Into<String>) -> Self {
        Self {
            document_base: document_base.into(),
        }
    }

    pub fn link(&self, policy_no: &str) -> String {
        format!("{}?pno={}", self.document_base, STANDARD.encode(policy_no))
    }
}

impl Default for DocumentLinkOperation {
    fn default() -> Self {
        Self::new(super::DEFAULT_DOCUMENT_BASE)
    }
}

impl StepOperation for DocumentLinkOperation {
    fn invoke(&self, input: StepInput) -> OperationFuture {
        let link = input
            .lookup_str("policy_no")
            .filter(|p| !p.trim().is_empty())
            .map(|p| (self.link(&p), p));
        Box::pin(async move {
            let Some((url, policy_no)) = link else {
                return Ok(OperationOutcome::failed(
                    "No policy number available for documents",
                ));
            };
            tracing::info!(trace_id = %input.trace_id, policy_no = %policy_no, "policy documents ready");
            Ok(OperationOutcome::ok_with_data(
                "Policy documents generated",
                json!({ "documentUrl": url, "policy_no": policy_no }),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genova::mock::MockGenovaApi;
    use crate::genova::{GenovaError, GenovaResponse};
    use serde_json::json;

    fn ok(message: &str, data: serde_json::Value) -> GenovaResponse {
        GenovaResponse {
            message: message.into(),
            data,
            success: true,
        }
    }

    #[test]
    fn test_document_link_encodes_policy_number() {
        let op = DocumentLinkOperation::default();
        assert_eq!(
            op.link("LIC/HQ/MOT/MC/24/476"),
            "https://loyalty.genovainsure.com/external/policy?pno=TElDL0hRL01PVC9NQy8yNC80NzY="
        );
    }

    #[tokio::test]
    async fn test_document_link_operation() {
        let op = DocumentLinkOperation::new("https://docs.test/policy");
        let input = StepInput::new("motor", "generate-documents")
            .with_prior_output("renew-policy", json!({ "policy_no": "P/1" }));
        let outcome = op.invoke(input).await.unwrap();
        assert!(outcome.success);
        assert_eq!(
            outcome.artifact().as_deref(),
            Some("https://docs.test/policy?pno=UC8x")
        );

        let missing = op
            .invoke(StepInput::new("motor", "generate-documents"))
            .await
            .unwrap();
        assert!(!missing.success);
    }

    #[tokio::test]
    async fn test_operation_resolves_fields_from_prior_outputs() {
        let api = Arc::new(MockGenovaApi::new().respond(
            GenovaEndpoint::GenerateDebitNote,
            ok("Debit note generated", json!({ "debit_note_no": "DN-7" })),
        ));
        let op = GenovaOperation::new(api.clone(), GenovaEndpoint::GenerateDebitNote)
            .forwarding(["currency"]);

        let input = StepInput::new("motor", "generate-debit-note")
            .with_param("policy_id", json!("stale"))
            .with_param("currency", json!("GHS"))
            .with_prior_output("prepare-policy", json!({ "policy_id": 42 }));
        let outcome = op.invoke(input).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("Debit note generated"));
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1["policy_id"], "42");
        assert_eq!(calls[0].1["currency"], "GHS");
    }

    #[tokio::test]
    async fn test_missing_field_fails_without_request() {
        let api = Arc::new(MockGenovaApi::new());
        let op = GenovaOperation::new(api.clone(), GenovaEndpoint::RenewPolicy);
        let input = StepInput::new("motor", "renew-policy").with_param("policy_no", json!("P-1"));

        let outcome = op.invoke(input).await.unwrap();
        assert_eq!(
            outcome,
            OperationOutcome::failed("Missing required field: effective_date")
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_null_output_field_does_not_hide_param() {
        let api = Arc::new(MockGenovaApi::new().respond(
            GenovaEndpoint::RenewPolicy,
            ok("Policy renewed", serde_json::Value::Null),
        ));
        let input = StepInput::new("motor", "renew-policy")
            .with_param("policy_no", json!("LIC/HQ/MOT/MC/24/476"))
            .with_param("effective_date", json!("2026-10-17"))
            .with_prior_output(
                "register-payment",
                json!({ "policy_id": 981, "policy_no": null }),
            );

        let outcome = GenovaOperation::new(api.clone(), GenovaEndpoint::RenewPolicy)
            .invoke(input)
            .await
            .unwrap();
        assert!(outcome.success, "{outcome:?}");
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1["policy_no"], "LIC/HQ/MOT/MC/24/476");
    }

    #[tokio::test]
    async fn test_pinned_field_ignores_params_and_other_outputs() {
        let api = Arc::new(MockGenovaApi::new().respond(
            GenovaEndpoint::GenerateDebitNote,
            ok("Debit note generated", serde_json::Value::Null),
        ));
        let op = GenovaOperation::new(api.clone(), GenovaEndpoint::GenerateDebitNote)
            .field_from("policy_id", "prepare-policy");

        let without = StepInput::new("motor", "generate-debit-note")
            .with_param("policy_id", json!("981"))
            .with_prior_output("register-payment", json!({ "policy_id": 981 }))
            .with_prior_output("prepare-policy", json!({ "policy_no": "P/1" }));
        assert_eq!(
            op.invoke(without).await.unwrap(),
            OperationOutcome::failed("Missing required field: policy_id")
        );
        assert!(api.calls().is_empty());

        let with = StepInput::new("motor", "generate-debit-note")
            .with_param("policy_id", json!("981"))
            .with_prior_output("prepare-policy", json!({ "policy_id": 1204 }));
        assert!(op.invoke(with).await.unwrap().success);
        assert_eq!(api.calls()[0].1["policy_id"], "1204");
    }

    #[tokio::test]
    async fn test_rejected_response_and_transport_error() {
        let api = Arc::new(MockGenovaApi::new().respond(
            GenovaEndpoint::PayPolicy,
            GenovaResponse {
                message: "Payment declined".into(),
                data: serde_json::Value::Null,
                success: false,
            },
        ));
        let input = StepInput::new("motor", "register-payment").with_param("policy_id", json!("9"));

        let declined = GenovaOperation::new(api.clone(), GenovaEndpoint::PayPolicy)
            .invoke(input.clone())
            .await
            .unwrap();
        assert_eq!(declined, OperationOutcome::failed("Payment declined"));

        let err = GenovaOperation::new(api, GenovaEndpoint::GenerateDebitNote)
            .invoke(input)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GenovaError>(),
            Some(GenovaError::Status { status: 404, .. })
        ));
    }
}
