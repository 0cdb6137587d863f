use crate::DefinitionError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::{future::Future, pin::Pin, sync::Arc};

/// Future returned by a step operation
pub type OperationFuture = Pin<Box<dyn Future<Output = Result<OperationOutcome>> + Send>>;

/// Result envelope of a remote operation: `{ success, message?, data? }`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl OperationOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn ok_with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Document reference carried by the payload, if any: either a bare
    /// string or a `documentUrl` / `document_url` field.
    pub fn artifact(&self) -> Option<String> {
        match self.data.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("documentUrl")
                .or_else(|| map.get("document_url"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            _ => None,
        }
    }
}

/// Everything an operation gets to see when it is invoked
#[derive(Debug, Clone, Default)]
pub struct StepInput {
    pub trace_id: String,
    pub flow_id: String,
    pub step_id: String,
    pub params: HashMap<String, Value>,
    /// Outputs of the steps completed so far, in step order
    pub prior_outputs: Vec<(String, Value)>,
}

impl StepInput {
    pub fn new(flow_id: impl Into<String>, step_id: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            step_id: step_id.into(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_prior_output(mut self, step_id: impl Into<String>, value: Value) -> Self {
        self.prior_outputs.push((step_id.into(), value));
        self
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn output(&self, step_id: &str) -> Option<&Value> {
        self.prior_outputs
            .iter()
            .find(|(id, _)| id == step_id)
            .map(|(_, v)| v)
    }

    /// Finds `key` in the most recent prior output that has a usable value
    /// for it, falling back to the run parameters. Nulls and blank strings
    /// count as absent.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.prior_outputs
            .iter()
            .rev()
            .find_map(|(_, output)| output.get(key).filter(|v| is_present(v)))
            .or_else(|| self.params.get(key))
    }

    /// Like [`lookup`](Self::lookup), rendering scalars as plain strings
    pub fn lookup_str(&self, key: &str) -> Option<String> {
        match self.lookup(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// A unit of remote work behind a step. Implementations are stateless and
/// may be shared between steps and flows.
pub trait StepOperation: Send + Sync {
    fn invoke(&self, input: StepInput) -> OperationFuture;
}

impl<F, Fut> StepOperation for F
where
    F: Fn(StepInput) -> Fut + Send + Sync,
    Fut: Future<Output = Result<OperationOutcome>> + Send + 'static,
{
    fn invoke(&self, input: StepInput) -> OperationFuture {
        Box::pin(self(input))
    }
}

/// Wraps a closure as a [`StepOperation`], pinning down its argument and
/// output types for inference
pub fn operation_fn<F, Fut>(f: F) -> F
where
    F: Fn(StepInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<OperationOutcome>> + Send + 'static,
{
    f
}

/// Operations addressable by name, for flows defined as data
#[derive(Clone, Default)]
pub struct OperationCatalog {
    operations: HashMap<String, Arc<dyn StepOperation>>,
}

impl OperationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, operation: Arc<dyn StepOperation>) {
        self.operations.insert(name.into(), operation);
    }

    pub fn with<O>(mut self, name: impl Into<String>, operation: O) -> Self
    where
        O: StepOperation + 'static,
    {
        self.insert(name, Arc::new(operation));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StepOperation>> {
        self.operations.get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<Arc<dyn StepOperation>, DefinitionError> {
        self.get(name)
            .ok_or_else(|| DefinitionError::UnknownOperation {
                operation: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for OperationCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationCatalog")
            .field("operations", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_prefers_latest_output() {
        let input = StepInput::new("motor", "generate-debit-note")
            .with_param("policy_id", json!("param"))
            .with_prior_output("register-payment", json!({ "policy_id": "first" }))
            .with_prior_output("prepare-policy", json!({ "policy_id": 42 }));
        assert_eq!(input.lookup("policy_id"), Some(&json!(42)));
        assert_eq!(input.lookup_str("policy_id").as_deref(), Some("42"));
        assert_eq!(input.lookup("missing"), None);
    }

    #[test]
    fn test_null_and_blank_outputs_fall_back_to_params() {
        let input = StepInput::new("motor", "renew-policy")
            .with_param("policy_no", json!("LIC/HQ/MOT/MC/24/476"))
            .with_param("effective_date", json!("2026-10-17"))
            .with_prior_output(
                "register-payment",
                json!({ "policy_id": 981, "policy_no": null, "effective_date": "  " }),
            );
        assert_eq!(
            input.lookup_str("policy_no").as_deref(),
            Some("LIC/HQ/MOT/MC/24/476")
        );
        assert_eq!(
            input.lookup_str("effective_date").as_deref(),
            Some("2026-10-17")
        );
        assert_eq!(input.lookup_str("policy_id").as_deref(), Some("981"));
    }
}
