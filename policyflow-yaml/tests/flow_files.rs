use policyflow_core::prelude::*;
use policyflow_yaml::{FlowLoader, FlowsConfig};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

const RENEWAL: &str = r#"
version: "1.0"
flows:
  - id: motor-policy-renewal
    title: "${env:POLICYFLOW_TEST_FILES_TITLE:-Motor Policy Renewal}"
    description: Renew an existing motor policy
    steps:
      - id: register-payment
        title: Register Payment
        operation: payment
      - id: renew-policy
        title: Renew Policy
        operation: renew
      - id: generate-documents
        title: Generate Documents
        operation: documents
"#;

fn catalog() -> OperationCatalog {
    OperationCatalog::new()
        .with(
            "payment",
            operation_fn(|_input| async move { Ok(OperationOutcome::ok("Payment registered")) }),
        )
        .with(
            "renew",
            operation_fn(|input| async move {
                let policy = input.lookup_str("policy_no").unwrap_or_default();
                Ok(OperationOutcome::ok_with_data(
                    "Policy renewed",
                    json!({ "policy_no": format!("{policy}/R") }),
                ))
            }),
        )
        .with(
            "documents",
            operation_fn(|input| async move {
                let policy = input.lookup_str("policy_no").unwrap_or_default();
                Ok(OperationOutcome::ok_with_data(
                    "Documents generated",
                    json!({ "documentUrl": format!("https://docs.test/{policy}") }),
                ))
            }),
        )
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("policyflow-{}-{name}", std::process::id()))
}

#[tokio::test]
async fn test_loaded_flow_runs_to_completion() {
    let config = FlowLoader::from_yaml_str(RENEWAL).unwrap();
    let registry = FlowLoader::build_registry(&config, &catalog()).unwrap();

    let flow = match registry.select("motor-policy-renewal") {
        FlowSelection::Ready(flow) => flow,
        FlowSelection::Invalid { requested } => panic!("{requested} should resolve"),
    };
    assert_eq!(flow.title, "Motor Policy Renewal");

    let history = Arc::new(HistoryObserver::new());
    let mut params = HashMap::new();
    params.insert("policy_no".to_string(), json!("P-7"));
    let report = StepRunner::new()
        .observe(history.clone())
        .run(&flow, params)
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.result_artifact.as_deref(), Some("https://docs.test/P-7/R"));
    assert_eq!(history.snapshots().len(), 1 + 2 * 3);
}

#[test]
fn test_yaml_and_json_files_round_trip() {
    let config = FlowLoader::from_yaml_str(RENEWAL).unwrap();

    let yaml_path = temp_path("flows.yaml");
    FlowLoader::save_to_yaml(&config, &yaml_path).unwrap();
    let from_yaml: FlowsConfig = FlowLoader::from_file(&yaml_path).unwrap();
    assert_eq!(from_yaml, config);

    let json_path = temp_path("flows.json");
    FlowLoader::save_to_json(&config, &json_path).unwrap();
    let from_json = FlowLoader::from_file(&json_path).unwrap();
    assert_eq!(from_json, config);

    let _ = std::fs::remove_file(yaml_path);
    let _ = std::fs::remove_file(json_path);
}

#[test]
fn test_missing_file_reports_path() {
    let err = FlowLoader::from_yaml_file(temp_path("missing.yaml")).unwrap_err();
    assert!(err.to_string().contains("missing.yaml"));
}
