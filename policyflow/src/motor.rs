//! Built-in motor insurance flows.
//!
//! Both flows share their operations by name, so the same registry can run
//! against simulated calls or the Genova API depending on the catalog.

use policyflow_core::{DefinitionError, FlowDescriptor, FlowRegistry, OperationCatalog};
use policyflow_runtime::{
    AcknowledgeOperation, Delay, DocumentLinkOperation, GenovaApi, GenovaEndpoint,
    GenovaOperation, SimulatedOperation,
};
use serde_json::json;
use std::sync::Arc;

pub const POLICY_CREATION: &str = "motor-policy-creation";
pub const POLICY_RENEWAL: &str = "motor-policy-renewal";

pub const REGISTER_PAYMENT: &str = "register-payment";
pub const PREPARE_POLICY: &str = "prepare-policy";
pub const RENEW_POLICY: &str = "renew-policy";
pub const GENERATE_DEBIT_NOTE: &str = "generate-debit-note";
pub const LINK_TO_ACCOUNT: &str = "link-to-account";
pub const GENERATE_DOCUMENTS: &str = "generate-documents";

/// Optional policy fields sent along with the required ones on creation
const POLICY_FIELDS: &[&str] = &[
    "product_id",
    "policy_start",
    "vehicle_usage_type",
    "vehicle_make",
    "vehicle_model",
    "vehicle_yr_manufacture",
    "vehicle_fuel_type",
    "vehicle_no_cylinders",
    "vehicle_cc",
    "vehicle_body_type",
    "vehicle_drive_type",
    "vehicle_seating",
    "vehicle_extra_seats",
    "vehicle_colour",
    "vehicle_trim",
    "vehicle_engine_no",
    "vehicle_claim_free",
    "vehicle_additional_remarks",
    "vehicle_chassis_no",
    "vehicle_type",
    "user_category_id",
    "prefemail",
    "buy_excess",
    "user_type",
];

/// Flow steps as `(step id, title, description)`; the step id doubles as
/// the operation name
type StepTable = &'static [(&'static str, &'static str, &'static str)];

const CREATION_STEPS: StepTable = &[
    (
        REGISTER_PAYMENT,
        "Register Payment",
        "Confirming payment validity and legitimacy",
    ),
    (PREPARE_POLICY, "Prepare Policy", "Creating your insurance policy"),
    (
        GENERATE_DEBIT_NOTE,
        "Generate Debit Note",
        "Generating financial documentation",
    ),
    (LINK_TO_ACCOUNT, "Link to Account", "Linking policy to your account"),
    (GENERATE_DOCUMENTS, "Generate Documents", "Creating policy documents"),
];

const RENEWAL_STEPS: StepTable = &[
    (
        REGISTER_PAYMENT,
        "Register Payment",
        "Confirming payment validity and legitimacy",
    ),
    (RENEW_POLICY, "Renew Policy", "Processing policy renewal"),
    (
        LINK_TO_ACCOUNT,
        "Link to Account",
        "Linking renewed policy to your account",
    ),
    (
        GENERATE_DOCUMENTS,
        "Generate Documents",
        "Creating updated policy documents",
    ),
];

fn build(
    id: &str,
    title: &str,
    description: &str,
    steps: StepTable,
    catalog: &OperationCatalog,
) -> Result<FlowDescriptor, DefinitionError> {
    let mut builder = FlowDescriptor::builder(id)
        .title(title)
        .description(description);
    for (step_id, step_title, step_description) in steps {
        builder = builder.step_with(
            *step_id,
            *step_title,
            *step_description,
            catalog.require(step_id)?,
        );
    }
    builder.build()
}

pub fn policy_creation(catalog: &OperationCatalog) -> Result<FlowDescriptor, DefinitionError> {
    build(
        POLICY_CREATION,
        "Motor Policy Creation",
        "Creating your new motor insurance policy",
        CREATION_STEPS,
        catalog,
    )
}

pub fn policy_renewal(catalog: &OperationCatalog) -> Result<FlowDescriptor, DefinitionError> {
    build(
        POLICY_RENEWAL,
        "Motor Policy Renewal",
        "Renewing your existing motor insurance policy",
        RENEWAL_STEPS,
        catalog,
    )
}

/// Registry holding both motor flows
pub fn registry(catalog: &OperationCatalog) -> Result<FlowRegistry, DefinitionError> {
    FlowRegistry::new()
        .with(policy_creation(catalog)?)?
        .with(policy_renewal(catalog)?)
}

/// Placeholder operations that wait for `delay` and then succeed
pub fn simulated_catalog(delay: Delay) -> OperationCatalog {
    let ok = |message: &str| SimulatedOperation::succeeding(message).with_delay(delay);
    let documents = SimulatedOperation::new(policyflow_core::OperationOutcome::ok_with_data(
        "Documents generated successfully",
        json!({ "documentUrl": "https://example.com/policy-document.pdf" }),
    ))
    .with_delay(delay);

    OperationCatalog::new()
        .with(REGISTER_PAYMENT, ok("Payment registered successfully"))
        .with(PREPARE_POLICY, ok("Policy created successfully"))
        .with(RENEW_POLICY, ok("Policy renewed successfully"))
        .with(GENERATE_DEBIT_NOTE, ok("Debit note generated successfully"))
        .with(LINK_TO_ACCOUNT, ok("Policy linked to account successfully"))
        .with(GENERATE_DOCUMENTS, documents)
}

/// Operations backed by the Genova API.
///
/// Payment is registered against an existing `policy_id` run parameter.
/// The debit note takes `policy_id` from the prepare-policy output only, so
/// a creation response without one fails that step instead of debiting the
/// policy the payment was registered against. Linking to the account has no
/// Genova endpoint and is acknowledged locally.
pub fn genova_catalog(api: Arc<dyn GenovaApi>, document_base: &str) -> OperationCatalog {
    OperationCatalog::new()
        .with(
            REGISTER_PAYMENT,
            GenovaOperation::new(api.clone(), GenovaEndpoint::PayPolicy),
        )
        .with(
            PREPARE_POLICY,
            GenovaOperation::new(api.clone(), GenovaEndpoint::CreatePolicy)
                .forwarding(POLICY_FIELDS.iter().copied()),
        )
        .with(
            RENEW_POLICY,
            GenovaOperation::new(api.clone(), GenovaEndpoint::RenewPolicy),
        )
        .with(
            GENERATE_DEBIT_NOTE,
            GenovaOperation::new(api, GenovaEndpoint::GenerateDebitNote)
                .field_from("policy_id", PREPARE_POLICY),
        )
        .with(
            LINK_TO_ACCOUNT,
            AcknowledgeOperation::new("Policy linked to account successfully"),
        )
        .with(GENERATE_DOCUMENTS, DocumentLinkOperation::new(document_base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_holds_both_flows() {
        let registry = registry(&simulated_catalog(Delay::None)).unwrap();
        assert_eq!(registry.flow_ids(), vec![POLICY_CREATION, POLICY_RENEWAL]);

        let creation = registry.resolve(POLICY_CREATION).unwrap();
        assert_eq!(creation.title, "Motor Policy Creation");
        assert_eq!(
            creation.step_ids().collect::<Vec<_>>(),
            vec![
                REGISTER_PAYMENT,
                PREPARE_POLICY,
                GENERATE_DEBIT_NOTE,
                LINK_TO_ACCOUNT,
                GENERATE_DOCUMENTS
            ]
        );

        let renewal = registry.resolve(POLICY_RENEWAL).unwrap();
        assert_eq!(renewal.len(), 4);
        assert_eq!(
            renewal.step(LINK_TO_ACCOUNT).unwrap().description,
            "Linking renewed policy to your account"
        );
    }

    #[test]
    fn test_missing_operation_is_a_definition_error() {
        let partial = OperationCatalog::new().with(
            REGISTER_PAYMENT,
            SimulatedOperation::succeeding("paid"),
        );
        assert_eq!(
            registry(&partial).unwrap_err(),
            DefinitionError::UnknownOperation {
                operation: PREPARE_POLICY.into()
            }
        );
    }
}
