//! # PolicyFlow Runtime
//!
//! Step operations backed by something real or simulated: the Genova
//! insurance API, the policy document service and delayed placeholder calls.

mod genova;
mod simulated;

#[cfg(feature = "http")]
pub use genova::GenovaClient;
pub use genova::{
    to_form, CustomerCreateRequest, CustomerSearchRequest, DocumentLinkOperation, GenovaApi,
    GenovaConfig, GenovaEndpoint, GenovaError, GenovaForm, GenovaOperation, GenovaResponse,
    PolicyIdRequest, PolicyRenewalRequest, PolicySearchRequest, PushToMidRequest,
    DEFAULT_BASE_URL, DEFAULT_DOCUMENT_BASE, DEFAULT_TIMEOUT,
};
pub use simulated::{AcknowledgeOperation, Delay, SimulatedOperation};
