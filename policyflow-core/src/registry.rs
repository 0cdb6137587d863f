use crate::{DefinitionError, FlowDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of selecting a flow by an externally supplied id
#[derive(Debug, Clone)]
pub enum FlowSelection {
    Ready(Arc<FlowDescriptor>),
    /// No flow is registered under the requested id; hosts render their
    /// "invalid flow" state instead of starting a run
    Invalid { requested: String },
}

impl FlowSelection {
    pub fn is_ready(&self) -> bool {
        matches!(self, FlowSelection::Ready(_))
    }
}

/// Maps flow ids to their descriptors
#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    flows: Vec<Arc<FlowDescriptor>>,
    index: HashMap<String, usize>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, flow: FlowDescriptor) -> Result<(), DefinitionError> {
        if self.index.contains_key(&flow.id) {
            return Err(DefinitionError::DuplicateFlow { flow_id: flow.id });
        }
        self.index.insert(flow.id.clone(), self.flows.len());
        self.flows.push(Arc::new(flow));
        Ok(())
    }

    pub fn with(mut self, flow: FlowDescriptor) -> Result<Self, DefinitionError> {
        self.register(flow)?;
        Ok(self)
    }

    pub fn resolve(&self, flow_id: &str) -> Option<Arc<FlowDescriptor>> {
        self.index.get(flow_id).map(|&i| self.flows[i].clone())
    }

    pub fn select(&self, flow_id: &str) -> FlowSelection {
        match self.resolve(flow_id) {
            Some(flow) => FlowSelection::Ready(flow),
            None => {
                tracing::warn!(flow = %flow_id, "requested flow is not registered");
                FlowSelection::Invalid {
                    requested: flow_id.to_string(),
                }
            }
        }
    }

    /// Flow ids in registration order
    pub fn flow_ids(&self) -> Vec<&str> {
        self.flows.iter().map(|f| f.id.as_str()).collect()
    }

    pub fn flows(&self) -> impl Iterator<Item = &Arc<FlowDescriptor>> {
        self.flows.iter()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
