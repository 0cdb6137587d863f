use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A file of flow definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowsConfig {
    pub version: String,
    /// Fallback values for `${env:..}` references
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    pub flows: Vec<FlowDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<StepDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Name of an operation in the catalog the flows are built against
    pub operation: String,
}

impl FlowsConfig {
    pub fn flow(&self, id: &str) -> Option<&FlowDefinition> {
        self.flows.iter().find(|f| f.id == id)
    }

    /// Every operation name referenced, deduplicated
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .flows
            .iter()
            .flat_map(|f| f.steps.iter().map(|s| s.operation.as_str()))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Applies `f` to every string field, stopping at the first error
    pub(crate) fn try_for_each_string<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut String) -> Result<()>,
    {
        f(&mut self.version)?;
        for flow in &mut self.flows {
            f(&mut flow.id)?;
            f(&mut flow.title)?;
            f(&mut flow.description)?;
            for step in &mut flow.steps {
                f(&mut step.id)?;
                f(&mut step.title)?;
                f(&mut step.description)?;
                f(&mut step.operation)?;
            }
        }
        Ok(())
    }
}
