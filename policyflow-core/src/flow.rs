use crate::{DefinitionError, OperationOutcome, StepInput, StepOperation};
use anyhow::Result;
use std::collections::HashSet;
use std::{future::Future, sync::Arc};

/// One step of a flow: display text plus the operation behind it
#[derive(Clone)]
pub struct StepDescriptor {
    pub id: String,
    pub title: String,
    pub description: String,
    operation: Arc<dyn StepOperation>,
}

impl StepDescriptor {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        operation: Arc<dyn StepOperation>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            operation,
        }
    }

    pub fn operation(&self) -> &Arc<dyn StepOperation> {
        &self.operation
    }
}

impl std::fmt::Debug for StepDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// An ordered, validated sequence of steps.
///
/// Step order is the dependency chain of the business process (payment
/// before policy creation, and so on) and is fixed once built.
#[derive(Debug, Clone)]
pub struct FlowDescriptor {
    pub id: String,
    pub title: String,
    pub description: String,
    steps: Vec<StepDescriptor>,
}

impl FlowDescriptor {
    pub fn builder(id: impl Into<String>) -> FlowDescriptorBuilder {
        FlowDescriptorBuilder::new(id)
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn step(&self, step_id: &str) -> Option<&StepDescriptor> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a built descriptor
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Builder for flow descriptors with a fluent API
pub struct FlowDescriptorBuilder {
    id: String,
    title: String,
    description: String,
    steps: Vec<StepDescriptor>,
}

impl FlowDescriptorBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            steps: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a step backed by an async closure
    pub fn step<F, Fut>(
        self,
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn(StepInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OperationOutcome>> + Send + 'static,
    {
        self.step_with(id, title, description, Arc::new(f))
    }

    /// Adds a step backed by a shared operation
    pub fn step_with(
        mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        operation: Arc<dyn StepOperation>,
    ) -> Self {
        self.steps
            .push(StepDescriptor::new(id, title, description, operation));
        self
    }

    pub fn push(mut self, step: StepDescriptor) -> Self {
        self.steps.push(step);
        self
    }

    /// Validates and builds the descriptor: the id must be set, and the
    /// steps must be non-empty with unique, non-empty ids.
    pub fn build(self) -> Result<FlowDescriptor, DefinitionError> {
        if self.id.trim().is_empty() {
            return Err(DefinitionError::EmptyFlowId);
        }
        if self.steps.is_empty() {
            return Err(DefinitionError::EmptyFlow { flow_id: self.id });
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(DefinitionError::EmptyStepId { flow_id: self.id });
            }
            if !seen.insert(step.id.as_str()) {
                return Err(DefinitionError::DuplicateStep {
                    flow_id: self.id.clone(),
                    step_id: step.id.clone(),
                });
            }
        }

        let title = if self.title.is_empty() {
            self.id.clone()
        } else {
            self.title
        };

        Ok(FlowDescriptor {
            id: self.id,
            title,
            description: self.description,
            steps: self.steps,
        })
    }
}
