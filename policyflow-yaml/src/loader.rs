use crate::config::FlowsConfig;
use crate::expression::EnvInterpolator;
use anyhow::{Context, Result};
use policyflow_core::{FlowDescriptor, FlowRegistry, OperationCatalog};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Loads flow definitions from files or strings
pub struct FlowLoader;

impl FlowLoader {
    /// Loads and interpolates a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<FlowsConfig> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read YAML file: {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<FlowsConfig> {
        let config: FlowsConfig =
            serde_yaml::from_str(content).with_context(|| "Failed to parse YAML content")?;
        Self::interpolate(config)
    }

    /// Loads and interpolates a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<FlowsConfig> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read JSON file: {:?}", path.as_ref()))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<FlowsConfig> {
        let config: FlowsConfig =
            serde_json::from_str(content).with_context(|| "Failed to parse JSON content")?;
        Self::interpolate(config)
    }

    /// Picks the format from the file extension; anything but `.json` is YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FlowsConfig> {
        let is_json = path
            .as_ref()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_file(path)
        } else {
            Self::from_yaml_file(path)
        }
    }

    pub fn save_to_yaml<P: AsRef<Path>>(config: &FlowsConfig, path: P) -> Result<()> {
        let yaml_content =
            serde_yaml::to_string(config).with_context(|| "Failed to serialize flows to YAML")?;
        fs::write(&path, yaml_content)
            .with_context(|| format!("Failed to write YAML file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn save_to_json<P: AsRef<Path>>(config: &FlowsConfig, path: P) -> Result<()> {
        let json_content = serde_json::to_string_pretty(config)
            .with_context(|| "Failed to serialize flows to JSON")?;
        fs::write(&path, json_content)
            .with_context(|| format!("Failed to write JSON file: {:?}", path.as_ref()))?;
        Ok(())
    }

    fn interpolate(mut config: FlowsConfig) -> Result<FlowsConfig> {
        let env = EnvInterpolator::new()?.with_fallback(config.env.clone());
        config.try_for_each_string(|field| {
            *field = env.interpolate(field)?;
            Ok(())
        })?;
        Ok(config)
    }

    /// Checks the structure of a definition file
    pub fn validate(config: &FlowsConfig) -> Result<()> {
        if config.version.trim().is_empty() {
            return Err(anyhow::anyhow!("Flows version cannot be empty"));
        }
        if config.flows.is_empty() {
            return Err(anyhow::anyhow!("At least one flow must be defined"));
        }

        let mut flow_ids = HashSet::new();
        for flow in &config.flows {
            if flow.id.trim().is_empty() {
                return Err(anyhow::anyhow!("Flow id cannot be empty"));
            }
            if !flow_ids.insert(&flow.id) {
                return Err(anyhow::anyhow!("Duplicate flow ID: {}", flow.id));
            }
            if flow.steps.is_empty() {
                return Err(anyhow::anyhow!("Flow {} has no steps", flow.id));
            }

            let mut step_ids = HashSet::new();
            for step in &flow.steps {
                if !step_ids.insert(&step.id) {
                    return Err(anyhow::anyhow!(
                        "Duplicate step ID: {}.{}",
                        flow.id,
                        step.id
                    ));
                }
                if step.operation.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "Step {}.{} names no operation",
                        flow.id,
                        step.id
                    ));
                }
            }
        }
        Ok(())
    }

    /// Validates `config` and builds a registry, resolving each step's
    /// operation in `catalog`
    pub fn build_registry(
        config: &FlowsConfig,
        catalog: &OperationCatalog,
    ) -> Result<FlowRegistry> {
        Self::validate(config)?;

        let mut registry = FlowRegistry::new();
        for definition in &config.flows {
            let mut builder = FlowDescriptor::builder(definition.id.clone())
                .title(definition.title.clone())
                .description(definition.description.clone());
            for step in &definition.steps {
                let operation = catalog
                    .require(&step.operation)
                    .with_context(|| format!("In step {}.{}", definition.id, step.id))?;
                builder = builder.step_with(
                    step.id.clone(),
                    step.title.clone(),
                    step.description.clone(),
                    operation,
                );
            }
            registry.register(builder.build()?)?;
        }

        tracing::info!(flows = registry.len(), version = %config.version, "flow definitions loaded");
        Ok(registry)
    }
}
