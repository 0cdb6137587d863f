use anyhow::{anyhow, Context, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;

const ENV_PATTERN: &str = r"\$\{env:([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}";

/// Expands `${env:NAME}` and `${env:NAME:-default}` references.
///
/// Lookup order: the process environment, then the fallback table, then the
/// inline default. A reference that resolves nowhere is an error.
#[derive(Debug, Clone)]
pub struct EnvInterpolator {
    pattern: Regex,
    fallback: HashMap<String, String>,
    use_process_env: bool,
}

impl EnvInterpolator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(ENV_PATTERN).context("compile env pattern")?,
            fallback: HashMap::new(),
            use_process_env: true,
        })
    }

    /// Resolves only from `vars`, ignoring the process environment
    pub fn isolated(vars: HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            fallback: vars,
            use_process_env: false,
            ..Self::new()?
        })
    }

    pub fn with_fallback(mut self, vars: HashMap<String, String>) -> Self {
        self.fallback.extend(vars);
        self
    }

    fn resolve(&self, name: &str) -> Option<String> {
        if self.use_process_env {
            if let Ok(value) = std::env::var(name) {
                return Some(value);
            }
        }
        self.fallback.get(name).cloned()
    }

    pub fn interpolate(&self, input: &str) -> Result<String> {
        if !input.contains("${") {
            return Ok(input.to_string());
        }

        let mut missing = None;
        let output = self.pattern.replace_all(input, |caps: &Captures| {
            let name = &caps[1];
            match self
                .resolve(name)
                .or_else(|| caps.get(2).map(|d| d.as_str().to_string()))
            {
                Some(value) => value,
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(name) => Err(anyhow!("Environment variable not found: {name}")),
            None => Ok(output.into_owned()),
        }
    }
}
