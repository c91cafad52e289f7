//! Catalog loading with schema + invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::Draft;
use serde_json::Value;
use tracing::debug;

use crate::core::catalog::Pattern;
use crate::core::invariants::validate_catalog_invariants;

/// JSON Schema every catalog file must satisfy.
pub const CATALOG_SCHEMA: &str = include_str!("../schemas/pattern/v1.schema.json");

/// Patterns shipped with the binary.
pub const BUILTIN_CATALOG: &str = include_str!("../data/patterns.json");

/// Parse and validate a catalog: schema conformance + semantic invariants.
pub fn validate_catalog(raw: &str) -> Result<Vec<Pattern>> {
    let catalog: Value = serde_json::from_str(raw).context("parse catalog json")?;
    let schema: Value = serde_json::from_str(CATALOG_SCHEMA).context("parse catalog schema")?;
    validate_schema(&catalog, &schema)?;

    let patterns: Vec<Pattern> =
        serde_json::from_value(catalog).context("deserialize catalog")?;
    let errors = validate_catalog_invariants(&patterns);
    if !errors.is_empty() {
        return Err(anyhow!(
            "catalog invariant violations:\n- {}",
            errors.join("\n- ")
        ));
    }
    debug!(patterns = patterns.len(), "catalog validated");
    Ok(patterns)
}

/// Load the catalog from `path`, or the built-in catalog when `None`.
pub fn load_catalog(path: Option<&Path>) -> Result<Vec<Pattern>> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("read catalog {}", path.display()))?;
            validate_catalog(&raw).with_context(|| format!("validate catalog {}", path.display()))
        }
        None => validate_catalog(BUILTIN_CATALOG).context("validate built-in catalog"),
    }
}

/// Validate JSON instance against a JSON Schema (Draft 2020-12).
fn validate_schema(instance: &Value, schema: &Value) -> Result<()> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .context("compile catalog schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "catalog schema validation failed:\n- {}",
            messages.join("\n- ")
        ));
    }
    Ok(())
}
