//! Patch plan parsing (TOML)
//!
//! A plan lists identifier renames and constant swaps to apply to one
//! template module:
//!
//! ```toml
//! [renames]
//! TEMPLATE = "MCN"
//! template = "mcn"
//!
//! [[constants]]
//! type = "U8"
//! expected = "06"
//! new = "03"
//! ```

use movetpl_bytecode::{is_valid_identifier, ConstantType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a plan
#[derive(Debug, Error)]
pub enum PlanError {
    /// Failed to read plan file
    #[error("Failed to read plan file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse plan: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid plan: {0}")]
    ValidationError(String),
}

/// Renames and constant patches for one module
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PatchPlan {
    /// Identifier renames, old name to new name
    #[serde(default)]
    pub renames: BTreeMap<String, String>,

    /// Constant swaps, applied in order after the renames
    #[serde(default)]
    pub constants: Vec<ConstantPatch>,
}

/// One constant compare-and-swap
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConstantPatch {
    /// Constant type, such as `U8` or `Vector(U8)`
    #[serde(rename = "type")]
    pub type_tag: String,

    /// Current value bytes, hex encoded
    #[serde(with = "hex::serde")]
    pub expected: Vec<u8>,

    /// Replacement value bytes, hex encoded
    #[serde(with = "hex::serde")]
    pub new: Vec<u8>,
}

impl ConstantPatch {
    /// Parsed type tag
    pub fn constant_type(&self) -> Result<ConstantType, PlanError> {
        self.type_tag
            .parse::<ConstantType>()
            .map_err(|e| PlanError::ValidationError(e.to_string()))
    }
}

impl PatchPlan {
    /// Load a plan from a file
    pub fn from_file(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a plan from a string
    pub fn from_str(content: &str) -> Result<Self, PlanError> {
        let plan: PatchPlan = toml::from_str(content)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Validate the plan
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.renames.is_empty() && self.constants.is_empty() {
            return Err(PlanError::ValidationError(
                "Plan has no renames and no constant patches".to_string(),
            ));
        }

        for (old, new) in &self.renames {
            if !is_valid_identifier(old) || !is_valid_identifier(new) {
                return Err(PlanError::ValidationError(format!(
                    "Invalid rename {old} -> {new}. Identifiers start with a letter or '_' and contain only letters, digits and '_'"
                )));
            }
        }

        for (index, patch) in self.constants.iter().enumerate() {
            let constant_type = patch.constant_type()?;
            constant_type.check_value(&patch.new).map_err(|e| {
                PlanError::ValidationError(format!("Constant patch {index}: {e}"))
            })?;
        }

        Ok(())
    }
}
