//! Identifier renaming
//!
//! Other tables refer to names only by position in the identifier pool, so
//! renaming touches nothing but the pool itself.

use crate::identifier::Identifier;
use crate::module::Module;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Identifier renaming errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameError {
    /// Proposed name violates the identifier grammar
    #[error("Invalid identifier {new:?} (renaming {old:?})")]
    InvalidIdentifier {
        /// Name being replaced
        old: String,
        /// Rejected replacement
        new: String,
    },

    /// Rename would leave two identical entries in the pool
    #[error("Renaming produces duplicate identifier {0:?}")]
    DuplicateIdentifier(String),
}

/// Rename identifiers according to `mapping`, returning the renamed module
///
/// Every replacement is validated before anything changes. Keys are matched
/// against the original pool, so a mapping may swap two names. Keys that do
/// not occur in the pool are ignored.
pub fn rename_identifiers<I, K, V>(module: &Module, mapping: I) -> Result<Module, RenameError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut renames: HashMap<String, Identifier> = HashMap::new();
    for (old, new) in mapping {
        let (old, new) = (old.as_ref(), new.as_ref());
        let ident = Identifier::new(new).map_err(|_| RenameError::InvalidIdentifier {
            old: old.to_string(),
            new: new.to_string(),
        })?;
        renames.insert(old.to_string(), ident);
    }

    let mut renamed = module.clone();
    let mut applied = HashSet::new();
    for slot in renamed.identifiers.iter_mut() {
        if let Some((old, new)) = renames.get_key_value(slot.as_str()) {
            debug!(from = %old, to = %new, "renaming identifier");
            applied.insert(old.as_str());
            *slot = new.clone();
        }
    }
    for old in renames.keys().filter(|old| !applied.contains(old.as_str())) {
        debug!(identifier = %old, "identifier not present, skipping rename");
    }

    let mut seen = HashSet::with_capacity(renamed.identifiers.len());
    for ident in &renamed.identifiers {
        if !seen.insert(ident.as_str()) {
            return Err(RenameError::DuplicateIdentifier(ident.to_string()));
        }
    }

    Ok(renamed)
}
