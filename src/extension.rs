//! # **Extension Module** - *Process-wide Extension-type Registry*
//!
//! Label-based mechanism to round-trip user-defined logical types on top of
//! physical Arrow types.
//!
//! ## Behaviour
//! - A registered extension binds a name to its physical `ArrowType` (and
//!   an optional parameter blob). On write, labelled fields carry the
//!   `ARROW:extension:*` metadata keys; on read, labels are validated
//!   against the registry.
//! - Registration is idempotent on `(name, physical_type)`; re-registering
//!   a name with a different physical type fails with `SchemaConflict`.
//! - Unknown labels are **not** errors: the field degrades to its physical
//!   type and a warning is emitted once per `(name, physical_type)` pair.
//!
//! The registry is read-mostly: an `RwLock` guards the map, matching the
//! shared-resource policy of the IPC layer.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, OnceLock, RwLock};

use crate::Array;
use crate::enums::arrow_type::ArrowType;
use crate::enums::error::{MinstreamError, Result};

/// Representation swap applied when a labelled column crosses the IPC
/// boundary.
pub type ExtensionCast = fn(&Array) -> Array;

/// A registered extension type.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    /// The physical layout the extension overlays.
    pub physical: ArrowType,
    /// Opaque per-extension parameter blob, serialized under
    /// `ARROW:extension:metadata`.
    pub metadata: Option<String>,
    /// Applied by the reader after reconstructing a labelled column.
    pub decode: Option<ExtensionCast>,
    /// Applied by the writer before serializing a labelled column.
    pub encode: Option<ExtensionCast>,
}

fn registry() -> &'static RwLock<HashMap<String, Extension>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Extension>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn warned() -> &'static Mutex<HashSet<(String, String)>> {
    static WARNED: OnceLock<Mutex<HashSet<(String, String)>>> = OnceLock::new();
    WARNED.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Registers `name` as an extension over `physical`.
///
/// Idempotent for an identical physical type; conflicting re-registration
/// returns `SchemaConflict`.
pub fn register_extension(
    name: &str,
    physical: ArrowType,
    metadata: Option<String>,
) -> Result<()> {
    register_extension_with(name, physical, metadata, None, None)
}

/// Registers `name` with representation-swap hooks: `decode` runs on read
/// after the physical column is reconstructed, `encode` on write before
/// serialization. Idempotence and conflict rules match
/// [`register_extension`].
pub fn register_extension_with(
    name: &str,
    physical: ArrowType,
    metadata: Option<String>,
    decode: Option<ExtensionCast>,
    encode: Option<ExtensionCast>,
) -> Result<()> {
    let mut map = registry().write().expect("extension registry poisoned");
    if let Some(existing) = map.get(name) {
        if existing.physical != physical {
            return Err(MinstreamError::SchemaConflict {
                name: name.to_string(),
                message: format!(
                    "already registered with physical type {}, re-registration uses {}",
                    existing.physical, physical
                ),
            });
        }
        return Ok(());
    }
    map.insert(
        name.to_string(),
        Extension {
            physical,
            metadata,
            decode,
            encode,
        },
    );
    Ok(())
}

/// Looks up a registered extension by name.
pub fn lookup_extension(name: &str) -> Option<Extension> {
    registry()
        .read()
        .expect("extension registry poisoned")
        .get(name)
        .cloned()
}

/// Called by the reader when a labelled field arrives. Validates the
/// physical type for known labels; emits a deduplicated warning for unknown
/// ones and lets the field degrade to its physical type.
pub fn resolve_extension(name: &str, physical: &ArrowType) -> Result<()> {
    match lookup_extension(name) {
        Some(ext) => {
            if !ext.physical.equivalent(physical) {
                return Err(MinstreamError::SchemaConflict {
                    name: name.to_string(),
                    message: format!(
                        "stream carries physical type {}, registry expects {}",
                        physical, ext.physical
                    ),
                });
            }
            Ok(())
        }
        None => {
            let key = (name.to_string(), physical.to_string());
            let mut seen = warned().lock().expect("extension warn set poisoned");
            if seen.insert(key) {
                log::warn!(
                    "unknown extension type '{name}' over {physical}; reading as the physical type"
                );
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_idempotent_and_conflict() {
        register_extension("test.point", ArrowType::FixedSizeBinary(8), None).unwrap();
        // idempotent
        register_extension("test.point", ArrowType::FixedSizeBinary(8), None).unwrap();
        // conflicting physical type
        let err = register_extension("test.point", ArrowType::Int64, None).unwrap_err();
        assert!(matches!(err, MinstreamError::SchemaConflict { .. }));
    }

    #[test]
    fn test_resolve_unknown_degrades() {
        // unknown labels resolve fine (with a one-shot warning)
        resolve_extension("test.unknown", &ArrowType::Int32).unwrap();
        resolve_extension("test.unknown", &ArrowType::Int32).unwrap();
    }

    #[test]
    fn test_resolve_known_checks_physical() {
        register_extension("test.uuid", ArrowType::FixedSizeBinary(16), None).unwrap();
        resolve_extension("test.uuid", &ArrowType::FixedSizeBinary(16)).unwrap();
        assert!(resolve_extension("test.uuid", &ArrowType::Int64).is_err());
    }
}
