//! Access to reflected program metadata.
//!
//! The server never owns the metadata; it queries a host-supplied
//! [`MetadataProvider`] that is treated as read-only for the life of the
//! process. [`Catalog`] is the in-memory provider shipped with the binary.

/// JSON-backed in-memory provider.
pub mod catalog;

pub use catalog::Catalog;

use crate::errors::Result;
use crate::types::{AssemblyInfo, TypeInfo};

/// Read-only source of assemblies, types, members and decompiled code.
///
/// Implementations must tolerate concurrent calls from many requests.
pub trait MetadataProvider: Send + Sync {
    /// Enumerates loaded assemblies in load order.
    fn assemblies(&self) -> Result<Vec<AssemblyInfo>>;

    /// Resolves an assembly by name (case-insensitive).
    fn assembly(&self, name: &str) -> Result<Option<AssemblyInfo>>;

    /// Enumerates the types of an assembly in declaration order. Unknown
    /// assemblies yield an empty list.
    fn types(&self, assembly: &str) -> Result<Vec<TypeInfo>>;

    /// Resolves a type by exact full name.
    fn find_type(&self, full_name: &str) -> Result<Option<TypeInfo>>;

    /// Finds every type whose full name contains `partial`, ignoring case,
    /// ordered by assembly load order and then declaration order.
    fn search_types(&self, partial: &str) -> Result<Vec<TypeInfo>>;

    /// Returns decompiled source for a method, `None` if the type or method
    /// does not exist.
    fn decompile(&self, type_full_name: &str, method_name: &str) -> Result<Option<String>>;

    /// Resolves a user-supplied type name: exact full name first, then the
    /// first type whose simple name matches, then the first partial match.
    fn resolve_type(&self, name: &str) -> Result<Option<TypeInfo>> {
        if let Some(found) = self.find_type(name)? {
            return Ok(Some(found));
        }
        let candidates = self.search_types(name)?;
        let by_simple_name = candidates.iter().position(|t| t.name == name);
        Ok(match by_simple_name {
            Some(idx) => candidates.into_iter().nth(idx),
            None => candidates.into_iter().next(),
        })
    }
}
