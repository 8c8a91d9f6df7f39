use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::MetadataProvider;
use crate::errors::{Result, TypeLensError};
use crate::types::{AssemblyInfo, TypeInfo};

/// On-disk shape of a catalog document.
#[derive(Debug, Default, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    assemblies: Vec<CatalogAssembly>,
}

#[derive(Debug, Deserialize)]
struct CatalogAssembly {
    name: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    types: Vec<TypeInfo>,
}

impl CatalogAssembly {
    fn info(&self) -> AssemblyInfo {
        AssemblyInfo {
            name: self.name.clone(),
            version: self.version.clone(),
            location: self.location.clone(),
            type_count: self.types.len(),
        }
    }
}

/// An immutable snapshot of reflected metadata loaded from JSON.
///
/// ```json
/// { "assemblies": [ { "name": "Game.Core", "version": "1.0.0.0",
///     "types": [ { "full_name": "Game.Core.Player",
///                  "properties": [ { "name": "Inventory", "type_name": "Game.Core.Inventory" } ],
///                  "fields": [], "methods": [] } ] } ] }
/// ```
///
/// `name` and `namespace` of a type are derived from `full_name` when omitted.
#[derive(Debug, Default)]
pub struct Catalog {
    assemblies: Vec<CatalogAssembly>,
    /// full name -> (assembly index, type index)
    index: HashMap<String, (usize, usize)>,
}

impl Catalog {
    /// A catalog with no assemblies.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a catalog document.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: CatalogDocument =
            serde_json::from_str(json).map_err(|e| TypeLensError::Metadata {
                message: format!("failed to parse catalog: {}", e),
            })?;
        Ok(Self::build(doc))
    }

    /// Loads a catalog document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| TypeLensError::Metadata {
            message: format!("failed to read catalog '{}': {}", path.display(), e),
        })?;
        let catalog = Self::from_json(&contents)?;
        debug!(
            path = %path.display(),
            assemblies = catalog.assemblies.len(),
            types = catalog.index.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    fn build(mut doc: CatalogDocument) -> Self {
        let mut seen = HashSet::new();
        for assembly in doc.assemblies.iter_mut() {
            let assembly_name = assembly.name.clone();
            assembly.types.retain_mut(|ty| {
                ty.assembly = assembly_name.clone();
                fill_names(ty);
                if seen.insert(ty.full_name.clone()) {
                    return true;
                }
                warn!(
                    type_name = %ty.full_name,
                    assembly = %assembly_name,
                    "duplicate type in catalog; keeping the first definition"
                );
                false
            });
        }

        let mut index = HashMap::new();
        for (a_idx, assembly) in doc.assemblies.iter().enumerate() {
            for (t_idx, ty) in assembly.types.iter().enumerate() {
                index.insert(ty.full_name.clone(), (a_idx, t_idx));
            }
        }
        Self {
            assemblies: doc.assemblies,
            index,
        }
    }

    fn type_ref(&self, full_name: &str) -> Option<&TypeInfo> {
        let (a_idx, t_idx) = *self.index.get(full_name)?;
        self.assemblies.get(a_idx)?.types.get(t_idx)
    }
}

impl MetadataProvider for Catalog {
    fn assemblies(&self) -> Result<Vec<AssemblyInfo>> {
        Ok(self.assemblies.iter().map(CatalogAssembly::info).collect())
    }

    fn assembly(&self, name: &str) -> Result<Option<AssemblyInfo>> {
        Ok(self
            .assemblies
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(CatalogAssembly::info))
    }

    fn types(&self, assembly: &str) -> Result<Vec<TypeInfo>> {
        Ok(self
            .assemblies
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(assembly))
            .map(|a| a.types.clone())
            .unwrap_or_default())
    }

    fn find_type(&self, full_name: &str) -> Result<Option<TypeInfo>> {
        Ok(self.type_ref(full_name).cloned())
    }

    fn search_types(&self, partial: &str) -> Result<Vec<TypeInfo>> {
        let needle = partial.to_lowercase();
        Ok(self
            .assemblies
            .iter()
            .flat_map(|a| a.types.iter())
            .filter(|t| t.full_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    fn decompile(&self, type_full_name: &str, method_name: &str) -> Result<Option<String>> {
        let Some(ty) = self.type_ref(type_full_name) else {
            return Ok(None);
        };
        let Some(method) = ty.overloads(method_name).next() else {
            return Ok(None);
        };
        match &method.source {
            Some(source) => Ok(Some(source.clone())),
            None => Err(TypeLensError::Metadata {
                message: format!(
                    "no decompiled source available for {}.{}",
                    type_full_name, method_name
                ),
            }),
        }
    }
}

/// Derives `name` and `namespace` from `full_name` where the document left them out.
fn fill_names(ty: &mut TypeInfo) {
    let (namespace, simple) = match ty.full_name.rfind('.') {
        Some(pos) => (
            ty.full_name[..pos].to_string(),
            ty.full_name[pos + 1..].to_string(),
        ),
        None => (String::new(), ty.full_name.clone()),
    };
    if ty.name.is_empty() {
        ty.name = simple;
    }
    if ty.namespace.is_empty() {
        ty.namespace = namespace;
    }
}

fn default_version() -> String {
    "0.0.0.0".to_string()
}
