use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::errors::Result;
use crate::metadata::MetadataProvider;
use crate::types::TypeInfo;

/// A chain of member references leading from a start type to a target type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypePath {
    /// Full name of the start type.
    pub start: String,
    /// Full name of the type that was reached.
    pub target: String,
    /// The start type's simple name followed by each traversed member name.
    pub steps: Vec<String>,
    /// Full names of the types visited along the path, start included.
    pub types: Vec<String>,
    /// Number of member edges traversed (`steps.len() - 1`).
    pub depth: usize,
}

impl TypePath {
    /// Renders the path as `Player -> Inventory -> items`.
    pub fn render(&self) -> String {
        self.steps.join(" -> ")
    }
}

/// A node waiting in the BFS queue, carrying the full route from the root.
struct Frontier {
    type_name: String,
    steps: Vec<String>,
    types: Vec<String>,
}

/// Searches the member-reference graph exposed by a [`MetadataProvider`].
///
/// An edge `A -> B` exists when `A` declares a property or field whose
/// declared type is `B`. Properties are explored before fields, each in
/// declaration order, so equally short paths always resolve the same way.
pub struct PathFinder<'a> {
    provider: &'a dyn MetadataProvider,
}

impl<'a> PathFinder<'a> {
    /// Creates a new `PathFinder` backed by the given provider.
    pub fn new(provider: &'a dyn MetadataProvider) -> Self {
        Self { provider }
    }

    /// Finds the shortest member path from `start` to the type named
    /// `target` (exact full name), using at most `max_depth` edges.
    ///
    /// Returns `Ok(None)` when the target is unreachable within the bound.
    /// The visited set and queue live only for this call.
    pub fn find_path(
        &self,
        start: &TypeInfo,
        target: &str,
        max_depth: usize,
    ) -> Result<Option<TypePath>> {
        let max_len = max_depth.saturating_add(1);

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<Frontier> = VecDeque::new();

        visited.insert(start.full_name.clone());
        queue.push_back(Frontier {
            type_name: start.full_name.clone(),
            steps: vec![start.name.clone()],
            types: vec![start.full_name.clone()],
        });

        while let Some(current) = queue.pop_front() {
            if current.type_name == target {
                return Ok(Some(TypePath {
                    start: start.full_name.clone(),
                    target: current.type_name,
                    depth: current.steps.len() - 1,
                    steps: current.steps,
                    types: current.types,
                }));
            }

            // Children would be longer than max_depth + 1 steps.
            if current.steps.len() >= max_len {
                continue;
            }

            let Some(ty) = self.provider.find_type(&current.type_name)? else {
                continue;
            };

            for (member, member_type) in member_edges(&ty) {
                if !visited.insert(member_type.to_string()) {
                    continue;
                }
                let mut steps = current.steps.clone();
                steps.push(member.to_string());
                let mut types = current.types.clone();
                types.push(member_type.to_string());
                queue.push_back(Frontier {
                    type_name: member_type.to_string(),
                    steps,
                    types,
                });
            }
        }

        Ok(None)
    }

    /// Runs one independent bounded search per target and returns the paths
    /// that were found, in target order. Unreachable targets are left out.
    pub fn find_paths(
        &self,
        start: &TypeInfo,
        targets: &[TypeInfo],
        max_depth: usize,
    ) -> Result<Vec<TypePath>> {
        let mut paths = Vec::new();
        for target in targets {
            if let Some(path) = self.find_path(start, &target.full_name, max_depth)? {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

/// Outgoing edges of a type as `(member name, declared type)`: properties
/// first, then fields.
fn member_edges(ty: &TypeInfo) -> impl Iterator<Item = (&str, &str)> {
    ty.properties
        .iter()
        .map(|p| (p.name.as_str(), p.type_name.as_str()))
        .chain(
            ty.fields
                .iter()
                .map(|f| (f.name.as_str(), f.type_name.as_str())),
        )
}
