//! Named documentation resources served through `resources/list` and
//! `resources/read`.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::logging::LogBuffer;

/// URI of the recent-log resource.
pub const LOGS_URI: &str = "typelens://logs/recent";

/// A resource advertised by `resources/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// The body of a resource returned by `resources/read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceContents {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: String,
}

/// Source of readable resources.
pub trait ResourceProvider: Send + Sync {
    /// Lists every available resource.
    fn list(&self) -> Result<Vec<ResourceDescriptor>>;

    /// Reads a resource by URI; `None` if no such resource exists.
    fn read(&self, uri: &str) -> Result<Option<ResourceContents>>;
}

struct StaticDoc {
    uri: &'static str,
    name: &'static str,
    description: &'static str,
    text: &'static str,
}

const DOCS: &[StaticDoc] = &[
    StaticDoc {
        uri: "typelens://docs/overview",
        name: "Overview",
        description: "What the server exposes and how to call it",
        text: OVERVIEW,
    },
    StaticDoc {
        uri: "typelens://docs/pagination",
        name: "Pagination",
        description: "How cursors and pages work",
        text: PAGINATION,
    },
    StaticDoc {
        uri: "typelens://docs/path-finding",
        name: "Path finding",
        description: "How find_type_path searches the member graph",
        text: PATH_FINDING,
    },
];

/// Built-in markdown documentation, plus the recent log lines when a
/// [`LogBuffer`] is attached.
#[derive(Default)]
pub struct StaticResources {
    logs: Option<LogBuffer>,
}

impl StaticResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also serve the contents of `buffer` at [`LOGS_URI`].
    pub fn with_logs(buffer: LogBuffer) -> Self {
        Self { logs: Some(buffer) }
    }
}

impl ResourceProvider for StaticResources {
    fn list(&self) -> Result<Vec<ResourceDescriptor>> {
        let mut resources: Vec<ResourceDescriptor> = DOCS
            .iter()
            .map(|doc| ResourceDescriptor {
                uri: doc.uri.to_string(),
                name: doc.name.to_string(),
                description: doc.description.to_string(),
                mime_type: "text/markdown".to_string(),
            })
            .collect();
        if self.logs.is_some() {
            resources.push(ResourceDescriptor {
                uri: LOGS_URI.to_string(),
                name: "Recent logs".to_string(),
                description: "The most recent server log lines, oldest first".to_string(),
                mime_type: "text/plain".to_string(),
            });
        }
        Ok(resources)
    }

    fn read(&self, uri: &str) -> Result<Option<ResourceContents>> {
        if let Some(doc) = DOCS.iter().find(|d| d.uri == uri) {
            return Ok(Some(ResourceContents {
                uri: uri.to_string(),
                mime_type: "text/markdown".to_string(),
                text: doc.text.to_string(),
            }));
        }
        match &self.logs {
            Some(buffer) if uri == LOGS_URI => Ok(Some(ResourceContents {
                uri: uri.to_string(),
                mime_type: "text/plain".to_string(),
                text: buffer.snapshot().join("\n"),
            })),
            _ => Ok(None),
        }
    }
}

const OVERVIEW: &str = "# TypeLens

TypeLens answers questions about reflected type metadata over JSON-RPC 2.0.

- `tools/list` returns the available tools and their input schemas.
- `tools/call` runs a tool: `{\"name\": \"search_types\", \"arguments\": {\"query\": \"Player\"}}`.
- Tool failures (unknown tool, provider faults) come back as results with `isError: true`.
- Missing arguments, unknown types and invalid cursors are JSON-RPC errors (-32603).
";

const PAGINATION: &str = "# Pagination

Listing tools return `{items, total_count, returned_count, nextCursor}`.

- Omit `cursor` to get the first page.
- Pass `nextCursor` back unchanged as `cursor` to get the next page.
- `nextCursor` is absent on the last page.
- Cursors are opaque. Edited or hand-built cursors are rejected.
- In `get_type_info` only the method list is paged.
";

const PATH_FINDING: &str = "# Path finding

`find_type_path` looks for the shortest chain of properties and fields leading
from `start_type` to every type whose name contains `target_type`.

- Properties are followed before fields, in declaration order.
- `max_depth` bounds the number of member hops (default 5). Values that are
  not numbers fall back to the default.
- Each target is searched independently.
- When no target is reachable the result is a plain message, not an error.
";
