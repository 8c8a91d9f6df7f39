//! Tool definitions and dispatch.
//!
//! Each tool maps to one query against the [`MetadataProvider`]. Tool
//! definitions include JSON Schema descriptions so that clients can discover
//! available capabilities. Collection-returning tools page their output
//! through [`paginate`]; single-entity tools do not, except for the method
//! list of `get_type_info`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::errors::{Result, TypeLensError};
use crate::graph::PathFinder;
use crate::metadata::MetadataProvider;
use crate::pagination::{paginate, Cursor};
use crate::types::{MethodInfo, TypeInfo, TypeSummary, Visibility};

/// Maximum byte length of a text tool response before truncation.
const MAX_RESPONSE_BYTES: usize = 15_000;

/// A tool definition exposed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// The payload of a `tools/call` response.
///
/// Tool-level failures are reported here with `is_error` set, so the RPC
/// call itself still succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolResult {
    /// A successful plain-text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: false,
        }
    }

    /// A successful result carrying pretty-printed JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::text(serde_json::to_string_pretty(value)?))
    }

    /// An error-flagged result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(message)
        }
    }

    /// Text of the first content block.
    pub fn first_text(&self) -> &str {
        self.content.first().map(|c| c.text.as_str()).unwrap_or("")
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Holds the tool descriptors and executes tools by name.
///
/// Built once at startup; the descriptor list never changes afterwards.
pub struct ToolRegistry {
    provider: Arc<dyn MetadataProvider>,
    definitions: Vec<ToolDefinition>,
    default_page_size: usize,
    default_max_depth: usize,
}

impl ToolRegistry {
    /// Creates a registry backed by `provider`, taking paging and depth
    /// defaults from `config`.
    pub fn new(provider: Arc<dyn MetadataProvider>, config: &ServerConfig) -> Self {
        Self {
            provider,
            definitions: get_tool_definitions(),
            default_page_size: config.default_page_size.max(1),
            default_max_depth: config.default_max_depth,
        }
    }

    /// Returns all tool definitions in their fixed order.
    pub fn list_tools(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }

    /// Executes the named tool.
    ///
    /// Unknown tools and provider faults come back as error-flagged results.
    /// Argument validation failures, invalid cursors and missing entities
    /// are returned as `Err` for the dispatcher to report.
    pub fn execute(&self, name: &str, args: &Value) -> Result<ToolResult> {
        let started = Instant::now();
        let outcome = match name {
            "list_assemblies" => self.list_assemblies(args),
            "get_assembly_info" => self.get_assembly_info(args),
            "list_types" => self.list_types(args),
            "search_types" => self.search_types(args),
            "get_type_info" => self.get_type_info(args),
            "get_method_signature" => self.get_method_signature(args),
            "decompile_method" => self.decompile_method(args),
            "get_property_details" => self.get_property_details(args),
            "find_fields_by_type" => self.find_fields_by_type(args),
            "find_type_path" => self.find_type_path(args),
            _ => {
                warn!(tool = name, "unknown tool");
                return Ok(ToolResult::error(format!("Unknown tool: {}", name)));
            }
        };
        debug!(
            tool = name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "tool executed"
        );

        match outcome {
            Err(e) if e.is_soft() => {
                warn!(tool = name, error = %e, "tool failed");
                Ok(ToolResult::error(format!("Tool '{}' failed: {}", name, e)))
            }
            other => other,
        }
    }

    fn cursor(&self, args: &Value) -> Result<Cursor> {
        let token = match args.get("cursor") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                return Err(TypeLensError::InvalidCursor {
                    reason: "cursor must be a string".to_string(),
                })
            }
        };
        Cursor::decode(token, self.default_page_size)
    }

    fn resolve_type(&self, name: &str) -> Result<TypeInfo> {
        self.provider
            .resolve_type(name)?
            .ok_or_else(|| TypeLensError::not_found("type", name))
    }

    /// Handles `list_assemblies` tool calls.
    fn list_assemblies(&self, args: &Value) -> Result<ToolResult> {
        let cursor = self.cursor(args)?;
        let assemblies = self.provider.assemblies()?;
        ToolResult::json(&paginate(assemblies, cursor))
    }

    /// Handles `get_assembly_info` tool calls.
    fn get_assembly_info(&self, args: &Value) -> Result<ToolResult> {
        let name = require_str(args, "assembly_name")?;
        let info = self
            .provider
            .assembly(name)?
            .ok_or_else(|| TypeLensError::not_found("assembly", name))?;
        let types = self.provider.types(&info.name)?;

        let namespaces: BTreeSet<&str> = types.iter().map(|t| t.namespace.as_str()).collect();
        let mut types_by_kind: BTreeMap<&str, usize> = BTreeMap::new();
        for ty in &types {
            *types_by_kind.entry(ty.kind.as_str()).or_insert(0) += 1;
        }
        let public_type_count = types
            .iter()
            .filter(|t| t.visibility == Visibility::Public)
            .count();

        ToolResult::json(&json!({
            "name": info.name,
            "version": info.version,
            "location": info.location,
            "type_count": info.type_count,
            "public_type_count": public_type_count,
            "namespaces": namespaces,
            "types_by_kind": types_by_kind,
        }))
    }

    /// Handles `list_types` tool calls.
    fn list_types(&self, args: &Value) -> Result<ToolResult> {
        let assembly = require_str(args, "assembly_name")?;
        let namespace = optional_str(args, "namespace")?;
        let cursor = self.cursor(args)?;

        let info = self
            .provider
            .assembly(assembly)?
            .ok_or_else(|| TypeLensError::not_found("assembly", assembly))?;
        let summaries: Vec<TypeSummary> = self
            .provider
            .types(&info.name)?
            .iter()
            .filter(|t| namespace.map_or(true, |ns| t.namespace == ns))
            .map(TypeInfo::summary)
            .collect();

        ToolResult::json(&paginate(summaries, cursor))
    }

    /// Handles `search_types` tool calls.
    fn search_types(&self, args: &Value) -> Result<ToolResult> {
        let query = require_str(args, "query")?;
        let cursor = self.cursor(args)?;
        let matches: Vec<TypeSummary> = self
            .provider
            .search_types(query)?
            .iter()
            .map(TypeInfo::summary)
            .collect();
        ToolResult::json(&paginate(matches, cursor))
    }

    /// Handles `get_type_info` tool calls. Fields and properties are listed
    /// in full; methods are paged.
    fn get_type_info(&self, args: &Value) -> Result<ToolResult> {
        let type_name = require_str(args, "type_name")?;
        let cursor = self.cursor(args)?;
        let ty = self.resolve_type(type_name)?;

        let fields: Vec<Value> = ty
            .fields
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "type": f.type_name,
                    "visibility": f.visibility.as_str(),
                    "is_static": f.is_static,
                    "is_readonly": f.is_readonly,
                })
            })
            .collect();
        let properties: Vec<Value> = ty
            .properties
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "type": p.type_name,
                    "can_read": p.can_read,
                    "can_write": p.can_write,
                    "is_static": p.is_static,
                })
            })
            .collect();
        let methods = paginate(ty.methods.clone(), cursor).map(|m| {
            json!({
                "name": m.name,
                "signature": m.signature(),
                "return_type": m.return_type,
                "is_static": m.is_static,
            })
        });

        ToolResult::json(&json!({
            "full_name": ty.full_name,
            "name": ty.name,
            "namespace": ty.namespace,
            "assembly": ty.assembly,
            "kind": ty.kind.as_str(),
            "visibility": ty.visibility.as_str(),
            "base_type": ty.base_type,
            "interfaces": ty.interfaces,
            "is_abstract": ty.is_abstract,
            "is_sealed": ty.is_sealed,
            "is_static": ty.is_static,
            "fields": fields,
            "properties": properties,
            "methods": methods,
        }))
    }

    /// Handles `get_method_signature` tool calls. Every overload is reported.
    fn get_method_signature(&self, args: &Value) -> Result<ToolResult> {
        let type_name = require_str(args, "type_name")?;
        let method_name = require_str(args, "method_name")?;
        let ty = self.resolve_type(type_name)?;

        let overloads: Vec<Value> = ty.overloads(method_name).map(method_details).collect();
        if overloads.is_empty() {
            return Err(TypeLensError::not_found(
                "method",
                format!("{}.{}", ty.full_name, method_name),
            ));
        }

        ToolResult::json(&json!({
            "declaring_type": ty.full_name,
            "method": method_name,
            "overloads": overloads,
        }))
    }

    /// Handles `decompile_method` tool calls.
    fn decompile_method(&self, args: &Value) -> Result<ToolResult> {
        let type_name = require_str(args, "type_name")?;
        let method_name = require_str(args, "method_name")?;
        let ty = self.resolve_type(type_name)?;
        let qualified = format!("{}.{}", ty.full_name, method_name);

        if ty.overloads(method_name).next().is_none() {
            return Err(TypeLensError::not_found("method", qualified));
        }
        let source = self
            .provider
            .decompile(&ty.full_name, method_name)?
            .ok_or_else(|| TypeLensError::not_found("method", qualified.as_str()))?;

        Ok(ToolResult::text(truncate_response(&format!(
            "// {}\n{}",
            qualified, source
        ))))
    }

    /// Handles `get_property_details` tool calls.
    fn get_property_details(&self, args: &Value) -> Result<ToolResult> {
        let type_name = require_str(args, "type_name")?;
        let property_name = require_str(args, "property_name")?;
        let ty = self.resolve_type(type_name)?;
        let property = ty.property(property_name).ok_or_else(|| {
            TypeLensError::not_found("property", format!("{}.{}", ty.full_name, property_name))
        })?;

        let property_type = self
            .provider
            .find_type(&property.type_name)?
            .map(|t| json!({ "kind": t.kind.as_str(), "assembly": t.assembly }));

        ToolResult::json(&json!({
            "declaring_type": ty.full_name,
            "name": property.name,
            "type": property.type_name,
            "can_read": property.can_read,
            "can_write": property.can_write,
            "is_static": property.is_static,
            "getter_visibility": property.getter_visibility.map(|v| v.as_str()),
            "setter_visibility": property.setter_visibility.map(|v| v.as_str()),
            "type_info": property_type,
        }))
    }

    /// Handles `find_fields_by_type` tool calls.
    fn find_fields_by_type(&self, args: &Value) -> Result<ToolResult> {
        let field_type = require_str(args, "field_type")?;
        let assembly = optional_str(args, "assembly_name")?;
        let cursor = self.cursor(args)?;

        let assemblies = match assembly {
            Some(name) => vec![self
                .provider
                .assembly(name)?
                .ok_or_else(|| TypeLensError::not_found("assembly", name))?],
            None => self.provider.assemblies()?,
        };

        let needle = field_type.to_lowercase();
        let mut matches = Vec::new();
        for info in &assemblies {
            for ty in self.provider.types(&info.name)? {
                for field in &ty.fields {
                    if field.type_name.to_lowercase().contains(&needle) {
                        matches.push(json!({
                            "declaring_type": ty.full_name,
                            "field": field.name,
                            "field_type": field.type_name,
                            "is_static": field.is_static,
                        }));
                    }
                }
            }
        }

        ToolResult::json(&paginate(matches, cursor))
    }

    /// Handles `find_type_path` tool calls.
    ///
    /// `max_depth` is lenient: anything that is not a non-negative number
    /// (or a string holding one) falls back to the default.
    fn find_type_path(&self, args: &Value) -> Result<ToolResult> {
        let start_name = require_str(args, "start_type")?;
        let target_query = require_str(args, "target_type")?;
        let max_depth = lenient_depth(args.get("max_depth"), self.default_max_depth);

        let start = self.resolve_type(start_name)?;
        let targets = self.provider.search_types(target_query)?;
        if targets.is_empty() {
            return Err(TypeLensError::not_found("type", target_query));
        }

        let paths = PathFinder::new(self.provider.as_ref()).find_paths(&start, &targets, max_depth)?;
        if paths.is_empty() {
            return Ok(ToolResult::text(format!(
                "No path found from {} to '{}' within depth {}.",
                start.full_name, target_query, max_depth
            )));
        }

        let rendered: Vec<Value> = paths
            .iter()
            .map(|p| {
                json!({
                    "target": p.target,
                    "path": p.render(),
                    "steps": p.steps,
                    "types": p.types,
                    "depth": p.depth,
                })
            })
            .collect();

        ToolResult::json(&json!({
            "start": start.full_name,
            "target_query": target_query,
            "max_depth": max_depth,
            "path_count": rendered.len(),
            "paths": rendered,
        }))
    }
}

/// Returns the list of all tool definitions exposed by this server.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_assemblies".to_string(),
            description: "List loaded assemblies with their version and type count.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "cursor": cursor_schema() }
            }),
        },
        ToolDefinition {
            name: "get_assembly_info".to_string(),
            description: "Describe one assembly: version, location, namespaces and type counts by kind.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "assembly_name": {
                        "type": "string",
                        "description": "Assembly name, case-insensitive"
                    }
                },
                "required": ["assembly_name"]
            }),
        },
        ToolDefinition {
            name: "list_types".to_string(),
            description: "List the types declared in an assembly, optionally restricted to one namespace.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "assembly_name": {
                        "type": "string",
                        "description": "Assembly name, case-insensitive"
                    },
                    "namespace": {
                        "type": "string",
                        "description": "Exact namespace to filter on"
                    },
                    "cursor": cursor_schema()
                },
                "required": ["assembly_name"]
            }),
        },
        ToolDefinition {
            name: "search_types".to_string(),
            description: "Search all assemblies for types whose full name contains the query (case-insensitive).".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Substring to match against full type names"
                    },
                    "cursor": cursor_schema()
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "get_type_info".to_string(),
            description: "Describe a type: kind, base type, interfaces, fields, properties and a page of methods.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "type_name": {
                        "type": "string",
                        "description": "Full or simple type name"
                    },
                    "cursor": cursor_schema()
                },
                "required": ["type_name"]
            }),
        },
        ToolDefinition {
            name: "get_method_signature".to_string(),
            description: "Show the signatures of every overload of a method.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "type_name": {
                        "type": "string",
                        "description": "Full or simple name of the declaring type"
                    },
                    "method_name": {
                        "type": "string",
                        "description": "Method name"
                    }
                },
                "required": ["type_name", "method_name"]
            }),
        },
        ToolDefinition {
            name: "decompile_method".to_string(),
            description: "Return decompiled source for a method.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "type_name": {
                        "type": "string",
                        "description": "Full or simple name of the declaring type"
                    },
                    "method_name": {
                        "type": "string",
                        "description": "Method name; the first overload is decompiled"
                    }
                },
                "required": ["type_name", "method_name"]
            }),
        },
        ToolDefinition {
            name: "get_property_details".to_string(),
            description: "Describe a property: type, accessors and accessor visibility.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "type_name": {
                        "type": "string",
                        "description": "Full or simple name of the declaring type"
                    },
                    "property_name": {
                        "type": "string",
                        "description": "Property name"
                    }
                },
                "required": ["type_name", "property_name"]
            }),
        },
        ToolDefinition {
            name: "find_fields_by_type".to_string(),
            description: "Find fields whose declared type contains the given name (case-insensitive).".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "field_type": {
                        "type": "string",
                        "description": "Substring of the field type name"
                    },
                    "assembly_name": {
                        "type": "string",
                        "description": "Restrict the search to one assembly"
                    },
                    "cursor": cursor_schema()
                },
                "required": ["field_type"]
            }),
        },
        ToolDefinition {
            name: "find_type_path".to_string(),
            description: "Find how a type is reachable from another through properties and fields (shortest path per matching target).".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "start_type": {
                        "type": "string",
                        "description": "Full or simple name of the type to start from"
                    },
                    "target_type": {
                        "type": "string",
                        "description": "Target type name; every type containing it is searched"
                    },
                    "max_depth": {
                        "type": "number",
                        "description": "Maximum number of member hops (default: 5)"
                    }
                },
                "required": ["start_type", "target_type"]
            }),
        },
    ]
}

fn cursor_schema() -> Value {
    json!({
        "type": "string",
        "description": "Opaque cursor from a previous response's nextCursor"
    })
}

/// Extracts a required, non-empty string argument.
fn require_str<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    match args.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        None | Some(Value::Null) | Some(Value::String(_)) => Err(TypeLensError::missing(name)),
        Some(_) => Err(TypeLensError::InvalidArgument {
            name: name.to_string(),
            message: "expected a string".to_string(),
        }),
    }
}

/// Extracts an optional string argument; empty strings count as absent.
fn optional_str<'a>(args: &'a Value, name: &str) -> Result<Option<&'a str>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(TypeLensError::InvalidArgument {
            name: name.to_string(),
            message: "expected a string".to_string(),
        }),
    }
}

/// Reads a depth argument, falling back to `default` for anything that is
/// not a non-negative integer or a string holding one.
fn lenient_depth(value: Option<&Value>, default: usize) -> usize {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .map(|d| d as usize)
            .unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse::<usize>().unwrap_or(default),
        _ => default,
    }
}

fn method_details(method: &MethodInfo) -> Value {
    let parameters: Vec<Value> = method
        .parameters
        .iter()
        .map(|p| {
            json!({
                "name": p.name,
                "type": p.type_name,
                "modifier": p.modifier,
                "default_value": p.default_value,
            })
        })
        .collect();
    json!({
        "signature": method.signature(),
        "return_type": method.return_type,
        "parameters": parameters,
        "generic_parameters": method.generic_parameters,
        "visibility": method.visibility.as_str(),
        "is_static": method.is_static,
        "is_virtual": method.is_virtual,
        "is_abstract": method.is_abstract,
    })
}

/// Truncates a string to [`MAX_RESPONSE_BYTES`], cutting at a character
/// boundary and appending a notice with the kept byte count.
fn truncate_response(s: &str) -> String {
    if s.len() <= MAX_RESPONSE_BYTES {
        s.to_string()
    } else {
        // Back off to a UTF-8 boundary at or before the limit
        let mut end = MAX_RESPONSE_BYTES;
        while !s.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}\n\n[... truncated at {} bytes]", &s[..end], end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definitions_have_schemas() {
        let tools = get_tool_definitions();
        assert_eq!(tools.len(), 10);
        for tool in &tools {
            assert!(!tool.description.is_empty());
            assert_eq!(tool.input_schema["type"], "object");
        }
    }

    #[test]
    fn test_tool_names_unique() {
        let tools = get_tool_definitions();
        let names: BTreeSet<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn test_require_str() {
        let args = json!({"a": "x", "b": "  ", "c": 3});
        assert_eq!(require_str(&args, "a").unwrap(), "x");
        assert!(matches!(
            require_str(&args, "b"),
            Err(TypeLensError::MissingArgument { .. })
        ));
        assert!(matches!(
            require_str(&args, "c"),
            Err(TypeLensError::InvalidArgument { .. })
        ));
        assert!(matches!(
            require_str(&args, "zzz"),
            Err(TypeLensError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_lenient_depth() {
        assert_eq!(lenient_depth(None, 5), 5);
        assert_eq!(lenient_depth(Some(&json!(2)), 5), 2);
        assert_eq!(lenient_depth(Some(&json!(3.0)), 5), 3);
        assert_eq!(lenient_depth(Some(&json!("4")), 5), 4);
        assert_eq!(lenient_depth(Some(&json!("deep")), 5), 5);
        assert_eq!(lenient_depth(Some(&json!(-1)), 5), 5);
        assert_eq!(lenient_depth(Some(&json!(true)), 5), 5);
    }

    #[test]
    fn test_truncate_long_response() {
        let long = "x".repeat(20_000);
        let result = truncate_response(&long);
        assert!(result.len() < 20_000);
        assert!(result.contains("[... truncated at 15000 bytes]"));
    }

    #[test]
    fn test_truncate_counts_bytes_not_chars() {
        // 3 bytes per char; 15000 is a boundary, so exactly 5000 chars survive
        let long = "\u{20ac}".repeat(6_000);
        let result = truncate_response(&long);
        assert!(result.ends_with("[... truncated at 15000 bytes]"));
        assert_eq!(result.chars().filter(|c| *c == '\u{20ac}').count(), 5_000);

        let offset = format!("a{}", "\u{20ac}".repeat(6_000));
        let result = truncate_response(&offset);
        assert!(result.ends_with("[... truncated at 14998 bytes]"));
    }

    #[test]
    fn test_error_result_serializes_flag() {
        let json = serde_json::to_value(ToolResult::error("nope")).unwrap();
        assert_eq!(json["isError"], true);
        let json = serde_json::to_value(ToolResult::text("fine")).unwrap();
        assert!(json.get("isError").is_none());
    }
}
