use serde::{Deserialize, Serialize};

/// Kinds of reflected types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    #[serde(alias = "valuetype")]
    Struct,
    Interface,
    Enum,
    Delegate,
}

impl TypeKind {
    /// Returns the string representation of this type kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Struct => "struct",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
            TypeKind::Delegate => "delegate",
        }
    }
}

/// Accessibility of a type or member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    #[serde(alias = "assembly")]
    Internal,
    #[serde(alias = "family")]
    Protected,
    #[serde(alias = "protected internal")]
    ProtectedInternal,
    #[serde(alias = "private protected")]
    PrivateProtected,
    Private,
}

impl Visibility {
    /// Returns the keyword form used when rendering signatures.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Protected => "protected",
            Self::ProtectedInternal => "protected internal",
            Self::PrivateProtected => "private protected",
            Self::Private => "private",
        }
    }
}

/// Summary of a loaded assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyInfo {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub type_count: usize,
}

/// A reflected type together with its declared members, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub full_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    /// Owning assembly; filled in by the provider when loading.
    #[serde(default)]
    pub assembly: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub base_type: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_sealed: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    #[serde(default)]
    pub properties: Vec<PropertyInfo>,
    #[serde(default)]
    pub methods: Vec<MethodInfo>,
}

impl TypeInfo {
    /// Returns the listing view of this type.
    pub fn summary(&self) -> TypeSummary {
        TypeSummary {
            full_name: self.full_name.clone(),
            kind: self.kind.as_str().to_string(),
            visibility: self.visibility.as_str().to_string(),
            assembly: self.assembly.clone(),
        }
    }

    /// Looks up a property by exact name.
    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Returns every overload of the named method, in declaration order.
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodInfo> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }
}

/// The compact row used by type listings and searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub full_name: String,
    pub kind: String,
    pub visibility: String,
    pub assembly: String,
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_readonly: bool,
}

/// A declared property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    pub type_name: String,
    #[serde(default = "default_true")]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub getter_visibility: Option<Visibility>,
    #[serde(default)]
    pub setter_visibility: Option<Visibility>,
}

/// A declared method. `source` holds decompiled text when the provider has it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    #[serde(default = "default_void")]
    pub return_type: String,
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
    #[serde(default)]
    pub generic_parameters: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default, skip_serializing)]
    pub source: Option<String>,
}

impl MethodInfo {
    /// Renders a C#-style declaration, e.g.
    /// `public static bool TryParse(string text, out int value)`.
    pub fn signature(&self) -> String {
        let mut out = String::from(self.visibility.as_str());
        if self.is_static {
            out.push_str(" static");
        }
        if self.is_abstract {
            out.push_str(" abstract");
        } else if self.is_virtual {
            out.push_str(" virtual");
        }
        out.push(' ');
        out.push_str(&self.return_type);
        out.push(' ');
        out.push_str(&self.name);
        if !self.generic_parameters.is_empty() {
            out.push('<');
            out.push_str(&self.generic_parameters.join(", "));
            out.push('>');
        }
        let params: Vec<String> = self.parameters.iter().map(ParameterInfo::render).collect();
        out.push('(');
        out.push_str(&params.join(", "));
        out.push(')');
        out
    }
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    pub type_name: String,
    /// `ref`, `out`, `in` or `params`.
    #[serde(default)]
    pub modifier: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ParameterInfo {
    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(modifier) = &self.modifier {
            out.push_str(modifier);
            out.push(' ');
        }
        out.push_str(&self.type_name);
        out.push(' ');
        out.push_str(&self.name);
        if let Some(default) = &self.default_value {
            out.push_str(" = ");
            out.push_str(default);
        }
        out
    }
}

fn default_true() -> bool {
    true
}

fn default_void() -> String {
    "void".to_string()
}
