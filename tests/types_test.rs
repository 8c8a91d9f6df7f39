use serde_json::json;
use typelens::types::*;

#[test]
fn test_type_kind_roundtrip() {
    let kinds = vec![
        TypeKind::Class,
        TypeKind::Struct,
        TypeKind::Interface,
        TypeKind::Enum,
        TypeKind::Delegate,
    ];
    for kind in kinds {
        let parsed: TypeKind = serde_json::from_value(json!(kind.as_str())).unwrap();
        assert_eq!(parsed, kind);
    }
    let value_type: TypeKind = serde_json::from_value(json!("valuetype")).unwrap();
    assert_eq!(value_type, TypeKind::Struct);
    assert!(serde_json::from_value::<TypeKind>(json!("module")).is_err());
}

#[test]
fn test_visibility_keywords() {
    assert_eq!(Visibility::ProtectedInternal.as_str(), "protected internal");
    for (raw, expected) in [
        ("family", Visibility::Protected),
        ("assembly", Visibility::Internal),
        ("private_protected", Visibility::PrivateProtected),
        ("protected internal", Visibility::ProtectedInternal),
    ] {
        let parsed: Visibility = serde_json::from_value(json!(raw)).unwrap();
        assert_eq!(parsed, expected, "{raw}");
    }
}

#[test]
fn test_method_signature_rendering() {
    let method: MethodInfo = serde_json::from_value(json!({
        "name": "TryGet",
        "return_type": "bool",
        "is_static": true,
        "generic_parameters": ["T"],
        "parameters": [
            {"name": "key", "type_name": "string"},
            {"name": "value", "type_name": "T", "modifier": "out"},
            {"name": "strict", "type_name": "bool", "default_value": "false"}
        ]
    }))
    .unwrap();
    assert_eq!(
        method.signature(),
        "public static bool TryGet<T>(string key, out T value, bool strict = false)"
    );

    let abstract_method: MethodInfo = serde_json::from_value(json!({
        "name": "Run", "visibility": "protected", "is_abstract": true, "is_virtual": true
    }))
    .unwrap();
    assert_eq!(abstract_method.signature(), "protected abstract void Run()");
}

#[test]
fn test_method_source_not_serialized() {
    let method: MethodInfo =
        serde_json::from_value(json!({"name": "Go", "source": "{ }"})).unwrap();
    assert_eq!(method.source.as_deref(), Some("{ }"));
    let out = serde_json::to_value(&method).unwrap();
    assert!(out.get("source").is_none());
}

#[test]
fn test_type_lookup_helpers() {
    let ty: TypeInfo = serde_json::from_value(json!({
        "full_name": "App.Service",
        "name": "Service",
        "assembly": "App",
        "kind": "interface",
        "properties": [{"name": "Id", "type_name": "int"}],
        "methods": [{"name": "Call"}, {"name": "Stop"}, {"name": "Call", "parameters": [{"name": "x", "type_name": "int"}]}]
    }))
    .unwrap();

    assert!(ty.property("Id").unwrap().can_read);
    assert!(ty.property("id").is_none());
    assert_eq!(ty.overloads("Call").count(), 2);

    let summary = ty.summary();
    assert_eq!(summary.kind, "interface");
    assert_eq!(summary.visibility, "public");
    assert_eq!(summary.assembly, "App");
}
