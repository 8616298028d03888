//! Protocol definition rendering module.
//!
//! This module turns a [`ReflectionNode`] tree into a proto3 document.
//!
//! ## Layout
//!
//! The document starts with the syntax declaration, an optional import of
//! the empty type, and the package statement. The root's `nested` entries
//! follow in declaration order; the entry named after the package is a
//! namespace and its children are written at the top level.
//!
//! ## Extensibility
//!
//! The [`ProtoWriter`] trait visits the same entities in the same order
//! without producing text, e.g. for statistics.

mod writer;

use crate::reflection::{
    Cardinality, EnumNode, FieldSpec, MessageNode, OneofSpec, ReflectionNode, Reserved,
    ServiceNode,
};
use crate::MAX_FIELD_NUMBER;
use std::fmt::Write as FmtWrite;
use tracing::trace;

pub use writer::{walk, ProtoWriter, StatsWriter};

/// Configuration for document rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Indentation string (default: 2 spaces)
    pub indent_str: String,
    /// Type substituted for an absent request or response type
    pub empty_type: String,
    /// Import emitted when `empty_type` is used
    pub empty_import: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent_str: "  ".to_string(),
            empty_type: "google.protobuf.Empty".to_string(),
            empty_import: Some("google/protobuf/empty.proto".to_string()),
        }
    }
}

impl RenderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    /// Sets the substitute for absent method types and the import it needs
    pub fn empty_type(mut self, name: impl Into<String>, import: Option<String>) -> Self {
        self.empty_type = name.into();
        self.empty_import = import;
        self
    }
}

/// Renders reflection trees into proto3 documents
#[derive(Debug, Clone, Default)]
pub struct ProtoRenderer {
    config: RenderConfig,
}

impl ProtoRenderer {
    /// Creates a renderer with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer with a custom configuration
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render the tree rooted at `root` as a document for `package`
    pub fn render(&self, root: &ReflectionNode, package: &str) -> String {
        let mut output = String::new();
        self.write_to(root, package, &mut output)
            .expect("String write cannot fail");
        output
    }

    /// Write the rendered document to a writer
    pub fn write_to(
        &self,
        root: &ReflectionNode,
        package: &str,
        w: &mut impl FmtWrite,
    ) -> std::fmt::Result {
        let mut body = String::new();
        let mut writer = DefaultProtoWriter::new(&mut body, &self.config);
        for (name, node) in top_level_entries(root, package) {
            if writer.write_entity(name, node)? {
                writeln!(writer.writer)?;
            }
        }
        let uses_empty = writer.uses_empty;

        writeln!(w, "syntax = \"proto3\";")?;
        writeln!(w)?;
        if uses_empty {
            if let Some(import) = &self.config.empty_import {
                writeln!(w, "import \"{}\";", import)?;
                writeln!(w)?;
            }
        }
        if !package.is_empty() {
            writeln!(w, "package {};", package)?;
            writeln!(w)?;
        }
        w.write_str(&body)
    }
}

/// Render with the default configuration
pub fn render(root: &ReflectionNode, package: &str) -> String {
    ProtoRenderer::new().render(root, package)
}

/// Entries written at the top level, with the package namespace unwrapped
pub(crate) fn top_level_entries<'a>(
    root: &'a ReflectionNode,
    package: &str,
) -> Vec<(&'a str, &'a ReflectionNode)> {
    let Some(root) = root.as_message() else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for (name, node) in &root.nested {
        match node.as_message() {
            Some(namespace) if namespace.namespace && name == package => {
                entries.extend(namespace.nested.iter().map(|(n, c)| (n.as_str(), c)));
            }
            _ => entries.push((name.as_str(), node)),
        }
    }
    entries
}

struct DefaultProtoWriter<'a, W: FmtWrite> {
    writer: &'a mut W,
    config: &'a RenderConfig,
    indent_level: usize,
    uses_empty: bool,
}

impl<'a, W: FmtWrite> DefaultProtoWriter<'a, W> {
    fn new(writer: &'a mut W, config: &'a RenderConfig) -> Self {
        Self {
            writer,
            config,
            indent_level: 0,
            uses_empty: false,
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) -> std::fmt::Result {
        for _ in 0..self.indent_level {
            write!(self.writer, "{}", self.config.indent_str)?;
        }
        Ok(())
    }

    fn writeln(&mut self, s: &str) -> std::fmt::Result {
        self.write_indent()?;
        writeln!(self.writer, "{}", s)
    }

    /// Returns whether anything was written
    fn write_entity(&mut self, name: &str, node: &ReflectionNode) -> Result<bool, std::fmt::Error> {
        match node {
            ReflectionNode::Message(message) => self.write_message(name, message)?,
            ReflectionNode::Enum(enum_type) => self.write_enum(name, enum_type)?,
            ReflectionNode::Service(service) => self.write_service(name, service)?,
            ReflectionNode::Unknown => {
                trace!("Skipping unrecognized node: {}", name);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn write_message(&mut self, name: &str, message: &MessageNode) -> std::fmt::Result {
        self.writeln(&format!("message {} {{", name))?;
        self.indent();

        self.write_reserved(message)?;

        for field in &message.fields {
            match message.oneof_of(&field.name) {
                Some(oneof) if !oneof.is_synthetic() => continue,
                Some(_) => self.write_field(field, Cardinality::Optional)?,
                None => self.write_field(field, field.cardinality)?,
            }
        }

        for oneof in message.oneofs.iter().filter(|o| !o.is_synthetic()) {
            self.write_oneof(oneof, message)?;
        }

        let mut wrote_any = !message.fields.is_empty() || !message.reserved.is_empty();
        for (child_name, child) in &message.nested {
            if !child.is_renderable() {
                trace!("Skipping unrecognized node: {}.{}", name, child_name);
                continue;
            }
            if wrote_any {
                writeln!(self.writer)?;
            }
            self.write_entity(child_name, child)?;
            wrote_any = true;
        }

        self.dedent();
        self.writeln("}")
    }

    fn write_reserved(&mut self, message: &MessageNode) -> std::fmt::Result {
        let names: Vec<_> = message
            .reserved
            .iter()
            .filter_map(|r| match r {
                Reserved::Name(name) => Some(format!("\"{}\"", name)),
                Reserved::Range(..) => None,
            })
            .collect();
        let ranges: Vec<_> = message
            .reserved
            .iter()
            .filter_map(|r| match *r {
                Reserved::Range(start, end) if start == end => Some(start.to_string()),
                Reserved::Range(start, end) if end == MAX_FIELD_NUMBER => {
                    Some(format!("{} to max", start))
                }
                Reserved::Range(start, end) => Some(format!("{} to {}", start, end)),
                Reserved::Name(_) => None,
            })
            .collect();

        if !ranges.is_empty() {
            self.writeln(&format!("reserved {};", ranges.join(", ")))?;
        }
        if !names.is_empty() {
            self.writeln(&format!("reserved {};", names.join(", ")))?;
        }
        Ok(())
    }

    fn write_field(&mut self, field: &FieldSpec, cardinality: Cardinality) -> std::fmt::Result {
        self.write_indent()?;
        match &field.key_type {
            Some(key_type) => writeln!(
                self.writer,
                "map<{}, {}> {} = {};",
                key_type, field.type_name, field.name, field.id
            ),
            None => writeln!(
                self.writer,
                "{}{} {} = {};",
                cardinality.prefix(),
                field.type_name,
                field.name,
                field.id
            ),
        }
    }

    fn write_oneof(&mut self, oneof: &OneofSpec, message: &MessageNode) -> std::fmt::Result {
        self.writeln(&format!("oneof {} {{", oneof.name))?;
        self.indent();

        for field in message
            .fields
            .iter()
            .filter(|f| oneof.fields.contains(&f.name))
        {
            self.write_field(field, Cardinality::Singular)?;
        }

        self.dedent();
        self.writeln("}")
    }

    fn write_enum(&mut self, name: &str, enum_type: &EnumNode) -> std::fmt::Result {
        self.writeln(&format!("enum {} {{", name))?;
        self.indent();

        for (symbol, value) in &enum_type.values {
            self.writeln(&format!("{} = {};", symbol, value))?;
        }

        self.dedent();
        self.writeln("}")
    }

    fn write_service(&mut self, name: &str, service: &ServiceNode) -> std::fmt::Result {
        self.writeln(&format!("service {} {{", name))?;
        self.indent();

        for method in &service.methods {
            let input = self.method_type(method.request_type.as_deref(), method.request_stream);
            let output = self.method_type(method.response_type.as_deref(), method.response_stream);
            self.writeln(&format!("rpc {}({}) returns ({});", method.name, input, output))?;
        }

        self.dedent();
        self.writeln("}")
    }

    fn method_type(&mut self, type_name: Option<&str>, stream: bool) -> String {
        let type_name = match type_name {
            Some(t) => t.to_string(),
            None => {
                self.uses_empty = true;
                self.config.empty_type.clone()
            }
        };
        if stream {
            format!("stream {}", type_name)
        } else {
            type_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> ReflectionNode {
        ReflectionNode::from_json(&value).unwrap()
    }

    #[test]
    fn test_render_simple_message() {
        let root = tree(json!({
            "nested": { "lq": { "nested": { "Foo": { "fields": {
                "bar": { "type": "string", "id": 1 }
            }}}}}
        }));

        let output = render(&root, "lq");
        assert!(output.contains("message Foo {\n  string bar = 1;\n}"));
        assert_eq!(
            output,
            "syntax = \"proto3\";\n\npackage lq;\n\nmessage Foo {\n  string bar = 1;\n}\n\n"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let root = tree(json!({
            "nested": { "lq": { "nested": {
                "B": { "fields": { "y": { "type": "int32", "id": 2 }, "x": { "type": "int32", "id": 1 } } },
                "A": { "values": { "ONE": 1, "ZERO": 0 } }
            }}}
        }));

        let renderer = ProtoRenderer::new();
        assert_eq!(renderer.render(&root, "lq"), renderer.render(&root, "lq"));
    }

    #[test]
    fn test_render_keeps_declaration_order() {
        let root = tree(json!({
            "nested": { "lq": { "nested": {
                "Msg": { "fields": {
                    "zulu": { "type": "int32", "id": 2 },
                    "alpha": { "type": "int32", "id": 1 }
                }},
                "Kind": { "values": { "Z": 0, "A": 1 } }
            }}}
        }));

        let output = render(&root, "lq");
        assert_eq!(
            output,
            "syntax = \"proto3\";\n\npackage lq;\n\n\
             message Msg {\n  int32 zulu = 2;\n  int32 alpha = 1;\n}\n\n\
             enum Kind {\n  Z = 0;\n  A = 1;\n}\n\n"
        );
    }

    #[test]
    fn test_render_nested_and_cardinality() {
        let root = tree(json!({
            "nested": { "lq": { "nested": { "Outer": {
                "fields": {
                    "items": { "rule": "repeated", "type": "Inner", "id": 1 },
                    "note": { "rule": "optional", "type": "string", "id": 2 }
                },
                "nested": {
                    "Inner": { "fields": { "id": { "type": "uint32", "id": 1 } }, "nested": {
                        "Deep": { "values": { "NONE": 0 } }
                    }},
                    "Empty": {}
                }
            }}}}
        }));

        let output = render(&root, "lq");
        assert_eq!(
            output,
            "syntax = \"proto3\";\n\npackage lq;\n\n\
             message Outer {\n\
             \x20 repeated Inner items = 1;\n\
             \x20 optional string note = 2;\n\
             \n\
             \x20 message Inner {\n\
             \x20   uint32 id = 1;\n\
             \n\
             \x20   enum Deep {\n\
             \x20     NONE = 0;\n\
             \x20   }\n\
             \x20 }\n\
             }\n\n"
        );
    }

    #[test]
    fn test_render_service_with_empty_type() {
        let root = tree(json!({
            "nested": { "lq": { "nested": { "Lobby": { "methods": {
                "login": { "requestType": "ReqLogin", "responseType": "ResLogin" },
                "heatbeat": { "responseType": "ResCommon" },
                "watch": { "requestType": "ReqWatch", "responseType": "Notify", "responseStream": true }
            }}}}}
        }));

        let output = render(&root, "lq");
        assert_eq!(
            output,
            "syntax = \"proto3\";\n\nimport \"google/protobuf/empty.proto\";\n\npackage lq;\n\n\
             service Lobby {\n\
             \x20 rpc login(ReqLogin) returns (ResLogin);\n\
             \x20 rpc heatbeat(google.protobuf.Empty) returns (ResCommon);\n\
             \x20 rpc watch(ReqWatch) returns (stream Notify);\n\
             }\n\n"
        );
    }

    #[test]
    fn test_render_custom_empty_type() {
        let root = tree(json!({
            "nested": { "S": { "methods": { "ping": {} } } }
        }));

        let renderer = ProtoRenderer::with_config(RenderConfig::new().empty_type("Empty", None));
        let output = renderer.render(&root, "");
        assert_eq!(
            output,
            "syntax = \"proto3\";\n\nservice S {\n  rpc ping(Empty) returns (Empty);\n}\n\n"
        );
    }

    #[test]
    fn test_render_skips_unknown_nodes() {
        let root = tree(json!({
            "nested": { "lq": { "nested": {
                "Opts": { "options": { "java_package": "x" } },
                "Foo": { "fields": {}, "nested": { "Bogus": 3 } }
            }}}
        }));

        let output = render(&root, "lq");
        assert_eq!(
            output,
            "syntax = \"proto3\";\n\npackage lq;\n\nmessage Foo {\n}\n\n"
        );
    }

    #[test]
    fn test_render_oneof_map_and_reserved() {
        let root = tree(json!({
            "nested": { "Msg": {
                "oneofs": {
                    "payload": { "oneof": ["text", "code"] },
                    "_hint": { "oneof": ["hint"] }
                },
                "fields": {
                    "text": { "type": "string", "id": 1 },
                    "code": { "type": "int32", "id": 2 },
                    "hint": { "type": "string", "id": 3 },
                    "attrs": { "keyType": "string", "type": "uint32", "id": 4 }
                },
                "reserved": [[5, 5], [8, 536870911], "old"]
            }}
        }));

        let output = render(&root, "");
        assert_eq!(
            output,
            "syntax = \"proto3\";\n\n\
             message Msg {\n\
             \x20 reserved 5, 8 to max;\n\
             \x20 reserved \"old\";\n\
             \x20 optional string hint = 3;\n\
             \x20 map<string, uint32> attrs = 4;\n\
             \x20 oneof payload {\n\
             \x20   string text = 1;\n\
             \x20   int32 code = 2;\n\
             \x20 }\n\
             }\n\n"
        );
    }

    #[test]
    fn test_non_package_namespace_renders_as_message() {
        let root = tree(json!({
            "nested": { "other": { "nested": { "Foo": { "fields": {} } } } }
        }));

        let output = render(&root, "lq");
        assert!(output.contains("message other {\n  message Foo {\n  }\n}\n"));
    }
}
