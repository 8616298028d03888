//! Extensible proto visiting traits.
//!
//! This module provides the [`ProtoWriter`] trait for observing the
//! entities of a reflection tree in rendering order.

use super::top_level_entries;
use crate::reflection::{
    EnumNode, FieldSpec, MessageNode, MethodSpec, OneofSpec, ReflectionNode, ServiceNode,
};
use std::fmt::Result;

/// Trait for visiting proto elements.
///
/// Implement this trait to collect information about a reflection tree
/// without rendering it. All methods default to doing nothing.
///
/// # Example
///
/// ```ignore
/// use lqdump_core::proto::{walk, ProtoWriter};
///
/// struct MessageNames(Vec<String>);
///
/// impl ProtoWriter for MessageNames {
///     fn write_message(&mut self, name: &str, _message: &MessageNode) -> Result {
///         self.0.push(name.to_string());
///         Ok(())
///     }
/// }
/// ```
pub trait ProtoWriter {
    /// Visit a message definition
    fn write_message(&mut self, name: &str, message: &MessageNode) -> Result {
        let _ = (name, message);
        Ok(())
    }

    /// Visit a field definition
    fn write_field(&mut self, field: &FieldSpec) -> Result {
        let _ = field;
        Ok(())
    }

    /// Visit a oneof group
    fn write_oneof(&mut self, oneof: &OneofSpec) -> Result {
        let _ = oneof;
        Ok(())
    }

    /// Visit an enum definition
    fn write_enum(&mut self, name: &str, enum_type: &EnumNode) -> Result {
        let _ = (name, enum_type);
        Ok(())
    }

    /// Visit a service definition
    fn write_service(&mut self, name: &str, service: &ServiceNode) -> Result {
        let _ = (name, service);
        Ok(())
    }

    /// Visit a method definition
    fn write_method(&mut self, method: &MethodSpec) -> Result {
        let _ = method;
        Ok(())
    }
}

/// Visit every renderable entity of the document for `package`
pub fn walk(root: &ReflectionNode, package: &str, writer: &mut impl ProtoWriter) -> Result {
    for (name, node) in top_level_entries(root, package) {
        walk_node(name, node, writer)?;
    }
    Ok(())
}

fn walk_node(name: &str, node: &ReflectionNode, writer: &mut impl ProtoWriter) -> Result {
    match node {
        ReflectionNode::Message(message) => {
            writer.write_message(name, message)?;
            for field in &message.fields {
                writer.write_field(field)?;
            }
            for oneof in message.oneofs.iter().filter(|o| !o.is_synthetic()) {
                writer.write_oneof(oneof)?;
            }
            for (child_name, child) in &message.nested {
                walk_node(child_name, child, writer)?;
            }
        }
        ReflectionNode::Enum(enum_type) => writer.write_enum(name, enum_type)?,
        ReflectionNode::Service(service) => {
            writer.write_service(name, service)?;
            for method in &service.methods {
                writer.write_method(method)?;
            }
        }
        ReflectionNode::Unknown => {}
    }
    Ok(())
}

/// A writer that collects statistics about the document
#[derive(Debug, Default)]
pub struct StatsWriter {
    /// Number of messages
    pub message_count: usize,
    /// Number of fields
    pub field_count: usize,
    /// Number of enums
    pub enum_count: usize,
    /// Number of services
    pub service_count: usize,
    /// Number of methods
    pub method_count: usize,
}

impl ProtoWriter for StatsWriter {
    fn write_message(&mut self, _name: &str, _message: &MessageNode) -> Result {
        self.message_count += 1;
        Ok(())
    }

    fn write_field(&mut self, _field: &FieldSpec) -> Result {
        self.field_count += 1;
        Ok(())
    }

    fn write_enum(&mut self, _name: &str, _enum_type: &EnumNode) -> Result {
        self.enum_count += 1;
        Ok(())
    }

    fn write_service(&mut self, _name: &str, _service: &ServiceNode) -> Result {
        self.service_count += 1;
        Ok(())
    }

    fn write_method(&mut self, _method: &MethodSpec) -> Result {
        self.method_count += 1;
        Ok(())
    }
}
