//! # lqdump-core
//!
//! A library for turning a game-data bundle into inspectable artifacts.
//!
//! This crate provides the core functionality for:
//! - Rendering a protobufjs reflection tree as a proto3 document
//! - Decoding a self-describing configuration table against its companion schema
//! - Synthesizing a derived proto3 document from the table's field metadata
//! - Decoding every table row against that derived document at run time
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`reflection`]: Reflection tree model
//! - [`proto`]: Proto document rendering
//! - [`table`]: Configuration table bootstrap
//! - [`synth`]: Derived schema synthesis
//! - [`decode`]: Dynamic row decoding
//! - [`compile`]: In-memory proto compilation
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use lqdump_core::{decode, render, synthesize, ConfigTable, ReflectionNode};
//! use std::fs;
//!
//! let tree = ReflectionNode::from_json_slice(&fs::read("liqi.json")?)?;
//! println!("{}", render(&tree, "lq"));
//!
//! let table = ConfigTable::decode(&fs::read("lqc.lqbin")?, &fs::read_to_string("config.proto")?)?;
//! let output = decode(&synthesize(&table.schemas), &table.datas)?;
//! for decoded in &output.tables {
//!     println!("{}: {} records", decoded.type_name, decoded.records.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod compile;
pub mod decode;
pub mod error;
pub mod proto;
pub mod reflection;
pub mod synth;
pub mod table;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience
pub use compile::compile_document;
pub use decode::{decode, DecodeOutput, DecodeWarning, DecodedTable, DerivedSchema, Record};
pub use error::{Error, Result};
pub use proto::{render, walk, ProtoRenderer, ProtoWriter, RenderConfig, StatsWriter};
pub use reflection::{Cardinality, FieldSpec, ReflectionNode};
pub use synth::{derive_type_name, synthesize};
pub use table::{ConfigTable, DataBlock, Schema, Sheet, SheetField};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum valid protobuf field number (2^29 - 1)
/// Used for `reserved X to max` ranges
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;
