//! Dynamic row decoding.
//!
//! The derived document is compiled once into a descriptor pool. Each
//! data block is then matched to its message type by derived name and
//! every row is decoded against that type with [`DynamicMessage`].
//!
//! Failures after compilation never abort the run: a block without a
//! matching type and a row that does not decode are both recorded as
//! [`DecodeWarning`]s and skipped.

mod record;

use crate::compile::compile_document;
use crate::error::Result;
use crate::table::DataBlock;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

pub use record::{to_json, to_record, Record};

/// Virtual file name the derived document is compiled as
const DERIVED_PROTO_NAME: &str = "derived.proto";

/// A recoverable problem met while decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// No derived type exists for a block
    #[error("no type '{type_name}' for table '{table}' sheet '{sheet}', block skipped")]
    SkippedBlock {
        /// Table name of the block
        table: String,
        /// Sheet name of the block
        sheet: String,
        /// Derived name that was looked up
        type_name: String,
    },

    /// A row failed to decode against its type
    #[error("row {row} of '{type_name}' failed to decode: {reason}")]
    SkippedRow {
        /// Derived type name
        type_name: String,
        /// Index of the row within its block
        row: usize,
        /// Decoder error text
        reason: String,
    },
}

/// Records decoded for one derived type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedTable {
    /// Derived type name
    pub type_name: String,
    /// Records in row order
    pub records: Vec<Record>,
}

/// Result of decoding all data blocks
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodeOutput {
    /// Tables in the order their first block appeared
    pub tables: Vec<DecodedTable>,
    /// Skipped blocks and rows
    pub warnings: Vec<DecodeWarning>,
}

impl DecodeOutput {
    /// Returns the records decoded for `type_name`
    pub fn get(&self, type_name: &str) -> Option<&[Record]> {
        self.tables
            .iter()
            .find(|t| t.type_name == type_name)
            .map(|t| t.records.as_slice())
    }

    /// Returns the total number of decoded records
    pub fn record_count(&self) -> usize {
        self.tables.iter().map(|t| t.records.len()).sum()
    }

    /// Returns true if nothing was skipped
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// A compiled derived schema
#[derive(Debug, Clone)]
pub struct DerivedSchema {
    pool: DescriptorPool,
}

impl DerivedSchema {
    /// Compile a derived document.
    ///
    /// Failure here is fatal for the whole decode stage.
    pub fn compile(source: &str) -> Result<Self> {
        let pool = compile_document(DERIVED_PROTO_NAME, source)?;
        Ok(Self { pool })
    }

    /// Returns the message type named `type_name`
    pub fn message(&self, type_name: &str) -> Option<MessageDescriptor> {
        self.pool.get_message_by_name(type_name)
    }

    /// Returns the names of all compiled message types
    pub fn type_names(&self) -> Vec<String> {
        self.pool
            .all_messages()
            .map(|m| m.full_name().to_string())
            .collect()
    }

    /// Decode every row of every block
    pub fn decode(&self, blocks: &[DataBlock]) -> DecodeOutput {
        let mut output = DecodeOutput::default();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for block in blocks {
            let type_name = block.type_name();
            let Some(descriptor) = self.message(&type_name) else {
                warn!(
                    "No type {} for {}/{}, skipping {} rows",
                    type_name,
                    block.table,
                    block.sheet,
                    block.rows.len()
                );
                output.warnings.push(DecodeWarning::SkippedBlock {
                    table: block.table.clone(),
                    sheet: block.sheet.clone(),
                    type_name,
                });
                continue;
            };

            let index = *positions.entry(type_name.clone()).or_insert_with(|| {
                output.tables.push(DecodedTable {
                    type_name: type_name.clone(),
                    records: Vec::new(),
                });
                output.tables.len() - 1
            });

            let before = output.tables[index].records.len();
            for (row, data) in block.rows.iter().enumerate() {
                match DynamicMessage::decode(descriptor.clone(), &data[..]) {
                    Ok(message) => output.tables[index].records.push(to_record(&message)),
                    Err(e) => {
                        warn!("Skipping row {} of {}: {}", row, type_name, e);
                        output.warnings.push(DecodeWarning::SkippedRow {
                            type_name: type_name.clone(),
                            row,
                            reason: e.to_string(),
                        });
                    }
                }
            }

            debug!(
                "Decoded {}/{} rows as {}",
                output.tables[index].records.len() - before,
                block.rows.len(),
                type_name
            );
        }

        output
    }
}

/// Compile `source` and decode `blocks` against it
pub fn decode(source: &str, blocks: &[DataBlock]) -> Result<DecodeOutput> {
    let schema = DerivedSchema::compile(source)?;
    Ok(schema.decode(blocks))
}
