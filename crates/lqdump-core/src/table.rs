//! Configuration table bootstrap.
//!
//! The configuration blob is a `ConfigTables` message described by a
//! companion schema that ships next to it. That schema only describes the
//! *shape* of the table: field metadata per sheet, and undecoded rows per
//! sheet. It is compiled in memory and read by field name, so the table
//! layout never has to be known at build time.

use crate::compile::compile_document;
use crate::error::{Error, Result};
use crate::synth::derive_type_name;
use bytes::Bytes;
use prost_reflect::{DynamicMessage, FieldDescriptor, MessageDescriptor, ReflectMessage, Value};
use std::borrow::Cow;
use tracing::debug;

/// Root message of the companion schema
pub const DEFAULT_ROOT_MESSAGE: &str = "ConfigTables";

/// Virtual file name the companion schema is compiled as
const CONFIG_PROTO_NAME: &str = "config.proto";

/// Field metadata of one sheet column
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetField {
    /// Column name
    pub field_name: String,
    /// Protocol type name, used verbatim
    pub pb_type: String,
    /// Field number
    pub pb_index: u32,
    /// Greater than zero for repeated columns
    pub array_length: u32,
}

impl SheetField {
    /// Returns true if the column holds a sequence
    pub fn is_repeated(&self) -> bool {
        self.array_length > 0
    }
}

/// A named group of typed columns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sheet {
    /// Sheet name
    pub name: String,
    /// Columns in declaration order
    pub fields: Vec<SheetField>,
}

/// A named collection of sheets
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Table name
    pub name: String,
    /// Sheets in declaration order
    pub sheets: Vec<Sheet>,
}

/// Undecoded rows of one table sheet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataBlock {
    /// Table name
    pub table: String,
    /// Sheet name
    pub sheet: String,
    /// Encoded rows in table order
    pub rows: Vec<Bytes>,
}

impl DataBlock {
    /// Derived type name the rows decode as
    pub fn type_name(&self) -> String {
        derive_type_name(&self.table, &self.sheet)
    }
}

/// Fully decoded configuration blob
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigTable {
    /// Table schemas
    pub schemas: Vec<Schema>,
    /// Row data per table sheet
    pub datas: Vec<DataBlock>,
}

impl ConfigTable {
    /// Decode `blob` using the companion schema source `config_proto`
    pub fn decode(blob: &[u8], config_proto: &str) -> Result<Self> {
        Self::decode_with_root(blob, config_proto, DEFAULT_ROOT_MESSAGE)
    }

    /// Decode `blob` as the message named `root` (short or full name)
    pub fn decode_with_root(blob: &[u8], config_proto: &str, root: &str) -> Result<Self> {
        let pool = compile_document(CONFIG_PROTO_NAME, config_proto)?;
        let descriptor = pool
            .all_messages()
            .find(|m| m.name() == root || m.full_name() == root)
            .ok_or_else(|| Error::missing_message(root))?;

        let message = DynamicMessage::decode(descriptor, blob)?;
        let table = Self::from_message(&message)?;

        debug!(
            "Decoded configuration table: {} schemas, {} data blocks",
            table.schemas.len(),
            table.datas.len()
        );
        Ok(table)
    }

    fn from_message(message: &DynamicMessage) -> Result<Self> {
        let schemas = messages(message, "schemas")?
            .iter()
            .map(read_schema)
            .collect::<Result<_>>()?;
        let datas = messages(message, "datas")?
            .iter()
            .map(read_block)
            .collect::<Result<_>>()?;
        Ok(Self { schemas, datas })
    }

    /// Returns the total number of encoded rows
    pub fn row_count(&self) -> usize {
        self.datas.iter().map(|d| d.rows.len()).sum()
    }
}

fn read_schema(message: &DynamicMessage) -> Result<Schema> {
    Ok(Schema {
        name: string(message, "name")?,
        sheets: messages(message, "sheets")?
            .iter()
            .map(read_sheet)
            .collect::<Result<_>>()?,
    })
}

fn read_sheet(message: &DynamicMessage) -> Result<Sheet> {
    Ok(Sheet {
        name: string(message, "name")?,
        fields: messages(message, "fields")?
            .iter()
            .map(read_sheet_field)
            .collect::<Result<_>>()?,
    })
}

fn read_sheet_field(message: &DynamicMessage) -> Result<SheetField> {
    Ok(SheetField {
        field_name: string(message, "field_name")?,
        pb_type: string(message, "pb_type")?,
        pb_index: integer(message, "pb_index")?,
        array_length: integer(message, "array_length")?,
    })
}

fn read_block(message: &DynamicMessage) -> Result<DataBlock> {
    let rows = list(message, "data")?
        .iter()
        .map(|row| {
            row.as_bytes()
                .cloned()
                .ok_or_else(|| invalid(message, "data", "expected bytes elements"))
        })
        .collect::<Result<_>>()?;
    Ok(DataBlock {
        table: string(message, "table")?,
        sheet: string(message, "sheet")?,
        rows,
    })
}

fn lookup(descriptor: &MessageDescriptor, name: &str) -> Result<FieldDescriptor> {
    descriptor
        .get_field_by_name(name)
        .ok_or_else(|| Error::missing_field(descriptor.full_name(), name))
}

fn get<'a>(message: &'a DynamicMessage, name: &str) -> Result<Cow<'a, Value>> {
    let field = lookup(&message.descriptor(), name)?;
    Ok(message.get_field(&field))
}

fn invalid(message: &DynamicMessage, name: &str, details: impl Into<String>) -> Error {
    Error::invalid_table(message.descriptor().full_name(), name, details)
}

fn list(message: &DynamicMessage, name: &str) -> Result<Vec<Value>> {
    match get(message, name)?.into_owned() {
        Value::List(items) => Ok(items),
        _ => Err(invalid(message, name, "expected a repeated field")),
    }
}

fn messages(message: &DynamicMessage, name: &str) -> Result<Vec<DynamicMessage>> {
    list(message, name)?
        .into_iter()
        .map(|item| match item {
            Value::Message(m) => Ok(m),
            _ => Err(invalid(message, name, "expected message elements")),
        })
        .collect()
}

fn string(message: &DynamicMessage, name: &str) -> Result<String> {
    match get(message, name)?.as_str() {
        Some(s) => Ok(s.to_string()),
        None => Err(invalid(message, name, "expected a string")),
    }
}

fn integer(message: &DynamicMessage, name: &str) -> Result<u32> {
    let value = get(message, name)?;
    let n = match &*value {
        Value::U32(n) => Ok(*n),
        Value::I32(n) => u32::try_from(*n).map_err(|e| e.to_string()),
        Value::U64(n) => u32::try_from(*n).map_err(|e| e.to_string()),
        Value::I64(n) => u32::try_from(*n).map_err(|e| e.to_string()),
        _ => Err("expected an integer".to_string()),
    };
    n.map_err(|details| invalid(message, name, format!("{} ({:?})", details, value)))
}
