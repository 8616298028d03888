//! Test fixtures shared by the unit tests.

use prost::Message;

/// Companion schema describing the configuration blob
pub(crate) const CONFIG_PROTO: &str = r#"syntax = "proto3";

package lq.config;

message FieldSchema {
  string field_name = 1;
  uint32 array_length = 2;
  string pb_type = 3;
  uint32 pb_index = 4;
}

message SheetSchema {
  string name = 1;
  repeated FieldSchema fields = 2;
}

message TableSchema {
  string name = 1;
  repeated SheetSchema sheets = 2;
}

message SheetData {
  string table = 1;
  string sheet = 2;
  repeated bytes data = 3;
}

message ConfigTables {
  string version = 1;
  string header_hash = 2;
  repeated TableSchema schemas = 3;
  repeated SheetData datas = 4;
}
"#;

#[derive(Clone, PartialEq, Message)]
struct FieldSchema {
    #[prost(string, tag = "1")]
    field_name: String,
    #[prost(uint32, tag = "2")]
    array_length: u32,
    #[prost(string, tag = "3")]
    pb_type: String,
    #[prost(uint32, tag = "4")]
    pb_index: u32,
}

#[derive(Clone, PartialEq, Message)]
struct SheetSchema {
    #[prost(string, tag = "1")]
    name: String,
    #[prost(message, repeated, tag = "2")]
    fields: Vec<FieldSchema>,
}

#[derive(Clone, PartialEq, Message)]
struct TableSchema {
    #[prost(string, tag = "1")]
    name: String,
    #[prost(message, repeated, tag = "2")]
    sheets: Vec<SheetSchema>,
}

#[derive(Clone, PartialEq, Message)]
struct SheetData {
    #[prost(string, tag = "1")]
    table: String,
    #[prost(string, tag = "2")]
    sheet: String,
    #[prost(bytes = "vec", repeated, tag = "3")]
    data: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
struct ConfigTables {
    #[prost(string, tag = "1")]
    version: String,
    #[prost(string, tag = "2")]
    header_hash: String,
    #[prost(message, repeated, tag = "3")]
    schemas: Vec<TableSchema>,
    #[prost(message, repeated, tag = "4")]
    datas: Vec<SheetData>,
}

/// Row layout of the `item_def` / `weapon` sheet
#[derive(Clone, PartialEq, Message)]
struct WeaponRow {
    #[prost(uint32, tag = "1")]
    id: u32,
    #[prost(string, tag = "2")]
    name: String,
    #[prost(int64, tag = "3")]
    damage: i64,
    #[prost(string, repeated, tag = "4")]
    tags: Vec<String>,
}

fn column(name: &str, pb_type: &str, pb_index: u32, array_length: u32) -> FieldSchema {
    FieldSchema {
        field_name: name.to_string(),
        array_length,
        pb_type: pb_type.to_string(),
        pb_index,
    }
}

/// One `item_def` schema with a `weapon` sheet, two weapon rows and one
/// block for a sheet that has no schema
pub(crate) fn sample_blob() -> Vec<u8> {
    let rows = vec![
        WeaponRow {
            id: 1,
            name: "Blade".to_string(),
            damage: 9_007_199_254_740_993,
            tags: vec!["sharp".to_string(), "steel".to_string()],
        }
        .encode_to_vec(),
        WeaponRow {
            id: 2,
            ..Default::default()
        }
        .encode_to_vec(),
    ];

    ConfigTables {
        version: "1.0.0".to_string(),
        header_hash: "abc".to_string(),
        schemas: vec![TableSchema {
            name: "item_def".to_string(),
            sheets: vec![SheetSchema {
                name: "weapon".to_string(),
                fields: vec![
                    column("id", "uint32", 1, 0),
                    column("name", "string", 2, 0),
                    column("damage", "int64", 3, 0),
                    column("tags", "string", 4, 3),
                ],
            }],
        }],
        datas: vec![
            SheetData {
                table: "item_def".to_string(),
                sheet: "weapon".to_string(),
                data: rows,
            },
            SheetData {
                table: "missing".to_string(),
                sheet: "sheet".to_string(),
                data: vec![vec![0x08, 0x01]],
            },
        ],
    }
    .encode_to_vec()
}
