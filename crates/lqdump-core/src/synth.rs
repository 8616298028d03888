//! Derived schema synthesis.
//!
//! Every sheet of every table schema becomes one proto3 message. The
//! message name comes from [`derive_type_name`], which is also how data
//! blocks find their type again, so both sides must agree exactly.

use crate::table::{Schema, SheetField};
use std::fmt::Write as FmtWrite;

/// Compute the derived type name of a (table, sheet) pair.
///
/// The pair is joined with `_`, split on `_`, and every segment gets its
/// first character upper-cased. The rest of each segment is kept as is.
///
/// ```
/// use lqdump_core::derive_type_name;
///
/// assert_eq!(derive_type_name("general", "normalClient"), "GeneralNormalClient");
/// assert_eq!(derive_type_name("item_def", "weapon"), "ItemDefWeapon");
/// ```
pub fn derive_type_name(table: &str, sheet: &str) -> String {
    let joined = format!("{}_{}", table, sheet);
    let mut name = String::with_capacity(joined.len());
    for segment in joined.split('_') {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    name
}

/// Synthesize the derived proto3 document for `schemas`
pub fn synthesize(schemas: &[Schema]) -> String {
    let mut output = String::new();
    write_schemas(&mut output, schemas).expect("String write cannot fail");
    output
}

fn write_schemas(w: &mut impl FmtWrite, schemas: &[Schema]) -> std::fmt::Result {
    writeln!(w, "syntax = \"proto3\";")?;
    writeln!(w)?;

    for schema in schemas {
        for sheet in &schema.sheets {
            writeln!(w, "message {} {{", derive_type_name(&schema.name, &sheet.name))?;
            for field in &sheet.fields {
                write_field(w, field)?;
            }
            writeln!(w, "}}")?;
            writeln!(w)?;
        }
    }
    Ok(())
}

fn write_field(w: &mut impl FmtWrite, field: &SheetField) -> std::fmt::Result {
    let label = if field.is_repeated() { "repeated " } else { "" };
    writeln!(
        w,
        "  {}{} {} = {};",
        label, field.pb_type, field.field_name, field.pb_index
    )
}
