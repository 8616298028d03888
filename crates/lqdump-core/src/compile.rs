//! In-memory compilation of protocol documents.
//!
//! Documents produced at run time never touch the file system: a single
//! virtual file is served to [`protox`] from memory, and imports of the
//! well-known `google/protobuf/*.proto` files are resolved from the
//! copies bundled with protox.

use crate::error::{Error, Result};
use prost_reflect::DescriptorPool;
use protox::file::{File, FileResolver, GoogleFileResolver};
use protox::Compiler;
use std::path::Path;
use tracing::debug;

/// Serves one in-memory document, falling back to the well-known types
struct SourceResolver {
    name: String,
    source: String,
    google: GoogleFileResolver,
}

impl FileResolver for SourceResolver {
    fn resolve_path(&self, path: &Path) -> Option<String> {
        (path == Path::new(&self.name)).then(|| self.name.clone())
    }

    fn open_file(&self, name: &str) -> std::result::Result<File, protox::Error> {
        if name == self.name {
            File::from_source(name, &self.source)
        } else {
            self.google.open_file(name)
        }
    }
}

/// Compile `source` as a file called `name` and return the resulting pool.
///
/// Any parse or resolution failure is reported as [`Error::SchemaCompile`].
pub fn compile_document(name: &str, source: &str) -> Result<DescriptorPool> {
    let resolver = SourceResolver {
        name: name.to_string(),
        source: source.to_string(),
        google: GoogleFileResolver::new(),
    };

    let mut compiler = Compiler::with_file_resolver(resolver);
    compiler.include_imports(true);
    compiler
        .open_file(name)
        .map_err(|e| Error::schema_compile(name, e))?;

    let pool = compiler.descriptor_pool();
    debug!(
        "Compiled {} ({} message types)",
        name,
        pool.all_messages().count()
    );
    Ok(pool)
}
