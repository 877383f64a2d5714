//! Loading of schema files and resolution of their imports.
//!
//! Imports are resolved relative to the importing file's directory and
//! loaded recursively, depth-first. Files are not cached by path: a file
//! imported through two different routes is parsed twice and yields two
//! independent schemas. A cyclic import chain is detected through the stack
//! of files currently being loaded and reported as an error rather than
//! recursing without bound.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LoaderError, SchemataError};
use crate::model::Schema;
use crate::parser::Parser;
use crate::passes;
use crate::scan::Marker;

#[derive(Debug, Default)]
pub struct Loader {
    stack: Vec<PathBuf>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads, parses, and post-processes the schema file at `path`,
    /// including everything it imports.
    pub fn load_file(&mut self, path: &Path) -> Result<Schema, SchemataError> {
        let text = fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        log::debug!("Loading schema file '{}'.", path.display());

        self.stack.push(canonical);
        let result = self.load_source(&text, &path.display().to_string(), path.parent());
        self.stack.pop();

        result
    }

    /// Parses schema source text, resolving imports against `base_dir`.
    /// With no base directory, import paths are taken as given.
    pub fn load_source(
        &mut self,
        text: &str,
        name: &str,
        base_dir: Option<&Path>,
    ) -> Result<Schema, SchemataError> {
        let parser = Parser::new_with_name(text, name.to_string());
        let mut marker = Marker::new();

        let format_name = parser.parse_format_name(&mut marker)?;
        let imports = parser.parse_import_statements(&mut marker)?;

        let mut schema = Schema::new(format_name);

        for import in imports {
            let target = base_dir
                .map(|d| d.join(&import.path))
                .unwrap_or_else(|| PathBuf::from(&import.path));

            if !target.exists() {
                return Err(LoaderError::ImportNotFound {
                    path: target.display().to_string(),
                    src: (*parser.source()).clone(),
                    span: import.span,
                }
                .into());
            }

            let canonical = target.canonicalize().unwrap_or_else(|_| target.clone());

            if self.stack.contains(&canonical) {
                let cycle = self
                    .stack
                    .iter()
                    .chain(std::iter::once(&canonical))
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ");

                return Err(LoaderError::CircularImport {
                    cycle,
                    src: (*parser.source()).clone(),
                    span: import.span,
                }
                .into());
            }

            let dependency = self.load_file(&target)?;
            schema.dependencies.push(dependency);
        }

        schema.structures = parser.parse_structures(&mut marker)?;

        passes::run(&mut schema);

        Ok(schema)
    }
}
