//! Compiler for BSS, a nested stylesheet language with imports, variables,
//! parametric `@func` templates, `&` nesting, `@extend` and nested `@media`
//! blocks, lowering it to flat CSS rules.
//!
//! ```ignore
//! use bss_core::{compile_file, CompileOptions};
//!
//! let compilation = compile_file("styles/main.bss".as_ref(), &CompileOptions::default())?;
//! for diagnostic in &compilation.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! println!("{}", compilation.to_css(false));
//! ```

pub mod ast;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod expand;
pub mod lexer;
pub mod loader;
pub mod output;
pub mod parser;
pub mod rule;
pub mod scope;

use std::path::Path;

pub use compiler::{Compilation, Compiler};
pub use config::CompileOptions;
pub use diagnostics::Diagnostic;
pub use error::{Error, Result, Span};
pub use loader::{FsLoader, MemoryLoader, SourceLoader};
pub use rule::FlatRule;

/// Compiles a file and everything it imports. Imports resolve against
/// `options.base_dir`, or the input's directory when unset.
pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<Compilation> {
    let base_dir = match &options.base_dir {
        Some(dir) => dir.clone(),
        None => path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut compiler = Compiler::new(FsLoader::new(base_dir)).with_suffix(options.suffix.clone());
    compiler.import_by_name(&name)?;
    Ok(compiler.compile())
}

/// Compiles source text; `loader` serves its imports.
pub fn compile_source(
    name: &str,
    source: &str,
    loader: impl SourceLoader + 'static,
) -> Result<Compilation> {
    let sheet = parser::parse(name, source)?;
    let mut compiler = Compiler::new(loader);
    compiler.import_parsed(sheet)?;
    Ok(compiler.compile())
}
