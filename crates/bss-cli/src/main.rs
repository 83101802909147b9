mod cli;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use bss_core::{compile_file, CompileOptions, Error};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), Error> {
    match command {
        Commands::Build {
            input,
            output,
            minify,
            config,
            base_dir,
        } => {
            let mut options = match config {
                Some(path) => CompileOptions::load(&path)?,
                None => CompileOptions::default(),
            };
            options.minify |= minify;
            if base_dir.is_some() {
                options.base_dir = base_dir;
            }
            build(&input, output.as_deref(), &options)
        }
    }
}

fn build(input: &Path, output: Option<&Path>, options: &CompileOptions) -> Result<(), Error> {
    let compilation = compile_file(input, options)?;
    tracing::info!(
        "compiled {} into {} rules with {} warnings",
        input.display(),
        compilation.rules.len(),
        compilation.diagnostics.len()
    );

    let css = compilation.to_css(options.minify);
    match output {
        Some(path) => fs::write(path, css).map_err(|e| Error::io(path, e)),
        None => {
            print!("{}", css);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_writes_output_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("base.bss"), "$c: red;\n").expect("write base");
        fs::write(
            dir.path().join("main.bss"),
            "@import base;\n.a { color: $c; &:hover { color: blue } }\n",
        )
        .expect("write main");

        let out = dir.path().join("main.css");
        let options = CompileOptions {
            minify: true,
            ..CompileOptions::default()
        };
        build(&dir.path().join("main.bss"), Some(&out), &options).expect("build");

        let css = fs::read_to_string(&out).expect("read css");
        assert_eq!(css, ".a{color:red;}\n.a:hover{color:blue;}\n");
    }

    #[test]
    fn build_reports_missing_input() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = build(&dir.path().join("nope.bss"), None, &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
    }
}
