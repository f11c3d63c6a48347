mod config;
mod document;
mod test_runner;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use calc::{ChartBackend, PlotSpec};
use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use log::{debug, warn};

use crate::config::Config;
use crate::document::{DocumentString, assemble, register, split};

#[derive(Parser)]
#[command(name = "rivet", about = "Turn rivet documents into calc text")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log every dispatched command
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a document and write its calc text
    Run {
        /// Path to the .rvt document
        file: PathBuf,

        /// Write the calc text here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Continue with the next string after a failure
        #[arg(long)]
        keep_going: bool,

        /// Append a summary of every defined variable
        #[arg(long)]
        summary: bool,
    },
    /// Scan every string without evaluating anything
    Check {
        /// Path to the .rvt document
        file: PathBuf,
    },
    /// Run .test.rvt fixtures
    Test {
        /// Path to a fixture file or a directory of fixtures
        path: PathBuf,

        /// Only run these categories (subfolder names)
        #[arg(short, long)]
        category: Vec<String>,

        /// List available categories and exit
        #[arg(long)]
        list: bool,
    },
}

/// Logs draw and export requests; no chart library is attached to the CLI.
struct LogBackend;

impl ChartBackend for LogBackend {
    fn draw(&mut self, spec: &PlotSpec) -> Result<(), calc::CalcError> {
        debug!("plot of '{}' with {} series", spec.table, spec.series.len());
        Ok(())
    }

    fn export(&mut self, spec: &PlotSpec, path: &Path) -> Result<(), calc::CalcError> {
        warn!("figure of '{}' not rendered to {}", spec.table, path.display());
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Run {
            file,
            out,
            keep_going,
            summary,
        } => do_run(&file, out.as_deref(), keep_going, summary, color),
        Command::Check { file } => do_check(&file, color),
        Command::Test {
            path,
            category,
            list,
        } => {
            if list {
                test_runner::list_categories(&path);
                return;
            }
            let code = test_runner::run_tests(&path, cli.no_color, &category);
            process::exit(code);
        }
    }
}

/// Read and split `path`, registering each string with `files`.
/// Exits on failure.
fn load(path: &Path, files: &mut SimpleFiles<String, String>) -> Vec<DocumentString> {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", path.display(), e);
            process::exit(1);
        }
    };
    let mut strings = match split(&source) {
        Ok(strings) => strings,
        Err(e) => {
            eprintln!("error: {}: {}", path.display(), e);
            process::exit(1);
        }
    };
    register(files, &path.display().to_string(), &mut strings);
    strings
}

fn emit(files: &SimpleFiles<String, String>, diagnostic: &Diagnostic<usize>, color: ColorChoice) {
    let writer = StandardStream::stderr(color);
    let config = term::Config::default();
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, diagnostic);
}

fn do_run(file: &Path, out: Option<&Path>, keep_going: bool, summary: bool, color: ColorChoice) {
    let mut files = SimpleFiles::new();
    let strings = load(file, &mut files);

    let dir = file.parent().unwrap_or(Path::new("."));
    let config = match Config::load(dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let mut ctx = config.context(dir);

    let assembly = assemble(&strings, &mut ctx, &mut LogBackend, keep_going);
    for failure in &assembly.failures {
        eprintln!("string '{}' failed", failure.name);
        emit(&files, &failure.error.to_diagnostic(failure.file_id), color);
    }

    let mut text = assembly.text;
    if summary {
        text.push('\n');
        for row in ctx.env.summary(ctx.settings.result_decimals) {
            text.push_str(&format!("{} = {}", row.name, row.value));
            if !row.description.is_empty() {
                text.push_str(&format!("  | {}", row.description));
            }
            text.push('\n');
        }
    }

    let written = match out {
        Some(path) => std::fs::write(path, &text).map_err(|e| (path.display().to_string(), e)),
        None => std::io::stdout()
            .write_all(text.as_bytes())
            .map_err(|e| ("stdout".to_string(), e)),
    };
    if let Err((target, e)) = written {
        eprintln!("error: cannot write {}: {}", target, e);
        process::exit(1);
    }

    if !assembly.failures.is_empty() {
        process::exit(1);
    }
}

fn do_check(file: &Path, color: ColorChoice) {
    let mut files = SimpleFiles::new();
    let strings = load(file, &mut files);

    let mut failed = 0;
    for doc in &strings {
        if let Err(err) = rivet::scan(&doc.string) {
            emit(&files, &err.to_diagnostic(), color);
            failed += 1;
        }
    }

    if failed > 0 {
        eprintln!("{} of {} strings failed to scan", failed, strings.len());
        process::exit(1);
    }
    eprintln!("{} strings ok", strings.len());
}
