//! Bluejay command line checker.
//!
//! Opens one document, waits until every statement has been checked and
//! prints the resulting diagnostics, one per line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use bluejay_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Uri};
use bluejay_lsp::{BluejayConfig, ProcessParser, ProcessVerifier, VerificationScheduler};
use clap::Parser;
use tracing::{debug, info};

/// Checker command line arguments.
#[derive(Parser, Debug)]
#[command(name = "bluejay-check")]
#[command(about = "Verify every statement of a bluejay document")]
#[command(version)]
struct Args {
	/// Document to verify
	file: PathBuf,

	/// Configuration file (TOML)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Working directory for the parser and verifier, overrides the config
	#[arg(short, long, value_name = "PATH")]
	workspace_root: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let mut config = match &args.config {
		Some(path) => BluejayConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => BluejayConfig::default(),
	};
	if let Some(root) = args.workspace_root {
		config.workspace_root = Some(root);
	}
	debug!(?config, "configuration loaded");

	let path = tokio::fs::canonicalize(&args.file)
		.await
		.with_context(|| format!("resolving {}", args.file.display()))?;
	let text = tokio::fs::read_to_string(&path)
		.await
		.with_context(|| format!("reading {}", path.display()))?;
	let uri = file_uri(&path)?;

	let (scheduler, _snapshots) = VerificationScheduler::new(
		Arc::new(ProcessParser::from_config(&config)),
		Arc::new(ProcessVerifier::from_config(&config)),
		config.scheduler_config(),
	);

	info!(uri = uri.as_str(), "checking document");
	scheduler.open(uri.clone(), text).await?;
	scheduler.settled(&uri).await;

	let diagnostics = scheduler.diagnostics(&uri).unwrap_or_default();
	scheduler.close(&uri).await;

	for diagnostic in &diagnostics {
		println!("{}", render(diagnostic));
	}

	let failed = diagnostics.iter().any(|d| d.severity == Some(DiagnosticSeverity::ERROR));
	Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("bluejay_lsp=debug,bluejay_worker=debug,bluejay_check=debug,info")
		} else {
			EnvFilter::new("warn")
		}
	});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

/// `file://` URI for an absolute path.
fn file_uri(path: &Path) -> anyhow::Result<Uri> {
	let url = url::Url::from_file_path(path).map_err(|()| anyhow::anyhow!("not an absolute path: {}", path.display()))?;
	Uri::from_str(url.as_str()).map_err(|err| anyhow::anyhow!("invalid document URI {url}: {err:?}"))
}

/// `<line>:<col> <severity> <message>` with a 1-based line.
fn render(diagnostic: &Diagnostic) -> String {
	let severity = match diagnostic.severity {
		Some(DiagnosticSeverity::ERROR) => "error",
		Some(DiagnosticSeverity::WARNING) => "warning",
		Some(DiagnosticSeverity::HINT) => "hint",
		_ => "info",
	};
	let start = diagnostic.range.start;
	format!("{}:{} {severity} {}", start.line + 1, start.character, diagnostic.message)
}

#[cfg(test)]
mod tests {
	use bluejay_lsp::lsp_types::{Position, Range};

	use super::*;

	#[cfg(unix)]
	#[test]
	fn file_uri_escapes_reserved_bytes() {
		let uri = file_uri(Path::new("/home/user/my proofs/a#1.bjy")).unwrap();
		assert_eq!(uri.as_str(), "file:///home/user/my%20proofs/a%231.bjy");
	}

	#[test]
	fn file_uri_rejects_relative_paths() {
		assert!(file_uri(Path::new("proofs/a.bjy")).is_err());
	}

	#[test]
	fn renders_one_based_lines() {
		let diagnostic = Diagnostic {
			range: Range::new(Position::new(2, 4), Position::new(2, 9)),
			severity: Some(DiagnosticSeverity::WARNING),
			message: "statement 3: timeout".into(),
			..Diagnostic::default()
		};
		assert_eq!(render(&diagnostic), "3:4 warning statement 3: timeout");
	}
}
