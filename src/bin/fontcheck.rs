//! Font checking tool.
//!
//! `fontcheck sanitize` runs the built-in rules over one font file and prints the
//! sanitizer statistics; `fontcheck load` pushes a set of faces through the full
//! loader (validation, timeout, resolver) and prints the load summary.

use clap::{ArgAction, Args, Parser, Subcommand};
use fontface_loader::font::ParsedFont;
use fontface_loader::loader::{FileFontRequest, UrlFontRequest};
use fontface_loader::sanitizer::builtin;
use fontface_loader::{FontLoader, LoadParams, LoaderOptions, LogLevel, Sanitizer};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fontcheck", version, about = "Validate, sanitize and load font files")]
struct Cli {
  /// Log verbosity (debug, info, warn, error)
  #[arg(long, default_value = "warn")]
  log_level: LogLevel,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Sanitize one font file with the built-in rules
  Sanitize(SanitizeArgs),
  /// Load faces through the font loader and report the summary
  Load(LoadArgs),
}

#[derive(Args, Debug)]
struct SanitizeArgs {
  /// Font file to sanitize
  input: PathBuf,

  /// Write the cleaned font here
  #[arg(short, long, value_name = "FILE")]
  output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct LoadArgs {
  /// Faces as FAMILY=SOURCE, where SOURCE is an http(s) URL or a file path (repeatable)
  #[arg(required = true, value_parser = parse_face_arg)]
  faces: Vec<(String, String)>,

  /// Per-face timeout in milliseconds
  #[arg(long, value_name = "MS")]
  timeout_ms: Option<u64>,

  /// Do not send failed faces through the resolver
  #[arg(long, action = ArgAction::SetTrue)]
  no_resolvers: bool,
}

fn parse_face_arg(raw: &str) -> Result<(String, String), String> {
  match raw.split_once('=') {
    Some((family, source)) if !family.trim().is_empty() && !source.trim().is_empty() => {
      Ok((family.to_string(), source.to_string()))
    }
    _ => Err(format!("expected FAMILY=SOURCE, got '{}'", raw)),
  }
}

fn run_sanitize(args: &SanitizeArgs) -> Result<bool, Box<dyn std::error::Error>> {
  let data = fs::read(&args.input)?;
  let font = ParsedFont::parse(&data)?;
  let result = Sanitizer::new().sanitize(&font, &builtin::default_rules(&font));

  println!("family: {}", font.family_name);
  println!("success: {}", result.success);
  println!("message: {}", result.message);
  if let Some(stats) = &result.stats {
    println!("stats: {}", serde_json::to_string_pretty(stats)?);
  }
  for err in &result.errors {
    println!("error: {}", err);
  }

  if let (Some(path), Some(bytes)) = (&args.output, &result.font) {
    fs::write(path, bytes)?;
    println!("wrote {} bytes to {}", bytes.len(), path.display());
  }
  Ok(result.success)
}

fn run_load(args: &LoadArgs, log_level: LogLevel) -> Result<bool, Box<dyn std::error::Error>> {
  let mut options = LoaderOptions::from_env()
    .debug_level(log_level)
    .use_resolvers(!args.no_resolvers);
  if let Some(ms) = args.timeout_ms {
    options = options.default_timeout(Duration::from_millis(ms));
  }
  let loader = FontLoader::new(options);

  let (urls, files): (Vec<_>, Vec<_>) = args
    .faces
    .iter()
    .partition(|(_, source)| source.starts_with("http://") || source.starts_with("https://"));
  let urls: Vec<UrlFontRequest> = urls
    .into_iter()
    .map(|(family, url)| UrlFontRequest {
      family: family.clone(),
      url: url.clone(),
      options: None,
    })
    .collect();
  let files: Vec<FileFontRequest> = files
    .into_iter()
    .map(|(family, path)| FileFontRequest {
      family: family.clone(),
      path: PathBuf::from(path),
      options: None,
    })
    .collect();

  let params = LoadParams::new();
  let mut summary = loader.load_from_urls(&urls, &params);
  let from_files = loader.load_from_files(&files, &params);
  summary.total += from_files.total;
  summary.succeeded += from_files.succeeded;
  summary.failed += from_files.failed;
  summary.failed_families.extend(from_files.failed_families);

  println!("{}", serde_json::to_string_pretty(&summary)?);
  for (family, err) in loader.get_font_face_errors() {
    println!("{}: {}", family, err);
    for detail in err.details.iter().skip(1) {
      println!("  {}", detail);
    }
  }
  Ok(summary.failed == 0)
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::new(cli.log_level.as_str()))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let outcome = match &cli.command {
    Command::Sanitize(args) => run_sanitize(args),
    Command::Load(args) => run_load(args, cli.log_level),
  };
  match outcome {
    Ok(true) => ExitCode::SUCCESS,
    Ok(false) => ExitCode::from(1),
    Err(err) => {
      eprintln!("fontcheck: {}", err);
      ExitCode::from(2)
    }
  }
}
