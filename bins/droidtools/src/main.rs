//! droidtools CLI
//!
//! Overlay generation from APKs and printable string tools for binary files.
//! Invoked as `binarysearch` or `binaryeditor` it behaves like the matching
//! subcommand.

use clap::{Parser, Subcommand};
use droidtools_android::apktool;
use droidtools_android::binary::{self, FileMatches, Replacement, StringScanner};
use droidtools_android::pipeline::{self, OverlayJob, OverlayRequest};
use droidtools_android::render::RenderOptions;
use droidtools_cli::output::{format_count, format_duration, set_quiet, Status};
use droidtools_cli::prompt;
use droidtools_core::config::Config;
use droidtools_core::error::{exit_codes, Result};
use droidtools_telemetry::{TelemetryConfig, Timer};
use owo_colors::{OwoColorize, Stream};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "droidtools")]
#[command(about = "Android platform tools: APK resource diffing, RRO overlays and binary string editing")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Diff an APK's resources against an AOSP tree and generate overlay files
    Overlay {
        /// APK to extract
        archive: PathBuf,
        /// AOSP resource directory to compare against
        reference: PathBuf,
        /// Differences file [default: config.xml]
        #[arg(long)]
        output: Option<PathBuf>,
        /// Common-keys file [default: cleaned_config.xml]
        #[arg(long)]
        cleaned_output: Option<PathBuf>,
        /// Scaffold an RRO package with this name
        #[arg(long)]
        overlay_name: Option<String>,
        /// Package name of the overlay [default: <target>.overlay]
        #[arg(long, requires = "overlay_name")]
        overlay_package: Option<String>,
        /// Directory receiving overlay packages [default: rro_output]
        #[arg(long)]
        rro_output: Option<PathBuf>,
        /// JVM heap for apktool, e.g. 4096m
        #[arg(long)]
        heap: Option<String>,
    },

    /// Search binary files for printable strings
    #[command(name = "binary-search")]
    BinarySearch {
        /// Pattern, '*' matches anything
        pattern: String,
        /// File or directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Replace printable strings inside binary files
    #[command(name = "binary-edit")]
    BinaryEdit {
        /// Pattern, '*' matches anything
        pattern: String,
        /// File or directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Replacement text; without it this is a search
        replacement: Option<String>,
        /// Apply every edit without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Diagnose environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Insert the subcommand implied by the executable name, if any
fn dispatch_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().collect();
    let alias = args
        .first()
        .and_then(|arg0| Path::new(arg0).file_stem())
        .and_then(|stem| stem.to_str())
        .and_then(|stem| match stem {
            "binarysearch" => Some("binary-search"),
            "binaryeditor" => Some("binary-edit"),
            _ => None,
        });

    if let Some(subcommand) = alias {
        args.insert(1, OsString::from(subcommand));
    }
    args
}

fn main() {
    let cli = Cli::parse_from(dispatch_args(std::env::args_os()));

    if cli.no_color {
        owo_colors::set_override(false);
    }
    set_quiet(cli.quiet);

    if let Err(e) =
        droidtools_telemetry::init_with_config(TelemetryConfig::from_verbosity(cli.verbose, cli.quiet))
    {
        Status::warning(&format!("Logging disabled: {}", e));
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(code = %err.code, "Command failed");
            Status::error(&err.to_string());
            err.exit_code()
        }
    };

    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = Config::load(cli.config.as_deref())?;
    if let Some(path) = &config.path {
        tracing::debug!(path = %path.display(), "Loaded config");
    }

    match cli.command {
        Commands::Overlay {
            archive,
            reference,
            output,
            cleaned_output,
            overlay_name,
            overlay_package,
            rro_output,
            heap,
        } => {
            let defaults = &config.schema.overlay;
            let job = OverlayJob {
                archive,
                reference,
                output: output.unwrap_or_else(|| defaults.output.clone()),
                cleaned_output: cleaned_output.unwrap_or_else(|| defaults.cleaned_output.clone()),
                overlay: overlay_name.map(|name| OverlayRequest {
                    name,
                    package: overlay_package,
                    output_dir: rro_output.unwrap_or_else(|| defaults.rro_output.clone()),
                }),
                render: RenderOptions::current(defaults.copyright_holder.clone()),
            };
            let mut apktool = config.schema.apktool.clone();
            if let Some(heap) = heap {
                apktool.heap = heap;
            }
            run_overlay(&job, &apktool)
        }
        Commands::BinarySearch { pattern, path } => run_binary(&config, &pattern, &path, None, false),
        Commands::BinaryEdit {
            pattern,
            path,
            replacement,
            yes,
        } => run_binary(&config, &pattern, &path, replacement.as_deref(), yes),
        Commands::Doctor { json } => run_doctor(&config, json),
    }
}

fn run_overlay(job: &OverlayJob, apktool: &droidtools_core::config::ApktoolConfig) -> Result<i32> {
    Status::header("Overlay generation");
    let timer = Timer::start("overlay");

    let report = pipeline::run(job, apktool)?;

    Status::info(&format!(
        "Reference {}, archive {}",
        format_count(report.reference_entries, "resource", "resources"),
        format_count(report.target_entries, "resource", "resources"),
    ));
    Status::success(&format!(
        "{}: {} ({} added, {} only in reference)",
        job.output.display(),
        format_count(report.overrides, "difference", "differences"),
        report.additions,
        report.removals,
    ));
    Status::success(&format!(
        "{}: {}",
        job.cleaned_output.display(),
        format_count(report.common, "common resource", "common resources"),
    ));
    if let (Some(dir), Some(target)) = (&report.overlay_dir, &report.target_package) {
        Status::success(&format!("Overlay for {} created in {}", target, dir.display()));
    }

    Status::info(&format!("Finished in {}", format_duration(timer.stop())));
    Ok(exit_codes::SUCCESS)
}

fn run_binary(
    config: &Config,
    pattern: &str,
    path: &Path,
    replacement: Option<&str>,
    yes: bool,
) -> Result<i32> {
    let regex = binary::pattern_to_regex(pattern)?;
    let scanner = StringScanner::new(regex)
        .min_length(config.schema.binary.min_string_length)
        .exclude_dirs(&config.schema.binary.exclude_dirs)
        .replacement(replacement);

    match replacement {
        Some(replacement) => Status::header(&format!(
            "Replacing '{}' with '{}' in {}",
            scanner.regex(),
            replacement,
            path.display()
        )),
        None => Status::header(&format!("Searching '{}' in {}", scanner.regex(), path.display())),
    }

    let results = scanner.scan_tree(path)?;

    match replacement {
        None => {
            for found in &results {
                print_matches(found);
            }
        }
        Some(replacement) => {
            for found in &results {
                edit_file(&scanner, found, replacement, yes);
            }
        }
    }

    Ok(exit_codes::SUCCESS)
}

fn print_matches(found: &FileMatches) {
    if found.matches.is_empty() {
        return;
    }
    let joined = found.matches.join(", ");
    println!(
        "   {}: {}",
        found.path.display(),
        joined.if_supports_color(Stream::Stdout, |s| s.yellow())
    );
}

fn edit_file(scanner: &StringScanner, found: &FileMatches, replacement: &str, yes: bool) {
    if found.matches.is_empty() {
        if found.replacement_found {
            println!("   {}: {} Found.", found.path.display(), replacement);
        }
        return;
    }

    println!("   {} : {}", found.path.display(), found.matches.join(", "));
    for old in &found.matches {
        match binary::plan_replacement(old, scanner.regex(), replacement) {
            Replacement::TooLong { old, new } => {
                println!("     {} -> {} [N] String too long...", old, new);
            }
            Replacement::Ready(edit) => {
                let question = format!("     {} -> {}", edit.old, edit.new);
                let accepted = if yes {
                    println!("{}", question);
                    true
                } else {
                    prompt::confirm(&question)
                };
                if !accepted {
                    println!("     Ignored.");
                    continue;
                }
                match binary::apply_edits(&found.path, std::slice::from_ref(&edit)) {
                    Ok(0) => println!("     Not NUL terminated on disk, skipped."),
                    Ok(count) => {
                        tracing::info!(file = %found.path.display(), count, "Edited file");
                        println!("     Done!");
                    }
                    Err(e) => Status::warning(&format!("{}: {}", found.path.display(), e)),
                }
            }
        }
    }
}

fn run_doctor(config: &Config, json: bool) -> Result<i32> {
    let status = apktool::check(&config.schema.apktool);
    let code = if status.is_available() {
        exit_codes::SUCCESS
    } else {
        exit_codes::COMMAND_NOT_FOUND
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(code);
    }

    println!("Environment Check");
    println!();
    match (&status.path, &status.version) {
        (Some(path), Some(version)) => {
            Status::success(&format!("{}: {} ({})", status.name, version, path.display()));
        }
        (Some(path), None) => Status::success(&format!("{}: {}", status.name, path.display())),
        (None, _) => Status::error(&format!(
            "{}: not found. Install apktool and make sure it is on PATH",
            status.name
        )),
    }

    Ok(code)
}
