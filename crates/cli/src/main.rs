mod load;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tessera_core::RawValue;
use tessera_eval::{Instance, Registry, Value};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Rule-based type dispatch for JSON and TOML records.
#[derive(Parser)]
#[command(name = "tessera", version, about = "Rule-based type dispatch for raw records")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log resolution and registration decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a catalogue and list its families and types
    Check {
        /// Path to the catalogue (.json or .toml)
        catalogue: PathBuf,
    },

    /// Resolve a record to a member of a family
    Resolve {
        /// Path to the catalogue (.json or .toml)
        catalogue: PathBuf,
        /// Family to resolve against
        #[arg(long)]
        family: String,
        /// Path to the record (.json or .toml)
        record: PathBuf,
    },

    /// Build a typed value from a record
    Build {
        /// Path to the catalogue (.json or .toml)
        catalogue: PathBuf,
        /// Family or type to build
        #[arg(long)]
        target: String,
        /// Path to the record (.json or .toml)
        record: PathBuf,
    },

    /// Build a typed value, then flatten it back to a raw record
    Flatten {
        /// Path to the catalogue (.json or .toml)
        catalogue: PathBuf,
        /// Family or type to build
        #[arg(long)]
        target: String,
        /// Path to the record (.json or .toml)
        record: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Check { catalogue } => {
            cmd_check(&catalogue, cli.output, cli.quiet);
        }
        Commands::Resolve {
            catalogue,
            family,
            record,
        } => {
            cmd_resolve(&catalogue, &family, &record, cli.output, cli.quiet);
        }
        Commands::Build {
            catalogue,
            target,
            record,
        } => {
            cmd_build(&catalogue, &target, &record, cli.output, cli.quiet);
        }
        Commands::Flatten {
            catalogue,
            target,
            record,
        } => {
            cmd_flatten(&catalogue, &target, &record, cli.output, cli.quiet);
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
///
/// `TESSERA_LOG` takes `EnvFilter` directives; without it the level is
/// `warn`, or `debug` with `--verbose`.
fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("TESSERA_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ──────────────────────────────────────────────
// Subcommands
// ──────────────────────────────────────────────

#[derive(Serialize)]
struct FamilySummary<'a> {
    name: &'a str,
    discriminators: Vec<String>,
    members: Vec<&'a str>,
}

fn cmd_check(catalogue_path: &Path, output: OutputFormat, quiet: bool) {
    let (_, registry) = load_registry_or_exit(catalogue_path, output, quiet);

    let families: Vec<FamilySummary> = registry
        .family_names()
        .filter_map(|name| {
            let decl = registry.family(name)?;
            Some(FamilySummary {
                name,
                discriminators: decl.discriminators.iter().map(ToString::to_string).collect(),
                members: registry.members(name),
            })
        })
        .collect();
    let plain: Vec<&str> = registry
        .type_names()
        .filter(|name| registry.family_of(name).is_none())
        .collect();

    match output {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "families": families,
                "types": plain,
            });
            print_json(&result);
        }
        OutputFormat::Text => {
            if quiet {
                return;
            }
            let member_count: usize = families.iter().map(|f| f.members.len()).sum();
            println!(
                "catalogue OK: {} families, {} types",
                families.len(),
                member_count + plain.len()
            );
            for family in &families {
                let keys = if family.discriminators.is_empty() {
                    "predicates only".to_string()
                } else {
                    format!("keyed on {}", family.discriminators.join(", "))
                };
                println!("  {} ({}): {}", family.name, keys, family.members.join(", "));
            }
            if !plain.is_empty() {
                println!("  types: {}", plain.join(", "));
            }
        }
    }
}

fn cmd_resolve(
    catalogue_path: &Path,
    family: &str,
    record_path: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let (_, registry) = load_registry_or_exit(catalogue_path, output, quiet);
    let record = load_record_or_exit(record_path, output, quiet);

    match tessera_eval::resolve(&registry, family, &record) {
        Ok(decl) => match output {
            OutputFormat::Json => print_json(&serde_json::json!({
                "family": family,
                "type": decl.name,
            })),
            OutputFormat::Text => println!("{}", decl.name),
        },
        Err(e) => {
            report_error(&format!("resolution error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_build(
    catalogue_path: &Path,
    target: &str,
    record_path: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let (_, registry) = load_registry_or_exit(catalogue_path, output, quiet);
    let record = load_record_or_exit(record_path, output, quiet);
    let instance = build_or_exit(&registry, target, &record, output, quiet);

    match output {
        OutputFormat::Json => {
            print_json(&tessera_eval::value_to_json(&Value::Object(instance)));
        }
        OutputFormat::Text => println!("{}", format_instance(&instance, 0)),
    }
}

fn cmd_flatten(
    catalogue_path: &Path,
    target: &str,
    record_path: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let (_, registry) = load_registry_or_exit(catalogue_path, output, quiet);
    let record = load_record_or_exit(record_path, output, quiet);
    let instance = build_or_exit(&registry, target, &record, output, quiet);
    let flat = tessera_eval::flatten(&registry, &instance);

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "type": instance.type_name,
            "record": flat,
        })),
        OutputFormat::Text => print_json(&RawValue::Object(flat)),
    }
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn load_registry_or_exit(
    path: &Path,
    output: OutputFormat,
    quiet: bool,
) -> (tessera_core::Catalogue, Registry) {
    match load::load_registry(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn load_record_or_exit(path: &Path, output: OutputFormat, quiet: bool) -> tessera_core::RawRecord {
    match load::load_record(path) {
        Ok(record) => record,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn build_or_exit(
    registry: &Registry,
    target: &str,
    record: &tessera_core::RawRecord,
    output: OutputFormat,
    quiet: bool,
) -> Instance {
    match tessera_eval::build(registry, target, record) {
        Ok(instance) => instance,
        Err(e) => {
            report_error(&format!("build error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn print_json(v: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
    );
}

/// Format a built instance as an indented tree for text output.
fn format_instance(instance: &Instance, depth: usize) -> String {
    let pad = "  ".repeat(depth + 1);
    let mut out = format!("{} {{", instance.type_name);
    for (name, value) in &instance.fields {
        out.push_str(&format!("\n{}{}: {}", pad, name, format_value(value, depth + 1)));
    }
    out.push_str(&format!("\n{}}}", "  ".repeat(depth)));
    out
}

fn format_value(v: &Value, depth: usize) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::Text(s) => format!("{:?}", s),
        Value::Object(instance) => format_instance(instance, depth),
        Value::List(items) | Value::Tuple(items) => {
            let parts: Vec<String> = items.iter().map(|i| format_value(i, depth)).collect();
            let (open, close) = match v {
                Value::Tuple(_) => ("(", ")"),
                _ => ("[", "]"),
            };
            format!("{}{}{}", open, parts.join(", "), close)
        }
        Value::Map(entries) => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", format_value(k, depth), format_value(v, depth)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Raw(raw) => raw.to_string(),
        other => match tessera_eval::value_to_json(other).get("value") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
            None => other.type_name().to_string(),
        },
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
