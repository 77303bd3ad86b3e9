//! modgen - generate modules from a template tree
//!
//! Commands:
//! - new <MODULE> <PACKAGE>: Generate a module next to the selected location
//! - show: Show the template tree and the sub-modules it declares
//! - config: Show the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modgen::copy::{fail_fast, CopyError, ErrorDecision, FileNode};
use modgen::{Generator, ModuleDescriptor};
use modgen_core::Config;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modgen")]
#[command(about = "Generate modules from a template tree and register them in the build settings")]
#[command(version)]
#[command(after_help = r#"TEMPLATE LAYOUT:
    module_templates/
        MODULE/             Renamed to the module name
            api/            Each sub-folder becomes an included sub-module
            impl/
                src/main/kotlin/PACKAGE/...

PATH TOKENS:
    MODULE          Module name (lower-case, spaces become hyphens)
    PACKAGE         Package path under the configured namespace (sk/o2 by default)

EXAMPLES:
    modgen new payments payments --at feature     # feature/payments/{api,impl}
    modgen new "Order History" orders --keep-going
    modgen show                                   # Show template and sub-modules
    modgen config --json                          # Show effective configuration
"#)]
struct Cli {
    /// Project root (default: current directory)
    #[arg(long, global = true, value_name = "PATH")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a module from the project's templates
    New {
        /// Module name
        module: String,

        /// Package name
        package: String,

        /// Selected location; a file selects its parent directory
        #[arg(long, value_name = "PATH")]
        at: Option<PathBuf>,

        /// Keep existing destination entries instead of replacing them
        #[arg(long)]
        no_overwrite: bool,

        /// Report errors and skip the faulty entries instead of aborting
        #[arg(long)]
        keep_going: bool,
    },

    /// Show the template tree and the sub-modules it declares
    Show,

    /// Show the effective configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let mut config = Config::discover(&root)?;
    if let Some(Commands::New {
        no_overwrite: true, ..
    }) = cli.command
    {
        config.overwrite = false;
    }
    let generator = Generator::new(root, config);

    match cli.command {
        Some(Commands::New {
            module,
            package,
            at,
            keep_going,
            ..
        }) => cmd_new(&generator, &module, &package, at, keep_going),

        Some(Commands::Show) => cmd_show(&generator),

        Some(Commands::Config { json }) => cmd_config(&generator, json),

        None => cmd_show(&generator),
    }
}

/// Policy for --keep-going: report and skip
fn keep_going(node: &FileNode, err: &CopyError) -> ErrorDecision {
    eprintln!("warning: {} (skipped {})", err, node.path.display());
    ErrorDecision::Continue
}

/// Generate a module
fn cmd_new(
    generator: &Generator,
    module: &str,
    package: &str,
    at: Option<PathBuf>,
    keep_going_on_error: bool,
) -> Result<()> {
    let descriptor = generator.descriptor(module, package)?;
    let selection = match at {
        Some(at) => at,
        None => generator.project_root().to_path_buf(),
    };

    println!(
        "info: Generating module {} (package {})",
        descriptor.module_name, descriptor.package_name
    );

    let generated = if keep_going_on_error {
        generator.generate(&selection, &descriptor, keep_going)
    } else {
        generator.generate(&selection, &descriptor, fail_fast)
    }
    .with_context(|| format!("Failed to generate module: {}", descriptor.module_name))?;

    println!(
        "success: Module created in {} ({})",
        generated.destination.display(),
        generated.report
    );
    println!("Updated {}", generated.settings_file.display());

    Ok(())
}

/// Show the template tree and the sub-modules a generation would declare
fn cmd_show(generator: &Generator) -> Result<()> {
    let templates = generator.templates_dir();
    if !templates.is_dir() {
        println!("\x1b[2mNo templates found at {}\x1b[0m", templates.display());
        println!("Create one with a single MODULE folder and one sub-folder per sub-module");
        return Ok(());
    }

    println!("\x1b[1mTemplates: {}\x1b[0m", templates.display());
    println!();
    println!("\x1b[36mStructure:\x1b[0m");
    print_tree(&templates, "", true)?;
    println!();

    let sample = ModuleDescriptor {
        module_name: "MODULE".to_string(),
        package_name: "PACKAGE".to_string(),
    };
    let lines = generator.preview(generator.project_root(), &sample)?;

    println!("\x1b[36mDeclared at the project root:\x1b[0m");
    if lines.is_empty() {
        println!("  (none)");
    }
    for line in &lines {
        println!("  {}", line);
    }

    Ok(())
}

/// Print directory tree structure
fn print_tree(path: &Path, prefix: &str, is_last: bool) -> Result<()> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or(".");

    let connector = if prefix.is_empty() {
        ""
    } else if is_last {
        "--- "
    } else {
        "|-- "
    };

    println!("{}{}{}", prefix, connector, name);

    if path.is_dir() {
        let mut entries: Vec<_> = std::fs::read_dir(path)?.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.file_name());

        let count = entries.len();
        for (i, entry) in entries.into_iter().enumerate() {
            let new_prefix = if is_last {
                format!("{}    ", prefix)
            } else {
                format!("{}|   ", prefix)
            };

            print_tree(&entry.path(), &new_prefix, i == count - 1)?;
        }
    }

    Ok(())
}

/// Show the effective configuration
fn cmd_config(generator: &Generator, json: bool) -> Result<()> {
    let config = generator.config();

    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("\x1b[1mConfiguration\x1b[0m");
    println!("  templates_dir  {}", config.templates_dir.display());
    println!("  settings_file  {}", config.settings_file.display());
    println!("  namespace      {}", config.namespace_path());
    println!("  overwrite      {}", config.overwrite);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_keep_going_skips() {
        let node = FileNode::stat(Path::new("/nonexistent/modgen/file"));
        let err = CopyError::SourceMissing(node.path.clone());
        assert_eq!(keep_going(&node, &err), ErrorDecision::Continue);
    }

    #[test]
    fn test_new_flags() {
        let cli = Cli::try_parse_from([
            "modgen",
            "--root",
            "/work/app",
            "new",
            "payments",
            "pay",
            "--at",
            "feature",
            "--keep-going",
        ])
        .unwrap();

        assert_eq!(cli.root, Some(PathBuf::from("/work/app")));
        match cli.command {
            Some(Commands::New {
                module,
                package,
                at,
                no_overwrite,
                keep_going,
            }) => {
                assert_eq!(module, "payments");
                assert_eq!(package, "pay");
                assert_eq!(at, Some(PathBuf::from("feature")));
                assert!(!no_overwrite);
                assert!(keep_going);
            }
            _ => panic!("expected new command"),
        }
    }
}
