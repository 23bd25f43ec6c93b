use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use npm_buildinfo::export::{self, ExportFormat};
use npm_buildinfo::extract::{calculate_dependencies_list, ExtractOptions};
use npm_buildinfo::npm::{npm_version, NpmCli};
use npm_buildinfo::parser::{read_package_info, PackageInfo};
use semver::Version;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "npm-buildinfo")]
#[command(author = "Zachary Woods <143150513+zach-fau@users.noreply.github.com>")]
#[command(version)]
#[command(about = "Extracts a flattened, checksummed npm dependency list for build-info records", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs to stderr as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the dependency list of an npm project
    Deps {
        /// Project directory (defaults to current directory)
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// npm executable to run (defaults to npm on PATH)
        #[arg(long, env = "NPM_BUILDINFO_NPM")]
        npm: Option<PathBuf>,

        /// Compute md5/sha1/sha256 of each tarball from the npm cache
        #[arg(short, long)]
        checksums: bool,

        /// Module id every requestedBy path ends at (defaults to package.json's)
        #[arg(long)]
        module_id: Option<String>,

        /// Output format: json or markdown
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extra arguments passed to npm ls and npm config
        #[arg(last = true)]
        npm_args: Vec<String>,
    },
    /// Show the module identity derived from package.json
    Module {
        /// Project directory (defaults to current directory)
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// npm executable to run (defaults to npm on PATH)
        #[arg(long, env = "NPM_BUILDINFO_NPM")]
        npm: Option<PathBuf>,
    },
    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Some(Commands::Deps {
            path,
            npm,
            checksums,
            module_id,
            format,
            output,
            npm_args,
        }) => {
            let npm = npm_cli(npm)?;
            let version = npm_version(&npm)?;
            let module_id = match module_id {
                Some(id) => id,
                None => package_info(&path, &version)?.build_info_module_id(),
            };
            info!(
                "Collecting dependencies of {} with {}",
                module_id,
                npm.executable().display()
            );

            let options = ExtractOptions::new(&path, module_id)
                .with_npm_args(npm_args)
                .with_checksums(checksums)
                .with_npm_version(version);
            let report = calculate_dependencies_list(&npm, &options)?;

            match output {
                Some(file) => {
                    let mut writer = BufWriter::new(
                        File::create(&file)
                            .with_context(|| format!("creating {}", file.display()))?,
                    );
                    export::export(format, &report, &mut writer)?;
                    writer.flush()?;
                }
                None => export::export(format, &report, &mut io::stdout().lock())?,
            }
        }
        Some(Commands::Module { path, npm }) => {
            let npm = npm_cli(npm)?;
            let info = package_info(&path, &npm_version(&npm)?)?;
            println!("Module id:   {}", info.build_info_module_id());
            println!("Full name:   {}", info.full_name());
            println!("Deploy path: {}", info.deploy_path());
        }
        Some(Commands::Version) => {
            println!("npm-buildinfo v{}", env!("CARGO_PKG_VERSION"));
        }
        None => {
            println!("npm-buildinfo - build-info dependency extraction for npm projects");
            println!("Run 'npm-buildinfo deps' to list the dependencies of the current project");
            println!("Run 'npm-buildinfo --help' for more information");
        }
    }

    Ok(())
}

fn npm_cli(executable: Option<PathBuf>) -> Result<NpmCli> {
    Ok(match executable {
        Some(path) => NpmCli::new(path),
        None => NpmCli::locate()?,
    })
}

fn package_info(project_dir: &Path, npm_version: &Version) -> Result<PackageInfo> {
    read_package_info(project_dir, Some(npm_version))
        .with_context(|| format!("reading package.json in {}", project_dir.display()))
}

/// Logs go to stderr so stdout stays a clean report.
fn init_tracing(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = tracing_subscriber::registry().with(filter);
    if json {
        subscriber
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(io::stderr))
            .init();
    }
}
