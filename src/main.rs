use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use trizip::cli::{
    compare_dirs, format_comparisons, inspect_carriers, restore_files, secure_files,
    RestoreOptions, SecureOptions,
};
use trizip::config::{Compression, HashAlgorithm, PipelineOptions};

/// Version info from build.rs
const VERSION: &str = env!("TRIZIP_VERSION");
const BUILD: &str = env!("TRIZIP_BUILD");
const PROFILE: &str = env!("TRIZIP_PROFILE");
const GIT_HASH: &str = env!("TRIZIP_GIT_HASH");

fn get_version() -> &'static str {
    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(|| format!("{} {} build {} ({})", PROFILE, VERSION, BUILD, GIT_HASH))
}

#[derive(Parser)]
#[command(name = "trizip")]
#[command(author, about = "Seal files and split them across steganographic image carriers", long_about = None)]
struct Cli {
    /// Print version
    #[arg(short = 'V', long)]
    version: bool,

    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Seal files and hide them across cover images
    #[command(alias = "s")]
    Secure {
        /// Passphrase
        #[arg(long, env = "TRIZIP_KEY", hide_env_values = true)]
        key: String,

        /// Files to secure
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Cover image; repeat once per carrier
        #[arg(short, long = "cover", required = true)]
        covers: Vec<PathBuf>,

        /// Output directory base; a numeric suffix is added
        #[arg(short, long, default_value = "encrypted_output")]
        output: PathBuf,

        /// Compression algorithm
        #[arg(long, default_value = "zstd", value_parser = parse_compression)]
        compression: Compression,

        /// Hash algorithm for fingerprints in the report
        #[arg(long, default_value = "sha256", value_parser = parse_hash)]
        hash: HashAlgorithm,

        /// Embed one carrier at a time
        #[arg(long)]
        sequential: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recover files from a complete set of carriers, in any order
    #[command(alias = "r")]
    Restore {
        /// Passphrase
        #[arg(long, env = "TRIZIP_KEY", hide_env_values = true)]
        key: String,

        /// Carrier images
        #[arg(required = true)]
        carriers: Vec<PathBuf>,

        /// Number of carriers in the original set
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Output directory base; a numeric suffix is added
        #[arg(short, long, default_value = "decrypted_output")]
        output: PathBuf,

        /// Hash algorithm for fingerprints in the report
        #[arg(long, default_value = "sha256", value_parser = parse_hash)]
        hash: HashAlgorithm,

        /// Reveal one carrier at a time
        #[arg(long)]
        sequential: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which chunk each carrier holds, without a key
    #[command(alias = "i")]
    Inspect {
        /// Carrier images
        #[arg(required = true)]
        carriers: Vec<PathBuf>,
    },

    /// Compare two directories file by file, matching on file stem
    #[command(alias = "c")]
    Compare {
        left: PathBuf,
        right: PathBuf,

        /// Hash algorithm
        #[arg(long, default_value = "sha256", value_parser = parse_hash)]
        hash: HashAlgorithm,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_hash(s: &str) -> Result<HashAlgorithm, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_compression(s: &str) -> Result<Compression, String> {
    s.parse().map_err(|e| format!("{}", e))
}

/// Respects `RUST_LOG` if set, otherwise `warn` or `debug` with `--verbose`
fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> trizip::Result<()> {
    match command {
        Commands::Secure {
            key,
            inputs,
            covers,
            output,
            compression,
            hash,
            sequential,
            json,
        } => {
            let options = SecureOptions {
                key,
                output_base: output,
                pipeline: PipelineOptions {
                    compression,
                    parallel: !sequential,
                },
                hash,
            };
            let report = secure_files(&inputs, &covers, &options)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Secured {} file(s) across {} carriers in {}",
                    report.inputs.len(),
                    report.carriers.len(),
                    report.output_dir.display()
                );
                for carrier in &report.carriers {
                    println!(
                        "  [{}] {} ({} bytes)",
                        carrier.index,
                        carrier.carrier.display(),
                        carrier.payload_bytes
                    );
                }
            }
            Ok(())
        }

        Commands::Restore {
            key,
            carriers,
            count,
            output,
            hash,
            sequential,
            json,
        } => {
            let options = RestoreOptions {
                key,
                expected_count: count,
                output_base: output,
                pipeline: PipelineOptions {
                    parallel: !sequential,
                    ..Default::default()
                },
                hash,
            };
            let report = restore_files(&carriers, &options)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Restored {} file(s) to {}",
                    report.files.len(),
                    report.output_dir.display()
                );
                for file in &report.files {
                    println!("  {} ({} bytes)", file.name, file.bytes);
                }
            }
            Ok(())
        }

        Commands::Inspect { carriers } => {
            print!("{}", inspect_carriers(&carriers)?);
            Ok(())
        }

        Commands::Compare {
            left,
            right,
            hash,
            json,
        } => {
            let results = compare_dirs(&left, &right, hash)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print!("{}", format_comparisons(&results));
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("trizip {}", get_version());
        return ExitCode::SUCCESS;
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            use clap::CommandFactory;
            if Cli::command().print_help().is_err() {
                return ExitCode::FAILURE;
            }
            println!();
            return ExitCode::SUCCESS;
        }
    };

    setup_tracing(cli.verbose);

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
