use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use brine_thrift::decode_to_json;
use brine_thrift_compiler::{generate_all, lower_file, CompileError, FileId, GenOptions, SchemaTree, Session};
use brine_thrift_compiler::options::ErrorPolicy;

#[derive(Parser)]
#[command(name = "bthrift")]
#[command(about = "Generate Rust from Thrift schema trees, or decode binary payloads", long_about = None)]
struct Cli {
    /// Log engine progress to stderr (`RUST_LOG` takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate Rust modules for a JSON schema tree
    GenRust {
        /// Schema tree produced by the parser, as JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Files to generate, by index (defaults to every file); includes follow
        #[arg(short, long = "root")]
        roots: Vec<usize>,

        /// Directory the modules are written to
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Generator options as JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Hold struct fields and elements inline instead of boxed
        #[arg(long)]
        inline_containers: bool,

        /// Skip declarations that fail to resolve instead of stopping
        #[arg(long)]
        keep_going: bool,
    },

    /// Decode a binary payload against a schema tree and print it as JSON
    Decode {
        /// Schema tree produced by the parser, as JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Index of the file the type is looked up from
        #[arg(short, long)]
        file: usize,

        /// Struct name as generated code names it from that file
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Binary protocol payload
        #[arg(short, long)]
        data: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) if verbose => EnvFilter::new("debug"),
        Err(_) => EnvFilter::new("warn"),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn read_tree(input: &PathBuf) -> Result<SchemaTree, CompileError> {
    let text = fs::read_to_string(input)?;
    let tree: SchemaTree = serde_json::from_str(&text)?;
    tracing::info!(path = %input.display(), files = tree.files.len(), "schema tree loaded");
    Ok(tree)
}

fn main() -> Result<(), CompileError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::GenRust { input, roots, out_dir, config, inline_containers, keep_going } => {
            let tree = read_tree(&input)?;
            let mut options = match config {
                Some(path) => GenOptions::from_json(&fs::read_to_string(path)?)?,
                None => GenOptions::default(),
            };
            if inline_containers {
                options.inline_containers = true;
            }
            if keep_going {
                options.error_policy = ErrorPolicy::Continue;
            }

            let roots: Vec<FileId> = roots.into_iter().map(FileId).collect();
            let generation = generate_all(&tree, &roots, options)?;
            for diagnostic in &generation.diagnostics {
                eprintln!("skipped {}", diagnostic);
            }
            let written = generation.write_to(&out_dir)?;
            println!("Generated {} files in {}", written.len(), out_dir.display());
            Ok(())
        }

        Commands::Decode { input, file, type_name, data } => {
            let tree = read_tree(&input)?;
            let mut session = Session::new(&tree, GenOptions::default());
            let schema = lower_file(&mut session, FileId(file))?;
            let bytes = fs::read(data)?;
            let json = decode_to_json(&schema, &type_name, &bytes)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }
    }
}
