mod dump;
mod inspect;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "jinspect",
    version,
    about = "Builds a resolved model of Java sources and class files",
    long_about = "jinspect reads class files from a classpath and Java sources from directories, \
                  merges them into one model of types and members, resolves every name and call, \
                  and reports what it could not resolve."
)]
pub struct Cli {
    /// JSON session configuration; JINSPECT_* variables override it.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also log to stderr (the log file is always written).
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Inputs of one analysis session.
#[derive(Args, Debug, Default, Clone)]
pub struct Inputs {
    /// Jar, zip or class directory. Earlier entries win over later ones.
    #[arg(long, num_args = 1.., value_name = "ENTRY")]
    pub classpath: Vec<PathBuf>,

    /// Directories searched recursively for `*.java` files.
    #[arg(long, num_args = 1.., value_name = "DIR")]
    pub sources: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print resolved types and diagnostics
    #[command(
        long_about = "Resolves every source type and prints its kind, modifiers, supertypes and \
                      members, followed by the diagnostics of the session."
    )]
    Inspect {
        #[command(flatten)]
        inputs: Inputs,

        /// Print only this type (canonical or binary name). Classpath types are accepted.
        #[arg(long = "type", value_name = "FQN")]
        type_name: Option<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print only the diagnostics of a session
    Diagnostics {
        #[command(flatten)]
        inputs: Inputs,

        #[arg(long)]
        json: bool,
    },
    /// Decode one class file and print its declaration shape
    DumpClass {
        #[arg(value_name = "CLASS_FILE")]
        file: PathBuf,
    },
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = jinspect_core::logging::init_logging("inspect", cli.verbose);

    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::Inspect {
            inputs,
            type_name,
            json,
        } => {
            let config = jinspect_core::SessionConfig::load(cli.config.as_deref())?;
            inspect::inspect(&mut out, config, &inputs, type_name.as_deref(), json)
        }
        Commands::Diagnostics { inputs, json } => {
            let config = jinspect_core::SessionConfig::load(cli.config.as_deref())?;
            inspect::diagnostics(&mut out, config, &inputs, json)
        }
        Commands::DumpClass { file } => dump::dump_class(&mut out, &file),
    }
}
