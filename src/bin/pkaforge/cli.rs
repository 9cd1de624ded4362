use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "pkaforge",
    about = "Graph neural network pKa prediction for small molecules",
    version,
    author,
    before_help = crate::display::banner_for_help(),
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Predict pKa values for every ionizable site
    #[command(visible_alias = "p")]
    Predict(PredictArgs),

    /// List ionization sites without running the models
    #[command(visible_alias = "s")]
    Sites(SitesArgs),

    /// Predict the built-in reference structure
    Demo(DemoArgs),
}

impl Command {
    pub fn output(&self) -> &OutputOptions {
        match self {
            Command::Predict(args) => &args.output,
            Command::Sites(args) => &args.output,
            Command::Demo(args) => &args.output,
        }
    }
}

/// Structure input shared by predict and sites.
#[derive(Args)]
pub struct InputOptions {
    /// SMILES strings to process
    #[arg(value_name = "SMILES")]
    pub smiles: Vec<String>,

    /// Input file (stdin if omitted and no SMILES are given)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Input format (inferred from extension if not specified)
    #[arg(long = "infmt", value_name = "FORMAT")]
    pub input_format: Option<InputFormat>,
}

/// Output options shared by all commands.
#[derive(Args)]
pub struct OutputOptions {
    /// Output file (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write one JSON object per structure instead of a table
    #[arg(long)]
    pub json: bool,

    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Args)]
#[command(next_help_heading = "Normalization")]
pub struct NormalizeOptions {
    /// Keep formal charges instead of neutralizing them
    #[arg(long)]
    pub keep_charges: bool,

    /// Keep only the largest fragment of salts and mixtures
    #[arg(long)]
    pub largest_fragment: bool,

    /// Custom ionization pattern table (TOML file)
    #[arg(long, value_name = "FILE")]
    pub patterns: Option<PathBuf>,
}

#[derive(Args)]
#[command(next_help_heading = "Model")]
pub struct ModelOptions {
    /// Directory containing weight_acid and weight_base files
    #[arg(long = "models", value_name = "DIR", env = "PKAFORGE_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Compute device: cpu, cuda[:N] or metal[:N]
    #[arg(long, value_name = "DEVICE", default_value = "cpu")]
    pub device: String,
}

#[derive(Args)]
pub struct PredictArgs {
    #[command(flatten)]
    pub input: InputOptions,

    #[command(flatten)]
    pub output: OutputOptions,

    #[command(flatten)]
    pub normalize: NormalizeOptions,

    #[command(flatten)]
    pub model: ModelOptions,
}

#[derive(Args)]
pub struct SitesArgs {
    #[command(flatten)]
    pub input: InputOptions,

    #[command(flatten)]
    pub output: OutputOptions,

    #[command(flatten)]
    pub normalize: NormalizeOptions,

    /// Which site kinds to report
    #[arg(long, value_name = "POLARITY", default_value = "both")]
    pub polarity: PolarityFilter,
}

#[derive(Args)]
pub struct DemoArgs {
    #[command(flatten)]
    pub output: OutputOptions,

    #[command(flatten)]
    pub model: ModelOptions,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum InputFormat {
    /// One SMILES per line, optionally followed by a title
    #[value(alias = "smi")]
    Smiles,
    /// MDL SD file (V2000)
    #[value(alias = "mol")]
    Sdf,
}

#[derive(Clone, Copy, Debug, ValueEnum, Default)]
pub enum PolarityFilter {
    /// Proton donors only
    Acid,
    /// Proton acceptors only
    Base,
    /// Both kinds
    #[default]
    Both,
}

pub fn parse() -> Cli {
    Cli::parse()
}
