//! media-fidelity CLI - compare original media trees with their derivatives

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use media_fidelity::Modality;
use tracing_subscriber::EnvFilter;

mod commands;

/// Measure MSE, PSNR and SSIM between original and derived media trees.
#[derive(Parser)]
#[command(name = "media-fidelity")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a source tree against a derived tree
    Compare {
        /// Root of the original files
        #[arg(short, long, default_value = "input")]
        source: PathBuf,

        /// Root of the derived files
        #[arg(short, long, default_value = "output")]
        derived: PathBuf,

        /// Modality to compare
        #[arg(short, long, value_enum, default_value_t = ModalityArg::All)]
        modality: ModalityArg,

        /// Suffix appended to derived image stems
        #[arg(long, default_value = media_fidelity::eval::session::DEFAULT_SUFFIX)]
        suffix: String,

        /// ffmpeg executable
        #[arg(long, env = "FFMPEG", default_value = "ffmpeg")]
        ffmpeg: PathBuf,

        /// ffprobe executable
        #[arg(long, env = "FFPROBE", default_value = "ffprobe")]
        ffprobe: PathBuf,

        /// Bit-depth probe timeout in seconds
        #[arg(long, default_value_t = 10)]
        probe_timeout: u64,

        /// Video measurement timeout in seconds
        #[arg(long, default_value_t = 300)]
        measure_timeout: u64,

        /// Measure pairs in parallel
        #[arg(long)]
        parallel: bool,

        /// Fail when two source files share a key
        #[arg(long)]
        strict_keys: bool,

        /// Create missing roots instead of treating them as empty
        #[arg(long)]
        create_missing_roots: bool,

        /// Also write the reports as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Print the correspondence index of one tree
    Index {
        /// Tree root
        root: PathBuf,

        /// Modality to index
        #[arg(short, long, value_enum)]
        modality: ModalityArg,

        /// Index as a derived tree, stripping this suffix from image stems
        #[arg(long)]
        derived_suffix: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModalityArg {
    Image,
    Audio,
    Video,
    All,
}

impl ModalityArg {
    fn modalities(self) -> &'static [Modality] {
        match self {
            Self::Image => &[Modality::Image],
            Self::Audio => &[Modality::Audio],
            Self::Video => &[Modality::Video],
            Self::All => &Modality::ALL,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Compare {
            source,
            derived,
            modality,
            suffix,
            ffmpeg,
            ffprobe,
            probe_timeout,
            measure_timeout,
            parallel,
            strict_keys,
            create_missing_roots,
            json,
        } => commands::compare::run(commands::compare::CompareArgs {
            source,
            derived,
            modalities: modality.modalities(),
            suffix,
            ffmpeg,
            ffprobe,
            probe_timeout,
            measure_timeout,
            parallel,
            strict_keys,
            create_missing_roots,
            json,
        }),
        Commands::Index {
            root,
            modality,
            derived_suffix,
        } => commands::index::run(&root, modality.modalities(), derived_suffix.as_deref()),
    }
}
