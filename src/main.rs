use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tunegen::{discover, Config, Pipeline, TuneError};

/// Compile MusicXML songs into buzzer firmware tables
#[derive(Parser)]
#[command(name = "tunegen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show per-song debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate audio_songs_generated.h/.cpp from the configuration
    Generate {
        /// Configuration document
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Directory holding <song>.musicxml files (overrides the configuration)
        #[arg(short, long)]
        songs: Option<PathBuf>,

        /// Output directory for the generated sources
        #[arg(short, long, default_value = "lib/Audio")]
        out: PathBuf,
    },

    /// Print the note table extracted from a single score
    Inspect {
        /// MusicXML file
        score: PathBuf,

        /// Tempo in quarter notes per minute
        #[arg(short, long, default_value_t = tunegen::pitch::DEFAULT_TEMPO)]
        tempo: u32,
    },

    /// Report configured songs without scores and scores without configuration
    Check {
        /// Configuration document
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Directory holding <song>.musicxml files (overrides the configuration)
        #[arg(short, long)]
        songs: Option<PathBuf>,
    },
}

/// Writes log records to stderr.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error => eprintln!("{}: {}", "error".red().bold(), record.args()),
            Level::Warn => eprintln!("{}: {}", "warning".yellow().bold(), record.args()),
            Level::Info => eprintln!("{}", record.args()),
            Level::Debug | Level::Trace => eprintln!("{}", record.args().to_string().dimmed()),
        }
    }

    fn flush(&self) {}
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn generate(config: &Path, songs: Option<PathBuf>, out: &Path) -> Result<ExitCode, TuneError> {
    eprintln!("{} {}", "Loading configuration from".cyan().bold(), config.display());
    let config = Config::load(config)?;
    let mut pipeline = Pipeline::new(config);
    if let Some(dir) = songs {
        pipeline = pipeline.with_songs_dir(dir);
    }

    let (report, written) = pipeline.generate(out)?;

    eprintln!();
    eprintln!("{}", "Code generation complete!".green().bold());
    for path in &written {
        eprintln!("  Generated: {}", path.display());
    }
    eprintln!("  Total songs: {}", report.songs.len());
    let warnings = report.all_diagnostics().count();
    if warnings > 0 {
        eprintln!("  {} {}", warnings.to_string().yellow(), "warning(s)".yellow());
    }
    Ok(ExitCode::SUCCESS)
}

fn inspect(score: &Path, tempo: u32) -> Result<ExitCode, TuneError> {
    let song = tunegen::parse_score(score, tempo)?;

    println!("{} ({} notes, {} ms)", song.name.bold(), song.notes.len(), song.duration_ms());
    for (i, note) in song.notes.iter().enumerate() {
        if note.is_rest() {
            println!("{:4}  {:>5}  {:>6} ms", i, "rest".dimmed(), note.duration_ms);
        } else {
            println!("{:4}  {:>5}  {:>6} ms", i, note.frequency_hz, note.duration_ms);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn check(config: &Path, songs: Option<PathBuf>) -> Result<ExitCode, TuneError> {
    let config = Config::load(config)?;
    let songs_dir = songs.unwrap_or_else(|| config.songs_dir.clone());
    let diagnostics = discover::audit(&config, &songs_dir);

    for diagnostic in &diagnostics {
        diagnostic.log();
    }
    if diagnostics.is_empty() {
        eprintln!(
            "{} {} songs configured, all scores present",
            "ok:".green().bold(),
            config.songs.len()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = match cli.command {
        Commands::Generate { config, songs, out } => generate(&config, songs, &out),
        Commands::Inspect { score, tempo } => inspect(&score, tempo),
        Commands::Check { config, songs } => check(&config, songs),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "error".red(), e);
            ExitCode::from(1)
        }
    }
}
