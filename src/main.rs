// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use subweave::app_config::{self, AnalyzerKind, Config, TranslationProvider};
use subweave::app_controller::{Controller, FileOutcome};
use subweave::file_utils::FileManager;
use subweave::translation::core::load_prompt_file;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Xai,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Xai => TranslationProvider::XAI,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for AnalyzerKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliAnalyzer {
    Heuristic,
    Full,
}

impl From<CliAnalyzer> for AnalyzerKind {
    fn from(cli_analyzer: CliAnalyzer) -> Self {
        match cli_analyzer {
            CliAnalyzer::Heuristic => AnalyzerKind::Heuristic,
            CliAnalyzer::Full => AnalyzerKind::Full,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate subtitle files (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for subweave
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// Input SRT file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output file or directory (defaults to the input's directory)
    #[arg(short, long, value_name = "OUTPUT_PATH")]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// File holding a system prompt template ({source_language} and {target_language} are replaced)
    #[arg(long, value_name = "FILE")]
    prompt_file: Option<PathBuf>,

    /// Sampling temperature (0.0 to 1.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// Requests sent for one unit before keeping its original text
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Most cues merged into one translation unit
    #[arg(long)]
    max_unit_cues: Option<usize>,

    /// Longest pause in seconds between cues that may still be merged
    #[arg(long)]
    max_gap_seconds: Option<f64>,

    /// Concurrent requests to the provider
    #[arg(long)]
    concurrency: Option<usize>,

    /// Linguistic analyzer used for segmentation
    #[arg(long, value_enum)]
    analyzer: Option<CliAnalyzer>,

    /// Check that the provider answers, then exit
    #[arg(long)]
    check_connection: bool,
}

/// subweave - sentence-aware subtitle translation
///
/// Merges subtitle cues into sentence-like units, translates each unit with an
/// AI provider and splits the translation back over the original cue timings.
#[derive(Parser, Debug)]
#[command(name = "subweave")]
#[command(version)]
#[command(about = "Sentence-aware subtitle translation with AI providers")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "subweave merges subtitle cues that belong to the same sentence, translates \
each merged unit with an AI provider and distributes the translation back over the original cues, \
keeping every timestamp untouched.

EXAMPLES:
    subweave movie.en.srt                          # Translate using default config
    subweave -f movie.en.srt                       # Force overwrite existing files
    subweave -p openai -m gpt-4o movie.srt         # Use specific provider and model
    subweave -s en -t es movie.srt                 # Translate from English to Spanish
    subweave -o out/ --max-unit-cues 4 movie.srt   # Write to out/, merge at most 4 cues
    subweave --log-level debug /subtitles/         # Process entire directory with debug logging
    subweave completions bash > subweave.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    xai       - x.ai API (default, requires XAI_API_KEY or api_key in config)
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker and ANSI color for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("[x]", "1;31"),
            Level::Warn => ("[!]", "1;33"),
            Level::Info => ("   ", "1;32"),
            Level::Debug => ("[?]", "1;36"),
            Level::Trace => ("[.]", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (marker, color) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                marker,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Levels are narrowed later through log::set_max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subweave", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    if let Some(concurrency) = options.concurrency {
        config.translation.active_provider_config_mut().concurrent_requests = concurrency;
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(temperature) = options.temperature {
        config.translation.common.temperature = temperature;
    }
    if let Some(max_attempts) = options.max_attempts {
        config.translation.common.max_attempts = max_attempts;
    }
    if let Some(max_unit_cues) = options.max_unit_cues {
        config.segmentation.max_unit_cues = Some(max_unit_cues);
    }
    if let Some(max_gap_seconds) = options.max_gap_seconds {
        config.segmentation.max_gap_seconds = Some(max_gap_seconds);
    }
    if let Some(analyzer) = &options.analyzer {
        config.segmentation.analyzer.kind = analyzer.clone().into();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let mut config = Config::load_or_create(Path::new(&options.config_path))?;
    apply_overrides(&mut config, &options);

    config.validate().context("Configuration validation failed")?;
    log::set_max_level(level_filter(&config.log_level));

    let prompt = options
        .prompt_file
        .as_deref()
        .map(load_prompt_file)
        .transpose()?;

    let controller = Controller::with_config(config)?.with_prompt(prompt);

    if options.check_connection {
        controller.test_connection().await?;
        return Ok(());
    }

    let input_path = options
        .input_path
        .clone()
        .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

    spawn_interrupt_handler(&controller);

    if input_path.is_file() {
        let outcome = match &options.output {
            Some(output) if FileManager::is_subtitle_file(output) && !output.is_dir() => {
                controller
                    .run_to_file(input_path, output.clone(), options.force_overwrite)
                    .await?
            }
            Some(output_dir) => {
                controller
                    .run(input_path, output_dir.clone(), options.force_overwrite)
                    .await?
            }
            None => {
                let output_dir = input_path
                    .parent()
                    .unwrap_or(Path::new("."))
                    .to_path_buf();
                controller
                    .run(input_path, output_dir, options.force_overwrite)
                    .await?
            }
        };

        if let FileOutcome::Translated { summary, .. } = outcome {
            if summary.fallback_units() > 0 {
                warn!("{} of {} units kept their original text", summary.fallback_units(), summary.units);
            }
        }
    } else if input_path.is_dir() {
        if options.output.is_some() {
            warn!("--output is ignored in folder mode, translations are written next to their inputs");
        }
        controller.run_folder(input_path, options.force_overwrite).await?;
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }

    Ok(())
}

/// First Ctrl-C lets in-flight units finish, a second one exits immediately
fn spawn_interrupt_handler(controller: &Controller) {
    let cancellation = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, finishing in-flight requests (press Ctrl-C again to abort)");
        cancellation.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            error!("Aborted");
            std::process::exit(130);
        }
    });
}
