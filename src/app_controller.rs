use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

use crate::analysis::LinguisticAnalyzer;
use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::providers::Translator;
use crate::subtitle_processor::SubtitleCollection;
use crate::translation::{
    CancellationToken, LogEntry, RequestLimiter, RetryPolicy, RunSummary, TranslationClient,
    TranslationPipeline, TranslationService,
};

// @module: Application controller for subtitle processing

/// Name of the report written next to the output when a run had problems
pub const ISSUES_LOG_FILE: &str = "subweave.issues.log";

/// Outcome of processing one input file
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// The file was translated and written
    Translated { output_path: PathBuf, summary: RunSummary },
    /// An output already existed and overwriting was not requested
    Skipped { output_path: PathBuf },
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Prompt template replacing the configured one
    prompt_override: Option<String>,

    // @field: Translator used instead of the configured provider
    translator: Option<Arc<dyn Translator>>,

    // @field: Stop signal shared with every run
    cancellation: CancellationToken,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            prompt_override: None,
            translator: None,
            cancellation: CancellationToken::new(),
        })
    }

    /// Use a prompt template instead of the configured one
    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt_override = prompt;
        self
    }

    /// Translate with the given translator instead of the configured provider
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check that the configured provider answers; a failure is only reported
    pub async fn test_connection(&self) -> Result<()> {
        if self.translator.is_some() {
            return Ok(());
        }

        let service = self.build_service()?;
        service
            .test_connection()
            .await
            .with_context(|| format!("Could not reach {}", self.config.translation.provider.display_name()))
    }

    /// Translate one file into `output_dir`, naming the output after the target language
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<FileOutcome> {
        let output_path = FileManager::generate_output_path(&input_file, &output_dir, &self.config.target_language);
        self.run_to_file(input_file, output_path, force_overwrite).await
    }

    /// Translate one file into an explicit output path
    pub async fn run_to_file(&self, input_file: PathBuf, output_path: PathBuf, force_overwrite: bool) -> Result<FileOutcome> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, &output_path, &multi_progress, force_overwrite)
            .await
    }

    /// Run the controller with progress reporting
    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_path: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<FileOutcome> {
        let start_time = Instant::now();

        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        if output_path.exists() && !force_overwrite {
            warn!(
                "Skipping {}, translation already exists (use -f to force overwrite)",
                input_file.display()
            );
            return Ok(FileOutcome::Skipped {
                output_path: output_path.to_path_buf(),
            });
        }

        let subtitles = SubtitleCollection::from_srt_file(input_file, &self.config.source_language)?;
        if subtitles.entries.is_empty() {
            return Err(anyhow!("No subtitle entries found in {}", input_file.display()));
        }
        info!("Loaded {} cues from {}", subtitles.entries.len(), input_file.display());

        let log_dir = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let (translated, summary, translation_elapsed) = self
            .translate_subtitles_with_progress(subtitles, multi_progress, &log_dir)
            .await?;

        let output_path = self.save_translated_subtitles(translated, output_path)?;

        info!("{}", summary);
        info!(
            "Translation complete. Total: {} - Translation: {}",
            Self::format_duration(start_time.elapsed()),
            Self::format_duration(translation_elapsed)
        );

        Ok(FileOutcome::Translated { output_path, summary })
    }

    fn build_service(&self) -> Result<TranslationService> {
        TranslationService::new(
            self.config.translation.clone(),
            &self.config.source_language,
            &self.config.target_language,
            self.prompt_override.as_deref(),
        )
    }

    fn build_translator(&self) -> Result<Arc<dyn Translator>> {
        match &self.translator {
            Some(translator) => Ok(translator.clone()),
            None => Ok(Arc::new(self.build_service()?)),
        }
    }

    /// Internal method to translate subtitles with a progress bar from the provided MultiProgress
    async fn translate_subtitles_with_progress(
        &self,
        subtitles: SubtitleCollection,
        multi_progress: &MultiProgress,
        log_dir: &Path,
    ) -> Result<(SubtitleCollection, RunSummary, Duration)> {
        let translation_start_time = Instant::now();

        let translator = self.build_translator()?;
        let analyzer = self.config.segmentation.build_analyzer();
        let limiter = Arc::new(RequestLimiter::from_config(&self.config.translation));
        let client = TranslationClient::new(
            translator.clone(),
            RetryPolicy::from_config(&self.config.translation.common),
            limiter,
        )
        .with_cancellation(self.cancellation.clone());
        let pipeline = TranslationPipeline::new(
            &client,
            &analyzer,
            &self.config.segmentation,
            self.config.target_language.as_str(),
            self.config.translation.optimal_concurrent_requests(),
        )
        .with_cancellation(self.cancellation.clone());

        let progress_bar = multi_progress.add(ProgressBar::new(0));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} units ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        info!(
            "subweave: {} - {} ({} analyzer)",
            translator.name(),
            self.config.translation.get_model(),
            analyzer.name()
        );
        progress_bar.set_message("Translating");

        let log_capture = Arc::new(StdMutex::new(Vec::new()));
        let pb = progress_bar.clone();

        let output = pipeline
            .run(&subtitles.entries, log_capture.clone(), move |completed, total| {
                pb.set_length(total as u64);
                pb.set_position(completed as u64);
            })
            .await?;

        // Cleared so that only the folder bar remains when processing many files
        progress_bar.finish_and_clear();

        let logs = log_capture.lock().map(|logs| logs.clone()).unwrap_or_default();
        let error_logs = logs.iter().filter(|log| log.level == "ERROR").count();
        let warning_logs = logs.iter().filter(|log| log.level == "WARN").count();

        if error_logs > 0 || warning_logs > 0 {
            info!("Translation completed with {} errors and {} warnings.", error_logs, warning_logs);

            if log::max_level() >= log::LevelFilter::Debug {
                for log in &logs {
                    match log.level.as_str() {
                        "ERROR" => error!("{}", log.message),
                        "WARN" => warn!("{}", log.message),
                        _ => debug!("{}", log.message),
                    }
                }
            }

            let log_file_path = log_dir.join(ISSUES_LOG_FILE);
            let context = format!(
                "{} - {} - {} ({})",
                subtitles.source_file.display(),
                translator.name(),
                self.config.translation.get_model(),
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );

            if let Err(e) = Self::write_logs_to_file(&logs, &log_file_path, &context) {
                warn!("Failed to write logs to file: {}", e);
            } else {
                info!("Logs written to {}", log_file_path.display());
            }
        }

        if self.cancellation.is_cancelled() {
            warn!("Run was interrupted, untranslated cues keep their original text");
        }

        let mut translated_collection =
            SubtitleCollection::new(subtitles.source_file.clone(), self.config.target_language.clone());
        translated_collection.entries = output.entries;

        Ok((translated_collection, output.summary, translation_start_time.elapsed()))
    }

    /// Save the translated subtitles to the output path
    fn save_translated_subtitles(&self, subtitles: SubtitleCollection, output_path: &Path) -> Result<PathBuf> {
        subtitles.write_to_srt(output_path)?;
        info!("Success: {}", output_path.display());
        Ok(output_path.to_path_buf())
    }

    // Format duration in a human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Translate every SRT file below a directory, writing each output next to its input
    ///
    /// Files that are already translations into the target language are ignored,
    /// and inputs whose translation exists are skipped unless `force_overwrite` is set.
    pub async fn run_folder(&self, input_dir: PathBuf, force_overwrite: bool) -> Result<Vec<FileOutcome>> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let subtitle_files: Vec<PathBuf> = FileManager::find_files(&input_dir, "srt")?
            .into_iter()
            .filter(|path| !FileManager::has_language_tag(path, &self.config.target_language))
            .collect();

        if subtitle_files.is_empty() {
            return Err(anyhow!("No subtitle files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(subtitle_files.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result.progress_chars("█▓▒░"));
        folder_pb.set_message("Processing files");

        let mut outcomes = Vec::with_capacity(subtitle_files.len());
        let mut error_count = 0;

        for subtitle_file in &subtitle_files {
            if self.cancellation.is_cancelled() {
                warn!("Run was interrupted, remaining files are left untouched");
                break;
            }

            let file_name = subtitle_file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let output_dir = subtitle_file.parent().unwrap_or(input_dir.as_path());
            let output_path =
                FileManager::generate_output_path(subtitle_file, output_dir, &self.config.target_language);

            match self
                .run_with_progress(subtitle_file, &output_path, &multi_progress, force_overwrite)
                .await
            {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    error_count += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        let success_count = outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Translated { .. }))
            .count();
        let skip_count = outcomes.len() - success_count;
        let summary_message = format!(
            "Folder processing completed: {} processed, {} skipped, {} errors",
            success_count, skip_count, error_count
        );
        info!("{}", summary_message);

        let log_file_path = input_dir.join(ISSUES_LOG_FILE);
        let message = format!("{} - Duration: {}", summary_message, Self::format_duration(start_time.elapsed()));
        if let Err(e) = FileManager::append_to_log_file(&log_file_path, &message) {
            warn!("Failed to write folder logs to file: {}", e);
        }

        Ok(outcomes)
    }

    /// Write translation logs to a log file
    fn write_logs_to_file(logs: &[LogEntry], file_path: &Path, translation_context: &str) -> Result<()> {
        let mut log_content = String::new();

        log_content.push_str(&format!(
            "Translation Log - {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        log_content.push_str(&format!("Context: {}\n\n", translation_context));

        for entry in logs {
            log_content.push_str(&format!("[{}] {}\n", entry.level, entry.message));
        }

        FileManager::write_to_file(file_path, &log_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use tempfile::TempDir;

    const SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nI went to\n\n\
                       2\n00:00:02,000 --> 00:00:03,500\nthe store.\n\n";

    fn fast_config() -> Config {
        let mut config = Config {
            target_language: "es".to_string(),
            ..Config::default()
        };
        config.translation.common.base_delay_ms = 1;
        config.translation.common.backoff_cap_ms = 2;
        config.translation.common.jitter_ms = 0;
        config.translation.common.rate_limit_delay_ms = 0;
        config.translation.active_provider_config_mut().rate_limit = None;
        config
    }

    fn controller(provider: MockProvider) -> Controller {
        Controller::with_config(fast_config())
            .unwrap()
            .with_translator(Arc::new(provider))
    }

    #[test]
    fn test_formatDuration_shouldPickLargestUnit() {
        assert_eq!(Controller::format_duration(Duration::from_millis(1500)), "1.500s");
        assert_eq!(Controller::format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(Controller::format_duration(Duration::from_secs(3723)), "1h 2m 3s");
    }

    #[tokio::test]
    async fn test_run_withMockTranslator_shouldWriteTranslatedFile() -> Result<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("movie.en.srt");
        FileManager::write_to_file(&input, SRT)?;
        let provider = MockProvider::working().with_custom_response(|_| "Fui a la tienda.".to_string());

        let outcome = controller(provider)
            .run(input, dir.path().to_path_buf(), false)
            .await?;

        let FileOutcome::Translated { output_path, summary } = outcome else {
            panic!("expected a translated file");
        };
        assert_eq!(output_path, dir.path().join("movie.es.srt"));
        assert_eq!(summary.translated_units, 1);

        let written = SubtitleCollection::from_srt_file(&output_path, "es")?;
        assert_eq!(written.entries.len(), 2);
        assert_eq!(written.entries[0].start_time_ms, 1000);
        assert_eq!(written.entries[1].end_time_ms, 3500);
        let joined = format!("{} {}", written.entries[0].text, written.entries[1].text);
        assert_eq!(joined, "Fui a la tienda.");
        Ok(())
    }

    #[tokio::test]
    async fn test_run_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("movie.srt");
        FileManager::write_to_file(&input, SRT)?;
        FileManager::write_to_file(dir.path().join("movie.es.srt"), "old")?;
        let provider = MockProvider::working();

        let skipped = controller(provider.clone())
            .run(input.clone(), dir.path().to_path_buf(), false)
            .await?;
        assert!(matches!(skipped, FileOutcome::Skipped { .. }));
        assert_eq!(provider.request_count(), 0);

        let forced = controller(provider.clone())
            .run(input, dir.path().to_path_buf(), true)
            .await?;
        assert!(matches!(forced, FileOutcome::Translated { .. }));
        assert_eq!(provider.request_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_withFailingProvider_shouldKeepOriginalTextAndWriteIssuesLog() -> Result<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("movie.srt");
        FileManager::write_to_file(&input, SRT)?;

        let outcome = controller(MockProvider::fatal())
            .run(input, dir.path().to_path_buf(), false)
            .await?;

        let FileOutcome::Translated { output_path, summary } = outcome else {
            panic!("expected a written file");
        };
        assert_eq!(summary.fallback_units(), 1);
        let written = SubtitleCollection::from_srt_file(&output_path, "es")?;
        assert_eq!(written.entries[0].text, "I went to");
        assert_eq!(written.entries[1].text, "the store.");

        let issues = FileManager::read_to_string(dir.path().join(ISSUES_LOG_FILE))?;
        assert!(issues.starts_with("Translation Log - "));
        assert!(issues.contains("[WARN]"));
        Ok(())
    }

    #[tokio::test]
    async fn test_runFolder_shouldIgnoreExistingTranslations() -> Result<()> {
        let dir = TempDir::new()?;
        FileManager::write_to_file(dir.path().join("a.en.srt"), SRT)?;
        FileManager::write_to_file(dir.path().join("season/b.srt"), SRT)?;
        FileManager::write_to_file(dir.path().join("season/c.es.srt"), SRT)?;

        let outcomes = controller(MockProvider::working())
            .run_folder(dir.path().to_path_buf(), false)
            .await?;

        assert_eq!(outcomes.len(), 2);
        assert!(FileManager::file_exists(dir.path().join("a.es.srt")));
        assert!(FileManager::file_exists(dir.path().join("season/b.es.srt")));
        assert!(FileManager::file_exists(dir.path().join(ISSUES_LOG_FILE)));
        Ok(())
    }

    #[tokio::test]
    async fn test_run_withMissingInput_shouldFail() {
        let result = controller(MockProvider::working())
            .run(PathBuf::from("/nonexistent/movie.srt"), PathBuf::from("/tmp"), false)
            .await;
        assert!(result.is_err());
    }
}
