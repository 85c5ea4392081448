use chatprofile_common::{AppConfig, ProfileError, Result};
use chatprofile_extract::{ExtractionReport, LineExtractor, SpeakerPattern};
use chatprofile_llm::{
    chunk_text, render_summaries, Analyzer, CompletionService, OpenAiClient, Prompts, Summarizer,
    TiktokenTokenizer, TokenBudget, Tokenizer, TracedService, Vocabulary,
};
use chrono::Utc;
use indicatif::ProgressBar;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::gate::AnalysisGate;
use crate::stage::{run_stage, PipelineStage};
use crate::types::{AnalysisReport, PipelineResult, SummaryReport};

/// Pipeline executor that orchestrates extraction, summarization and analysis
///
/// Stages hand off through the files named in the configuration, so each one
/// can also be run on its own against the output of an earlier run.
pub struct PipelineExecutor {
    config: AppConfig,
    run_id: String,
    tokenizer: Arc<dyn Tokenizer>,
    summarizer: Summarizer,
    analyzer: Analyzer,
}

impl PipelineExecutor {
    /// Create new pipeline executor around a completion service
    ///
    /// Fails when the configuration is invalid or the analysis instruction
    /// leaves no room in the context budget.
    pub fn new(config: AppConfig, client: Arc<dyn CompletionService>) -> Result<Self> {
        config.validate()?;

        let tokenizer: Arc<dyn Tokenizer> = Arc::new(load_tokenizer(&config)?);
        let prompts = Prompts::from_config(&config)?;

        let summarizer = Summarizer::new(client.clone(), config.llm_model.clone(), prompts.summary)
            .with_max_response_tokens(config.summary_max_tokens as u32)
            .with_concurrency(config.summary_concurrency);

        let analyzer = Analyzer::new(
            client,
            tokenizer.clone(),
            config.llm_model.clone(),
            prompts.analysis,
            TokenBudget::from_config(&config),
        )?;

        let run_id = Uuid::new_v4().to_string();
        info!(
            "Pipeline ready - Run: {}, Model: {}, Vocabulary: {}, Analysis budget: {} tokens",
            run_id,
            config.llm_model,
            tokenizer.name(),
            analyzer.available_tokens()
        );

        Ok(Self {
            config,
            run_id,
            tokenizer,
            summarizer,
            analyzer,
        })
    }

    /// Create executor backed by the OpenAI client from the configuration
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let client = OpenAiClient::from_config(&config)?;
        Self::new(config, Arc::new(TracedService::new(client)))
    }

    /// Show chunk summarization progress on the given bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.summarizer = self.summarizer.with_progress(progress);
        self
    }

    /// Identifier attached to every stage span of this executor
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Content tokens the analysis request may carry
    pub fn analysis_budget(&self) -> usize {
        self.analyzer.available_tokens()
    }

    /// Execute the whole pipeline
    ///
    /// Analysis runs only when there are summaries and the gate agrees.
    pub async fn run(&self, gate: &dyn AnalysisGate) -> Result<PipelineResult> {
        let started_at = Utc::now();

        let extraction = self.extract().await?;
        let summary = self.summarize().await?;

        let analysis = if summary.is_empty() {
            warn!("No messages matched the speaker; skipping profile analysis");
            None
        } else if gate.proceed(&summary) {
            Some(self.analyze().await?)
        } else {
            info!("Profile analysis skipped by caller");
            None
        };

        Ok(PipelineResult {
            run_id: self.run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            extraction,
            summary,
            analysis,
        })
    }

    /// Extract the speaker's lines into the extracted lines file
    pub async fn extract(&self) -> Result<ExtractionReport> {
        run_stage(PipelineStage::Extract, &self.run_id, async {
            let extractor = self.build_extractor()?;
            info!(
                "Extracting lines of '{}' from {}",
                extractor.pattern().speaker(),
                self.config.source_dir.display()
            );
            let source_dir = self.config.source_dir.clone();
            let output = self.config.extracted_file.clone();

            // Directory walk and file reads are blocking
            tokio::task::spawn_blocking(move || extractor.extract_directory(&source_dir, &output))
                .await
                .map_err(|e| ProfileError::internal(format!("Extraction task failed: {}", e)))?
        })
        .await
    }

    /// Chunk the extracted lines and summarize every chunk
    ///
    /// The summaries file is written only once every chunk has a summary.
    pub async fn summarize(&self) -> Result<SummaryReport> {
        run_stage(PipelineStage::Summarize, &self.run_id, async {
            let text = read_stage_input(&self.config.extracted_file, PipelineStage::Extract).await?;

            let chunks = chunk_text(self.tokenizer.as_ref(), &text, self.config.chunk_size)?;
            let source_tokens = chunks.last().map(|c| c.token_end).unwrap_or(0);
            info!(
                "Split {} tokens into {} chunks of at most {} tokens",
                source_tokens,
                chunks.len(),
                self.config.chunk_size
            );

            let summaries = self.summarizer.summarize_chunks(&chunks).await?;
            write_atomic(&self.config.summaries_file, &render_summaries(&summaries)).await?;

            info!("Summaries saved in {}", self.config.summaries_file.display());

            Ok(SummaryReport {
                summaries_path: self.config.summaries_file.clone(),
                chunk_count: chunks.len(),
                source_tokens,
            })
        })
        .await
    }

    /// Analyze the summaries file and write the profile narrative
    pub async fn analyze(&self) -> Result<AnalysisReport> {
        run_stage(PipelineStage::Analyze, &self.run_id, async {
            let summaries = read_stage_input(&self.config.summaries_file, PipelineStage::Summarize).await?;

            let analysis = self.analyzer.analyze(&summaries).await?;
            write_atomic(&self.config.analysis_file, &analysis.narrative).await?;

            info!("Complete analysis saved in {}", self.config.analysis_file.display());

            Ok(AnalysisReport {
                analysis_path: self.config.analysis_file.clone(),
                original_tokens: analysis.original_tokens,
                submitted_tokens: analysis.submitted_tokens,
            })
        })
        .await
    }

    fn build_extractor(&self) -> Result<LineExtractor> {
        let speaker = self
            .config
            .speaker_name
            .as_deref()
            .ok_or_else(|| ProfileError::config("Speaker name is not set (SPEAKER_NAME or --speaker)"))?;

        let pattern = if self.config.speaker_regex {
            SpeakerPattern::from_regex(speaker)?
        } else {
            SpeakerPattern::new(speaker)?
        };

        Ok(LineExtractor::new(pattern)
            .with_extension(self.config.source_extension.clone())
            .with_excluded(self.config.output_files()))
    }
}

/// Tokenizer for the whole run: the configured vocabulary, or the model's own
fn load_tokenizer(config: &AppConfig) -> Result<TiktokenTokenizer> {
    let model_vocabulary = Vocabulary::for_model(&config.llm_model);

    let vocabulary = match config.tokenizer_vocabulary.as_deref() {
        Some(name) => name.parse::<Vocabulary>()?,
        None => model_vocabulary,
    };

    if vocabulary != model_vocabulary {
        warn!(
            "Tokenizer vocabulary {} differs from {} used by model {}; token budgets may not hold",
            vocabulary, model_vocabulary, config.llm_model
        );
    }

    TiktokenTokenizer::new(vocabulary)
}

/// Read the file an earlier stage produced
async fn read_stage_input(path: &Path, producer: PipelineStage) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ProfileError::not_found(format!(
            "{} not found; run the {} stage first",
            path.display(),
            producer
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Write data to file atomically (temp file + rename)
async fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, data)
        .await
        .map_err(|e| ProfileError::file_system(format!("Cannot write {}: {}", tmp_path.display(), e)))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ProfileError::file_system(format!("Cannot replace {}: {}", path.display(), e)))?;

    Ok(())
}
