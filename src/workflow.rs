use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{GameProfile, TranslateConfig};
use crate::document::ScriptDocument;
use crate::error::{Result, ScriptlocError};
use crate::script::{Dialect, RecombineOptions, Span, cleanup_newlines, recombine, splice, strip_notes};
use crate::translate::{RetryPolicy, TranslationBackend, TranslationOrchestrator};

/// Counts of a batch run over many files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    fn record(&mut self, rel: &Path, result: Result<()>) {
        match result {
            Ok(()) => {
                debug!("Finished {}", rel.display());
                self.succeeded += 1;
            }
            Err(e) => {
                warn!("Failed to process {}: {}", rel.display(), e);
                self.failed += 1;
            }
        }
    }
}

/// File-level operations of one game: translate, combine and strip
pub struct Workflow {
    game: GameProfile,
    policy: RetryPolicy,
    max_concurrent_files: usize,
    backend: Option<Arc<dyn TranslationBackend>>,
    cancel: CancellationToken,
    show_progress: bool,
}

impl Workflow {
    pub fn new(game: GameProfile, config: &TranslateConfig) -> Self {
        Self {
            game,
            policy: RetryPolicy::from_config(config),
            max_concurrent_files: config.max_concurrent_files.max(1),
            backend: None,
            cancel: CancellationToken::new(),
            show_progress: false,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn TranslationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn orchestrator(&self) -> Result<TranslationOrchestrator> {
        let backend = self
            .backend
            .clone()
            .ok_or_else(|| ScriptlocError::Config("No translation backend configured".to_string()))?;

        Ok(
            TranslationOrchestrator::new(backend, self.game.system_prompt(), self.policy)
                .with_cancellation(self.cancel.clone()),
        )
    }

    /// Translate every message block of `src` and write the result to `dest`.
    ///
    /// Nothing is written unless every block came back translated.
    pub async fn translate_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, src: P, dest: Q) -> Result<()> {
        let src = src.as_ref();
        let dest = dest.as_ref();
        debug!("Translating {} -> {}", src.display(), dest.display());

        let mut doc = ScriptDocument::read(src).await?;
        let syntax = &self.game.syntax;
        let text = doc.text(&self.game.text_field)?;

        let blocks = syntax.locate(text, Dialect::Relaxed);
        if blocks.is_empty() {
            debug!("No message blocks in {}, copying as-is", src.display());
            return doc.write(dest).await;
        }

        let spans: Vec<Span> = blocks.iter().map(|b| b.span).collect();
        let contents: Vec<&str> = blocks.iter().map(|b| b.content).collect();

        let outcome = self.orchestrator()?.translate(&contents).await;
        if let Some(failure) = outcome.failure {
            return Err(failure.into_error(contents.len()));
        }

        let cleaned: Vec<String> = outcome
            .blocks
            .iter()
            .map(|block| cleanup_newlines(block, &syntax.line_break))
            .collect();
        let translated = splice(text, &spans, &cleaned)?;

        doc.set_text(&self.game.text_field, translated);
        doc.write(dest).await?;
        info!("Translated {} blocks: {}", spans.len(), dest.display());
        Ok(())
    }

    /// Translate a file given relative to the export directory
    pub async fn translate_relative<P: AsRef<Path>>(&self, rel: P) -> Result<()> {
        let rel = rel.as_ref();
        self.translate_file(self.game.export_dir.join(rel), self.game.translated_dir.join(rel))
            .await
    }

    /// Translate every export file that has no translated counterpart yet
    pub async fn translate_all(&self) -> Result<BatchReport> {
        let files = find_json_files(&self.game.export_dir)?;
        let mut report = BatchReport::default();

        let pending: Vec<PathBuf> = files
            .into_iter()
            .filter(|rel| {
                let exists = self.game.translated_dir.join(rel).exists();
                if exists {
                    report.skipped += 1;
                }
                !exists
            })
            .collect();

        info!(
            "Translating {} files ({} already translated)",
            pending.len(),
            report.skipped
        );

        let bar = self.progress_bar(pending.len(), "Translating");
        let mut results = stream::iter(pending)
            .map(|rel| async move {
                let result = self.translate_relative(&rel).await;
                (rel, result)
            })
            .buffer_unordered(self.max_concurrent_files);

        while let Some((rel, result)) = results.next().await {
            bar.inc(1);
            report.record(&rel, result);
        }
        bar.finish_and_clear();

        Ok(report)
    }

    /// Merge the export and translated versions of `rel` into a bilingual file
    pub async fn combine_file<P: AsRef<Path>>(&self, rel: P) -> Result<()> {
        let rel = rel.as_ref();
        let field = &self.game.text_field;

        let original = ScriptDocument::read(self.game.export_dir.join(rel)).await?;
        let mut translated = ScriptDocument::read(self.game.translated_dir.join(rel)).await?;

        let options = RecombineOptions::default().with_speaker_line(self.game.speaker_line_policy);
        let combined = recombine(
            original.text(field)?,
            translated.text(field)?,
            &self.game.syntax,
            &options,
        )?;

        translated.set_text(field, combined);
        let out = self.game.combined_dir().join(rel);
        translated.write(&out).await?;
        info!("Combined: {}", out.display());
        Ok(())
    }

    /// Combine every export file that has a translated counterpart
    pub async fn combine_all(&self) -> Result<BatchReport> {
        let files = find_json_files(&self.game.export_dir)?;
        let mut report = BatchReport::default();

        let bar = self.progress_bar(files.len(), "Combining");
        for rel in files {
            bar.inc(1);
            if !self.game.translated_dir.join(&rel).is_file() {
                debug!("No translation for {}, skipping", rel.display());
                report.skipped += 1;
                continue;
            }
            let result = self.combine_file(&rel).await;
            report.record(&rel, result);
        }
        bar.finish_and_clear();

        Ok(report)
    }

    /// Remove speaker notes from the translated `rel`, writing to the stripped directory
    pub async fn strip_file<P: AsRef<Path>>(&self, rel: P) -> Result<()> {
        let rel = rel.as_ref();
        let field = &self.game.text_field;

        let mut doc = ScriptDocument::read(self.game.translated_dir.join(rel)).await?;
        let stripped = strip_notes(doc.text(field)?, &self.game.syntax)?;
        doc.set_text(field, stripped);

        let out = self.game.stripped_dir().join(rel);
        doc.write(&out).await?;
        info!("Stripped: {}", out.display());
        Ok(())
    }

    pub async fn strip_all(&self) -> Result<BatchReport> {
        let files = find_json_files(&self.game.translated_dir)?;
        let mut report = BatchReport::default();

        let bar = self.progress_bar(files.len(), "Stripping");
        for rel in files {
            bar.inc(1);
            let result = self.strip_file(&rel).await;
            report.record(&rel, result);
        }
        bar.finish_and_clear();

        Ok(report)
    }

    fn progress_bar(&self, len: usize, label: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(label);
        bar
    }
}

/// All `*.json` files under `root`, as sorted paths relative to it
pub fn find_json_files<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(ScriptlocError::FileNotFound(root.display().to_string()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .filter_map(|entry| pathdiff::diff_paths(entry.path(), root))
        .collect();

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{BatchResponse, MockTranslationBackend};
    use tempfile::TempDir;

    fn workflow(root: &Path) -> Workflow {
        Workflow::new(GameProfile::new("demo", root), &TranslateConfig::default())
    }

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_find_json_files_is_recursive_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("b.json"), "{}");
        write(&root.join("a/c.JSON"), "{}");
        write(&root.join("a/notes.txt"), "");

        let files = find_json_files(root).unwrap();
        assert_eq!(files, vec![PathBuf::from("a/c.JSON"), PathBuf::from("b.json")]);
    }

    #[test]
    fn test_find_json_files_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            find_json_files(temp_dir.path().join("nope")),
            Err(ScriptlocError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_translate_file_splices_cleaned_blocks() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            &root.join("Export/s.json"),
            r#"{"Id": 1, "Text": "a MSG([[ねこ\\r\\nだ]]) b"}"#,
        );

        let mut mock = MockTranslationBackend::new();
        mock.expect_translate_batch().times(1).returning(|_, batch| {
            assert_eq!(batch.get("0").map(String::as_str), Some(r"ねこ\r\nだ"));
            Ok(BatchResponse::new(
                [("0".to_string(), r"It's\r\n  a cat".to_string())].into(),
            ))
        });

        let flow = workflow(root).with_backend(Arc::new(mock));
        flow.translate_relative("s.json").await.unwrap();

        let out = std::fs::read_to_string(root.join("Translated/s.json")).unwrap();
        assert_eq!(out, "{\n  \"Id\": 1,\n  \"Text\": \"a MSG([[It's a cat]]) b\"\n}");
    }

    #[tokio::test]
    async fn test_translate_file_without_blocks_copies_document() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("Export/s.json"), r#"{"Text": "return 1"}"#);

        let mut mock = MockTranslationBackend::new();
        mock.expect_translate_batch().times(0);

        let flow = workflow(root).with_backend(Arc::new(mock));
        flow.translate_relative("s.json").await.unwrap();
        assert!(root.join("Translated/s.json").is_file());
    }

    #[tokio::test]
    async fn test_translate_file_needs_a_backend() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("Export/s.json"), r#"{"Text": "MSG([[x]])"}"#);

        let result = workflow(root).translate_relative("s.json").await;
        assert!(matches!(result, Err(ScriptlocError::Config(_))));
        assert!(!root.join("Translated/s.json").exists());
    }

    #[tokio::test]
    async fn test_combine_file_keeps_translated_fields() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            &root.join("Export/s.json"),
            r#"{"Rev": "jp", "Text": "MSG([[\\r\\n    こんにちは\\r\\n]])"}"#,
        );
        write(
            &root.join("Translated/s.json"),
            r#"{"Rev": "en", "Text": "MSG([[ Hello. ]])"}"#,
        );

        workflow(root).combine_file("s.json").await.unwrap();

        let out = ScriptDocument::read(root.join("Combined/s.json")).await.unwrap();
        assert_eq!(out.text("Rev").unwrap(), "en");
        assert_eq!(
            out.text("Text").unwrap(),
            r"MSG([[\r\nHello.\r\nこんにちは\r\n]])"
        );
    }

    #[tokio::test]
    async fn test_combine_all_skips_untranslated() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("Export/a.json"), r#"{"Text": "MSG([[x]])"}"#);
        write(&root.join("Export/b.json"), r#"{"Text": "MSG([[y]])"}"#);
        write(&root.join("Translated/a.json"), r#"{"Text": "MSG([[X]]) MSG([[Z]])"}"#);

        let report = workflow(root).combine_all().await.unwrap();
        assert_eq!(report, BatchReport { succeeded: 0, skipped: 1, failed: 1 });
        assert!(!root.join("Combined/a.json").exists());
    }

    #[tokio::test]
    async fn test_strip_all() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            &root.join("Translated/a.json"),
            r#"{"Text": "MSG([[\\r\\n【Erika】Serious\\r\\nHello]])"}"#,
        );
        write(&root.join("Translated/b.json"), r#"{"Other": 1}"#);

        let report = workflow(root).strip_all().await.unwrap();
        assert_eq!(report, BatchReport { succeeded: 1, skipped: 0, failed: 1 });

        let out = ScriptDocument::read(root.join("Stripped/a.json")).await.unwrap();
        assert_eq!(out.text("Text").unwrap(), r"MSG([[\r\n【Erika】\r\nHello]])");
    }
}
