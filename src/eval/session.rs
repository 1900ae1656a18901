//! Comparison session: index, match, measure, collect.
//!
//! [`CompareSession`] is the entry point for comparing a tree of originals
//! with a tree of derivatives. It indexes both trees for one modality, joins
//! them on correspondence key and measures every matched pair, folding
//! per-pair failures into row statuses.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rayon::prelude::*;

use super::report::{ComparisonReport, ReportRow, RowOutcome};
use crate::error::{Error, Result};
use crate::metrics::audio::calculate_audio_metrics;
use crate::metrics::image::calculate_image_metrics;
use crate::metrics::FidelityRecord;
use crate::tree::{
    Correspondence, IndexRule, MatchedPair, Modality, SuffixPattern, TreeIndex, match_trees,
};
use crate::video::{VideoToolchain, calculate_video_metrics};

/// Default suffix of derived image names.
pub const DEFAULT_SUFFIX: &str = "_optimized";

/// Configuration for a comparison session.
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Compiled derived-image suffix.
    pub suffix: SuffixPattern,

    /// External tools for video.
    pub toolchain: VideoToolchain,

    /// Measure pairs on the rayon pool. Row order is unaffected.
    pub parallel: bool,

    /// Abort when two source files share a key.
    pub strict_keys: bool,

    /// Create absent roots instead of treating them as empty.
    pub create_missing_roots: bool,
}

impl CompareConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> CompareConfigBuilder {
        CompareConfigBuilder::default()
    }
}

/// Builder for [`CompareConfig`].
#[derive(Debug, Default)]
pub struct CompareConfigBuilder {
    suffix: Option<String>,
    ffmpeg: Option<PathBuf>,
    ffprobe: Option<PathBuf>,
    probe_timeout: Option<Duration>,
    measure_timeout: Option<Duration>,
    parallel: bool,
    strict_keys: bool,
    create_missing_roots: bool,
}

impl CompareConfigBuilder {
    /// Set the derived-image suffix.
    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Set the ffmpeg program.
    #[must_use]
    pub fn ffmpeg(mut self, program: impl Into<PathBuf>) -> Self {
        self.ffmpeg = Some(program.into());
        self
    }

    /// Set the ffprobe program.
    #[must_use]
    pub fn ffprobe(mut self, program: impl Into<PathBuf>) -> Self {
        self.ffprobe = Some(program.into());
        self
    }

    /// Set the bit-depth probe timeout.
    #[must_use]
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Set the measurement timeout.
    #[must_use]
    pub fn measure_timeout(mut self, timeout: Duration) -> Self {
        self.measure_timeout = Some(timeout);
        self
    }

    /// Measure pairs in parallel.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Treat source key collisions as fatal.
    #[must_use]
    pub fn strict_keys(mut self, strict: bool) -> Self {
        self.strict_keys = strict;
        self
    }

    /// Create missing roots before indexing.
    #[must_use]
    pub fn create_missing_roots(mut self, create: bool) -> Self {
        self.create_missing_roots = create;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the suffix cannot be compiled.
    pub fn build(self) -> Result<CompareConfig> {
        let defaults = VideoToolchain::default();
        Ok(CompareConfig {
            suffix: SuffixPattern::new(self.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX))?,
            toolchain: VideoToolchain {
                ffmpeg: self.ffmpeg.unwrap_or(defaults.ffmpeg),
                ffprobe: self.ffprobe.unwrap_or(defaults.ffprobe),
                probe_timeout: self.probe_timeout.unwrap_or(defaults.probe_timeout),
                measure_timeout: self.measure_timeout.unwrap_or(defaults.measure_timeout),
            },
            parallel: self.parallel,
            strict_keys: self.strict_keys,
            create_missing_roots: self.create_missing_roots,
        })
    }
}

/// Comparison session.
///
/// # Example
///
/// ```rust,ignore
/// use media_fidelity::{CompareConfig, CompareSession, Modality};
///
/// let session = CompareSession::new(CompareConfig::builder().build()?);
/// let report = session.compare(Modality::Image, "input/image", "output/image")?;
/// print!("{}", media_fidelity::render_report(&report));
/// ```
pub struct CompareSession {
    config: CompareConfig,
}

impl CompareSession {
    /// Create a session.
    #[must_use]
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Compare images under two roots.
    ///
    /// # Errors
    ///
    /// See [`CompareSession::compare`].
    pub fn compare_images(
        &self,
        source_root: impl AsRef<Path>,
        derived_root: impl AsRef<Path>,
    ) -> Result<ComparisonReport> {
        self.compare(Modality::Image, source_root, derived_root)
    }

    /// Compare audio under two roots.
    ///
    /// # Errors
    ///
    /// See [`CompareSession::compare`].
    pub fn compare_audio(
        &self,
        source_root: impl AsRef<Path>,
        derived_root: impl AsRef<Path>,
    ) -> Result<ComparisonReport> {
        self.compare(Modality::Audio, source_root, derived_root)
    }

    /// Compare videos under two roots.
    ///
    /// # Errors
    ///
    /// See [`CompareSession::compare`]. A missing ffmpeg aborts before any row
    /// is produced.
    pub fn compare_videos(
        &self,
        source_root: impl AsRef<Path>,
        derived_root: impl AsRef<Path>,
    ) -> Result<ComparisonReport> {
        self.compare(Modality::Video, source_root, derived_root)
    }

    /// Index both roots for `modality`, match them and measure every pair.
    ///
    /// Rows come back in ascending key order with one row per source file.
    /// Per-pair failures become row statuses; only fatal errors are returned.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolUnavailable`] if a required external tool is missing
    /// - [`Error::KeyCollision`] on a source collision in strict mode
    /// - [`Error::Io`] if a missing root cannot be created
    pub fn compare(
        &self,
        modality: Modality,
        source_root: impl AsRef<Path>,
        derived_root: impl AsRef<Path>,
    ) -> Result<ComparisonReport> {
        let (source_root, derived_root) = (source_root.as_ref(), derived_root.as_ref());

        if self.config.create_missing_roots {
            for root in [source_root, derived_root] {
                if !root.exists() {
                    tracing::debug!(root = %root.display(), "creating missing root");
                    std::fs::create_dir_all(root)?;
                }
            }
        }

        let source = TreeIndex::build(source_root, &IndexRule::source(modality));
        if self.config.strict_keys
            && let Some(collision) = source.collisions.first()
        {
            return Err(Error::KeyCollision {
                key: collision.key.to_string(),
                first: collision.replaced.clone(),
                second: collision.kept.clone(),
            });
        }

        let derived = TreeIndex::build(
            derived_root,
            &IndexRule::derived(modality, Some(&self.config.suffix)),
        );
        let matches = match_trees(&source, &derived);

        tracing::info!(
            modality = %modality,
            sources = matches.entries.len(),
            pairs = matches.matched_count(),
            "starting comparison"
        );

        let rows = if self.config.parallel {
            matches
                .entries
                .par_iter()
                .map(|entry| self.row_for(modality, entry))
                .collect::<Result<Vec<_>>>()?
        } else {
            matches
                .entries
                .iter()
                .map(|entry| self.row_for(modality, entry))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(ComparisonReport {
            modality,
            source_root: source_root.to_path_buf(),
            derived_root: derived_root.to_path_buf(),
            rows,
            skipped: source.skipped,
            orphans: matches.orphans.len(),
        })
    }

    fn row_for(&self, modality: Modality, entry: &Correspondence) -> Result<ReportRow> {
        let source_path = entry.source().display_path();

        let pair = match entry {
            Correspondence::Matched(pair) => pair,
            Correspondence::Missing(missing) => {
                return Ok(ReportRow {
                    key: missing.key.clone(),
                    source_path,
                    derived_name: None,
                    outcome: RowOutcome::Missing {
                        hint: self.missing_hint(modality, missing.key.stem()),
                    },
                });
            }
        };

        let outcome = if modality == Modality::Image && !modality.accepts(pair.derived.file_name()) {
            RowOutcome::NotMedia
        } else {
            tracing::info!("-> Comparing {}", source_path);
            match self.measure(modality, pair) {
                Ok(record) => {
                    tracing::info!(
                        mse = record.mse(),
                        psnr = record.psnr(),
                        ssim = ?record.ssim(),
                        "RESULTS"
                    );
                    RowOutcome::Measured { record }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(path = %source_path, "comparison failed: {}", e);
                    RowOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        };

        Ok(ReportRow {
            key: pair.key.clone(),
            source_path,
            derived_name: Some(pair.derived.file_name().to_string()),
            outcome,
        })
    }

    fn measure(&self, modality: Modality, pair: &MatchedPair) -> Result<FidelityRecord> {
        let (source, derived) = (&pair.source.absolute_path, &pair.derived.absolute_path);
        Ok(match modality {
            Modality::Image => FidelityRecord::Image(calculate_image_metrics(source, derived)?),
            Modality::Audio => FidelityRecord::Audio(calculate_audio_metrics(source, derived)?),
            Modality::Video => FidelityRecord::Video(calculate_video_metrics(
                &self.config.toolchain,
                source,
                derived,
            )?),
        })
    }

    fn missing_hint(&self, modality: Modality, stem: &str) -> String {
        match modality {
            Modality::Image => format!(
                "Missing Optimized File ({})",
                self.config.suffix.expected_name(stem)
            ),
            Modality::Audio => "Missing Corresponding File in Output".to_string(),
            Modality::Video => "Missing".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn session() -> CompareSession {
        CompareSession::new(CompareConfig::builder().build().unwrap())
    }

    fn write_png(path: &Path, offset: u8) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = image::RgbImage::from_fn(16, 16, |x, y| {
            image::Rgb([(x * 10) as u8 + offset, (y * 10) as u8, 128])
        });
        img.save(path).unwrap();
    }

    fn write_wav(path: &Path, rate: u32, len: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..len {
            writer.write_sample(((i % 100) as i16 - 50) * 300).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_builder_defaults() {
        let config = CompareConfig::builder().build().unwrap();
        assert_eq!(config.suffix.suffix(), "_optimized");
        assert_eq!(config.toolchain, VideoToolchain::default());
        assert!(!config.parallel);
        assert!(!config.strict_keys);
        assert!(!config.create_missing_roots);
    }

    #[test]
    fn test_builder_overrides() {
        let config = CompareConfig::builder()
            .suffix("-small")
            .ffmpeg("/opt/ffmpeg")
            .measure_timeout(Duration::from_secs(5))
            .parallel(true)
            .build()
            .unwrap();
        assert_eq!(config.suffix.suffix(), "-small");
        assert_eq!(config.toolchain.ffmpeg, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(config.toolchain.ffprobe, PathBuf::from("ffprobe"));
        assert_eq!(config.toolchain.measure_timeout, Duration::from_secs(5));
        assert!(config.parallel);
    }

    #[test]
    fn test_image_identity_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = (dir.path().join("in"), dir.path().join("out"));
        write_png(&input.join("a.png"), 0);
        write_png(&output.join("a_optimized.png"), 0);
        write_png(&input.join("sub/b.png"), 0);
        fs::write(input.join("notes.txt"), b"skip me").unwrap();

        let report = session().compare_images(&input, &output).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.skipped, 1);

        let first = &report.rows[0];
        assert_eq!(first.key.as_str(), "a");
        let record = first.record().unwrap();
        assert_eq!(record.mse(), 0.0);
        assert_eq!(record.psnr(), 100.0);
        assert_eq!(record.ssim(), Some(1.0));

        assert_eq!(report.rows[1].key.as_str(), "sub/b");
        assert_eq!(
            report.rows[1].status(),
            "Missing Optimized File (b_optimized*)"
        );
    }

    #[test]
    fn test_image_non_raster_derivative() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = (dir.path().join("in"), dir.path().join("out"));
        write_png(&input.join("logo.png"), 0);
        fs::create_dir_all(&output).unwrap();
        fs::write(output.join("logo_optimized.webp"), b"RIFF").unwrap();

        let report = session().compare_images(&input, &output).unwrap();
        assert_eq!(report.rows[0].outcome, RowOutcome::NotMedia);
        assert_eq!(report.rows[0].derived_name.as_deref(), Some("logo_optimized.webp"));
    }

    #[test]
    fn test_image_dimension_mismatch_is_row_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = (dir.path().join("in"), dir.path().join("out"));
        write_png(&input.join("a.png"), 0);
        fs::create_dir_all(&output).unwrap();
        image::RgbImage::new(20, 16).save(output.join("a_optimized.png")).unwrap();

        let report = session().compare_images(&input, &output).unwrap();
        assert!(matches!(report.rows[0].outcome, RowOutcome::Failed { .. }));
        assert_eq!(report.summary().failed, 1);
    }

    #[test]
    fn test_audio_pairs_and_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = (dir.path().join("in"), dir.path().join("out"));
        write_wav(&input.join("album/t1.wav"), 8000, 800);
        write_wav(&output.join("album/t1.wav"), 8000, 600);
        write_wav(&input.join("album/t2.wav"), 8000, 800);
        write_wav(&output.join("extra.wav"), 8000, 100);

        let report = session().compare_audio(&input, &output).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.orphans, 1);

        match &report.rows[0].outcome {
            RowOutcome::Measured {
                record: FidelityRecord::Audio(audio),
            } => {
                assert_eq!(audio.samples, 600);
                assert_eq!(audio.psnr, 100.0);
            }
            other => panic!("expected audio record, got {other:?}"),
        }
        assert_eq!(report.rows[1].status(), "Missing Corresponding File in Output");
    }

    #[test]
    fn test_parallel_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = (dir.path().join("in"), dir.path().join("out"));
        for name in ["d", "b", "a", "c"] {
            write_png(&input.join(format!("{name}.png")), 0);
            write_png(&output.join(format!("{name}_optimized.png")), 3);
        }

        let config = CompareConfig::builder().parallel(true).build().unwrap();
        let report = CompareSession::new(config).compare_images(&input, &output).unwrap();
        let keys: Vec<&str> = report.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["a", "b", "c", "d"]);
        assert_eq!(report.summary().ok, 4);
    }

    #[test]
    fn test_missing_roots() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = (dir.path().join("in"), dir.path().join("out"));

        let report = session().compare_audio(&input, &output).unwrap();
        assert!(report.is_empty());
        assert!(!input.exists());

        let config = CompareConfig::builder().create_missing_roots(true).build().unwrap();
        let report = CompareSession::new(config).compare_images(&input, &output).unwrap();
        assert!(report.is_empty());
        assert!(input.is_dir());
        assert!(output.is_dir());
    }

    #[test]
    fn test_video_missing_without_tools() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = (dir.path().join("in"), dir.path().join("out"));
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("clip.mp4"), b"not really a video").unwrap();

        // No derivative, so the toolchain is never invoked.
        let config = CompareConfig::builder()
            .ffmpeg("/nonexistent/ffmpeg")
            .build()
            .unwrap();
        let report = CompareSession::new(config).compare_videos(&input, &output).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].status(), "Missing");
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_strict_keys() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = (dir.path().join("in"), dir.path().join("out"));
        write_wav(&input.join("a.wav"), 8000, 10);
        write_wav(&input.join("a.WAV"), 8000, 10);

        let lenient = session().compare_audio(&input, &output).unwrap();
        assert_eq!(lenient.rows.len(), 1);

        let config = CompareConfig::builder().strict_keys(true).build().unwrap();
        let err = CompareSession::new(config)
            .compare_audio(&input, &output)
            .unwrap_err();
        assert!(matches!(err, Error::KeyCollision { .. }));
    }
}
