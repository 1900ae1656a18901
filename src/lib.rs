//! # media-fidelity
//!
//! Objective fidelity measurement between original media and derived
//! (compressed, re-encoded or optimized) copies.
//!
//! Two directory trees are indexed per modality and joined on a normalized
//! `<relative dir>/<stem>` key. Each matched pair is measured:
//!
//! | Modality | Metrics | Computed by |
//! |----------|---------|-------------|
//! | Image | MSE, PSNR over RGB8; SSIM over luminance | in-process |
//! | Audio | MSE, PSNR over mono samples, resampled to the source rate | in-process |
//! | Video | average PSNR and SSIM, MSE derived from PSNR | ffmpeg / ffprobe |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use media_fidelity::{CompareConfig, CompareSession, Modality, render_report};
//!
//! let config = CompareConfig::builder()
//!     .suffix("_optimized")
//!     .parallel(true)
//!     .build()?;
//!
//! let session = CompareSession::new(config);
//! for modality in Modality::ALL {
//!     let report = session.compare(modality, "input", "output")?;
//!     println!("{}", render_report(&report));
//!     println!("{}", report.summary());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`tree`]: Modalities, correspondence keys, tree indexing and matching
//! - [`decode`]: Image and audio decoding
//! - [`resample`]: Sample-rate conversion
//! - [`metrics`]: MSE/PSNR policy and per-modality calculators
//! - [`video`]: External toolchain runner, probe and diagnostic parser
//! - [`eval`]: Comparison session, reports and table rendering

pub mod decode;
pub mod error;
pub mod eval;
pub mod metrics;
pub mod resample;
pub mod tree;
pub mod video;

// Re-export commonly used types
pub use error::{Error, Result};
pub use eval::{
    report::{ComparisonReport, ReportRow, RowOutcome, RunSummary, write_json},
    session::{CompareConfig, CompareSession},
    table::render_report,
};
pub use metrics::{AudioFidelity, FidelityRecord, ImageFidelity, VideoFidelity};
pub use tree::{CorrespondenceKey, IndexRule, Modality, SuffixPattern, TreeIndex, match_trees};
pub use video::VideoToolchain;
