//! Directory-tree correspondence between source and derived media.
//!
//! A run indexes two trees (the originals and the space-reduced derivatives)
//! into maps from [`CorrespondenceKey`] to file, then joins them on that key:
//!
//! ```rust,ignore
//! use media_fidelity::tree::{IndexRule, Modality, TreeIndex, match_trees};
//!
//! let source = TreeIndex::build("input", &IndexRule::source(Modality::Audio));
//! let derived = TreeIndex::build("output", &IndexRule::derived(Modality::Audio, None));
//!
//! for pair in match_trees(&source, &derived).matched() {
//!     println!("{} -> {}", pair.source.display_path(), pair.derived.display_path());
//! }
//! ```

mod discovery;
mod key;
mod matching;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use key::{IndexRule, SuffixPattern};
pub use matching::{Correspondence, MatchSet, MatchedPair, MissingCounterpart, match_trees};

/// Raster formats compared pixel-by-pixel.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff", "tif"];

/// Audio containers compared sample-by-sample.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "flac", "m4a"];

/// Video containers handed to the external toolchain.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "flv", "ts", "m4v"];

/// Kind of media a comparison run handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    /// Still images (MSE/PSNR over RGB, SSIM over luminance).
    Image,
    /// Audio waveforms (MSE/PSNR over normalized samples).
    Audio,
    /// Video streams (measured by ffmpeg).
    Video,
}

impl Modality {
    /// All modalities in run order.
    pub const ALL: [Modality; 3] = [Self::Image, Self::Audio, Self::Video];

    /// Extension allow-list for this modality (lowercase, no dot).
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Image => IMAGE_EXTENSIONS,
            Self::Audio => AUDIO_EXTENSIONS,
            Self::Video => VIDEO_EXTENSIONS,
        }
    }

    /// Whether a file name carries one of this modality's extensions.
    #[must_use]
    pub fn accepts(self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions().contains(&ext.as_str())
            })
    }

    /// Parse a modality name, case-insensitively.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "image" | "images" | "img" => Some(Self::Image),
            "audio" | "sound" => Some(Self::Audio),
            "video" | "videos" => Some(Self::Video),
            _ => None,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "Image"),
            Self::Audio => write!(f, "Audio"),
            Self::Video => write!(f, "Video"),
        }
    }
}

/// Normalized `<directory>/<stem>` identifier joining the two trees.
///
/// Components are joined with `/` regardless of platform, and files at the
/// tree root have no directory prefix, so ordering is plain string ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorrespondenceKey(String);

impl CorrespondenceKey {
    /// Build a key from a relative directory and a stem.
    #[must_use]
    pub fn new(relative_dir: &Path, stem: &str) -> Self {
        let mut parts: Vec<String> = relative_dir
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        parts.push(stem.to_string());
        Self(parts.join("/"))
    }

    /// The key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final (stem) component of the key.
    #[must_use]
    pub fn stem(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for CorrespondenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrespondenceKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Path relative to the tree root.
    pub relative_path: PathBuf,
    /// Path the decoders and external tools open.
    pub absolute_path: PathBuf,
}

impl IndexEntry {
    /// Relative path with `/` separators, for display.
    #[must_use]
    pub fn display_path(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// File name component.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.relative_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }
}

/// Two files of one tree that resolved to the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    /// The shared key.
    pub key: CorrespondenceKey,
    /// Entry that was replaced.
    pub replaced: PathBuf,
    /// Entry that is kept (indexed later in walk order).
    pub kept: PathBuf,
}

/// Correspondence index of one directory tree.
#[derive(Debug, Clone)]
pub struct TreeIndex {
    /// Root that was walked.
    pub root: PathBuf,

    /// Modality the tree was indexed for.
    pub modality: Modality,

    /// Indexed files by key, in key order.
    pub entries: BTreeMap<CorrespondenceKey, IndexEntry>,

    /// Files that were hidden, filtered by extension or did not match the pattern.
    pub skipped: usize,

    /// Keys that were produced more than once during the walk.
    pub collisions: Vec<KeyCollision>,
}

impl TreeIndex {
    /// Create an empty index for a root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, modality: Modality) -> Self {
        Self {
            root: root.into(),
            modality,
            entries: BTreeMap::new(),
            skipped: 0,
            collisions: Vec::new(),
        }
    }

    /// Walk `root` and index every file accepted by `rule`.
    ///
    /// A missing root produces an empty index.
    pub fn build(root: impl AsRef<Path>, rule: &IndexRule) -> Self {
        discovery::index_tree(root.as_ref(), rule)
    }

    /// Number of indexed files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a key.
    #[must_use]
    pub fn get(&self, key: &CorrespondenceKey) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Insert an entry, recording a collision if the key was already present.
    pub fn insert(&mut self, key: CorrespondenceKey, entry: IndexEntry) {
        let kept = entry.relative_path.clone();
        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            tracing::warn!(
                key = %key,
                replaced = %previous.relative_path.display(),
                kept = %kept.display(),
                "two files share one correspondence key"
            );
            self.collisions.push(KeyCollision {
                key,
                replaced: previous.relative_path,
                kept,
            });
        }
    }
}
