//! Decoding media files into the buffers the calculators consume.
//!
//! Images become an RGB8 raster plus a derived 8-bit luminance plane. Audio
//! becomes a mono `f32` signal in [-1, 1] at the file's native rate.
//!
//! # Example
//!
//! ```ignore
//! use media_fidelity::decode::{decode_audio, decode_image};
//!
//! let image = decode_image("input/photo.png".as_ref())?;
//! println!("{}x{}", image.width(), image.height());
//!
//! let audio = decode_audio("input/track.flac".as_ref())?;
//! println!("{} samples at {} Hz", audio.samples.len(), audio.sample_rate);
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use imgref::ImgVec;
use rgb::RGB8;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};

/// A decoded still image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Pixels converted to 8-bit RGB.
    pub rgb: ImgVec<RGB8>,
    /// ITU-R 601 luminance of `rgb`.
    pub luma: ImgVec<u8>,
}

impl DecodedImage {
    /// Build from an RGB raster, deriving the luminance plane.
    #[must_use]
    pub fn from_rgb(rgb: ImgVec<RGB8>) -> Self {
        let luma_pixels = rgb.pixels().map(luma_of).collect();
        let luma = ImgVec::new(luma_pixels, rgb.width(), rgb.height());
        Self { rgb, luma }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rgb.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rgb.height()
    }
}

/// Fixed-point ITU-R 601 luma, as used by common imaging libraries for RGB to L.
#[inline]
fn luma_of(p: RGB8) -> u8 {
    let y = u32::from(p.r) * 19595 + u32::from(p.g) * 38470 + u32::from(p.b) * 7471 + 0x8000;
    (y >> 16) as u8
}

/// Decode an image file of any supported raster format.
///
/// The format is sniffed from content, falling back to the extension.
/// Alpha is dropped and palette or grayscale images are expanded to RGB.
///
/// # Errors
///
/// Returns [`Error::ImageLoad`] if the file cannot be read or decoded.
pub fn decode_image(path: &Path) -> Result<DecodedImage> {
    let load_err = |reason: String| Error::ImageLoad {
        path: path.to_path_buf(),
        reason,
    };

    let decoded = image::ImageReader::open(path)
        .map_err(|e| load_err(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| load_err(e.to_string()))?
        .decode()
        .map_err(|e| load_err(e.to_string()))?;

    let rgb = decoded.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    let pixels: Vec<RGB8> = rgb
        .pixels()
        .map(|p| RGB8::new(p.0[0], p.0[1], p.0[2]))
        .collect();

    Ok(DecodedImage::from_rgb(ImgVec::new(pixels, width, height)))
}

/// A decoded audio track, mixed down to mono.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// File the samples came from.
    pub path: PathBuf,
    /// Mono samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Native sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count before downmixing.
    pub channels: usize,
}

/// Decode the first audio track of a file to mono `f32` at its native rate.
///
/// Multi-channel audio is averaged per frame. Corrupt packets are skipped
/// with a warning; everything else is an error.
///
/// # Errors
///
/// Returns [`Error::AudioDecode`] if the container or codec is unsupported,
/// the file has no audio track, or reading fails.
pub fn decode_audio(path: &Path) -> Result<DecodedAudio> {
    let decode_err = |reason: String| Error::AudioDecode {
        path: path.to_path_buf(),
        reason,
    };

    tracing::debug!(path = %path.display(), "decoding audio");

    let file = File::open(path).map_err(|e| decode_err(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_err(format!("unsupported format: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_err("no audio track".to_string()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map_or(0, |c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(format!("unsupported codec: {e}")))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_err(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(path = %path.display(), "skipping corrupt packet: {}", e);
                continue;
            }
            Err(e) => return Err(decode_err(e.to_string())),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channels = spec.channels.count();

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        downmix_into(buffer.samples(), channels, &mut samples);
    }

    let sample_rate = sample_rate.ok_or_else(|| decode_err("unknown sample rate".to_string()))?;

    tracing::debug!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate,
        channels,
        "audio decoded"
    );

    Ok(DecodedAudio {
        path: path.to_path_buf(),
        samples,
        sample_rate,
        channels,
    })
}

/// Average interleaved frames into `out`.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}
