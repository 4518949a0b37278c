// ============================================================================
// rehash-core/src/filters.rs
// ============================================================================
//
// FILTER CHAINS: Per-Job Visual and Audio Perturbations
//
// Each job gets a freshly generated `FilterChain`. Fast mode applies a fixed,
// barely visible brightness/contrast tweak and copies the audio stream.
// Advanced mode samples contrast and brightness from small ranges, injects
// temporal noise and applies a center crop that is scaled back to the source
// size; audio is re-encoded with a slight volume change.
//
// Sampled values are never shared between jobs, so outputs from one batch are
// not trivially correlated with each other.

use crate::config::{
    ADVANCED_X264_CRF, ADVANCED_X264_PRESET, AUDIO_BITRATE, BRIGHTNESS_RANGE, CONTRAST_RANGE,
    FAST_MODE_FILTER, FAST_X264_CRF, FAST_X264_PRESET, Intensity, Mode, VOLUME_DELTA_RANGE,
};

use rand::Rng;

/// How the audio stream is written to the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioTreatment {
    /// Stream copied without re-encoding.
    Copy,
    /// Re-encoded to AAC with the given volume multiplier.
    Reencode { volume: f64 },
}

/// Numeric parameters sampled or looked up for an advanced-mode chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perturbation {
    pub contrast: f64,
    pub brightness: f64,
    pub noise_strength: u8,
    pub crop_factor: f64,
}

/// Builder for constructing video filter chains
#[derive(Debug, Clone, Default)]
pub struct VideoFilterChain {
    filters: Vec<String>,
}

impl VideoFilterChain {
    /// Creates a new empty filter chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter to the chain, ignoring empty strings
    #[must_use]
    pub fn add_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.filters.push(filter);
        }
        self
    }

    /// Joins the filters into a single `-vf` argument
    #[must_use]
    pub fn build(self) -> Option<String> {
        if self.filters.is_empty() {
            None
        } else {
            Some(self.filters.join(","))
        }
    }
}

/// Complete set of transform parameters for one ffmpeg invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    pub mode: Mode,
    pub video_filter: String,
    pub audio: AudioTreatment,
    /// Present only in advanced mode.
    pub perturbation: Option<Perturbation>,
    pub preset: &'static str,
    pub crf: u8,
}

impl FilterChain {
    /// Generates a chain using the calling thread's random generator.
    pub fn random(mode: Mode, intensity: Intensity, scramble_audio: bool) -> Self {
        Self::generate(mode, intensity, scramble_audio, &mut rand::thread_rng())
    }

    /// Generates a chain drawing every random value from `rng`.
    ///
    /// `intensity` is ignored in fast mode. `scramble_audio` forces an audio
    /// re-encode in fast mode; advanced mode always re-encodes audio.
    pub fn generate<R: Rng>(
        mode: Mode,
        intensity: Intensity,
        scramble_audio: bool,
        rng: &mut R,
    ) -> Self {
        match mode {
            Mode::Fast => {
                let audio = if scramble_audio {
                    sample_volume(rng)
                } else {
                    AudioTreatment::Copy
                };
                Self {
                    mode,
                    video_filter: FAST_MODE_FILTER.to_string(),
                    audio,
                    perturbation: None,
                    preset: FAST_X264_PRESET,
                    crf: FAST_X264_CRF,
                }
            }
            Mode::Advanced => {
                let tier = intensity.values();
                let perturbation = Perturbation {
                    contrast: rng.gen_range(CONTRAST_RANGE),
                    brightness: rng.gen_range(BRIGHTNESS_RANGE),
                    noise_strength: tier.noise_strength,
                    crop_factor: tier.crop_factor,
                };
                Self {
                    mode,
                    video_filter: advanced_video_filter(&perturbation),
                    audio: sample_volume(rng),
                    perturbation: Some(perturbation),
                    preset: ADVANCED_X264_PRESET,
                    crf: ADVANCED_X264_CRF,
                }
            }
        }
    }

    /// Output-side ffmpeg arguments: filters, metadata removal and codecs.
    pub fn output_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-vf".into(),
            self.video_filter.clone(),
            "-map_metadata".into(),
            "-1".into(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            self.preset.into(),
            "-crf".into(),
            self.crf.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ];

        match self.audio {
            AudioTreatment::Copy => {
                args.extend(["-c:a".into(), "copy".into()]);
            }
            AudioTreatment::Reencode { volume } => {
                args.extend([
                    "-af".into(),
                    format!("volume={volume:.3}"),
                    "-c:a".into(),
                    "aac".into(),
                    "-b:a".into(),
                    AUDIO_BITRATE.into(),
                ]);
            }
        }

        args.extend(["-movflags".into(), "+faststart".into()]);
        args
    }
}

fn advanced_video_filter(p: &Perturbation) -> String {
    let crop = p.crop_factor;
    VideoFilterChain::new()
        .add_filter(format!(
            "eq=contrast={:.3}:brightness={:.3}",
            p.contrast, p.brightness
        ))
        .add_filter(format!("noise=alls={}:allf=t+u", p.noise_strength))
        .add_filter(format!("crop=iw*{crop}:ih*{crop}"))
        // Back up to the source size. Rounding up undoes the crop's truncation
        // to even dimensions; the result stays even for yuv420p.
        .add_filter(format!("scale=ceil(iw/{crop}/2)*2:ceil(ih/{crop}/2)*2"))
        .build()
        .unwrap_or_default()
}

fn sample_volume<R: Rng>(rng: &mut R) -> AudioTreatment {
    let delta = rng.gen_range(VOLUME_DELTA_RANGE);
    let volume = if rng.gen_bool(0.5) {
        1.0 + delta
    } else {
        1.0 - delta
    };
    AudioTreatment::Reencode { volume }
}
