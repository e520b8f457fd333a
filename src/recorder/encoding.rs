//! Encoding format selection
//!
//! The recording pipeline picks the first supported entry from a fixed
//! preference-ordered format list, mirroring the container/codec
//! identifiers browsers use for stream recording.

use crate::recorder::state::RecordingError;
use std::process::Command;

/// A container/codec combination the pipeline can encode to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFormat {
    /// video/webm (VP9)
    Webm,
    /// video/webm;codecs=vp8
    WebmVp8,
    /// video/webm;codecs=h264 (Matroska container)
    WebmH264,
    /// video/mp4 (fragmented, H.264)
    Mp4,
}

/// Preference order: first supported entry wins
pub const FORMAT_PREFERENCE: [EncodingFormat; 4] = [
    EncodingFormat::Webm,
    EncodingFormat::WebmVp8,
    EncodingFormat::WebmH264,
    EncodingFormat::Mp4,
];

impl EncodingFormat {
    /// MIME-like identifier for this format
    pub fn identifier(&self) -> &'static str {
        match self {
            EncodingFormat::Webm => "video/webm",
            EncodingFormat::WebmVp8 => "video/webm;codecs=vp8",
            EncodingFormat::WebmH264 => "video/webm;codecs=h264",
            EncodingFormat::Mp4 => "video/mp4",
        }
    }

    /// FFmpeg video encoder for this format
    pub fn video_codec(&self) -> &'static str {
        match self {
            EncodingFormat::Webm => "libvpx-vp9",
            EncodingFormat::WebmVp8 => "libvpx",
            EncodingFormat::WebmH264 => "libx264",
            EncodingFormat::Mp4 => "libx264",
        }
    }

    /// FFmpeg muxer for this format.
    ///
    /// WebM does not carry H.264, so the h264 variant muxes into plain
    /// Matroska; mp4 uses a fragmented layout so it can stream to a pipe.
    pub fn muxer(&self) -> &'static str {
        match self {
            EncodingFormat::Webm | EncodingFormat::WebmVp8 => "webm",
            EncodingFormat::WebmH264 => "matroska",
            EncodingFormat::Mp4 => "mp4",
        }
    }

    /// File extension: mp4 when the identifier names mp4, webm otherwise
    pub fn extension(&self) -> &'static str {
        if self.identifier().contains("mp4") {
            "mp4"
        } else {
            "webm"
        }
    }
}

impl std::fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Pick the first format of the preference list the probe reports as
/// supported. Errors only when nothing is supported.
pub fn pick_format<F>(is_supported: F) -> Result<EncodingFormat, RecordingError>
where
    F: Fn(EncodingFormat) -> bool,
{
    FORMAT_PREFERENCE
        .iter()
        .copied()
        .find(|format| is_supported(*format))
        .ok_or(RecordingError::NoSupportedFormat)
}

/// Probe the host FFmpeg for its available encoders
pub fn available_encoders() -> Result<String, RecordingError> {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .map_err(|e| RecordingError::Ffmpeg(format!("Failed to run ffmpeg: {e}")))?;

    if !output.status.success() {
        return Err(RecordingError::Ffmpeg(format!(
            "ffmpeg -encoders failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Pick a format based on the host's FFmpeg encoder list
pub fn detect_format() -> Result<EncodingFormat, RecordingError> {
    let encoders = available_encoders()?;
    let format = pick_format(|f| encoders.contains(f.video_codec()))?;
    tracing::info!("Using encoding format: {}", format);
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_returns_first_supported() {
        let format = pick_format(|_| true).unwrap();
        assert_eq!(format, EncodingFormat::Webm);
    }

    #[test]
    fn test_pick_skips_unsupported() {
        let format = pick_format(|f| f != EncodingFormat::Webm).unwrap();
        assert_eq!(format, EncodingFormat::WebmVp8);

        let format = pick_format(|f| f == EncodingFormat::Mp4).unwrap();
        assert_eq!(format, EncodingFormat::Mp4);
    }

    #[test]
    fn test_pick_errors_when_none_supported() {
        let err = pick_format(|_| false).unwrap_err();
        assert!(matches!(err, RecordingError::NoSupportedFormat));
    }

    #[test]
    fn test_extension_follows_identifier() {
        assert_eq!(EncodingFormat::Webm.extension(), "webm");
        assert_eq!(EncodingFormat::WebmVp8.extension(), "webm");
        assert_eq!(EncodingFormat::WebmH264.extension(), "webm");
        assert_eq!(EncodingFormat::Mp4.extension(), "mp4");
    }

    #[test]
    fn test_preference_order() {
        let idents: Vec<_> = FORMAT_PREFERENCE.iter().map(|f| f.identifier()).collect();
        assert_eq!(
            idents,
            vec![
                "video/webm",
                "video/webm;codecs=vp8",
                "video/webm;codecs=h264",
                "video/mp4",
            ]
        );
    }
}
