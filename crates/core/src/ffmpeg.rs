//! FFmpeg/FFprobe argument builders and ffprobe output parsing.
//!
//! Every builder returns a complete argument list whose first element is
//! the program name. Nothing here spawns a process; `kino-pipeline` runs
//! the lists.

use serde::{Deserialize, Serialize};

/// Program name of the ffmpeg binary.
pub const FFMPEG_BIN: &str = "ffmpeg";

/// Program name of the ffprobe binary.
pub const FFPROBE_BIN: &str = "ffprobe";

/// Audio codec shared by all clip presets.
const AUDIO_CODEC: &str = "aac";

/// Audio bitrate shared by all clip presets.
const AUDIO_BITRATE: &str = "192k";

/// Scale filter for thumbnails: 1280 px wide, even height keeping aspect.
pub const THUMBNAIL_SCALE_FILTER: &str = "scale=1280:-2";

/// WebP quality for thumbnails.
pub const THUMBNAIL_QUALITY: &str = "80";

/// Default x264 preset for locally rendered clips.
pub const DEFAULT_X264_PRESET: &str = "ultrafast";

/// Default x264 CRF for locally rendered clips.
pub const DEFAULT_X264_CRF: &str = "18";

/// A fully-formed argument list, program name first.
pub type CommandArgs = Vec<String>;

// ---------------------------------------------------------------------------
// Clip extraction
// ---------------------------------------------------------------------------

/// Source range and destination for one extracted clip.
///
/// `start_tc` and `end_tc` are passed to ffmpeg verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRequest {
    pub input_path: String,
    pub start_tc: String,
    pub end_tc: String,
    pub output_path: String,
}

/// Fixed encoder presets used by the clip-extraction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipPreset {
    /// Fast CPU encode for previews.
    Draft,
    /// Slow CPU encode for delivery.
    HighQuality,
}

impl ClipPreset {
    /// x264 `-preset` value.
    pub fn x264_preset(self) -> &'static str {
        match self {
            Self::Draft => "veryfast",
            Self::HighQuality => "slow",
        }
    }

    /// x264 `-crf` value.
    pub fn crf(self) -> &'static str {
        match self {
            Self::Draft => "20",
            Self::HighQuality => "18",
        }
    }
}

/// Tunable x264 settings for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X264Settings {
    pub preset: String,
    pub crf: String,
}

impl Default for X264Settings {
    fn default() -> Self {
        Self {
            preset: DEFAULT_X264_PRESET.to_string(),
            crf: DEFAULT_X264_CRF.to_string(),
        }
    }
}

/// Build the clip command for one of the fixed [`ClipPreset`]s.
pub fn build_preset_clip_command(request: &ClipRequest, preset: ClipPreset) -> CommandArgs {
    let mut args = clip_input_args(request);
    args.extend(
        [
            "-c:v",
            "libx264",
            "-preset",
            preset.x264_preset(),
            "-crf",
            preset.crf(),
            "-c:a",
            AUDIO_CODEC,
            "-b:a",
            AUDIO_BITRATE,
        ]
        .map(String::from),
    );
    args.push(request.output_path.clone());
    args
}

/// Build an x264 clip command with configurable preset and CRF.
///
/// Forces `yuv420p` so the output plays in browsers.
pub fn build_x264_clip_command(request: &ClipRequest, settings: &X264Settings) -> CommandArgs {
    let mut args = clip_input_args(request);
    args.extend(
        [
            "-c:v",
            "libx264",
            "-preset",
            settings.preset.as_str(),
            "-crf",
            settings.crf.as_str(),
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            AUDIO_CODEC,
            "-b:a",
            AUDIO_BITRATE,
        ]
        .map(String::from),
    );
    args.push(request.output_path.clone());
    args
}

/// Build a clip command using the NVIDIA hardware encoder.
pub fn build_nvenc_clip_command(request: &ClipRequest) -> CommandArgs {
    let mut args = clip_input_args(request);
    args.extend(
        [
            "-c:v",
            "h264_nvenc",
            "-preset",
            "p1",
            "-tune",
            "ll",
            "-rc",
            "vbr",
            "-cq",
            "23",
            "-b:v",
            "0",
            "-c:a",
            AUDIO_CODEC,
            "-b:a",
            AUDIO_BITRATE,
        ]
        .map(String::from),
    );
    args.push(request.output_path.clone());
    args
}

/// `ffmpeg -y -ss <start> -to <end> -i <input>`
fn clip_input_args(request: &ClipRequest) -> CommandArgs {
    vec![
        FFMPEG_BIN.to_string(),
        "-y".to_string(),
        "-ss".to_string(),
        request.start_tc.clone(),
        "-to".to_string(),
        request.end_tc.clone(),
        "-i".to_string(),
        request.input_path.clone(),
    ]
}

// ---------------------------------------------------------------------------
// Thumbnails
// ---------------------------------------------------------------------------

/// Build a single-frame WebP thumbnail command seeking to `timecode`.
pub fn build_thumbnail_command(input_path: &str, timecode: &str, output_path: &str) -> CommandArgs {
    [
        FFMPEG_BIN,
        "-y",
        "-ss",
        timecode,
        "-i",
        input_path,
        "-frames:v",
        "1",
        "-vf",
        THUMBNAIL_SCALE_FILTER,
        "-c:v",
        "libwebp",
        "-quality",
        THUMBNAIL_QUALITY,
        output_path,
    ]
    .map(String::from)
    .into()
}

// ---------------------------------------------------------------------------
// ffprobe
// ---------------------------------------------------------------------------

/// Build the ffprobe command that prints container and stream metadata as JSON.
pub fn build_probe_command(input_path: &str) -> CommandArgs {
    [
        FFPROBE_BIN,
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
        input_path,
    ]
    .map(String::from)
    .into()
}

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    #[serde(default)]
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeStream {
    pub codec_type: Option<String>,
    /// e.g. "24/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub duration: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
}

fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Media duration in seconds, or `0.0` when unknown.
///
/// Prefers the container duration and falls back to the first video stream.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    let from_format = probe.format.duration.as_deref();
    let from_stream = first_video_stream(probe).and_then(|s| s.duration.as_deref());

    [from_format, from_stream]
        .into_iter()
        .flatten()
        .find_map(|d| d.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Frame rate of the first video stream, or `0.0` when unknown.
pub fn parse_framerate(probe: &FfprobeOutput) -> f64 {
    first_video_stream(probe)
        .and_then(|s| s.r_frame_rate.as_deref())
        .map(parse_fraction)
        .unwrap_or(0.0)
}

/// Parse a fraction string like `"24000/1001"` into a float.
fn parse_fraction(s: &str) -> f64 {
    if let Some((num, den)) = s.split_once('/') {
        let num = num.parse::<f64>().unwrap_or(0.0);
        let den = den.parse::<f64>().unwrap_or(0.0);
        return if den > 0.0 { num / den } else { 0.0 };
    }
    s.parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ClipRequest {
        ClipRequest {
            input_path: "./uploads/p1.mp4".into(),
            start_tc: "00:23:45.12".into(),
            end_tc: "00:23:49.08".into(),
            output_path: "./clips/p1/sb0_scene1.mp4".into(),
        }
    }

    #[test]
    fn draft_clip_command_layout() {
        let args = build_preset_clip_command(&request(), ClipPreset::Draft);
        assert_eq!(
            args,
            vec![
                "ffmpeg", "-y", "-ss", "00:23:45.12", "-to", "00:23:49.08", "-i",
                "./uploads/p1.mp4", "-c:v", "libx264", "-preset", "veryfast", "-crf", "20",
                "-c:a", "aac", "-b:a", "192k", "./clips/p1/sb0_scene1.mp4",
            ]
        );
    }

    #[test]
    fn presets_differ_only_in_preset_and_crf() {
        let draft = build_preset_clip_command(&request(), ClipPreset::Draft);
        let hq = build_preset_clip_command(&request(), ClipPreset::HighQuality);
        assert_eq!(draft.len(), hq.len());

        let differing: Vec<usize> = (0..draft.len()).filter(|&i| draft[i] != hq[i]).collect();
        assert_eq!(differing, vec![11, 13]);
        assert_eq!(hq[11], "slow");
        assert_eq!(hq[13], "18");
    }

    #[test]
    fn x264_command_uses_settings_and_pix_fmt() {
        let settings = X264Settings {
            preset: "medium".into(),
            crf: "22".into(),
        };
        let args = build_x264_clip_command(&request(), &settings);
        let joined = args.join(" ");
        assert!(joined.contains("-preset medium -crf 22 -pix_fmt yuv420p"));
        assert_eq!(args.last().map(String::as_str), Some("./clips/p1/sb0_scene1.mp4"));
    }

    #[test]
    fn x264_defaults() {
        let settings = X264Settings::default();
        assert_eq!(settings.preset, "ultrafast");
        assert_eq!(settings.crf, "18");
    }

    #[test]
    fn nvenc_command_uses_hardware_encoder() {
        let args = build_nvenc_clip_command(&request());
        let joined = args.join(" ");
        assert!(joined.contains("-c:v h264_nvenc -preset p1 -tune ll -rc vbr -cq 23 -b:v 0"));
        assert_eq!(&args[..4], &["ffmpeg", "-y", "-ss", "00:23:45.12"]);
    }

    #[test]
    fn thumbnail_command_layout() {
        let args = build_thumbnail_command("in.mp4", "00:00:10.00", "out.webp");
        assert_eq!(
            args,
            vec![
                "ffmpeg", "-y", "-ss", "00:00:10.00", "-i", "in.mp4", "-frames:v", "1", "-vf",
                "scale=1280:-2", "-c:v", "libwebp", "-quality", "80", "out.webp",
            ]
        );
    }

    #[test]
    fn probe_command_ends_with_input() {
        let args = build_probe_command("movie.mp4");
        assert_eq!(args[0], "ffprobe");
        assert_eq!(args.last().map(String::as_str), Some("movie.mp4"));
    }

    #[test]
    fn parse_fraction_variants() {
        assert!((parse_fraction("30/1") - 30.0).abs() < 0.001);
        assert!((parse_fraction("24000/1001") - 23.976).abs() < 0.01);
        assert!((parse_fraction("25") - 25.0).abs() < 0.001);
        assert_eq!(parse_fraction("30/0"), 0.0);
    }

    #[test]
    fn duration_prefers_format() {
        let probe: FfprobeOutput = serde_json::from_str(
            r#"{"streams":[{"codec_type":"video","duration":"10.0"}],"format":{"duration":"120.5"}}"#,
        )
        .unwrap();
        assert!((parse_duration(&probe) - 120.5).abs() < 0.001);
    }

    #[test]
    fn duration_falls_back_to_video_stream() {
        let probe: FfprobeOutput = serde_json::from_str(
            r#"{"streams":[{"codec_type":"audio","duration":"3.0"},{"codec_type":"video","duration":"60.0","r_frame_rate":"24/1"}],"format":{}}"#,
        )
        .unwrap();
        assert!((parse_duration(&probe) - 60.0).abs() < 0.001);
        assert!((parse_framerate(&probe) - 24.0).abs() < 0.001);
    }

    #[test]
    fn empty_probe_is_unknown() {
        let probe: FfprobeOutput = serde_json::from_str("{}").unwrap();
        assert_eq!(parse_duration(&probe), 0.0);
        assert_eq!(parse_framerate(&probe), 0.0);
    }
}
