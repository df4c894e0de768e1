//! Frame-accurate timecode conversion.
//!
//! Timecodes use the `HH:MM:SS.FF` form where `FF` is a frame index at a
//! known frame rate, not a decimal fraction of a second. The frame rate is
//! never embedded in the string and must be supplied with every call.
//!
//! The converters are permissive: they never fail and never
//! panic. Out-of-range frame counts compute a shifted value, non-numeric
//! fields yield `NaN`, and `fps == 0` divides in floating point. Callers
//! that want to reject such input use [`validate_fps`] and
//! [`validate_timecode`] at their boundary.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Slack, in frames, absorbing float error when `seconds * fps` lands just
/// below a whole frame.
const FRAME_EPSILON: f64 = 1e-6;

/// Timecode of the first frame.
pub const ZERO_TIMECODE: &str = "00:00:00.00";

/// Default frame rate assumed for upstream storyboard timecodes.
pub const DEFAULT_FPS: u32 = 24;

/// Canonical timecode grammar. Hours may widen past two digits.
static TIMECODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2})\.(\d{2,})$").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Convert a timecode to absolute seconds at `fps`.
///
/// Accepts `HH:MM:SS.FF`, `MM:SS.FF` and `SS.FF`; a missing `.FF` means
/// frame 0. Every field is an integer. Malformed fields produce `NaN`
/// instead of an error.
///
/// ```
/// use kino_core::timecode::timecode_to_seconds;
///
/// assert_eq!(timecode_to_seconds("00:23:47.00", 24), 1427.0);
/// assert_eq!(timecode_to_seconds("00:00:09.16", 24), 9.0 + 16.0 / 24.0);
/// ```
pub fn timecode_to_seconds(timecode: &str, fps: u32) -> f64 {
    try_timecode_to_seconds(timecode, fps).unwrap_or(f64::NAN)
}

/// Like [`timecode_to_seconds`] but returns `None` when a field is not an
/// integer or the string has more than three `:`-separated fields.
///
/// Range checks are still not applied: `"00:00:00.30"` at 24 fps is
/// `1.25` seconds.
pub fn try_timecode_to_seconds(timecode: &str, fps: u32) -> Option<f64> {
    let parts: Vec<&str> = timecode.trim().split(':').collect();
    let (hours, minutes, rest) = match parts.as_slice() {
        [hours, minutes, rest] => (*hours, *minutes, *rest),
        [minutes, rest] => ("0", *minutes, *rest),
        [rest] => ("0", "0", *rest),
        _ => return None,
    };
    let (seconds, frames) = rest.split_once('.').unwrap_or((rest, "0"));

    let base = parse_field(hours)? * 3600.0 + parse_field(minutes)? * 60.0 + parse_field(seconds)?;
    Some(base + parse_field(frames)? / f64::from(fps))
}

/// Convert absolute seconds to an `HH:MM:SS.FF` timecode at `fps`.
///
/// Negative and `NaN` inputs clamp to zero. The result truncates to the
/// frame at or before `seconds`; it never rounds up. `fps == 0` has no
/// representable frame and yields [`ZERO_TIMECODE`].
///
/// ```
/// use kino_core::timecode::seconds_to_timecode;
///
/// assert_eq!(seconds_to_timecode(1427.0, 24), "00:23:47.00");
/// assert_eq!(seconds_to_timecode(-5.0, 24), "00:00:00.00");
/// ```
pub fn seconds_to_timecode(seconds: f64, fps: u32) -> String {
    if fps == 0 {
        return ZERO_TIMECODE.to_string();
    }
    let fps = u64::from(fps);
    // `f64::max` discards NaN, so NaN clamps to zero as well.
    let clamped = seconds.max(0.0);
    let total_frames = (clamped * fps as f64 + FRAME_EPSILON).floor() as u64;

    let frame = total_frames % fps;
    let total_seconds = total_frames / fps;
    let sec = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;

    format!("{hours:02}:{minutes:02}:{sec:02}.{frame:02}")
}

/// Duration of a single frame in seconds.
pub fn frame_duration(fps: u32) -> f64 {
    1.0 / f64::from(fps.max(1))
}

// ---------------------------------------------------------------------------
// Repair helpers
// ---------------------------------------------------------------------------

/// Interpret a three-field timecode as `MM:SS:FF`.
///
/// Upstream generators sometimes emit `MM:SS:FF` when asked for
/// `HH:MM:SS.FF`. Returns `None` unless minutes, seconds and frames are all
/// plain digits and seconds is below 60. Anything after a `.` in the last
/// field is ignored.
pub fn mm_ss_ff_to_seconds(timecode: &str, fps: u32) -> Option<f64> {
    let parts: Vec<&str> = timecode.trim().split(':').collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };
    let frames_token = third.split('.').next().unwrap_or_default();
    if !is_digits(first) || !is_digits(second) || !is_digits(frames_token) {
        return None;
    }

    let minutes: u64 = first.parse().ok()?;
    let seconds: u64 = second.parse().ok()?;
    let frames: u64 = frames_token.parse().ok()?;
    if seconds >= 60 {
        return None;
    }

    Some((minutes * 60 + seconds) as f64 + frames as f64 / f64::from(fps.max(1)))
}

/// Resolve an upstream timecode to a usable position inside the media.
///
/// Missing or unparseable values resolve to `0.0`. For media shorter than
/// an hour, a value overshooting the duration by more than a second is
/// retried as `MM:SS:FF`. With a known duration the result is clamped so
/// that at least one frame remains after it.
pub fn normalize_timestamp_seconds(value: Option<&str>, duration_seconds: f64, fps: u32) -> f64 {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return 0.0;
    };
    let Some(mut parsed) = try_timecode_to_seconds(value, fps)
        .filter(|s| s.is_finite())
        .map(|s| s.max(0.0))
    else {
        return 0.0;
    };

    if duration_seconds > 0.0 && duration_seconds < 3600.0 && parsed > duration_seconds + 1.0 {
        if let Some(alt) = mm_ss_ff_to_seconds(value, fps) {
            if alt <= duration_seconds + 1.0 {
                parsed = alt;
            }
        }
    }

    if duration_seconds <= 0.0 {
        return parsed;
    }

    let max_start = (duration_seconds - frame_duration(fps)).max(0.0);
    parsed.max(0.0).min(max_start)
}

// ---------------------------------------------------------------------------
// Validation functions
// ---------------------------------------------------------------------------

/// Validate that a frame rate is usable for conversion.
pub fn validate_fps(fps: u32) -> Result<(), CoreError> {
    if fps == 0 {
        return Err(CoreError::Validation(
            "fps must be a positive integer, got 0".to_string(),
        ));
    }
    Ok(())
}

/// Validate that `timecode` is a canonical `HH:MM:SS.FF` string at `fps`.
///
/// Minutes and seconds must be below 60 and the frame index below `fps`.
pub fn validate_timecode(timecode: &str, fps: u32) -> Result<(), CoreError> {
    validate_fps(fps)?;

    let caps = TIMECODE_RE.captures(timecode).ok_or_else(|| {
        CoreError::Validation(format!(
            "timecode must match HH:MM:SS.FF, got '{timecode}'"
        ))
    })?;

    let field = |i: usize| -> Result<u64, CoreError> {
        caps[i]
            .parse::<u64>()
            .map_err(|e| CoreError::Validation(format!("timecode field out of range in '{timecode}': {e}")))
    };

    let minutes = field(2)?;
    let seconds = field(3)?;
    let frames = field(4)?;

    if minutes >= 60 {
        return Err(CoreError::Validation(format!(
            "minutes must be < 60 in '{timecode}'"
        )));
    }
    if seconds >= 60 {
        return Err(CoreError::Validation(format!(
            "seconds must be < 60 in '{timecode}'"
        )));
    }
    if frames >= u64::from(fps) {
        return Err(CoreError::Validation(format!(
            "frame index {frames} must be < fps ({fps}) in '{timecode}'"
        )));
    }
    Ok(())
}

fn parse_field(field: &str) -> Option<f64> {
    field.trim().parse::<i64>().ok().map(|n| n as f64)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
