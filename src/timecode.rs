// Timecode helpers shared by the STL writer and reader.

/// Splits a frame count into (hours, minutes, seconds, frames).
pub fn frames_to_components(frames: u64, frame_rate: u32) -> (u64, u64, u64, u64) {
    let rate = frame_rate.max(1) as u64;
    let total_seconds = frames / rate;
    (
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60,
        frames % rate,
    )
}

/// Formats a frame count as `HH:MM:SS:FF`.
pub fn format_frames(frames: u64, frame_rate: u32) -> String {
    let (h, m, s, f) = frames_to_components(frames, frame_rate);
    format!("{:02}:{:02}:{:02}:{:02}", h, m, s, f)
}

/// Formats seconds as `HH:MM:SS;FF`. Fractional frames round half to even,
/// negative input clamps to zero.
pub fn format_timecode(seconds: f64, fps: f64) -> String {
    let seconds = if seconds < 0.0 || seconds.is_nan() {
        0.0
    } else {
        seconds
    };

    let total_frames = (seconds * fps).round_ties_even() as u64;
    let rate = (fps as u64).max(1);
    let (s, f) = (total_frames / rate, total_frames % rate);
    let (h, rem) = (s / 3600, s % 3600);
    let (m, s) = (rem / 60, rem % 60);

    format!("{:02}:{:02}:{:02};{:02}", h, m, s, f)
}

// TTI time code bytes (HH, MM, SS, FF) in seconds
pub fn tti_timecode_seconds(tc: [u8; 4], fps: f64) -> f64 {
    let [h, m, s, f] = tc;
    h as f64 * 3600.0 + m as f64 * 60.0 + s as f64 + f as f64 / fps
}
