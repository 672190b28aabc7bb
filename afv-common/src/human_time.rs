//! Human-readable duration and rate formatting
//!
//! Provides the text lines shown beside the charts and the time-axis tick
//! labels, so the server and any report output agree on formatting.

/// Axis labels switch from `S.SSs` to `M:SS.S` at this many seconds
const SHORT_FORMAT_MAX: f64 = 100.0;

/// Format a duration the way the metadata line shows it.
///
/// Always two decimals, e.g. `3.00 seconds`.
///
/// # Examples
///
/// ```
/// use afv_common::human_time::format_duration_seconds;
///
/// assert_eq!(format_duration_seconds(3.0), "3.00 seconds");
/// assert_eq!(format_duration_seconds(0.126), "0.13 seconds");
/// ```
pub fn format_duration_seconds(seconds: f64) -> String {
    format!("{:.2} seconds", seconds)
}

/// Format a sample rate, e.g. `16000 Hz`
pub fn format_sample_rate(sample_rate: u32) -> String {
    format!("{} Hz", sample_rate)
}

/// Format a time-axis position.
///
/// - Short format (`S.SSs`): below 100 seconds
/// - Medium format (`M:SS.S`): 100 seconds and above
///
/// Negative values keep their sign; they only occur for centred frames
/// whose window starts before the first sample.
///
/// # Examples
///
/// ```
/// use afv_common::human_time::format_axis_time;
///
/// assert_eq!(format_axis_time(1.5), "1.50s");
/// assert_eq!(format_axis_time(125.0), "2:05.0");
/// ```
pub fn format_axis_time(seconds: f64) -> String {
    let is_negative = seconds < 0.0;
    let abs_seconds = seconds.abs();

    let formatted = if abs_seconds < SHORT_FORMAT_MAX {
        format!("{:.2}s", abs_seconds)
    } else {
        let minutes = (abs_seconds / 60.0).floor() as u64;
        let secs = abs_seconds - minutes as f64 * 60.0;
        format!("{}:{:04.1}", minutes, secs)
    };

    if is_negative {
        format!("-{}", formatted)
    } else {
        formatted
    }
}
