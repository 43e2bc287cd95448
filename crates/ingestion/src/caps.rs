//! Capability string parsing
//!
//! Media pipelines announce the negotiated frame rate in their capability
//! string, e.g. `image/jpeg, width=(int)1280, framerate=(fraction)4/1`.
//! The parsed rate is forwarded to the aligner as a rate hint.

use regex::Regex;

const FRAMERATE_PATTERN: &str = r"framerate=(?:\(fraction\))?\s*(\d+)\s*/\s*(\d+)";

/// Extract the frame rate (frames per second) from a capability string.
///
/// Returns `None` when no `framerate` field is present, the denominator is
/// zero, or the numerator is zero (variable frame rate is announced as `0/1`).
pub fn parse_framerate(caps: &str) -> Option<f64> {
    let re = Regex::new(FRAMERATE_PATTERN).ok()?;
    let captures = re.captures(caps)?;
    let num: u64 = captures.get(1)?.as_str().parse().ok()?;
    let den: u64 = captures.get(2)?.as_str().parse().ok()?;
    if num == 0 || den == 0 {
        return None;
    }
    Some(num as f64 / den as f64)
}
