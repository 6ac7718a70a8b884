//! Encoding selection

/// Preferred recording types, most preferred first
pub const DEFAULT_MIME_PREFERENCES: &[&str] = &[
    "video/webm;codecs=H264",
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm",
];

/// First preference the platform supports, or `""` to let the platform pick
pub fn select_mime_type<'a, F>(preferences: &'a [String], is_supported: F) -> &'a str
where
    F: Fn(&str) -> bool,
{
    preferences
        .iter()
        .map(String::as_str)
        .find(|mime| is_supported(mime))
        .unwrap_or("")
}
