//! Logging helpers.

/// Page content as it may appear in logs.
///
/// Without the `dangerous-logging` feature, text content and attribute values are potentially personal data and are redacted.
pub(crate) fn content(text: &str) -> &str {
	if cfg!(feature = "dangerous-logging") {
		text
	} else {
		"<redacted>"
	}
}
