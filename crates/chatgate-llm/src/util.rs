//! Common utilities for providers
//!
//! Shared helpers for masking credentials and keeping backend error text
//! safe to return to callers.

/// Minimum key length to display partial key
const MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY: usize = 8;

/// Number of characters to show at start/end of masked key
const KEY_MASK_VISIBLE_CHARS: usize = 4;

/// Maximum length of an error message passed through to callers
const MAX_ERROR_CHARS: usize = 300;

/// Sensitive patterns to filter from error messages
const SENSITIVE_PATTERNS: &[&str] = &[
    "api_key",
    "api-key",
    "apikey",
    "api key",
    "key=",
    "authorization",
    "bearer",
    "token",
    "secret",
    "password",
    "credential",
];

/// Mask an API key (or caller key) for safe display in logs
///
/// Shows first 4 and last 4 characters for keys longer than 8 characters,
/// otherwise shows "****".
///
/// # Examples
/// ```
/// use chatgate_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("sk-1234567890abcdef"), "sk-1...cdef");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY {
        return "****".to_string();
    }
    let head: String = chars[..KEY_MASK_VISIBLE_CHARS].iter().collect();
    let tail: String = chars[chars.len() - KEY_MASK_VISIBLE_CHARS..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Sanitize error message for user display
///
/// Messages mentioning credentials collapse to a generic message; long ones
/// are truncated on a char boundary.
///
/// # Examples
/// ```
/// use chatgate_llm::util::sanitize_error_for_user;
/// assert_eq!(
///     sanitize_error_for_user("Invalid api_key provided"),
///     "An API error occurred. Please try again."
/// );
/// assert_eq!(sanitize_error_for_user("Connection timeout"), "Connection timeout");
/// ```
#[must_use]
pub fn sanitize_error_for_user(error: &str) -> String {
    let lower = error.to_lowercase();

    for pattern in SENSITIVE_PATTERNS {
        if lower.contains(pattern) {
            return "An API error occurred. Please try again.".to_string();
        }
    }

    if error.chars().count() > MAX_ERROR_CHARS {
        format!("{}...(truncated)", truncate_safe(error, MAX_ERROR_CHARS))
    } else {
        error.to_string()
    }
}

/// Longest model name accepted from a client hint
const MAX_MODEL_NAME_CHARS: usize = 128;

/// Whether a client-supplied model name is safe to forward to a backend
///
/// Names may only use ASCII letters, digits, `-`, `_`, `.` and `:`, and may
/// not contain `..`. Some backends put the model in the URL path.
///
/// # Examples
/// ```
/// use chatgate_llm::util::is_valid_model_name;
/// assert!(is_valid_model_name("gemini-2.5-pro"));
/// assert!(is_valid_model_name("llama2:13b"));
/// assert!(!is_valid_model_name("../../admin?x="));
/// ```
#[must_use]
pub fn is_valid_model_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_MODEL_NAME_CHARS
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

/// Truncate to at most `max_chars` characters without splitting a char
#[must_use]
pub fn truncate_safe(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
