use regex::{Captures, Regex};
use std::sync::LazyLock;

const REDACTED: &str = "[REDACTED]";

static INLINE_SECRET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(password|passwd|pwd|secret|token)\b\s*([:=])\s*([^\s,;&]+)").unwrap()
});

static URI_CREDENTIAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([a-z][a-z0-9+.-]*://[^:@/\s]+:)([^@/\s]+)(@)").unwrap()
});

/// Masks passwords embedded in connection urls and `key=value` pairs before
/// the text reaches a log line.
pub fn redact_sensitive_text(input: &str) -> String {
    let redacted_inline = INLINE_SECRET_REGEX.replace_all(input, |caps: &Captures| {
        format!("{}{}{}", &caps[1], &caps[2], REDACTED)
    });
    URI_CREDENTIAL_REGEX
        .replace_all(&redacted_inline, |caps: &Captures| {
            format!("{}{}{}", &caps[1], REDACTED, &caps[3])
        })
        .to_string()
}

/// Same as [`redact_sensitive_text`], additionally masking a known password
/// wherever it appears verbatim.
pub fn redact_known_secret(input: &str, secret: &str) -> String {
    let redacted = redact_sensitive_text(input);
    if secret.is_empty() {
        return redacted;
    }
    redacted.replace(secret, REDACTED)
}
