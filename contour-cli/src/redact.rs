//! Secret redaction for audit service responses.
//!
//! Response bodies are echoed into logs and error messages, so anything that
//! looks like a credential is masked first.

use once_cell::sync::Lazy;
use regex::Regex;

/// Replacement for every redacted span.
pub const REDACTED: &str = "[REDACTED]";

/// A secret detection pattern.
pub struct SecretPattern {
    pub name: &'static str,
    pub regex: &'static Lazy<Regex>,
}

static BEARER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)bearer\s+[A-Za-z0-9\-_.~+/]+=*").expect("bearer pattern is valid")
});
static JWT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"eyJ[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+").expect("jwt pattern is valid")
});
static GENERIC_API_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(api_key|apikey|api-key|access_token|token)("?\s*[=:]\s*['"]?)([A-Za-z0-9_\-]{16,})"#)
        .expect("api key pattern is valid")
});
static GENERIC_SECRET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(secret|password|passwd|pwd)("?\s*[=:]\s*['"]?)([^\s'",}]{8,})"#)
        .expect("secret pattern is valid")
});
static GITHUB_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"gh[pousr]_[A-Za-z0-9_]{36,}").expect("github pattern is valid")
});
static AWS_ACCESS_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"AKIA[0-9A-Z]{16}").expect("aws pattern is valid"));
static PRIVATE_KEY_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)-----BEGIN [A-Z ]*PRIVATE KEY-----.*?(-----END [A-Z ]*PRIVATE KEY-----|$)")
        .expect("private key pattern is valid")
});

/// Patterns whose whole match is replaced.
pub static WHOLE_MATCH_PATTERNS: &[SecretPattern] = &[
    SecretPattern {
        name: "private_key",
        regex: &PRIVATE_KEY_BLOCK,
    },
    SecretPattern {
        name: "bearer_token",
        regex: &BEARER_TOKEN,
    },
    SecretPattern {
        name: "jwt",
        regex: &JWT,
    },
    SecretPattern {
        name: "github_token",
        regex: &GITHUB_TOKEN,
    },
    SecretPattern {
        name: "aws_access_key_id",
        regex: &AWS_ACCESS_KEY,
    },
];

/// Key/value patterns: the key and separator are kept, the value is replaced.
pub static KEY_VALUE_PATTERNS: &[SecretPattern] = &[
    SecretPattern {
        name: "generic_api_key",
        regex: &GENERIC_API_KEY,
    },
    SecretPattern {
        name: "generic_secret",
        regex: &GENERIC_SECRET,
    },
];

/// Mask the caller's own token and anything matching a secret pattern.
pub fn redact(text: &str, token: Option<&str>) -> String {
    let mut redacted = match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => text.replace(token, REDACTED),
        None => text.to_string(),
    };

    for pattern in WHOLE_MATCH_PATTERNS {
        redacted = pattern.regex.replace_all(&redacted, REDACTED).into_owned();
    }
    for pattern in KEY_VALUE_PATTERNS {
        redacted = pattern
            .regex
            .replace_all(&redacted, format!("${{1}}${{2}}{}", REDACTED).as_str())
            .into_owned();
    }

    redacted
}

/// Names of the patterns that match `text`.
pub fn detected(text: &str) -> Vec<&'static str> {
    WHOLE_MATCH_PATTERNS
        .iter()
        .chain(KEY_VALUE_PATTERNS)
        .filter(|p| p.regex.is_match(text))
        .map(|p| p.name)
        .collect()
}
