//! Error-body hygiene for backend failures surfaced to callers and logs.

const MAX_API_ERROR_CHARS: usize = 200;

const SECRET_MARKERS: &[&str] = &[
    "api_key=",
    "api-key=",
    "access_token=",
    "token=",
    "secret=",
    "Bearer ",
];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

fn scrub_after_marker(scrubbed: &mut String, marker: &str) {
    let mut search_from = 0;
    loop {
        let Some(rel) = scrubbed[search_from..].find(marker) else {
            break;
        };

        let start = search_from + rel;
        let content_start = start + marker.len();
        let end = token_end(scrubbed, content_start);

        // Skip bare markers without a token value.
        if end == content_start {
            search_from = content_start;
            continue;
        }

        scrubbed.replace_range(content_start..end, "[REDACTED]");
        search_from = content_start + "[REDACTED]".len();
    }
}

/// Redact credential-looking tokens from a raw API error body and truncate
/// it to a loggable length.
pub fn sanitize_api_error(raw: &str) -> String {
    let mut scrubbed = raw.to_string();
    for marker in SECRET_MARKERS {
        scrub_after_marker(&mut scrubbed, marker);
    }

    if scrubbed.chars().count() > MAX_API_ERROR_CHARS {
        let truncated: String = scrubbed.chars().take(MAX_API_ERROR_CHARS).collect();
        format!("{truncated}…")
    } else {
        scrubbed
    }
}
