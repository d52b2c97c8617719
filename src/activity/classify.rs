//! Window title to activity label mapping.
//!
//! Labels are `/`-separated paths from the most general to the most
//! specific part, e.g. `github/rust-lang/rust/Issue/#1234 Some title`.

use regex::Regex;
use std::sync::LazyLock;

const TLDS: [&str; 31] = [
    "com", "org", "net", "io", "dev", "co", "ai", "app", "tech", "cloud", "edu", "gov", "mil",
    "int", "info", "biz", "name", "museum", "uk", "us", "ca", "au", "de", "fr", "it", "es", "nl",
    "jp", "cn", "in", "br",
];

static GITHUB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\[\d{1,3}%\] )?(.*) · (Pull Request|Issue|Discussion) (#\d*) · (.*) - qutebrowser$",
    )
    .expect("github pattern")
});

static QUTEBROWSER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\[\d{1,3}%\] )?(.*) - qutebrowser$").expect("qutebrowser pattern")
});

static TMUX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*) \(tmux:([^/]*)/(.*)\)$").expect("tmux pattern"));

static DOMAINS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let tld = TLDS.join("|");
    [
        // Full URL with protocol
        format!(r"https?://(?:www\.)?([a-zA-Z0-9-]+\.(?:{tld}))(?:/|$|\s)"),
        format!(r"\bwww\.([a-zA-Z0-9-]+\.(?:{tld}))(?:/|$|\s|\))"),
        // Standalone domain (github.com, crates.io, ...)
        format!(r"\b([a-zA-Z0-9-]+\.(?:{tld}))(?:/|$|\s|\)|:)"),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("domain pattern"))
    .collect()
});

const SERVICES: [(&str, &str); 6] = [
    ("youtube", "youtube.com"),
    ("reddit", "reddit.com"),
    ("twitter", "twitter.com"),
    ("gitlab", "gitlab.com"),
    ("stackoverflow", "stackoverflow.com"),
    ("stack overflow", "stackoverflow.com"),
];

/// Derive an activity label from a raw window title.
///
/// Returns `None` for titles that carry no information (empty or blank).
pub fn classify(title: &str) -> Option<String> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }

    if title.ends_with(" - qutebrowser") {
        if title.contains("Rocket.Chat") || title.contains("Slack") {
            return Some("chat".to_string());
        }
        if title.contains(" Mail - qutebrowser") || title.starts_with("Inbox") {
            return Some("mail".to_string());
        }
        if title.contains(" - Calendar - ") {
            return Some("calendar".to_string());
        }
        if title.starts_with("Notifications - ") {
            return Some("github/notifications".to_string());
        }
    }

    if let Some(gh) = GITHUB.captures(title) {
        return Some(format!("github/{}/{}/{} {}", &gh[4], &gh[2], &gh[3], &gh[1]));
    }

    if let Some(qute) = QUTEBROWSER.captures(title) {
        return Some(format!("qutebrowser/{}", qute[1].trim()));
    }

    if let Some(tmux) = TMUX.captures(title) {
        return Some(format!("tmux/{}/{}", &tmux[2], &tmux[3]));
    }

    if let Some(domain) = extract_domain(title) {
        return Some(format!("web/{domain}"));
    }

    Some(title.to_string())
}

fn extract_domain(title: &str) -> Option<String> {
    for pattern in DOMAINS.iter() {
        if let Some(domain) = pattern.captures(title).and_then(|c| c.get(1)) {
            return Some(domain.as_str().to_lowercase());
        }
    }

    let lower = title.to_lowercase();
    SERVICES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, domain)| domain.to_string())
}
