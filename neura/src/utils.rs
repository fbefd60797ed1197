//! Small helpers shared across the services.

use regex::Regex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

const UNSAFE_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const MAX_FILENAME_LEN: usize = 100;
const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Make a user supplied filename safe to store.
///
/// Names that end up empty or made only of dots fall back to `file_<unix seconds>`.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let sanitized: String = replaced.trim().chars().take(MAX_FILENAME_LEN).collect();

    if sanitized.replace('.', "").trim().is_empty() {
        return format!("file_{}", chrono::Utc::now().timestamp());
    }
    sanitized
}

/// Human readable byte count, e.g. `1.5 MB`
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{size:.1} {}", SIZE_UNITS[unit])
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_PATTERN
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("Valid regex"))
        .is_match(email)
}

/// Shorten `text` to at most `max_length` characters, ending in `suffix` when cut.
pub fn truncate_string(text: &str, max_length: usize, suffix: &str) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let keep = max_length.saturating_sub(suffix.chars().count());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(suffix);
    truncated
}

/// Jaccard similarity of the lowercase word sets of `a` and `b`.
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();

    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    words_a.intersection(&words_b).count() as f64 / union as f64
}

/// Run `operation` up to `max_attempts` times, sleeping `delay` between failures.
///
/// Returns the first success or the last error.
pub async fn retry_async<T, E, F, Fut>(max_attempts: u32, delay: Duration, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                warn!(attempt, "Attempt failed: {}. Retrying in {:?}", e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(max_attempts, "All attempts failed. Last error: {}", e);
                return Err(e);
            }
        }
    }
}

/// Logs how long a scope took when dropped.
pub struct Timer {
    name: String,
    started: Instant,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("{} completed in {:.2} seconds", self.name, self.elapsed().as_secs_f64());
    }
}
