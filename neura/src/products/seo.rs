//! On-page SEO audit.
//!
//! The page is fetched once and inspected with a handful of case-insensitive patterns. Any
//! fetch failure produces a [`SeoAudit::Failed`] result rather than an error response.

use std::{sync::OnceLock, time::Duration};

use chrono::Utc;
use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::{
    api::models::products::{
        HeadingAnalysis, ImageAnalysis, MetaDescriptionAnalysis, SeoAudit, SeoAuditResponse, SeoReport, TitleAnalysis,
    },
    products::strings,
    utils::Timer,
};

const GOOD: u8 = 8;
const POOR: u8 = 4;
const OVERALL_SCORE: u8 = 75;

const RECOMMENDATIONS: &[&str] = &[
    "Optimize title tag length (30-60 characters)",
    "Add meta description (120-160 characters)",
    "Use only one H1 tag per page",
    "Add alt text to all images",
    "Improve page loading speed",
    "Add internal linking structure",
    "Optimize for mobile responsiveness",
];

const UNREACHABLE_RECOMMENDATIONS: &[&str] = &[
    "Ensure website is accessible",
    "Check for SSL certificate",
    "Verify domain configuration",
];

struct SeoPatterns {
    title: Regex,
    meta: Regex,
    h1: Regex,
    img: Regex,
    attribute: Regex,
}

static PATTERNS: OnceLock<SeoPatterns> = OnceLock::new();

fn patterns() -> &'static SeoPatterns {
    PATTERNS.get_or_init(|| SeoPatterns {
        title: Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("Valid regex"),
        meta: Regex::new(r"(?i)<meta\b[^>]*>").expect("Valid regex"),
        h1: Regex::new(r"(?i)<h1[\s>]").expect("Valid regex"),
        img: Regex::new(r"(?i)<img\b[^>]*>").expect("Valid regex"),
        attribute: Regex::new(r#"(?i)([a-z][a-z0-9_:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("Valid regex"),
    })
}

/// Value of `name` among the attributes of a single tag
fn attribute<'t>(tag: &'t str, name: &str) -> Option<&'t str> {
    patterns()
        .attribute
        .captures_iter(tag)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)))
        .map(|m| m.as_str())
}

fn score(good: bool) -> u8 {
    if good { GOOD } else { POOR }
}

/// Audit already-fetched HTML
pub fn analyze(html: &str) -> SeoReport {
    let patterns = patterns();

    let title = patterns.title.captures(html).map(|caps| caps[1].to_string());
    let title_length = title.as_deref().map_or(0, |t| t.chars().count());

    let description = patterns
        .meta
        .find_iter(html)
        .map(|tag| tag.as_str())
        .find(|tag| attribute(tag, "name").is_some_and(|name| name.eq_ignore_ascii_case("description")))
        .map(|tag| attribute(tag, "content").unwrap_or_default().to_string());
    let description_length = description.as_deref().map_or(0, |d| d.chars().count());

    let h1_count = patterns.h1.find_iter(html).count();

    let images: Vec<&str> = patterns.img.find_iter(html).map(|m| m.as_str()).collect();
    let with_alt = images
        .iter()
        .filter(|tag| attribute(tag, "alt").is_some_and(|alt| !alt.is_empty()))
        .count();

    SeoReport {
        overall_score: OVERALL_SCORE,
        title_analysis: TitleAnalysis {
            score: score(title.is_some() && (30..=60).contains(&title_length)),
            title: title.unwrap_or_else(|| "Missing".to_string()),
            length: title_length,
        },
        meta_description: MetaDescriptionAnalysis {
            score: score(description.is_some() && (120..=160).contains(&description_length)),
            description: description.unwrap_or_else(|| "Missing".to_string()),
            length: description_length,
        },
        headings: HeadingAnalysis {
            h1_count,
            score: score(h1_count == 1),
        },
        images: ImageAnalysis {
            total_images: images.len(),
            missing_alt: images.len() - with_alt,
            score: score(with_alt as f64 > images.len() as f64 * 0.8),
        },
        recommendations: strings(RECOMMENDATIONS),
    }
}

async fn fetch(client: &reqwest::Client, url: &str, timeout: Duration) -> reqwest::Result<String> {
    client.get(url).timeout(timeout).send().await?.text().await
}

/// Fetch `url` and audit it
#[instrument(skip(client))]
pub async fn audit(client: &reqwest::Client, url: &str, timeout: Duration) -> SeoAuditResponse {
    let _timer = Timer::start(format!("SEO audit of {url}"));
    let audit = match fetch(client, url, timeout).await {
        Ok(html) => {
            debug!(bytes = html.len(), "Fetched page for audit");
            SeoAudit::Report(analyze(&html))
        }
        Err(e) => {
            warn!("SEO audit fetch failed: {}", e);
            SeoAudit::Failed {
                error: format!("Could not audit website: {e}"),
                recommendations: strings(UNREACHABLE_RECOMMENDATIONS),
            }
        }
    };

    SeoAuditResponse {
        url: url.to_string(),
        audit,
        timestamp: Utc::now(),
        next_audit_recommended: "30 days".to_string(),
    }
}
