//! The AI services sold through the API.
//!
//! Every service is a plain function from its request model to its response model, so handlers
//! stay thin and the services can be tested without a server. Only the SEO audit touches the
//! network.
//!
//! | Service id | Module | Endpoint |
//! |---|---|---|
//! | `resume_reviewer` | [`resume`] | `POST /api/resume/review` |
//! | `landing_page_generator` | [`landing`] | `POST /api/landing-page/generate` |
//! | `name_brand_generator` | [`names`] | `POST /api/names/generate` |
//! | `seo_audit_bot` | [`seo`] | `POST /api/seo/audit` |
//! | `logo_maker` | [`logo`] | `POST /api/logo/generate` |

pub mod landing;
pub mod logo;
pub mod names;
pub mod resume;
pub mod seo;

/// Service ids in registry order, as listed by `GET /`
pub const SERVICE_IDS: [&str; 5] = [
    "resume_reviewer",
    "landing_page_generator",
    "name_brand_generator",
    "seo_audit_bot",
    "logo_maker",
];

/// Escape text for interpolation into HTML or SVG markup
pub(crate) fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markup() {
        assert_eq!(escape_markup("Tom & Jerry's <b>\"shop\"</b>"), "Tom &amp; Jerry&#39;s &lt;b&gt;&quot;shop&quot;&lt;/b&gt;");
        assert_eq!(escape_markup("plain"), "plain");
    }
}
