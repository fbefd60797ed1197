//! Text logo rendering.

use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;

use crate::{
    api::models::products::{LogoRequest, LogoResponse, LogoVariation},
    products::{escape_markup, strings},
};

const WIDTH: u32 = 400;
const HEIGHT: u32 = 200;

const USAGE_GUIDELINES: &[&str] = &[
    "Minimum size: 100px width",
    "Clear space: 1/2 logo height on all sides",
    "Use on light backgrounds for best visibility",
];

/// Primary, dark and light colour for an industry
pub fn palette(industry: &str) -> [&'static str; 3] {
    match industry.to_lowercase().as_str() {
        "technology" => ["#2563eb", "#1d4ed8", "#3b82f6"],
        "healthcare" => ["#059669", "#047857", "#10b981"],
        "finance" => ["#dc2626", "#b91c1c", "#ef4444"],
        "education" => ["#7c3aed", "#6d28d9", "#8b5cf6"],
        _ => ["#374151", "#4b5563", "#6b7280"],
    }
}

fn render_svg(company_name: &str, color: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}"><rect width="100%" height="100%" fill="white"/><text x="50" y="115" font-family="Arial, sans-serif" font-size="36" fill="{color}">{}</text></svg>"#,
        escape_markup(company_name)
    )
}

pub fn generate(request: &LogoRequest) -> LogoResponse {
    let colors = strings(&palette(&request.industry));
    let svg = render_svg(&request.company_name, &colors[0]);
    let image_data = format!("data:image/svg+xml;base64,{}", general_purpose::STANDARD.encode(svg));

    LogoResponse {
        company_name: request.company_name.clone(),
        industry: request.industry.clone(),
        style: request.style.clone(),
        logo_variations: vec![LogoVariation {
            name: "Primary Logo".to_string(),
            image_data,
            colors: colors.clone(),
            format: "SVG".to_string(),
        }],
        color_palette: colors,
        fonts_used: vec!["Arial".to_string()],
        usage_guidelines: strings(USAGE_GUIDELINES),
        timestamp: Utc::now(),
    }
}
