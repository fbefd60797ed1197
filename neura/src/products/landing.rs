//! Landing page generation.

use chrono::Utc;

use crate::{
    api::models::products::{LandingPageRequest, LandingPageResponse},
    products::escape_markup,
};

const MAX_BENEFITS: usize = 3;
const PREVIEW_BASE_URL: &str = "https://preview.neura-ai.com";

pub fn generate(request: &LandingPageRequest) -> LandingPageResponse {
    LandingPageResponse {
        html: render_page(request),
        css: "/* Custom CSS included in HTML */".to_string(),
        js: "/* Interactive JavaScript can be added */".to_string(),
        preview_url: format!("{PREVIEW_BASE_URL}/{}", request.name.to_lowercase().replace(' ', "-")),
        timestamp: Utc::now(),
    }
}

fn render_benefit(benefit: &str) -> String {
    let title = escape_markup(benefit);
    let lowered = escape_markup(&benefit.to_lowercase());

    format!(
        r#"
                <div class="text-center p-6 bg-white rounded-lg shadow-lg">
                    <div class="w-16 h-16 bg-blue-100 rounded-full flex items-center justify-center mx-auto mb-4">
                        <svg class="w-8 h-8 text-blue-600" fill="currentColor" viewBox="0 0 20 20">
                            <path d="M9 12l2 2 4-4m6 2a9 9 0 11-18 0 9 9 0 0118 0z"/>
                        </svg>
                    </div>
                    <h3 class="text-xl font-semibold mb-2">{title}</h3>
                    <p class="text-gray-600">Experience the power of {lowered} with our innovative approach.</p>
                </div>"#
    )
}

fn render_page(request: &LandingPageRequest) -> String {
    let name = escape_markup(&request.name);
    let industry = escape_markup(&request.industry);
    let audience = escape_markup(&request.target_audience);
    let benefits: String = request
        .benefits
        .iter()
        .take(MAX_BENEFITS)
        .map(|b| render_benefit(b))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{name} - Transform Your {industry} Experience</title>
    <script src="https://cdn.tailwindcss.com"></script>
    <link href="https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700&display=swap" rel="stylesheet">
    <style>
        body {{ font-family: 'Inter', sans-serif; }}
    </style>
</head>
<body class="bg-gray-50">
    <section class="bg-gradient-to-r from-blue-600 to-purple-600 text-white py-20">
        <div class="container mx-auto px-6 text-center">
            <h1 class="text-5xl font-bold mb-6">{name}</h1>
            <p class="text-xl mb-8">Revolutionary {industry} Solutions for {audience}</p>
            <button class="bg-white text-blue-600 px-8 py-3 rounded-lg font-semibold hover:bg-gray-100 transition">
                Get Started Today
            </button>
        </div>
    </section>

    <section class="py-16">
        <div class="container mx-auto px-6">
            <h2 class="text-3xl font-bold text-center mb-12">Why Choose {name}?</h2>
            <div class="grid md:grid-cols-3 gap-8">{benefits}
            </div>
        </div>
    </section>

    <section class="bg-gray-100 py-16">
        <div class="container mx-auto px-6 text-center">
            <h2 class="text-3xl font-bold mb-6">Ready to Transform Your {industry} Experience?</h2>
            <p class="text-xl text-gray-600 mb-8">Join thousands of satisfied customers who have revolutionized their workflow.</p>
            <button class="bg-blue-600 text-white px-8 py-3 rounded-lg font-semibold hover:bg-blue-700 transition">
                Start Your Free Trial
            </button>
        </div>
    </section>
</body>
</html>
"#
    )
}
