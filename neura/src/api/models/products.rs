//! API request/response models for the AI services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use utoipa::ToSchema;

fn default_style() -> String {
    "modern".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResumeReviewRequest {
    pub resume_text: String,
    /// When given, the review includes a `job_match` score
    pub job_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResumeAnalysis {
    pub overall_score: f64,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub recommendations: Vec<String>,
    pub ats_tips: Vec<String>,
    pub keywords: Vec<String>,
    /// Word overlap between resume and job description, 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_match: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResumeReviewResponse {
    pub analysis: ResumeAnalysis,
    pub timestamp: DateTime<Utc>,
    pub service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LandingPageRequest {
    pub name: String,
    pub industry: String,
    pub target_audience: String,
    /// Only the first three are used
    #[serde(default)]
    pub benefits: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LandingPageResponse {
    pub html: String,
    pub css: String,
    pub js: String,
    pub preview_url: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NameGeneratorRequest {
    pub industry: String,
    pub keywords: Vec<String>,
    #[serde(default = "default_style")]
    pub style: String,
}

/// Suggested `.com` domain per name, in suggestion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainAvailability(pub Vec<(String, String)>);

impl Serialize for DomainAvailability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, domain) in &self.0 {
            map.serialize_entry(name, domain)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NameGeneratorResponse {
    pub names: Vec<String>,
    #[schema(value_type = std::collections::HashMap<String, String>)]
    pub domain_availability: DomainAvailability,
    pub trademark_status: String,
    pub style: String,
    pub industry: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SeoAuditRequest {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TitleAnalysis {
    /// `Missing` when the page has no title
    pub title: String,
    pub length: usize,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MetaDescriptionAnalysis {
    pub description: String,
    pub length: usize,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HeadingAnalysis {
    pub h1_count: usize,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ImageAnalysis {
    pub total_images: usize,
    pub missing_alt: usize,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SeoReport {
    pub overall_score: u8,
    pub title_analysis: TitleAnalysis,
    pub meta_description: MetaDescriptionAnalysis,
    pub headings: HeadingAnalysis,
    pub images: ImageAnalysis,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SeoAudit {
    Report(SeoReport),
    /// The page could not be fetched
    Failed { error: String, recommendations: Vec<String> },
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeoAuditResponse {
    pub url: String,
    pub audit: SeoAudit,
    pub timestamp: DateTime<Utc>,
    pub next_audit_recommended: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoRequest {
    pub company_name: String,
    pub industry: String,
    #[serde(default = "default_style")]
    pub style: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogoVariation {
    pub name: String,
    /// `data:` URI of the rendered logo
    pub image_data: String,
    pub colors: Vec<String>,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogoResponse {
    pub company_name: String,
    pub industry: String,
    pub style: String,
    pub logo_variations: Vec<LogoVariation>,
    pub color_palette: Vec<String>,
    pub fonts_used: Vec<String>,
    pub usage_guidelines: Vec<String>,
    pub timestamp: DateTime<Utc>,
}
