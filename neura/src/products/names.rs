//! Business name and brand suggestions.

use chrono::Utc;

use crate::{
    api::models::products::{DomainAvailability, NameGeneratorRequest, NameGeneratorResponse},
    products::strings,
};

const PREFIXES: &[&str] = &["Pro", "Smart", "Quick"];
const SUFFIXES: &[&str] = &["Hub", "Labs", "Works"];
const MAX_KEYWORDS: usize = 3;
const MAX_NAMES: usize = 20;
const MAX_DOMAINS: usize = 10;

/// Curated names appended for well-known industries
fn industry_names(industry: &str) -> &'static [&'static str] {
    match industry.to_lowercase().as_str() {
        "technology" => &["TechFlow", "CodeCraft", "DataDrive", "CloudCore", "ByteBridge"],
        "healthcare" => &["MedTech", "HealthHub", "CareCore", "WellnessWorks", "MediFlow"],
        "finance" => &["FinTech", "MoneyMind", "WealthWorks", "CashCore", "InvestIQ"],
        "education" => &["EduTech", "LearnLab", "StudyHub", "KnowledgeCore", "SkillSphere"],
        _ => &[],
    }
}

/// Upper-case the first character and lower-case the rest
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn generate(request: &NameGeneratorRequest) -> NameGeneratorResponse {
    let mut names = Vec::new();
    for keyword in request.keywords.iter().take(MAX_KEYWORDS) {
        let keyword = capitalize(keyword);
        names.extend(PREFIXES.iter().map(|prefix| format!("{prefix}{keyword}")));
        names.extend(SUFFIXES.iter().map(|suffix| format!("{keyword}{suffix}")));
    }
    names.extend(strings(industry_names(&request.industry)));

    let mut domains: Vec<(String, String)> = Vec::new();
    for name in names.iter().take(MAX_DOMAINS) {
        if !domains.iter().any(|(existing, _)| existing == name) {
            domains.push((name.clone(), format!("{}.com", name.to_lowercase())));
        }
    }
    names.truncate(MAX_NAMES);

    NameGeneratorResponse {
        names,
        domain_availability: DomainAvailability(domains),
        trademark_status: "Available for most names (verification recommended)".to_string(),
        style: request.style.clone(),
        industry: request.industry.clone(),
        timestamp: Utc::now(),
    }
}
