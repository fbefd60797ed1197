//! Resume review.

use chrono::Utc;

use crate::{
    api::models::products::{ResumeAnalysis, ResumeReviewRequest, ResumeReviewResponse},
    errors::{Error, Result},
    products::strings,
    utils::calculate_similarity,
};

const STRENGTHS: &[&str] = &[
    "Strong technical skills section",
    "Quantified achievements with metrics",
    "Clean, professional formatting",
];

const IMPROVEMENTS: &[&str] = &[
    "Add more action verbs",
    "Include relevant keywords for ATS",
    "Expand on leadership experience",
];

const RECOMMENDATIONS: &[&str] = &[
    "Start bullet points with strong action verbs",
    "Add 2-3 more technical keywords",
    "Include a professional summary",
    "Quantify more achievements with numbers",
    "Optimize for ATS scanning",
];

const ATS_TIPS: &[&str] = &[
    "Use standard section headings",
    "Avoid graphics and tables",
    "Include relevant keywords naturally",
];

const KEYWORDS: &[&str] = &["Python", "Machine Learning", "Data Analysis", "Project Management"];

pub fn review(request: &ResumeReviewRequest) -> Result<ResumeReviewResponse> {
    if request.resume_text.trim().is_empty() {
        return Err(Error::bad_request("resume_text must not be empty"));
    }

    let job_match = request
        .job_description
        .as_deref()
        .map(|job| (calculate_similarity(&request.resume_text, job) * 100.0).round() / 100.0);

    Ok(ResumeReviewResponse {
        analysis: ResumeAnalysis {
            overall_score: 7.5,
            strengths: strings(STRENGTHS),
            improvements: strings(IMPROVEMENTS),
            recommendations: strings(RECOMMENDATIONS),
            ats_tips: strings(ATS_TIPS),
            keywords: strings(KEYWORDS),
            job_match,
        },
        timestamp: Utc::now(),
        service: "resume_review".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn request(resume_text: &str, job_description: Option<&str>) -> ResumeReviewRequest {
        ResumeReviewRequest {
            resume_text: resume_text.to_string(),
            job_description: job_description.map(str::to_string),
        }
    }

    #[test]
    fn test_review_fixed_analysis() {
        let response = review(&request("Senior engineer with Rust and Python", None)).unwrap();

        assert_eq!(response.service, "resume_review");
        assert_eq!(response.analysis.overall_score, 7.5);
        assert_eq!(response.analysis.strengths.len(), 3);
        assert_eq!(response.analysis.recommendations.len(), 5);
        assert_eq!(response.analysis.keywords[1], "Machine Learning");
        assert!(response.analysis.job_match.is_none());
    }

    #[test]
    fn test_job_match_is_rounded_similarity() {
        // {rust, python, go} vs {rust, java, go}: 2 shared of 4 distinct
        let response = review(&request("Rust Python Go", Some("rust java go"))).unwrap();
        assert_eq!(response.analysis.job_match, Some(0.5));

        // 1 of 3 rounds to 0.33
        let response = review(&request("a b", Some("b c"))).unwrap();
        assert_eq!(response.analysis.job_match, Some(0.33));
    }

    #[test]
    fn test_empty_resume_rejected() {
        for text in ["", "   \n"] {
            let err = review(&request(text, None)).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }
}
