//! Match Analysis Engine: one structured prompt, one tolerant parse.
//!
//! The model's JSON is untrusted. Every field is optional and read leniently
//! (camelCase or snake_case keys, numbers as strings, bare strings for records).
//! Defaults:
//! - missing strings → `None`, missing lists → empty
//! - missing `score` → `intelligence.technicalScore`, then `None`
//! - missing or unknown `verdict` → `None` (callers treat it as `Review`)
//!
//! Scores are passed through unclamped.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::analysis::prompts::MATCH_ANALYSIS_PROMPT_TEMPLATE;
use crate::capability::AiPermit;
use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::TextService;
use crate::models::candidate::{
    EducationRecord, ExperienceRecord, SkillMatrixEntry, SkillRecord, Verdict,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Intelligence {
    pub technical_score: Option<i32>,
    pub cultural_score: Option<i32>,
    pub communication_score: Option<i32>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub missing_skills: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchAnalysis {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub links: Vec<String>,
    pub score: Option<i32>,
    pub verdict: Option<Verdict>,
    pub match_reason: Option<String>,
    pub summary: Option<String>,
    pub skills: Vec<SkillRecord>,
    pub skills_matrix: Vec<SkillMatrixEntry>,
    pub experience: Vec<ExperienceRecord>,
    pub education: Vec<EducationRecord>,
    pub intelligence: Intelligence,
}

impl MatchAnalysis {
    pub fn effective_verdict(&self) -> Verdict {
        self.verdict.unwrap_or_default()
    }

    /// Effective score. A response with no score at all counts as 0.
    pub fn effective_score(&self) -> i32 {
        self.score.unwrap_or(0)
    }
}

/// Runs the match analysis. Service failure is fatal to the call and not retried here.
pub async fn analyze(
    text_service: &dyn TextService,
    _permit: &AiPermit,
    resume_text: &str,
    job_description: &str,
) -> Result<MatchAnalysis, AppError> {
    let prompt = MATCH_ANALYSIS_PROMPT_TEMPLATE
        .replace("{job_description}", job_description)
        .replace("{resume_text}", resume_text);

    let response = text_service
        .generate_json(&prompt, JSON_ONLY_SYSTEM)
        .await
        .map_err(|e| AppError::AnalysisFailed(format!("Match analysis call failed: {e}")))?;

    let analysis = parse_analysis(&response)?;
    info!(
        score = ?analysis.score,
        verdict = ?analysis.verdict,
        skills = analysis.skills.len(),
        "Match analysis parsed"
    );
    Ok(analysis)
}

/// Tolerant parse of the model response into a `MatchAnalysis`.
pub fn parse_analysis(response: &Value) -> Result<MatchAnalysis, AppError> {
    let root = response.as_object().ok_or_else(|| {
        AppError::AnalysisFailed("Match analysis response was not a JSON object".to_string())
    })?;

    let intelligence = field(root, &["intelligence"])
        .and_then(Value::as_object)
        .map(parse_intelligence)
        .unwrap_or_default();

    let score = field(root, &["score", "matchScore", "match_score"])
        .and_then(lenient_int)
        .or(intelligence.technical_score);
    if root.get("score").is_none() && score.is_some() {
        debug!("Top-level score missing, using intelligence.technicalScore");
    }

    Ok(MatchAnalysis {
        name: text(root, &["name", "fullName", "full_name"]),
        email: text(root, &["email"]),
        phone: text(root, &["phone", "phoneNumber", "phone_number"]),
        links: parse_links(field(root, &["links"])),
        score,
        verdict: text(root, &["verdict"]).and_then(|v| Verdict::parse(&v)),
        match_reason: text(root, &["matchReason", "match_reason"]),
        summary: text(root, &["summary"]),
        skills: records(root, &["skills"])
            .enumerate()
            .filter_map(|(i, v)| parse_skill(i, v))
            .collect(),
        skills_matrix: records(root, &["skillsMatrix", "skills_matrix"])
            .filter_map(parse_matrix_entry)
            .collect(),
        experience: records(root, &["experience"])
            .enumerate()
            .filter_map(|(i, v)| parse_experience(i, v))
            .collect(),
        education: records(root, &["education"])
            .enumerate()
            .filter_map(|(i, v)| parse_education(i, v))
            .collect(),
        intelligence,
    })
}

fn parse_intelligence(obj: &Map<String, Value>) -> Intelligence {
    Intelligence {
        technical_score: field(obj, &["technicalScore", "technical_score"]).and_then(lenient_int),
        cultural_score: field(obj, &["culturalScore", "cultural_score"]).and_then(lenient_int),
        communication_score: field(obj, &["communicationScore", "communication_score"])
            .and_then(lenient_int),
        strengths: strings(field(obj, &["strengths"])),
        weaknesses: strings(field(obj, &["weaknesses"])),
        missing_skills: strings(field(obj, &["missingSkills", "missing_skills"])),
    }
}

fn parse_skill(index: usize, value: &Value) -> Option<SkillRecord> {
    let id = format!("skill-{}", index + 1);
    if let Some(name) = non_empty(value.as_str()) {
        return Some(SkillRecord {
            id,
            name,
            ..SkillRecord::default()
        });
    }
    let obj = value.as_object()?;
    Some(SkillRecord {
        id,
        name: text(obj, &["name", "skill"])?,
        level: text(obj, &["level", "proficiency"]),
        years: field(obj, &["years", "yearsOfExperience"]).and_then(lenient_float),
    })
}

fn parse_matrix_entry(value: &Value) -> Option<SkillMatrixEntry> {
    let obj = value.as_object()?;
    Some(SkillMatrixEntry {
        skill: text(obj, &["skill", "name"])?,
        required: field(obj, &["required"]).and_then(lenient_bool).unwrap_or(false),
        candidate_has: field(obj, &["candidateHas", "candidate_has", "present", "has"])
            .and_then(lenient_bool)
            .unwrap_or(false),
        proficiency: text(obj, &["proficiency", "level"]),
    })
}

fn parse_experience(index: usize, value: &Value) -> Option<ExperienceRecord> {
    let obj = value.as_object()?;
    let title = text(obj, &["title", "role", "position"]).unwrap_or_default();
    let company = text(obj, &["company", "employer", "organization"]).unwrap_or_default();
    if title.is_empty() && company.is_empty() {
        return None;
    }
    Some(ExperienceRecord {
        id: format!("exp-{}", index + 1),
        title,
        company,
        start_date: text(obj, &["startDate", "start_date"]),
        end_date: text(obj, &["endDate", "end_date"]),
        description: text(obj, &["description", "summary"]),
    })
}

fn parse_education(index: usize, value: &Value) -> Option<EducationRecord> {
    let obj = value.as_object()?;
    Some(EducationRecord {
        id: format!("edu-{}", index + 1),
        institution: text(obj, &["institution", "school", "university"])?,
        degree: text(obj, &["degree"]),
        field: text(obj, &["field", "fieldOfStudy", "field_of_study", "major"]),
        year: field(obj, &["year", "graduationYear", "graduation_year"]).and_then(|v| {
            non_empty(v.as_str()).or_else(|| v.as_i64().map(|y| y.to_string()))
        }),
    })
}

/// Links arrive as a list of URLs, a list of `{url}` objects, or a map of name → URL.
fn parse_links(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                non_empty(item.as_str()).or_else(|| {
                    item.as_object()
                        .and_then(|o| text(o, &["url", "href", "link"]))
                })
            })
            .collect(),
        Some(Value::Object(map)) => map.values().filter_map(|v| non_empty(v.as_str())).collect(),
        _ => Vec::new(),
    }
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(obj, keys).and_then(|v| non_empty(v.as_str()))
}

fn records<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> impl Iterator<Item = &'a Value> {
    field(obj, keys)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| non_empty(v.as_str())).collect())
        .unwrap_or_default()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Values that do not fit an `i32` are treated as absent rather than wrapped.
fn lenient_int(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i32::try_from(i).ok(),
            None => n.as_f64().and_then(rounded_i32),
        },
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .ok()
            .and_then(rounded_i32),
        _ => None,
    }
}

fn rounded_i32(f: f64) -> Option<i32> {
    let rounded = f.round();
    (rounded.is_finite() && rounded >= f64::from(i32::MIN) && rounded <= f64::from(i32::MAX))
        .then_some(rounded as i32)
}

fn lenient_float(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().trim_end_matches('+').parse::<f32>().ok(),
        _ => None,
    }
}

fn lenient_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
