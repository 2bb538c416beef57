/// Match analysis prompt template. Replace `{job_description}` and `{resume_text}`.
pub const MATCH_ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are screening a candidate for a role. Read the resume and the job description,
extract the candidate's profile, and score how well they fit.

Return a JSON object with this EXACT schema:
{
  "name": "Full name",
  "email": "email@example.com",
  "phone": "+1 555 0100",
  "links": ["https://linkedin.com/in/...", "https://github.com/..."],
  "score": 0,
  "verdict": "Proceed",
  "matchReason": "One or two sentences explaining the score",
  "summary": "Three to five sentence professional summary",
  "skills": [{"name": "Rust", "level": "Expert", "years": 5}],
  "skillsMatrix": [
    {"skill": "Kubernetes", "required": true, "candidateHas": false, "proficiency": null}
  ],
  "experience": [
    {"title": "Senior Engineer", "company": "Acme", "startDate": "2020-01", "endDate": "Present", "description": "..."}
  ],
  "education": [
    {"institution": "MIT", "degree": "BSc", "field": "Computer Science", "year": "2015"}
  ],
  "intelligence": {
    "technicalScore": 0,
    "culturalScore": 0,
    "communicationScore": 0,
    "strengths": ["..."],
    "weaknesses": ["..."],
    "missingSkills": ["..."]
  }
}

Rules:
- All scores are integers from 0 to 100.
- "verdict" is exactly one of "Proceed", "Review", "Reject".
- List experience most recent first.
- Use null for anything the resume does not state. Do NOT invent contact details.
- "skillsMatrix" has one row per skill or requirement named in the job description.

JOB DESCRIPTION:
{job_description}

RESUME:
{resume_text}"#;
