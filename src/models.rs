use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Candidate,
    Company,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Candidate => "candidate",
            UserType::Company => "company",
        }
    }

    /// Unrecognised values map to `None` rather than an error.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "candidate" => Some(UserType::Candidate),
            "company" => Some(UserType::Company),
            _ => None,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    Technical,
    Soft,
    Language,
    Other,
}

impl SkillCategory {
    pub fn label(&self) -> &'static str {
        match self {
            SkillCategory::Technical => "TECHNICAL",
            SkillCategory::Soft => "SOFT SKILLS",
            SkillCategory::Language => "LANGUAGES",
            SkillCategory::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProficiencyLevel::Beginner => "beginner",
            ProficiencyLevel::Intermediate => "intermediate",
            ProficiencyLevel::Advanced => "advanced",
            ProficiencyLevel::Expert => "expert",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default)]
    pub skill_id: Option<i64>,
    #[serde(default)]
    pub skill_name: String,
    #[serde(default, alias = "skill_category")]
    pub category: Option<SkillCategory>,
    #[serde(default, alias = "proficiency_level")]
    pub proficiency: Option<ProficiencyLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub education_id: Option<i64>,
    pub degree: Option<String>,
    pub institution: Option<String>,
    pub graduation_year: Option<i32>,
    pub gpa: Option<f64>,
}

/// An applicant as listed for a company's job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub fullname: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub years_experience: Option<i64>,
    pub resume_path: Option<String>,
    pub status: Option<String>, // "pending", "shortlisted", "rejected"
    #[serde(default)]
    pub shortlisted: bool,
    pub applied_date: Option<String>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: i64,
    pub email: String,
    #[serde(alias = "fullName")]
    pub fullname: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub years_experience: Option<i64>,
    pub resume_file_path: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CandidateProfileUpdate {
    #[serde(rename = "fullName", skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_experience: Option<i64>,
}

impl CandidateProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.fullname.is_none()
            && self.phone.is_none()
            && self.location.is_none()
            && self.years_experience.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewEducation {
    pub degree: String,
    pub institution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpa: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSkill {
    pub skill_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_category: Option<SkillCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proficiency_level: Option<ProficiencyLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyJobProfile {
    pub id: Option<i64>,
    pub email: Option<String>,
    #[serde(rename = "companyName")]
    pub company_name: Option<String>,
    pub job_role: Option<String>,
    pub job_type: Option<String>,
    pub stipend: Option<String>,
    pub location: Option<String>,
    pub skills_required: Option<String>, // comma-separated
    pub education_qualification: Option<String>,
    pub description: Option<String>,
    pub posted_date: Option<String>,
    pub application_deadline: Option<String>,
    #[serde(default)]
    pub profile_completed: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompanyProfileUpdate {
    #[serde(rename = "companyName", skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stipend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills_required: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education_qualification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_deadline: Option<String>, // YYYY-MM-DD
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyProfileSaved {
    #[serde(default)]
    pub message: Option<String>,
    pub company: CompanyJobProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateProfileSaved {
    #[serde(default)]
    pub message: Option<String>,
    pub candidate: CandidateProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(rename = "totalResumes")]
    pub total_resumes: u64,
    pub shortlisted: u64,
    pub pending: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyRegistration {
    pub email: String,
    #[serde(rename = "companyName")]
    pub company_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateRegistration {
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Raw login response. `candidate` or `company` carries the profile
/// snapshot depending on which endpoint answered.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: Option<String>,
    pub candidate: Option<serde_json::Value>,
    pub company: Option<serde_json::Value>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShortlistEcho {
    pub shortlisted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MatchedSkill {
    #[serde(default)]
    pub matched: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SkillMatchDetails {
    #[serde(default)]
    pub matched_skills: Vec<MatchedSkill>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedCandidate {
    pub candidate_id: i64,
    pub fullname: String,
    pub email: String,
    pub location: Option<String>,
    pub years_experience: Option<i64>,
    #[serde(default)]
    pub aggregate_score: f64,
    #[serde(default)]
    pub skill_score: f64,
    #[serde(default)]
    pub experience_score: f64,
    #[serde(default)]
    pub skill_match_details: SkillMatchDetails,
}

impl RankedCandidate {
    pub fn matched_skills(&self) -> Vec<&str> {
        self.skill_match_details
            .matched_skills
            .iter()
            .map(|s| s.matched.as_str())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn missing_skills(&self) -> &[String] {
        &self.skill_match_details.missing_skills
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiShortlistResult {
    #[serde(default)]
    pub total_candidates: u64,
    #[serde(default, alias = "ranked_candidates")]
    pub candidates: Vec<RankedCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedCandidate {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkUploadReport {
    pub message: Option<String>,
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub candidates_created: Vec<UploadedCandidate>,
    #[serde(default)]
    pub candidates_applied: Vec<UploadedCandidate>,
    #[serde(default)]
    pub errors: Vec<UploadFailure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeUploadReport {
    pub message: Option<String>,
    pub file_path: Option<String>,
    pub filename: Option<String>,
    pub parsed_data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub database_update: Option<String>, // "success" or "failed"
    pub update_message: Option<String>,
    pub update_error: Option<String>,
}

impl ResumeUploadReport {
    /// Number of `(education, skills)` entries the parser pulled out of the
    /// resume, if it parsed at all.
    pub fn parsed_counts(&self) -> Option<(usize, usize)> {
        let parsed = self.parsed_data.as_ref()?;
        let count = |key: &str| parsed.get(key).and_then(|v| v.as_array()).map_or(0, Vec::len);
        Some((count("education"), count("skills")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidate_from_listing_payload() {
        let payload = json!({
            "id": 7,
            "fullname": "Ann Lee",
            "email": "ann@example.com",
            "phone": null,
            "location": "Pune",
            "years_experience": 3,
            "resume_path": "/Uploads/resumes/ann.pdf",
            "status": "pending",
            "shortlisted": false,
            "applied_date": "2024-03-01 10:00:00",
            "education": [{"degree": "BSc", "institution": "MIT", "graduation_year": 2020, "gpa": 3.5}],
            "skills": [{"skill_name": "Rust", "category": "technical", "proficiency": "expert"}]
        });

        let candidate: Candidate = serde_json::from_value(payload).unwrap();
        assert_eq!(candidate.id, 7);
        assert_eq!(candidate.skills[0].category, Some(SkillCategory::Technical));
        assert_eq!(candidate.skills[0].proficiency, Some(ProficiencyLevel::Expert));
        assert_eq!(candidate.education[0].graduation_year, Some(2020));
    }

    #[test]
    fn test_profile_skill_uses_long_field_names() {
        let payload = json!({
            "skill_id": 3,
            "skill_name": "Spanish",
            "skill_category": "language",
            "proficiency_level": "intermediate"
        });

        let skill: Skill = serde_json::from_value(payload).unwrap();
        assert_eq!(skill.category, Some(SkillCategory::Language));
        assert_eq!(skill.proficiency, Some(ProficiencyLevel::Intermediate));
    }

    #[test]
    fn test_profile_updates_skip_unset_fields() {
        let update = CompanyProfileUpdate {
            job_role: Some("Backend Intern".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"job_role": "Backend Intern"}));

        let update = CandidateProfileUpdate {
            fullname: Some("Bo Kim".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"fullName": "Bo Kim"}));
        assert!(CandidateProfileUpdate::default().is_empty());
    }

    #[test]
    fn test_ranked_candidate_skill_details() {
        let payload = json!({
            "total_candidates": 1,
            "candidates": [{
                "candidate_id": 2,
                "fullname": "Bo Kim",
                "email": "bo@example.com",
                "aggregate_score": 0.82,
                "skill_score": 0.9,
                "experience_score": 0.74,
                "skill_match_details": {
                    "matched_skills": [{"matched": "python", "similarity": 1.0}],
                    "missing_skills": ["docker"]
                }
            }]
        });

        let result: AiShortlistResult = serde_json::from_value(payload).unwrap();
        let ranked = &result.candidates[0];
        assert_eq!(ranked.matched_skills(), vec!["python"]);
        assert_eq!(ranked.missing_skills(), ["docker".to_string()]);
    }

    #[test]
    fn test_user_type_parse() {
        assert_eq!(UserType::parse("company"), Some(UserType::Company));
        assert_eq!(UserType::parse("candidate"), Some(UserType::Candidate));
        assert_eq!(UserType::parse("admin"), None);
    }

    #[test]
    fn test_resume_upload_report_counts_parsed_entries() {
        let report: ResumeUploadReport = serde_json::from_value(json!({
            "message": "Resume uploaded successfully",
            "file_path": "/Uploads/resumes/4_20240301_cv.pdf",
            "filename": "4_20240301_cv.pdf",
            "parsed_data": {
                "candidate": {"fullname": "Ann Lee"},
                "education": [{"degree": "BSc"}],
                "skills": [{"skill_name": "Rust"}, {"skill_name": "SQL"}]
            },
            "database_update": "success",
            "update_message": "Candidate data updated successfully"
        }))
        .unwrap();
        assert_eq!(report.parsed_counts(), Some((1, 2)));

        let failed: ResumeUploadReport = serde_json::from_value(json!({
            "message": "Resume uploaded but parsing failed",
            "error": "Unsupported layout"
        }))
        .unwrap();
        assert_eq!(failed.parsed_counts(), None);
    }
}
