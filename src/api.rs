use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{
    AiShortlistResult, BulkUploadReport, Candidate, CandidateProfile, CandidateProfileSaved,
    CandidateProfileUpdate, CandidateRegistration, CompanyJobProfile, CompanyProfileSaved,
    CompanyProfileUpdate, CompanyRegistration, Credentials, DashboardStats, LoginResponse,
    NewEducation, NewSkill, ResumeUploadReport, ShortlistEcho, UserType,
};
use crate::session::SessionStore;

pub const DEFAULT_AI_THRESHOLD: f64 = 0.7;

const RESUME_EXTENSIONS: [&str; 4] = ["pdf", "doc", "docx", "txt"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not logged in")]
    NotAuthenticated,

    #[error("{0}")]
    Validation(String),

    /// Non-success status. `message` is the backend's own message when it
    /// sent one.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save session: {0}")]
    Session(#[source] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Receives the fraction of an upload body sent so far, in `[0, 1]`.
pub type ProgressFn = Box<dyn FnMut(f64) + Send + 'static>;

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct ApiClient {
    base_url: String,
    http: Client,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        session: Arc<dyn SessionStore>,
        timeout: Option<Duration>,
    ) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| ApiError::Transport {
            context: "Failed to build HTTP client".to_string(),
            source: e,
        })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> ApiResult<String> {
        self.session
            .token()
            .map(|token| format!("Bearer {}", token))
            .ok_or(ApiError::NotAuthenticated)
    }

    fn authed(&self, method: reqwest::Method, path: &str) -> ApiResult<RequestBuilder> {
        let bearer = self.bearer()?;
        debug!(%method, path, "authenticated request");
        Ok(self
            .http
            .request(method, self.url(path))
            .header("Authorization", bearer))
    }

    fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
        fallback: &str,
    ) -> ApiResult<T> {
        let response = request.send().map_err(|e| ApiError::Transport {
            context: format!("No response from server while trying to {}", what),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    if fallback.is_empty() {
                        format!("Server error: {}", status.as_u16())
                    } else {
                        fallback.to_string()
                    }
                });
            debug!(status = status.as_u16(), %message, "request failed");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().map_err(|e| ApiError::Transport {
            context: format!("Failed to parse response while trying to {}", what),
            source: e,
        })
    }

    // --- Registration and login ---

    pub fn register_company(&self, data: &CompanyRegistration) -> ApiResult<MessageResponse> {
        debug!(path = "/register/company", "request");
        let request = self.http.post(self.url("/register/company")).json(data);
        self.send(request, "register", "Registration failed")
    }

    pub fn register_candidate(&self, data: &CandidateRegistration) -> ApiResult<MessageResponse> {
        debug!(path = "/register/candidate", "request");
        let request = self.http.post(self.url("/register/candidate")).json(data);
        self.send(request, "register", "Registration failed")
    }

    pub fn login_candidate(&self, credentials: &Credentials) -> ApiResult<LoginResponse> {
        self.login(UserType::Candidate, credentials)
    }

    pub fn login_company(&self, credentials: &Credentials) -> ApiResult<LoginResponse> {
        self.login(UserType::Company, credentials)
    }

    /// The session is written only when the response carries an
    /// `access_token`; otherwise the store is left exactly as it was.
    fn login(&self, user_type: UserType, credentials: &Credentials) -> ApiResult<LoginResponse> {
        let path = format!("/login/{}", user_type);
        debug!(path = %path, "request");
        let request = self.http.post(self.url(&path)).json(credentials);
        let data: LoginResponse = self.send(request, "log in", "Login failed")?;

        if let Some(token) = &data.access_token {
            let profile = match user_type {
                UserType::Candidate => data.candidate.clone(),
                UserType::Company => data.company.clone(),
            };
            self.session
                .login(token, user_type, profile.unwrap_or(Value::Null))
                .map_err(ApiError::Session)?;
            info!(%user_type, "logged in");
        }

        Ok(data)
    }

    // --- Candidate ---

    pub fn fetch_candidate_profile(&self) -> ApiResult<CandidateProfile> {
        let request = self.authed(reqwest::Method::GET, "/candidate/profile")?;
        self.send(request, "fetch profile", "")
    }

    pub fn update_candidate_profile(
        &self,
        update: &CandidateProfileUpdate,
    ) -> ApiResult<CandidateProfileSaved> {
        let request = self.authed(reqwest::Method::PUT, "/candidate/profile")?.json(update);
        self.send(request, "update profile", "")
    }

    pub fn upload_resume(
        &self,
        file: &Path,
        progress: Option<ProgressFn>,
    ) -> ApiResult<ResumeUploadReport> {
        let extension = extension_of(file);
        if !RESUME_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ApiError::Validation(format!(
                "Unsupported resume format '{}'. Use one of: {}",
                file.display(),
                RESUME_EXTENSIONS.join(", ")
            )));
        }

        let bearer = self.bearer()?;
        let part = file_part(file, mime_for(&extension), progress)?;
        let form = Form::new().part("resume", part);

        debug!(path = "/candidate/resume", file = %file.display(), "upload");
        let request = self
            .http
            .post(self.url("/candidate/resume"))
            .header("Authorization", bearer)
            .multipart(form);
        let report: ResumeUploadReport = self.send(request, "upload resume", "")?;
        info!(file = %file.display(), "resume uploaded");
        Ok(report)
    }

    pub fn add_education(&self, education: &NewEducation) -> ApiResult<Value> {
        let request = self
            .authed(reqwest::Method::POST, "/candidate/education")?
            .json(education);
        self.send(request, "add education", "")
    }

    pub fn add_skill(&self, skill: &NewSkill) -> ApiResult<Value> {
        let request = self.authed(reqwest::Method::POST, "/candidate/skills")?.json(skill);
        self.send(request, "add skill", "")
    }

    // --- Company ---

    pub fn fetch_company_profile(&self) -> ApiResult<CompanyJobProfile> {
        let request = self.authed(reqwest::Method::GET, "/company/profile")?;
        self.send(request, "fetch job profile", "")
    }

    pub fn update_company_profile(
        &self,
        update: &CompanyProfileUpdate,
    ) -> ApiResult<CompanyProfileSaved> {
        let request = self.authed(reqwest::Method::PUT, "/company/profile")?.json(update);
        self.send(request, "update job profile", "")
    }

    pub fn fetch_dashboard_stats(&self) -> ApiResult<DashboardStats> {
        let request = self.authed(reqwest::Method::GET, "/company/dashboard/stats")?;
        self.send(request, "fetch dashboard stats", "")
    }

    pub fn fetch_applied_candidates(&self) -> ApiResult<Vec<Candidate>> {
        let request = self.authed(reqwest::Method::GET, "/company/candidates")?;
        self.send(request, "fetch candidates", "")
    }

    pub fn update_shortlist_status(
        &self,
        candidate_id: i64,
        shortlisted: bool,
    ) -> ApiResult<ShortlistEcho> {
        let path = format!("/company/candidates/{}/shortlist", candidate_id);
        let request = self
            .authed(reqwest::Method::PUT, &path)?
            .json(&json!({ "shortlisted": shortlisted }));
        self.send(request, "update shortlist status", "")
    }

    pub fn rank_candidates_by_ai(&self, threshold: f64) -> ApiResult<AiShortlistResult> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ApiError::Validation(format!(
                "Threshold must be between 0 and 1, got {}",
                threshold
            )));
        }
        let request = self
            .authed(reqwest::Method::GET, "/company/resumeShortlister")?
            .query(&[("threshold", threshold)]);
        self.send(request, "rank candidates", "")
    }

    /// Rejects anything not named `*.zip` before touching the network.
    pub fn bulk_upload_resumes(
        &self,
        zip_file: &Path,
        progress: Option<ProgressFn>,
    ) -> ApiResult<BulkUploadReport> {
        let is_zip = zip_file
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".zip"));
        if !is_zip {
            return Err(ApiError::Validation(
                "Only ZIP files are supported for bulk upload".to_string(),
            ));
        }

        let bearer = self.bearer()?;
        let part = file_part(zip_file, "application/zip", progress)?;
        let form = Form::new().part("resumes", part);

        debug!(path = "/company/bulkUpload", file = %zip_file.display(), "upload");
        let request = self
            .http
            .post(self.url("/company/bulkUpload"))
            .header("Authorization", bearer)
            .multipart(form);
        let report: BulkUploadReport = self.send(request, "upload resumes", "")?;
        info!(
            processed = report.total_files,
            errors = report.errors.len(),
            "bulk upload finished"
        );
        Ok(report)
    }

    pub fn resume_download_url(&self, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty()).map(|p| self.url(p))
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

fn mime_for(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

fn file_part(path: &Path, mime: &str, progress: Option<ProgressFn>) -> ApiResult<Part> {
    let file_error = |source| ApiError::File {
        path: path.display().to_string(),
        source,
    };
    let file = std::fs::File::open(path).map_err(file_error)?;
    let total = file.metadata().map_err(file_error)?.len();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let reader = ProgressReader {
        inner: file,
        sent: 0,
        total,
        progress,
    };
    Part::reader_with_length(reader, total)
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|e| ApiError::Transport {
            context: "Invalid upload content type".to_string(),
            source: e,
        })
}

struct ProgressReader<R> {
    inner: R,
    sent: u64,
    total: u64,
    progress: Option<ProgressFn>,
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.sent += n as u64;
        if let Some(progress) = self.progress.as_mut() {
            if n > 0 || self.total == 0 {
                let fraction = if self.total == 0 {
                    1.0
                } else {
                    (self.sent as f64 / self.total as f64).min(1.0)
                };
                progress(fraction);
            }
        }
        Ok(n)
    }
}
