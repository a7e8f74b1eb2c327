mod api;
mod config;
mod guard;
mod logging;
mod models;
mod session;
mod tasks;
mod tui;
mod view;

use anyhow::{Context, Result, anyhow, bail};
use api::{ApiClient, ApiError, ProgressFn};
use clap::{Parser, Subcommand};
use guard::{Outcome, Page, Route, RouteGuard};
use models::{
    CandidateProfileUpdate, CandidateRegistration, CompanyJobProfile, CompanyProfileUpdate,
    CompanyRegistration, Credentials, NewEducation, NewSkill, ProficiencyLevel, SkillCategory,
    UserType,
};
use session::{FileSessionStore, SessionStore};
use std::path::PathBuf;
use std::sync::Arc;
use view::{CandidateView, Tab, format_date, format_score, group_skills, split_skills};

#[derive(Parser)]
#[command(name = "recruit")]
#[command(about = "Recruitment portal client - profiles, resumes and applicant shortlisting")]
struct Cli {
    /// Backend base URL (overrides config and RECRUIT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        #[command(subcommand)]
        command: RegisterCommands,
    },

    /// Log in and store the session
    Login {
        #[command(subcommand)]
        command: LoginCommands,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in
    Whoami,

    /// Company: resume statistics. Candidate: profile summary
    Dashboard,

    /// Show your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Candidate commands
    Candidate {
        #[command(subcommand)]
        command: CandidateCommands,
    },

    /// Company commands
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },
}

#[derive(Subcommand)]
enum RegisterCommands {
    /// Register a company account
    Company {
        #[arg(long)]
        email: String,

        #[arg(long)]
        company_name: String,

        #[arg(long)]
        password: String,
    },

    /// Register a candidate account
    Candidate {
        #[arg(long)]
        email: String,

        #[arg(long)]
        full_name: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Subcommand)]
enum LoginCommands {
    /// Log in as a company
    Company {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Log in as a candidate
    Candidate {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Print the profile of the logged-in account
    Show,
}

#[derive(Subcommand)]
enum CandidateCommands {
    /// Update personal details
    Update {
        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        years_experience: Option<i64>,
    },

    /// Upload a resume (pdf, doc, docx or txt)
    Resume {
        /// Path to resume file
        file: PathBuf,
    },

    /// Manage education entries
    Education {
        #[command(subcommand)]
        command: EducationCommands,
    },

    /// Manage skills
    Skill {
        #[command(subcommand)]
        command: SkillCommands,
    },
}

#[derive(Subcommand)]
enum EducationCommands {
    /// Add an education entry
    Add {
        #[arg(long)]
        degree: String,

        #[arg(long)]
        institution: String,

        #[arg(long)]
        graduation_year: Option<i32>,

        #[arg(long)]
        gpa: Option<f64>,
    },
}

#[derive(Subcommand)]
enum SkillCommands {
    /// Add a skill
    Add {
        /// Skill name
        name: String,

        #[arg(short, long, value_enum)]
        category: Option<SkillCategory>,

        #[arg(short, long, value_enum)]
        proficiency: Option<ProficiencyLevel>,
    },
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// Update the job profile
    Update {
        #[arg(long)]
        company_name: Option<String>,

        #[arg(long)]
        job_role: Option<String>,

        #[arg(long)]
        job_type: Option<String>,

        #[arg(long)]
        stipend: Option<String>,

        #[arg(long)]
        location: Option<String>,

        /// Comma-separated list
        #[arg(long)]
        skills_required: Option<String>,

        #[arg(long)]
        education: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Application deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,
    },

    /// List applicants
    Candidates {
        #[arg(short, long, value_enum, default_value = "all")]
        tab: Tab,

        /// Match name, email, location or skill
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Shortlist an applicant
    Shortlist {
        /// Candidate ID
        id: i64,

        /// Move back to pending instead
        #[arg(long)]
        remove: bool,
    },

    /// Rank applicants against the job profile with the AI shortlister
    Rank {
        /// Minimum match score (0-1)
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Upload a ZIP of resumes
    BulkUpload {
        /// Path to .zip file
        file: PathBuf,
    },

    /// Browse applicants interactively
    Browse,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, config_path) = config::Config::load()?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }

    let browsing = matches!(
        cli.command,
        Commands::Company {
            command: CompanyCommands::Browse
        }
    );
    let _log_guard = if browsing {
        Some(
            logging::init_file(&config::data_dir(), &config.log_level, cli.verbose)
                .context("Failed to open log file")?,
        )
    } else {
        logging::init_stderr(&config.log_level, cli.verbose);
        None
    };

    let file_store = FileSessionStore::open()?;
    tracing::debug!(
        config = %config_path.display(),
        session = %file_store.path().display(),
        "starting"
    );
    let store: Arc<dyn SessionStore> = Arc::new(file_store);
    let client = ApiClient::new(&config.api_url, store.clone(), config.timeout())?;
    tracing::debug!(api_url = client.base_url(), "client ready");
    let guard = RouteGuard::new(store.clone());

    run(cli.command, &config, client, guard).map_err(with_hint)
}

fn run(
    command: Commands,
    config: &config::Config,
    client: ApiClient,
    guard: RouteGuard,
) -> Result<()> {
    match command {
        Commands::Register { command } => match command {
            RegisterCommands::Company {
                email,
                company_name,
                password,
            } => {
                let response = client.register_company(&CompanyRegistration {
                    email,
                    company_name,
                    password,
                })?;
                println!(
                    "{}",
                    response.message.unwrap_or_else(|| "Company registered".to_string())
                );
                println!("Log in with: recruit login company --email <email> --password <password>");
            }

            RegisterCommands::Candidate {
                email,
                full_name,
                password,
                phone,
            } => {
                let response = client.register_candidate(&CandidateRegistration {
                    email,
                    full_name,
                    password,
                    phone,
                })?;
                println!(
                    "{}",
                    response.message.unwrap_or_else(|| "Candidate registered".to_string())
                );
                println!("Log in with: recruit login candidate --email <email> --password <password>");
            }
        },

        Commands::Login { command } => {
            if let Outcome::Redirect(_) = guard.resolve(Route::Login) {
                let who = client.session().user_type().map(|t| t.to_string());
                println!(
                    "Already logged in as {}. Run `recruit logout` first to switch accounts.",
                    who.unwrap_or_default()
                );
                return Ok(());
            }

            let (user_type, email, password) = match command {
                LoginCommands::Company { email, password } => (UserType::Company, email, password),
                LoginCommands::Candidate { email, password } => {
                    (UserType::Candidate, email, password)
                }
            };
            let credentials = Credentials { email, password };
            let response = match user_type {
                UserType::Company => client.login_company(&credentials)?,
                UserType::Candidate => client.login_candidate(&credentials)?,
            };

            if response.access_token.is_none() {
                bail!(
                    "{}",
                    response
                        .message
                        .unwrap_or_else(|| "Login failed: no token in response".to_string())
                );
            }
            println!("Logged in as {} {}", user_type, credentials.email);
        }

        Commands::Logout => {
            client.session().logout()?;
            tracing::info!("logged out");
            println!("Logged out.");
        }

        Commands::Whoami => match client.session().user_type() {
            Some(user_type) if client.session().is_authenticated() => {
                let user = client.session().current_user().unwrap_or_default();
                let name = user
                    .get("companyName")
                    .or_else(|| user.get("fullname"))
                    .or_else(|| user.get("fullName"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("-");
                let email = user.get("email").and_then(|v| v.as_str()).unwrap_or("-");
                println!("{} {} <{}>", user_type, name, email);
            }
            _ => println!("Not logged in."),
        },

        Commands::Dashboard => match gate(&guard, Route::Dashboard)? {
            Page::CompanyDashboard => {
                let stats = client.fetch_dashboard_stats()?;
                let profile = client.fetch_company_profile()?;
                println!(
                    "{}",
                    profile.company_name.as_deref().unwrap_or("Company dashboard")
                );
                println!("  Total resumes: {}", stats.total_resumes);
                println!("  Shortlisted:   {}", stats.shortlisted);
                println!("  Pending:       {}", stats.pending);
                if !profile.profile_completed {
                    println!("\n{}", INCOMPLETE_PROFILE);
                }
            }
            _ => {
                let profile = client.fetch_candidate_profile()?;
                println!("{}", profile.fullname.as_deref().unwrap_or(&profile.email));
                println!("  Status:    {}", profile.status.as_deref().unwrap_or("-"));
                println!(
                    "  Resume:    {}",
                    if profile.resume_file_path.is_some() {
                        "uploaded"
                    } else {
                        "not uploaded"
                    }
                );
                println!("  Skills:    {}", profile.skills.len());
                println!("  Education: {}", profile.education.len());
            }
        },

        Commands::Profile {
            command: ProfileCommands::Show,
        } => match gate(&guard, Route::Profile)? {
            Page::CompanyProfile => print_company_profile(&client.fetch_company_profile()?),
            _ => {
                let p = client.fetch_candidate_profile()?;
                println!("Candidate #{}", p.id);
                println!("Name: {}", p.fullname.as_deref().unwrap_or("-"));
                println!("Email: {}", p.email);
                if let Some(phone) = &p.phone {
                    println!("Phone: {}", phone);
                }
                if let Some(location) = &p.location {
                    println!("Location: {}", location);
                }
                if let Some(years) = p.years_experience {
                    println!("Experience: {} year(s)", years);
                }
                if let Some(url) = client.resume_download_url(p.resume_file_path.as_deref()) {
                    println!("Resume: {}", url);
                }
                println!("Member since: {}", format_date(p.created_at.as_deref()));

                if !p.education.is_empty() {
                    println!("\nEducation:");
                    for edu in &p.education {
                        let year = edu
                            .graduation_year
                            .map(|y| format!(" ({})", y))
                            .unwrap_or_default();
                        println!(
                            "  {} - {}{}",
                            edu.degree.as_deref().unwrap_or("?"),
                            edu.institution.as_deref().unwrap_or("?"),
                            year
                        );
                    }
                }
                if !p.skills.is_empty() {
                    println!("\nSkills:");
                    for (category, skills) in group_skills(&p.skills) {
                        let names: Vec<String> = skills
                            .iter()
                            .map(|s| match s.proficiency {
                                Some(level) => format!("{} ({})", s.skill_name, level),
                                None => s.skill_name.clone(),
                            })
                            .collect();
                        println!("  {}: {}", category.0.label(), names.join(", "));
                    }
                }
            }
        },

        Commands::Candidate { command } => {
            require_page(&guard, Route::Dashboard, Page::CandidateDashboard, "candidate")?;
            match command {
                CandidateCommands::Update {
                    full_name,
                    phone,
                    location,
                    years_experience,
                } => {
                    let update = CandidateProfileUpdate {
                        fullname: full_name,
                        phone,
                        location,
                        years_experience,
                    };
                    if update.is_empty() {
                        bail!("Nothing to update. Pass at least one of --full-name, --phone, --location, --years-experience");
                    }
                    let saved = client.update_candidate_profile(&update)?;
                    println!(
                        "{}",
                        saved.message.unwrap_or_else(|| "Profile updated".to_string())
                    );
                    let p = saved.candidate;
                    println!("  Name:       {}", p.fullname.as_deref().unwrap_or("-"));
                    println!("  Phone:      {}", p.phone.as_deref().unwrap_or("-"));
                    println!("  Location:   {}", p.location.as_deref().unwrap_or("-"));
                    match p.years_experience {
                        Some(years) => println!("  Experience: {} year(s)", years),
                        None => println!("  Experience: -"),
                    }
                }

                CandidateCommands::Resume { file } => {
                    let report = client.upload_resume(&file, Some(progress_printer("Uploading")))?;
                    println!(
                        "{}",
                        report.message.as_deref().unwrap_or("Resume uploaded")
                    );
                    if let Some(name) = &report.filename {
                        println!("Stored as {}", name);
                    }
                    if let Some(url) = client.resume_download_url(report.file_path.as_deref()) {
                        println!("Download: {}", url);
                    }
                    if let Some(warning) = &report.error {
                        println!("Warning: {}", warning);
                    }
                    if let Some((education, skills)) = report.parsed_counts() {
                        println!(
                            "Parsed {} education entr{} and {} skill(s)",
                            education,
                            if education == 1 { "y" } else { "ies" },
                            skills
                        );
                    }
                    match report.database_update.as_deref() {
                        Some("success") => println!(
                            "{}",
                            report
                                .update_message
                                .as_deref()
                                .unwrap_or("Profile updated from resume")
                        ),
                        Some(_) => println!(
                            "Profile not updated from resume: {}",
                            report.update_error.as_deref().unwrap_or("unknown error")
                        ),
                        None => {}
                    }
                }

                CandidateCommands::Education {
                    command:
                        EducationCommands::Add {
                            degree,
                            institution,
                            graduation_year,
                            gpa,
                        },
                } => {
                    client.add_education(&NewEducation {
                        degree: degree.clone(),
                        institution: institution.clone(),
                        graduation_year,
                        gpa,
                    })?;
                    println!("Added {} - {}", degree, institution);
                }

                CandidateCommands::Skill {
                    command:
                        SkillCommands::Add {
                            name,
                            category,
                            proficiency,
                        },
                } => {
                    client.add_skill(&NewSkill {
                        skill_name: name.clone(),
                        skill_category: category,
                        proficiency_level: proficiency,
                    })?;
                    println!("Added skill '{}'", name);
                }
            }
        }

        Commands::Company { command } => {
            require_page(&guard, Route::Dashboard, Page::CompanyDashboard, "company")?;
            run_company(command, config, client, guard)?;
        }
    }

    Ok(())
}

fn run_company(
    command: CompanyCommands,
    config: &config::Config,
    client: ApiClient,
    guard: RouteGuard,
) -> Result<()> {
    match command {
        CompanyCommands::Update {
            company_name,
            job_role,
            job_type,
            stipend,
            location,
            skills_required,
            education,
            description,
            deadline,
        } => {
            if let Some(deadline) = &deadline {
                chrono::NaiveDate::parse_from_str(deadline, "%Y-%m-%d")
                    .with_context(|| format!("Deadline '{}' is not YYYY-MM-DD", deadline))?;
            }
            let update = CompanyProfileUpdate {
                company_name,
                job_role,
                job_type,
                stipend,
                location,
                skills_required,
                education_qualification: education,
                description,
                application_deadline: deadline,
            };
            let saved = client.update_company_profile(&update)?;
            println!(
                "{}",
                saved.message.unwrap_or_else(|| "Job profile updated".to_string())
            );
            print_company_profile(&saved.company);
        }

        CompanyCommands::Candidates { tab, search } => {
            let mut view = CandidateView::new(client.fetch_applied_candidates()?);
            view.set_tab(tab);
            if let Some(term) = &search {
                view.set_term(term);
            }

            let counts = view.counts();
            println!(
                "All: {}  Shortlisted: {}  Pending: {}",
                counts.all, counts.shortlisted, counts.pending
            );
            if view.visible().is_empty() {
                println!("No candidates found.");
                return Ok(());
            }

            println!(
                "{:<6} {:<12} {:<24} {:<28} {:<12} {:<24}",
                "ID", "STATUS", "NAME", "EMAIL", "APPLIED", "SKILLS"
            );
            println!("{}", "-".repeat(110));
            for c in view.visible() {
                let skills: Vec<&str> = c.skills.iter().map(|s| s.skill_name.as_str()).collect();
                println!(
                    "{:<6} {:<12} {:<24} {:<28} {:<12} {:<24}",
                    c.id,
                    if c.shortlisted { "shortlisted" } else { "pending" },
                    truncate(&c.fullname, 22),
                    truncate(&c.email, 26),
                    format_date(c.applied_date.as_deref()),
                    truncate(&skills.join(", "), 24)
                );
            }
        }

        CompanyCommands::Shortlist { id, remove } => {
            require_complete_profile(&client)?;
            let wanted = !remove;

            let mut view = CandidateView::new(client.fetch_applied_candidates()?);
            let current = view
                .get(id)
                .map(|c| c.shortlisted)
                .ok_or_else(|| anyhow!("Candidate #{} has not applied to this job", id))?;
            if current == wanted {
                println!(
                    "Candidate #{} is already {}.",
                    id,
                    if wanted { "shortlisted" } else { "pending" }
                );
                return Ok(());
            }

            let now = view.toggle_shortlist_via(&client, id)?;
            let name = view.get(id).map(|c| c.fullname.clone()).unwrap_or_default();
            if now {
                println!("Shortlisted #{} {}", id, name);
            } else {
                println!("Moved #{} {} back to pending", id, name);
            }
        }

        CompanyCommands::Rank { threshold } => {
            require_complete_profile(&client)?;
            let threshold = threshold.unwrap_or(config.ai_threshold);
            let result = client.rank_candidates_by_ai(threshold)?;

            println!(
                "Analyzed {} candidate(s), {} at or above {}",
                result.total_candidates,
                result.candidates.len(),
                format_score(threshold)
            );
            if result.candidates.is_empty() {
                return Ok(());
            }

            println!(
                "\n{:<5} {:<6} {:<24} {:>7} {:>7} {:>7}",
                "RANK", "ID", "NAME", "MATCH", "SKILLS", "EXP"
            );
            println!("{}", "-".repeat(60));
            for (i, ranked) in result.candidates.iter().enumerate() {
                println!(
                    "{:<5} {:<6} {:<24} {:>7} {:>7} {:>7}",
                    i + 1,
                    ranked.candidate_id,
                    truncate(&ranked.fullname, 22),
                    format_score(ranked.aggregate_score),
                    format_score(ranked.skill_score),
                    format_score(ranked.experience_score)
                );
                let options = textwrap::Options::new(72)
                    .initial_indent("      ")
                    .subsequent_indent("        ");
                let matched = ranked.matched_skills();
                if !matched.is_empty() {
                    println!(
                        "{}",
                        textwrap::fill(&format!("matched: {}", matched.join(", ")), &options)
                    );
                }
                if !ranked.missing_skills().is_empty() {
                    println!(
                        "{}",
                        textwrap::fill(
                            &format!("missing: {}", ranked.missing_skills().join(", ")),
                            &options
                        )
                    );
                }
            }
        }

        CompanyCommands::BulkUpload { file } => {
            gate(&guard, Route::ResumeUpload)?;
            require_complete_profile(&client)?;

            let report = client.bulk_upload_resumes(&file, Some(progress_printer("Uploading")))?;
            if let Some(message) = &report.message {
                println!("{}", message);
            }
            println!("\nResults:");
            println!("  Files processed:    {}", report.total_files);
            println!("  Accounts created:   {}", report.candidates_created.len());
            println!("  Applications added: {}", report.candidates_applied.len());
            for created in &report.candidates_created {
                println!(
                    "    + {} <{}>",
                    created.name.as_deref().unwrap_or("-"),
                    created.email
                );
            }
            if !report.errors.is_empty() {
                println!("  Errors:             {}", report.errors.len());
                for failure in &report.errors {
                    println!("    {}: {}", failure.filename, failure.error);
                }
            }
        }

        CompanyCommands::Browse => {
            let profile = client.fetch_company_profile()?;
            let client = Arc::new(client);
            match tui::run_browse(
                client,
                guard,
                profile.profile_completed,
                config.ai_threshold,
            )? {
                tui::BrowseExit::Quit => {}
                tui::BrowseExit::SessionEnded => {
                    println!("Session ended. Log in again to continue.")
                }
            }
        }
    }

    Ok(())
}

const INCOMPLETE_PROFILE: &str = "Your job profile is incomplete. Fill it in with `recruit company update ...` to shortlist, rank and upload resumes.";

/// Maps the guard's answer for `route` onto the page to show, turning
/// redirects into errors the user can act on.
fn gate(guard: &RouteGuard, route: Route) -> Result<Page> {
    match guard.resolve(route) {
        Outcome::Render(page) => Ok(page),
        Outcome::Redirect(Route::Login) => {
            bail!("Not logged in. Run `recruit login company|candidate` first.")
        }
        Outcome::Redirect(_) => bail!("{} is not available to this account", route),
    }
}

fn require_page(guard: &RouteGuard, route: Route, page: Page, who: &str) -> Result<()> {
    if gate(guard, route)? != page {
        bail!("These commands need a {} login", who);
    }
    Ok(())
}

fn require_complete_profile(client: &ApiClient) -> Result<()> {
    if !client.fetch_company_profile()?.profile_completed {
        bail!("{}", INCOMPLETE_PROFILE);
    }
    Ok(())
}

fn with_hint(err: anyhow::Error) -> anyhow::Error {
    let rejected = err
        .downcast_ref::<ApiError>()
        .is_some_and(|e| e.status() == Some(401));
    if rejected {
        err.context("The server rejected the stored session. Log in again with `recruit login`")
    } else {
        err
    }
}

fn progress_printer(label: &'static str) -> ProgressFn {
    let mut last = None;
    Box::new(move |fraction: f64| {
        let percent = (fraction * 100.0).round() as u32;
        if last == Some(percent) {
            return;
        }
        last = Some(percent);
        eprint!("\r{} {:>3}%", label, percent);
        if percent >= 100 {
            eprintln!();
        }
    })
}

fn print_company_profile(profile: &CompanyJobProfile) {
    println!("{}", profile.company_name.as_deref().unwrap_or("(no company name)"));
    let field = |label: &str, value: &Option<String>| {
        println!("  {:<14} {}", label, value.as_deref().unwrap_or("-"));
    };
    field("Job role:", &profile.job_role);
    field("Job type:", &profile.job_type);
    field("Stipend:", &profile.stipend);
    field("Location:", &profile.location);
    field("Education:", &profile.education_qualification);
    println!(
        "  {:<14} {}",
        "Deadline:",
        format_date(profile.application_deadline.as_deref())
    );
    println!("  {:<14} {}", "Posted:", format_date(profile.posted_date.as_deref()));

    let skills = split_skills(profile.skills_required.as_deref());
    if !skills.is_empty() {
        println!("  {:<14} {}", "Skills:", skills.join(", "));
    }
    if let Some(description) = &profile.description {
        println!("\n{}", textwrap::fill(description, 76));
    }
    if !profile.profile_completed {
        println!("\n{}", INCOMPLETE_PROFILE);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
