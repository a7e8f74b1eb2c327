use chrono::NaiveDateTime;
use clap::ValueEnum;
use std::collections::BTreeMap;

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::models::{Candidate, Skill, SkillCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Tab {
    #[default]
    All,
    Shortlisted,
    Pending,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::All, Tab::Shortlisted, Tab::Pending];

    pub fn label(&self) -> &'static str {
        match self {
            Tab::All => "All",
            Tab::Shortlisted => "Shortlisted",
            Tab::Pending => "Pending",
        }
    }

    pub fn next(&self) -> Tab {
        match self {
            Tab::All => Tab::Shortlisted,
            Tab::Shortlisted => Tab::Pending,
            Tab::Pending => Tab::All,
        }
    }

    fn admits(&self, candidate: &Candidate) -> bool {
        match self {
            Tab::All => true,
            Tab::Shortlisted => candidate.shortlisted,
            Tab::Pending => !candidate.shortlisted,
        }
    }
}

fn matches_term(candidate: &Candidate, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);
    hit(&candidate.fullname)
        || hit(&candidate.email)
        || candidate.location.as_deref().is_some_and(hit)
        || candidate.skills.iter().any(|s| hit(&s.skill_name))
}

/// Tab first, then a case-insensitive substring search over name, email,
/// location and skill names. A blank term matches everyone.
pub fn filter_candidates(all: &[Candidate], tab: Tab, term: &str) -> Vec<Candidate> {
    let needle = term.trim().to_lowercase();
    all.iter()
        .filter(|c| tab.admits(c))
        .filter(|c| needle.is_empty() || matches_term(c, &needle))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TabCounts {
    pub all: usize,
    pub shortlisted: usize,
    pub pending: usize,
}

/// Applicant list with its active tab and search term. `visible` is
/// re-derived whenever any of the three changes.
#[derive(Debug, Clone, Default)]
pub struct CandidateView {
    all: Vec<Candidate>,
    tab: Tab,
    term: String,
    visible: Vec<Candidate>,
}

impl CandidateView {
    pub fn new(all: Vec<Candidate>) -> Self {
        let mut view = Self {
            all,
            ..Default::default()
        };
        view.recompute();
        view
    }

    fn recompute(&mut self) {
        self.visible = filter_candidates(&self.all, self.tab, &self.term);
    }

    pub fn visible(&self) -> &[Candidate] {
        &self.visible
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn set_candidates(&mut self, all: Vec<Candidate>) {
        self.all = all;
        self.recompute();
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.recompute();
    }

    pub fn set_term(&mut self, term: &str) {
        self.term = term.to_string();
        self.recompute();
    }

    pub fn counts(&self) -> TabCounts {
        let shortlisted = self.all.iter().filter(|c| c.shortlisted).count();
        TabCounts {
            all: self.all.len(),
            shortlisted,
            pending: self.all.len() - shortlisted,
        }
    }

    pub fn get(&self, id: i64) -> Option<&Candidate> {
        self.all.iter().find(|c| c.id == id)
    }

    /// Sets the flag on the record with `id` and returns the previous
    /// value, or `None` if no such candidate is loaded.
    pub fn set_shortlisted(&mut self, id: i64, shortlisted: bool) -> Option<bool> {
        let candidate = self.all.iter_mut().find(|c| c.id == id)?;
        let previous = candidate.shortlisted;
        candidate.shortlisted = shortlisted;
        candidate.status = Some(if shortlisted { "shortlisted" } else { "pending" }.to_string());
        self.recompute();
        Some(previous)
    }

    /// Optimistic half of a toggle: flips the record now and returns
    /// `(previous, wanted)` for the confirming call.
    pub fn begin_toggle(&mut self, id: i64) -> ApiResult<(bool, bool)> {
        let previous = self
            .get(id)
            .map(|c| c.shortlisted)
            .ok_or_else(|| ApiError::Validation(format!("Candidate #{} is not in this list", id)))?;
        self.set_shortlisted(id, !previous);
        Ok((previous, !previous))
    }

    /// Applies the server's echo, or puts the record back to `previous`
    /// when the call failed.
    pub fn finish_toggle(
        &mut self,
        id: i64,
        previous: bool,
        result: ApiResult<bool>,
    ) -> ApiResult<bool> {
        match result {
            Ok(echoed) => {
                self.set_shortlisted(id, echoed);
                Ok(echoed)
            }
            Err(e) => {
                self.set_shortlisted(id, previous);
                Err(e)
            }
        }
    }

    pub fn toggle_shortlist(
        &mut self,
        id: i64,
        confirm: impl FnOnce(i64, bool) -> ApiResult<bool>,
    ) -> ApiResult<bool> {
        let (previous, wanted) = self.begin_toggle(id)?;
        let result = confirm(id, wanted);
        self.finish_toggle(id, previous, result)
    }

    pub fn toggle_shortlist_via(&mut self, client: &ApiClient, id: i64) -> ApiResult<bool> {
        self.toggle_shortlist(id, |id, wanted| {
            client
                .update_shortlist_status(id, wanted)
                .map(|echo| echo.shortlisted)
        })
    }
}

// --- Display helpers ---

pub fn group_skills(skills: &[Skill]) -> BTreeMap<SkillCategoryKey, Vec<&Skill>> {
    let mut grouped: BTreeMap<SkillCategoryKey, Vec<&Skill>> = BTreeMap::new();
    for skill in skills {
        let key = SkillCategoryKey(skill.category.unwrap_or(SkillCategory::Other));
        grouped.entry(key).or_default().push(skill);
    }
    grouped
}

/// Orders categories technical, soft, language, other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkillCategoryKey(pub SkillCategory);

impl SkillCategoryKey {
    fn rank(&self) -> u8 {
        match self.0 {
            SkillCategory::Technical => 0,
            SkillCategory::Soft => 1,
            SkillCategory::Language => 2,
            SkillCategory::Other => 3,
        }
    }
}

impl PartialOrd for SkillCategoryKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SkillCategoryKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

pub fn format_score(score: f64) -> String {
    format!("{}%", (score * 100.0).round() as i64)
}

pub fn split_skills(skills_required: Option<&str>) -> Vec<String> {
    skills_required
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `2024-03-01 10:00:00` → `Mar 1, 2024`; anything unparseable is shown
/// as-is and a missing date as `N/A`.
pub fn format_date(value: Option<&str>) -> String {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return "N/A".to_string();
    };
    let parsed = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|dt| dt.date())
        .or_else(|_| chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d"));
    match parsed {
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProficiencyLevel;

    fn candidate(id: i64, name: &str, shortlisted: bool) -> Candidate {
        Candidate {
            id,
            fullname: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: None,
            location: None,
            years_experience: None,
            resume_path: None,
            status: None,
            shortlisted,
            applied_date: None,
            education: Vec::new(),
            skills: Vec::new(),
        }
    }

    fn skill(name: &str, category: Option<SkillCategory>) -> Skill {
        Skill {
            skill_id: None,
            skill_name: name.to_string(),
            category,
            proficiency: Some(ProficiencyLevel::Advanced),
        }
    }

    fn sample() -> Vec<Candidate> {
        let mut ann = candidate(1, "Ann Lee", false);
        ann.location = Some("Seattle".to_string());
        ann.skills = vec![skill("Rust", Some(SkillCategory::Technical))];
        let bo = candidate(2, "Bo Kim", true);
        let mut cy = candidate(3, "Cy Park", false);
        cy.skills = vec![skill("Kubernetes", Some(SkillCategory::Technical))];
        vec![ann, bo, cy]
    }

    fn ids(list: &[Candidate]) -> Vec<i64> {
        list.iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_shortlisted_tab_scenario() {
        let list = vec![candidate(1, "Ann Lee", false), candidate(2, "Bo Kim", true)];
        let result = filter_candidates(&list, Tab::Shortlisted, "");
        assert_eq!(result, vec![list[1].clone()]);
    }

    #[test]
    fn test_tabs() {
        let list = sample();
        assert_eq!(ids(&filter_candidates(&list, Tab::All, "")), vec![1, 2, 3]);
        assert_eq!(ids(&filter_candidates(&list, Tab::Shortlisted, "")), vec![2]);
        assert_eq!(ids(&filter_candidates(&list, Tab::Pending, "")), vec![1, 3]);
    }

    #[test]
    fn test_search_fields() {
        let list = sample();
        assert_eq!(ids(&filter_candidates(&list, Tab::All, "ann")), vec![1]);
        assert_eq!(ids(&filter_candidates(&list, Tab::All, "BO.KIM@")), vec![2]);
        assert_eq!(ids(&filter_candidates(&list, Tab::All, "seattle")), vec![1]);
        assert_eq!(ids(&filter_candidates(&list, Tab::All, "kube")), vec![3]);
        assert_eq!(ids(&filter_candidates(&list, Tab::All, "   ")), vec![1, 2, 3]);
        assert!(filter_candidates(&list, Tab::All, "zzz").is_empty());
    }

    #[test]
    fn test_search_combines_with_tab() {
        let list = sample();
        assert!(filter_candidates(&list, Tab::Shortlisted, "rust").is_empty());
        assert_eq!(ids(&filter_candidates(&list, Tab::Pending, "rust")), vec![1]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let list = sample();
        for tab in Tab::ALL {
            for term in ["", "a", "rust", "KIM", "nobody"] {
                let once = filter_candidates(&list, tab, term);
                let twice = filter_candidates(&once, tab, term);
                assert_eq!(once, twice, "tab {:?} term {:?}", tab, term);
            }
        }
    }

    #[test]
    fn test_view_recomputes_on_each_input() {
        let mut view = CandidateView::new(sample());
        assert_eq!(ids(view.visible()), vec![1, 2, 3]);

        view.set_tab(Tab::Pending);
        assert_eq!(ids(view.visible()), vec![1, 3]);

        view.set_term("cy");
        assert_eq!(ids(view.visible()), vec![3]);

        view.set_candidates(vec![candidate(9, "Cyd Nox", false)]);
        assert_eq!(ids(view.visible()), vec![9]);
        assert_eq!(view.counts(), TabCounts { all: 1, shortlisted: 0, pending: 1 });
    }

    #[test]
    fn test_toggle_applies_server_echo() {
        let mut view = CandidateView::new(sample());
        let result = view.toggle_shortlist(1, |id, wanted| {
            assert_eq!(id, 1);
            assert!(wanted);
            Ok(true)
        });

        assert!(result.unwrap());
        assert!(view.get(1).unwrap().shortlisted);
        assert_eq!(view.get(1).unwrap().status.as_deref(), Some("shortlisted"));
        assert_eq!(view.counts().shortlisted, 2);
    }

    #[test]
    fn test_toggle_trusts_server_echo_over_request() {
        let mut view = CandidateView::new(sample());
        view.set_tab(Tab::Shortlisted);

        let echoed = view.toggle_shortlist(3, |_, wanted| {
            assert!(wanted);
            Ok(false)
        });

        assert!(!echoed.unwrap());
        assert!(!view.get(3).unwrap().shortlisted);
        assert_eq!(ids(view.visible()), vec![2]);
    }

    #[test]
    fn test_toggle_rolls_back_on_failure() {
        let mut view = CandidateView::new(sample());
        let err = view
            .toggle_shortlist(2, |_, _| {
                Err(ApiError::Api {
                    status: 404,
                    message: "Application not found".to_string(),
                })
            })
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(view.get(2).unwrap().shortlisted);
        assert_eq!(ids(view.visible()), vec![1, 2, 3]);
    }

    #[test]
    fn test_split_toggle_shows_flip_before_confirmation() {
        let mut view = CandidateView::new(sample());
        view.set_tab(Tab::Shortlisted);

        let (previous, wanted) = view.begin_toggle(3).unwrap();
        assert_eq!((previous, wanted), (false, true));
        assert_eq!(ids(view.visible()), vec![2, 3]);

        let err = view
            .finish_toggle(
                3,
                previous,
                Err(ApiError::Api {
                    status: 500,
                    message: "Server error: 500".to_string(),
                }),
            )
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(ids(view.visible()), vec![2]);
    }

    #[test]
    fn test_toggle_unknown_candidate() {
        let mut view = CandidateView::new(sample());
        let err = view.toggle_shortlist(42, |_, _| Ok(true)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_group_skills_orders_categories() {
        let skills = vec![
            skill("English", Some(SkillCategory::Language)),
            skill("Go", Some(SkillCategory::Technical)),
            skill("Juggling", None),
            skill("Rust", Some(SkillCategory::Technical)),
        ];
        let grouped = group_skills(&skills);
        let order: Vec<SkillCategory> = grouped.keys().map(|k| k.0).collect();
        assert_eq!(
            order,
            vec![SkillCategory::Technical, SkillCategory::Language, SkillCategory::Other]
        );
        let technical = &grouped[&SkillCategoryKey(SkillCategory::Technical)];
        assert_eq!(technical.len(), 2);
    }

    #[test]
    fn test_formatting_helpers() {
        assert_eq!(format_score(0.824), "82%");
        assert_eq!(format_score(0.0), "0%");
        assert_eq!(
            split_skills(Some("Python, SQL,, Docker ,")),
            vec!["Python", "SQL", "Docker"]
        );
        assert!(split_skills(None).is_empty());
        assert_eq!(format_date(Some("2024-03-01 10:00:00")), "Mar 1, 2024");
        assert_eq!(format_date(Some("2024-12-25")), "Dec 25, 2024");
        assert_eq!(format_date(Some("soon")), "soon");
        assert_eq!(format_date(None), "N/A");
    }
}
