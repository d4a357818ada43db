use lazy_static::lazy_static;
use regex::Regex;

use super::error::{ProjectError, ProjectResult};

/// Owner and repository name as they appear in a GitHub URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

/// Extracts `(owner, repo)` from anything containing `github.com/<owner>/<repo>`.
///
/// Accepted forms include `https://github.com/owner/repo`,
/// `https://github.com/owner/repo.git` and `github.com/owner/repo`.
/// Segments are taken verbatim; they are not checked against GitHub's naming rules.
pub fn parse_github_url(url: &str) -> ProjectResult<RepoRef> {
    lazy_static! {
        static ref GITHUB_REPO_RE: Regex = Regex::new(r"github\.com/([^/]+)/([^/]+)").unwrap();
    }

    let url = url.trim();
    let url = url.strip_suffix(".git").unwrap_or(url);

    let caps = GITHUB_REPO_RE
        .captures(url)
        .ok_or(ProjectError::InvalidUrlFormat)?;

    Ok(RepoRef {
        owner: caps[1].to_string(),
        repo: caps[2].to_string(),
    })
}
