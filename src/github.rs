use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::format::format_timestamp;

const USER_AGENT: &str = concat!("chattograph/", env!("CARGO_PKG_VERSION"));
const LIST_PER_PAGE: u32 = 100;
const COMMITS_PER_PAGE: u32 = 30;
const PATCH_PREVIEW_CHARS: usize = 300;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Repo {
    pub(crate) id: u64,
    pub(crate) name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Branch {
    pub(crate) name: String,
    pub(crate) commit_sha: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CommitSummary {
    pub(crate) sha: String,
    /// First line of the commit message.
    pub(crate) message: String,
    pub(crate) author: String,
    pub(crate) date: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CommitFile {
    pub(crate) filename: String,
    pub(crate) status: String,
    pub(crate) patch: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CommitDetail {
    pub(crate) message: String,
    pub(crate) body: String,
    pub(crate) author: String,
    pub(crate) date: String,
    pub(crate) files: Vec<CommitFile>,
}

#[derive(Debug, Deserialize)]
struct WireRepo {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireBranch {
    name: String,
    commit: WireBranchCommit,
}

#[derive(Debug, Deserialize)]
struct WireBranchCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WireCommit {
    sha: String,
    commit: WireCommitBody,
    #[serde(default)]
    files: Option<Vec<WireFile>>,
}

#[derive(Debug, Deserialize)]
struct WireCommitBody {
    message: String,
    author: Option<WireAuthor>,
}

#[derive(Debug, Deserialize)]
struct WireAuthor {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct WireFile {
    filename: String,
    status: String,
    patch: Option<String>,
}

fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().to_string()
}

fn author_fields(author: Option<WireAuthor>) -> (String, String) {
    let Some(author) = author else {
        return (String::new(), String::new());
    };
    let date = author
        .date
        .map(|at| format_timestamp(&at.with_timezone(&Local)))
        .unwrap_or_default();
    (author.name.unwrap_or_default(), date)
}

impl From<WireRepo> for Repo {
    fn from(wire: WireRepo) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
        }
    }
}

impl From<WireBranch> for Branch {
    fn from(wire: WireBranch) -> Self {
        Self {
            name: wire.name,
            commit_sha: wire.commit.sha,
        }
    }
}

impl From<WireCommit> for CommitSummary {
    fn from(wire: WireCommit) -> Self {
        let (author, date) = author_fields(wire.commit.author);
        Self {
            sha: wire.sha,
            message: first_line(&wire.commit.message),
            author,
            date,
        }
    }
}

impl From<WireCommit> for CommitDetail {
    fn from(wire: WireCommit) -> Self {
        let (author, date) = author_fields(wire.commit.author);
        Self {
            message: first_line(&wire.commit.message),
            body: wire.commit.message,
            author,
            date,
            files: wire
                .files
                .unwrap_or_default()
                .into_iter()
                .map(|f| CommitFile {
                    filename: f.filename,
                    status: f.status,
                    patch: f.patch,
                })
                .collect(),
        }
    }
}

/// First 300 characters of a patch, with `...` when cut.
pub(crate) fn patch_preview(patch: &str) -> String {
    let mut chars = patch.char_indices();
    match chars.nth(PATCH_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &patch[..cut]),
        None => patch.to_string(),
    }
}

/// Read-only GitHub REST client. Requests are unauthenticated.
#[derive(Clone)]
pub(crate) struct GitHubClient {
    http: reqwest::blocking::Client,
    api_base: String,
}

impl GitHubClient {
    pub(crate) fn new(api_base: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(20))
            .build()
            .context("build github http client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn get<T: DeserializeOwned>(&self, endpoint: Endpoint<'_>) -> Result<T> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}{}", self.api_base, endpoint.path()),
            endpoint.query(),
        )
        .with_context(|| format!("build url for {}", endpoint.path()))?;
        let response = self
            .http
            .get(url.clone())
            .header("Accept", "application/vnd.github+json")
            .send()
            .with_context(|| format!("GET {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url} returned {status}");
        }
        response
            .json::<T>()
            .with_context(|| format!("decode {url}"))
    }

    pub(crate) fn list_repos(&self, owner: &str) -> Result<Vec<Repo>> {
        let wire: Vec<WireRepo> = self.get(Endpoint::Repos { owner })?;
        Ok(wire.into_iter().map(Repo::from).collect())
    }

    pub(crate) fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>> {
        let wire: Vec<WireBranch> = self.get(Endpoint::Branches { owner, repo })?;
        Ok(wire.into_iter().map(Branch::from).collect())
    }

    pub(crate) fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<CommitSummary>> {
        let wire: Vec<WireCommit> = self.get(Endpoint::Commits {
            owner,
            repo,
            branch,
        })?;
        Ok(wire.into_iter().map(CommitSummary::from).collect())
    }

    pub(crate) fn commit_detail(&self, owner: &str, repo: &str, sha: &str) -> Result<CommitDetail> {
        let wire: WireCommit = self.get(Endpoint::Detail { owner, repo, sha })?;
        Ok(CommitDetail::from(wire))
    }
}

/// The REST routes the panel reads. List routes always ask for a full page.
#[derive(Clone, Copy, Debug)]
enum Endpoint<'a> {
    Repos {
        owner: &'a str,
    },
    Branches {
        owner: &'a str,
        repo: &'a str,
    },
    Commits {
        owner: &'a str,
        repo: &'a str,
        branch: &'a str,
    },
    Detail {
        owner: &'a str,
        repo: &'a str,
        sha: &'a str,
    },
}

impl Endpoint<'_> {
    fn path(&self) -> String {
        match self {
            Endpoint::Repos { owner } => format!("/users/{owner}/repos"),
            Endpoint::Branches { owner, repo } => format!("/repos/{owner}/{repo}/branches"),
            Endpoint::Commits { owner, repo, .. } => format!("/repos/{owner}/{repo}/commits"),
            Endpoint::Detail { owner, repo, sha } => {
                format!("/repos/{owner}/{repo}/commits/{sha}")
            }
        }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::Repos { .. } | Endpoint::Branches { .. } => {
                vec![("per_page", LIST_PER_PAGE.to_string())]
            }
            Endpoint::Commits { branch, .. } => vec![
                ("sha", branch.to_string()),
                ("per_page", COMMITS_PER_PAGE.to_string()),
            ],
            Endpoint::Detail { .. } => Vec::new(),
        }
    }
}
