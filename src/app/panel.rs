use crate::github::{Branch, CommitDetail, CommitSummary, GitHubClient, Repo};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PanelLevel {
    Repos,
    Branches,
    Commits,
    Detail,
}

/// One GitHub request the panel wants made. Runs off the UI thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PanelFetch {
    Repos {
        owner: String,
    },
    Branches {
        owner: String,
        repo: String,
    },
    Commits {
        owner: String,
        repo: String,
        branch: String,
    },
    Detail {
        owner: String,
        repo: String,
        sha: String,
    },
}

#[derive(Debug)]
pub(crate) enum PanelEvent {
    Repos {
        owner: String,
        result: Result<Vec<Repo>, String>,
    },
    Branches {
        owner: String,
        repo: String,
        result: Result<Vec<Branch>, String>,
    },
    Commits {
        repo: String,
        branch: String,
        result: Result<Vec<CommitSummary>, String>,
    },
    Detail {
        sha: String,
        result: Result<CommitDetail, String>,
    },
}

fn flatten<T>(what: &str, result: anyhow::Result<T>) -> Result<T, String> {
    result.map_err(|err| {
        tracing::warn!(error = %format!("{err:#}"), "github {what} fetch failed");
        format!("{err:#}")
    })
}

impl PanelFetch {
    /// The response for a fetch that could not be sent at all.
    pub(crate) fn fail(self, reason: &str) -> PanelEvent {
        match self {
            PanelFetch::Repos { owner } => PanelEvent::Repos {
                owner,
                result: Err(reason.to_string()),
            },
            PanelFetch::Branches { owner, repo } => PanelEvent::Branches {
                owner,
                repo,
                result: Err(reason.to_string()),
            },
            PanelFetch::Commits { repo, branch, .. } => PanelEvent::Commits {
                repo,
                branch,
                result: Err(reason.to_string()),
            },
            PanelFetch::Detail { sha, .. } => PanelEvent::Detail {
                sha,
                result: Err(reason.to_string()),
            },
        }
    }

    pub(crate) fn run(self, client: &GitHubClient) -> PanelEvent {
        match self {
            PanelFetch::Repos { owner } => {
                let result = flatten("repos", client.list_repos(&owner));
                PanelEvent::Repos { owner, result }
            }
            PanelFetch::Branches { owner, repo } => {
                let result = flatten("branches", client.list_branches(&owner, &repo));
                PanelEvent::Branches {
                    owner,
                    repo,
                    result,
                }
            }
            PanelFetch::Commits {
                owner,
                repo,
                branch,
            } => {
                let result = flatten("commits", client.list_commits(&owner, &repo, &branch));
                PanelEvent::Commits {
                    repo,
                    branch,
                    result,
                }
            }
            PanelFetch::Detail { owner, repo, sha } => {
                let result = flatten("commit detail", client.commit_detail(&owner, &repo, &sha));
                PanelEvent::Detail { sha, result }
            }
        }
    }
}

/// Read-only repository browser: owner, repos, branches, commits, detail.
/// Choosing something at one level empties every level below it.
#[derive(Debug)]
pub(crate) struct GitHubPanel {
    owner: String,
    repos: Vec<Repo>,
    selected_repo: Option<String>,
    branches: Vec<Branch>,
    selected_branch: Option<String>,
    commits: Vec<CommitSummary>,
    selected_commit: Option<String>,
    detail: Option<CommitDetail>,

    level: PanelLevel,
    cursor: usize,
    detail_scroll: u16,
    loading: usize,
    last_error: Option<String>,
}

impl GitHubPanel {
    pub(crate) fn new(owner: impl Into<String>, repo: Option<String>) -> Self {
        Self {
            owner: owner.into(),
            repos: Vec::new(),
            selected_repo: repo,
            branches: Vec::new(),
            selected_branch: None,
            commits: Vec::new(),
            selected_commit: None,
            detail: None,
            level: PanelLevel::Repos,
            cursor: 0,
            detail_scroll: 0,
            loading: 0,
            last_error: None,
        }
    }

    pub(crate) fn owner(&self) -> &str {
        &self.owner
    }

    pub(crate) fn repos(&self) -> &[Repo] {
        &self.repos
    }

    pub(crate) fn selected_repo(&self) -> Option<&str> {
        self.selected_repo.as_deref()
    }

    pub(crate) fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub(crate) fn selected_branch(&self) -> Option<&str> {
        self.selected_branch.as_deref()
    }

    pub(crate) fn commits(&self) -> &[CommitSummary] {
        &self.commits
    }

    pub(crate) fn detail(&self) -> Option<&CommitDetail> {
        self.detail.as_ref()
    }

    pub(crate) fn level(&self) -> PanelLevel {
        self.level
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn detail_scroll(&self) -> u16 {
        self.detail_scroll
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading > 0
    }

    pub(crate) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Initial fetches: the owner's repos and, when a repo is preselected,
    /// its branches.
    pub(crate) fn start(&mut self) -> Vec<PanelFetch> {
        if self.owner.is_empty() {
            return Vec::new();
        }
        let mut fetches = vec![self.fetch_repos()];
        if let Some(repo) = self.selected_repo.clone() {
            self.level = PanelLevel::Branches;
            fetches.push(self.fetch_branches(repo));
        }
        fetches
    }

    pub(crate) fn set_owner(&mut self, owner: &str) -> Option<PanelFetch> {
        self.owner = owner.trim().to_string();
        self.repos.clear();
        self.selected_repo = None;
        self.clear_below_repo();
        self.level = PanelLevel::Repos;
        self.cursor = 0;
        self.last_error = None;
        if self.owner.is_empty() {
            return None;
        }
        Some(self.fetch_repos())
    }

    pub(crate) fn select_repo(&mut self, name: &str) -> PanelFetch {
        self.selected_repo = Some(name.to_string());
        self.clear_below_repo();
        self.enter(PanelLevel::Branches);
        self.fetch_branches(name.to_string())
    }

    pub(crate) fn select_branch(&mut self, name: &str) -> Option<PanelFetch> {
        let repo = self.selected_repo.clone()?;
        self.selected_branch = Some(name.to_string());
        self.clear_below_branch();
        self.enter(PanelLevel::Commits);
        self.loading += 1;
        Some(PanelFetch::Commits {
            owner: self.owner.clone(),
            repo,
            branch: name.to_string(),
        })
    }

    pub(crate) fn select_commit(&mut self, sha: &str) -> Option<PanelFetch> {
        let repo = self.selected_repo.clone()?;
        self.selected_commit = Some(sha.to_string());
        self.detail = None;
        self.enter(PanelLevel::Detail);
        self.loading += 1;
        Some(PanelFetch::Detail {
            owner: self.owner.clone(),
            repo,
            sha: sha.to_string(),
        })
    }

    /// Opens whatever the cursor points at on the current level.
    pub(crate) fn activate(&mut self) -> Option<PanelFetch> {
        match self.level {
            PanelLevel::Repos => {
                let name = self.repos.get(self.cursor)?.name.clone();
                Some(self.select_repo(&name))
            }
            PanelLevel::Branches => {
                let name = self.branches.get(self.cursor)?.name.clone();
                self.select_branch(&name)
            }
            PanelLevel::Commits => {
                let sha = self.commits.get(self.cursor)?.sha.clone();
                self.select_commit(&sha)
            }
            PanelLevel::Detail => None,
        }
    }

    /// Steps the view up one level. Loaded data stays.
    pub(crate) fn back(&mut self) {
        let (level, cursor) = match self.level {
            PanelLevel::Repos => return,
            PanelLevel::Branches => (PanelLevel::Repos, self.position_of_repo()),
            PanelLevel::Commits => (PanelLevel::Branches, self.position_of_branch()),
            PanelLevel::Detail => (PanelLevel::Commits, self.position_of_commit()),
        };
        self.level = level;
        self.cursor = cursor;
    }

    pub(crate) fn move_cursor(&mut self, delta: isize) {
        if self.level == PanelLevel::Detail {
            self.detail_scroll = if delta < 0 {
                self.detail_scroll.saturating_sub(delta.unsigned_abs() as u16)
            } else {
                self.detail_scroll.saturating_add(delta as u16)
            };
            return;
        }
        let len = self.level_len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, len as isize - 1) as usize;
    }

    /// Applies a finished fetch. Every dispatched fetch reports back exactly
    /// once, so each response settles one in-flight count even when it is
    /// dropped for belonging to a selection that has since changed.
    pub(crate) fn apply(&mut self, event: PanelEvent) {
        self.finish_loading();
        match event {
            PanelEvent::Repos { owner, result } => {
                if owner != self.owner {
                    return;
                }
                match result {
                    Ok(mut repos) => {
                        repos.dedup_by_key(|r| r.id);
                        self.repos = repos;
                        let keep = self
                            .selected_repo
                            .as_ref()
                            .is_some_and(|name| self.repos.iter().any(|r| &r.name == name));
                        if !keep {
                            self.selected_repo = None;
                            self.clear_below_repo();
                            self.level = PanelLevel::Repos;
                        }
                        self.clamp_cursor();
                    }
                    Err(err) => {
                        self.repos.clear();
                        self.selected_repo = None;
                        self.clear_below_repo();
                        self.level = PanelLevel::Repos;
                        self.cursor = 0;
                        self.last_error = Some(err);
                    }
                }
            }
            PanelEvent::Branches {
                owner,
                repo,
                result,
            } => {
                if owner != self.owner || self.selected_repo.as_deref() != Some(repo.as_str()) {
                    return;
                }
                self.clear_below_repo();
                match result {
                    Ok(branches) => self.branches = branches,
                    Err(err) => self.last_error = Some(err),
                }
                self.clamp_cursor();
            }
            PanelEvent::Commits {
                repo,
                branch,
                result,
            } => {
                if self.selected_repo.as_deref() != Some(repo.as_str())
                    || self.selected_branch.as_deref() != Some(branch.as_str())
                {
                    return;
                }
                match result {
                    Ok(commits) => self.commits = commits,
                    Err(err) => {
                        self.commits.clear();
                        self.last_error = Some(err);
                    }
                }
                self.clamp_cursor();
            }
            PanelEvent::Detail { sha, result } => {
                if self.selected_commit.as_deref() != Some(sha.as_str()) {
                    return;
                }
                match result {
                    Ok(detail) => self.detail = Some(detail),
                    Err(err) => {
                        self.detail = None;
                        self.last_error = Some(err);
                    }
                }
            }
        }
    }

    fn fetch_repos(&mut self) -> PanelFetch {
        self.loading += 1;
        PanelFetch::Repos {
            owner: self.owner.clone(),
        }
    }

    fn fetch_branches(&mut self, repo: String) -> PanelFetch {
        self.loading += 1;
        PanelFetch::Branches {
            owner: self.owner.clone(),
            repo,
        }
    }

    fn enter(&mut self, level: PanelLevel) {
        self.level = level;
        self.cursor = 0;
        self.detail_scroll = 0;
        self.last_error = None;
    }

    fn finish_loading(&mut self) {
        self.loading = self.loading.saturating_sub(1);
    }

    fn clear_below_repo(&mut self) {
        self.branches.clear();
        self.selected_branch = None;
        self.clear_below_branch();
    }

    fn clear_below_branch(&mut self) {
        self.commits.clear();
        self.selected_commit = None;
        self.detail = None;
    }

    fn level_len(&self) -> usize {
        match self.level {
            PanelLevel::Repos => self.repos.len(),
            PanelLevel::Branches => self.branches.len(),
            PanelLevel::Commits => self.commits.len(),
            PanelLevel::Detail => 0,
        }
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.level_len().saturating_sub(1));
    }

    fn position_of_repo(&self) -> usize {
        self.selected_repo
            .as_ref()
            .and_then(|name| self.repos.iter().position(|r| &r.name == name))
            .unwrap_or(0)
    }

    fn position_of_branch(&self) -> usize {
        self.selected_branch
            .as_ref()
            .and_then(|name| self.branches.iter().position(|b| &b.name == name))
            .unwrap_or(0)
    }

    fn position_of_commit(&self) -> usize {
        self.selected_commit
            .as_ref()
            .and_then(|sha| self.commits.iter().position(|c| &c.sha == sha))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: u64, name: &str) -> Repo {
        Repo {
            id,
            name: name.to_string(),
        }
    }

    fn branch(name: &str) -> Branch {
        Branch {
            name: name.to_string(),
            commit_sha: format!("{name}-head"),
        }
    }

    fn commit(sha: &str) -> CommitSummary {
        CommitSummary {
            sha: sha.to_string(),
            message: format!("commit {sha}"),
            author: "Mint".to_string(),
            date: String::new(),
        }
    }

    fn detail(message: &str) -> CommitDetail {
        CommitDetail {
            message: message.to_string(),
            body: message.to_string(),
            author: "Mint".to_string(),
            date: String::new(),
            files: Vec::new(),
        }
    }

    fn loaded_panel() -> GitHubPanel {
        let mut panel = GitHubPanel::new("MintSoda07", None);
        panel.start();
        panel.apply(PanelEvent::Repos {
            owner: "MintSoda07".to_string(),
            result: Ok(vec![repo(1, "foodtable"), repo(2, "dotfiles")]),
        });
        panel
    }

    #[test]
    fn start_fetches_repos_and_preselected_branches() {
        let mut panel = GitHubPanel::new("MintSoda07", Some("foodtable".to_string()));
        let fetches = panel.start();

        assert_eq!(
            fetches,
            vec![
                PanelFetch::Repos {
                    owner: "MintSoda07".to_string()
                },
                PanelFetch::Branches {
                    owner: "MintSoda07".to_string(),
                    repo: "foodtable".to_string()
                },
            ]
        );
        assert_eq!(panel.level(), PanelLevel::Branches);
        assert!(panel.is_loading());
    }

    #[test]
    fn preselected_repo_survives_when_listed() {
        let mut panel = GitHubPanel::new("MintSoda07", Some("foodtable".to_string()));
        panel.start();
        panel.apply(PanelEvent::Branches {
            owner: "MintSoda07".to_string(),
            repo: "foodtable".to_string(),
            result: Ok(vec![branch("main")]),
        });
        panel.apply(PanelEvent::Repos {
            owner: "MintSoda07".to_string(),
            result: Ok(vec![repo(1, "foodtable")]),
        });

        assert_eq!(panel.selected_repo(), Some("foodtable"));
        assert_eq!(panel.branches().len(), 1);
        assert!(!panel.is_loading());
    }

    #[test]
    fn preselected_repo_is_dropped_when_missing() {
        let mut panel = GitHubPanel::new("MintSoda07", Some("gone".to_string()));
        panel.start();
        panel.apply(PanelEvent::Repos {
            owner: "MintSoda07".to_string(),
            result: Ok(vec![repo(1, "foodtable")]),
        });

        assert_eq!(panel.selected_repo(), None);
        assert_eq!(panel.level(), PanelLevel::Repos);
    }

    #[test]
    fn activating_walks_down_and_resets_lower_levels() {
        let mut panel = loaded_panel();

        let fetch = panel.activate().expect("branch fetch");
        assert_eq!(
            fetch,
            PanelFetch::Branches {
                owner: "MintSoda07".to_string(),
                repo: "foodtable".to_string()
            }
        );
        panel.apply(PanelEvent::Branches {
            owner: "MintSoda07".to_string(),
            repo: "foodtable".to_string(),
            result: Ok(vec![branch("main"), branch("dev")]),
        });

        panel.move_cursor(1);
        let fetch = panel.activate().expect("commit fetch");
        assert!(matches!(fetch, PanelFetch::Commits { ref branch, .. } if branch == "dev"));
        panel.apply(PanelEvent::Commits {
            repo: "foodtable".to_string(),
            branch: "dev".to_string(),
            result: Ok(vec![commit("a1"), commit("b2")]),
        });

        let fetch = panel.activate().expect("detail fetch");
        assert!(matches!(fetch, PanelFetch::Detail { ref sha, .. } if sha == "a1"));
        panel.apply(PanelEvent::Detail {
            sha: "a1".to_string(),
            result: Ok(detail("commit a1")),
        });
        assert_eq!(panel.level(), PanelLevel::Detail);
        assert!(panel.detail().is_some());

        panel.back();
        panel.back();
        assert_eq!(panel.level(), PanelLevel::Branches);
        assert_eq!(panel.cursor(), 1);
        panel.activate();
        assert!(panel.commits().is_empty());
        assert!(panel.detail().is_none());
    }

    #[test]
    fn stale_branch_response_is_ignored() {
        let mut panel = loaded_panel();
        panel.select_repo("foodtable");
        panel.select_repo("dotfiles");

        panel.apply(PanelEvent::Branches {
            owner: "MintSoda07".to_string(),
            repo: "foodtable".to_string(),
            result: Ok(vec![branch("main")]),
        });

        assert!(panel.branches().is_empty());
        assert_eq!(panel.selected_repo(), Some("dotfiles"));
    }

    #[test]
    fn superseded_responses_still_settle_loading() {
        let mut panel = loaded_panel();
        panel.select_repo("foodtable");
        panel.select_repo("dotfiles");
        assert!(panel.is_loading());

        for name in ["foodtable", "dotfiles"] {
            panel.apply(PanelEvent::Branches {
                owner: "MintSoda07".to_string(),
                repo: name.to_string(),
                result: Ok(vec![branch("main")]),
            });
        }

        assert!(!panel.is_loading());
        assert_eq!(panel.branches().len(), 1);
    }

    #[test]
    fn owner_switch_settles_the_old_owners_fetch() {
        let mut panel = GitHubPanel::new("MintSoda07", None);
        panel.start();
        panel.set_owner("octocat");

        for owner in ["MintSoda07", "octocat"] {
            panel.apply(PanelEvent::Repos {
                owner: owner.to_string(),
                result: Ok(vec![repo(1, "hello-world")]),
            });
        }

        assert!(!panel.is_loading());
        assert_eq!(panel.repos().len(), 1);
    }

    #[test]
    fn unsent_fetch_reports_as_failure() {
        let mut panel = loaded_panel();
        let fetch = panel.select_repo("foodtable");
        panel.apply(fetch.fail("offline"));

        assert!(!panel.is_loading());
        assert_eq!(panel.selected_repo(), Some("foodtable"));
        assert_eq!(panel.last_error(), Some("offline"));
    }

    #[test]
    fn repo_failure_clears_repo_selection() {
        let mut panel = GitHubPanel::new("MintSoda07", Some("foodtable".to_string()));
        panel.start();
        panel.apply(PanelEvent::Repos {
            owner: "MintSoda07".to_string(),
            result: Err("GET /users/MintSoda07/repos returned 403".to_string()),
        });

        assert!(panel.repos().is_empty());
        assert_eq!(panel.selected_repo(), None);
        assert_eq!(panel.level(), PanelLevel::Repos);
        assert!(panel.last_error().is_some_and(|e| e.contains("403")));
    }

    #[test]
    fn detail_failure_clears_detail() {
        let mut panel = loaded_panel();
        panel.select_repo("foodtable");
        panel.select_branch("main");
        panel.select_commit("a1");
        panel.apply(PanelEvent::Detail {
            sha: "a1".to_string(),
            result: Err("timeout".to_string()),
        });

        assert!(panel.detail().is_none());
        assert_eq!(panel.last_error(), Some("timeout"));
    }

    #[test]
    fn owner_change_resets_everything() {
        let mut panel = loaded_panel();
        panel.select_repo("foodtable");

        let fetch = panel.set_owner("  octocat ");

        assert_eq!(
            fetch,
            Some(PanelFetch::Repos {
                owner: "octocat".to_string()
            })
        );
        assert!(panel.repos().is_empty());
        assert_eq!(panel.selected_repo(), None);
        assert!(panel.branches().is_empty());

        panel.apply(PanelEvent::Repos {
            owner: "MintSoda07".to_string(),
            result: Ok(vec![repo(1, "foodtable")]),
        });
        assert!(panel.repos().is_empty());
    }

    #[test]
    fn empty_owner_fetches_nothing() {
        let mut panel = loaded_panel();
        assert_eq!(panel.set_owner("   "), None);
        assert!(panel.start().is_empty());
    }

    #[test]
    fn cursor_stays_inside_the_list() {
        let mut panel = loaded_panel();
        panel.move_cursor(10);
        assert_eq!(panel.cursor(), 1);
        panel.move_cursor(-10);
        assert_eq!(panel.cursor(), 0);
    }
}
