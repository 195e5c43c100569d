//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{Comment, MergeabilityState, PullRequestSnapshot, Review, ReviewState};
use async_trait::async_trait;
use octocrab::Octocrab;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Timeout for raw HTTP requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const GITHUB_ACCEPT_HEADER: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const PULLS_PER_PAGE: u8 = 100;
const COMMENTS_PER_PAGE: u8 = 50;

/// GitHub service using octocrab
///
/// Listing and issue operations go through octocrab. Mergeability and the
/// three fatal-class mutations (approve, update branch, merge) use raw
/// requests so the exact status code and response body can be reported.
pub struct GitHubService {
    client: Octocrab,
    /// Repository owner (user or organization)
    owner: String,
    /// Token for raw HTTP requests
    token: String,
    /// HTTP client for raw requests
    http_client: Client,
    /// API root, always ending in `/`
    api_base: Url,
}

impl GitHubService {
    /// Create a new GitHub service
    ///
    /// `host` selects a GitHub Enterprise instance; `None` means github.com.
    pub fn new(token: &str, owner: String, host: Option<&str>) -> Result<Self> {
        let api_base = host.map_or_else(
            || "https://api.github.com/".to_string(),
            |h| format!("https://{h}/api/v3/"),
        );
        Self::with_api_base(token, owner, &api_base)
    }

    /// Create a service against an explicit API root URL
    pub fn with_api_base(token: &str, owner: String, api_base: &str) -> Result<Self> {
        let mut api_base = Url::parse(api_base)
            .map_err(|e| Error::Config(format!("invalid API URL {api_base}: {e}")))?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(api_base.as_str())
            .map_err(|e| Error::GitHubApi(e.to_string()))?
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent("automerge-bot")
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            owner,
            token: token.to_string(),
            http_client,
            api_base,
        })
    }

    /// URL of a pulls endpoint, e.g. `repos/{owner}/{repo}/pulls/{n}/merge`
    fn pull_url(&self, pr: &PullRequestSnapshot, suffix: &str) -> Result<Url> {
        let path = format!(
            "repos/{}/{}/pulls/{}{suffix}",
            urlencoding::encode(&self.owner),
            urlencoding::encode(&pr.repo),
            pr.number
        );
        self.api_base
            .join(&path)
            .map_err(|e| Error::GitHubApi(format!("invalid URL for {pr}: {e}")))
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut request = self
            .http_client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", GITHUB_ACCEPT_HEADER)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION);

        if let Some(body) = body {
            request = request.json(&body);
        }

        request.send().await
    }

    /// Send a mutating request whose failure must abort the run
    async fn send_required(
        &self,
        action: &'static str,
        pr: &PullRequestSnapshot,
        method: Method,
        url: Url,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Result<()> {
        let response = self
            .send(method, url, body)
            .await
            .map_err(|e| Error::ActionFailed {
                action,
                pr: pr.to_string(),
                status: "transport".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status != expected {
            let reason = response.text().await.unwrap_or_default();
            return Err(Error::ActionFailed {
                action,
                pr: pr.to_string(),
                status: status.to_string(),
                reason,
            });
        }

        Ok(())
    }
}

fn snapshot_from_octocrab(
    repo: &str,
    pr: &octocrab::models::pulls::PullRequest,
) -> PullRequestSnapshot {
    PullRequestSnapshot {
        repo: repo.to_string(),
        number: pr.number,
        title: pr.title.as_deref().unwrap_or_default().to_string(),
        html_url: pr
            .html_url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
    }
}

fn comment_from_octocrab(comment: &octocrab::models::issues::Comment) -> Comment {
    Comment {
        id: comment.id.0,
        body: comment.body.clone().unwrap_or_default(),
        author: comment.user.login.clone(),
    }
}

fn review_from_octocrab(review: &octocrab::models::pulls::Review) -> Option<Review> {
    use octocrab::models::pulls::ReviewState as Octo;

    let state = match review.state.as_ref()? {
        Octo::Approved => ReviewState::Approved,
        Octo::Dismissed => ReviewState::Dismissed,
        Octo::ChangesRequested => ReviewState::ChangesRequested,
        Octo::Commented => ReviewState::Commented,
        // ReviewState is non-exhaustive; anything new counts as not approved
        _ => ReviewState::Pending,
    };

    Some(Review {
        id: review.id.0,
        state,
        author: review
            .user
            .as_ref()
            .map(|u| u.login.clone())
            .unwrap_or_default(),
    })
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn list_open_pull_requests(&self, repo: &str) -> Result<Vec<PullRequestSnapshot>> {
        debug!(repo, "listing open PRs");
        let page = self
            .client
            .pulls(&self.owner, repo)
            .list()
            .state(octocrab::params::State::Open)
            .per_page(PULLS_PER_PAGE)
            .send()
            .await?;

        let prs = self.client.all_pages(page).await?;
        debug!(repo, count = prs.len(), "listed open PRs");
        Ok(prs.iter().map(|pr| snapshot_from_octocrab(repo, pr)).collect())
    }

    async fn latest_comment(&self, pr: &PullRequestSnapshot) -> Result<Option<Comment>> {
        debug!(repo = %pr.repo, pr = pr.number, "fetching latest comment");
        let first = self
            .client
            .issues(&self.owner, &pr.repo)
            .list_comments(pr.number)
            .per_page(COMMENTS_PER_PAGE)
            .send()
            .await?;

        // More than one page: the newest comment is at the end of the last one
        if first.last.is_some() {
            match self
                .client
                .get_page::<octocrab::models::issues::Comment>(&first.last)
                .await
            {
                Ok(Some(last_page)) => {
                    if let Some(comment) = last_page.items.last() {
                        return Ok(Some(comment_from_octocrab(comment)));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        repo = %pr.repo,
                        pr = pr.number,
                        error = %e,
                        "failed to fetch last comment page, falling back to first page"
                    );
                }
            }
        }

        Ok(first.items.last().map(comment_from_octocrab))
    }

    async fn list_reviews(&self, pr: &PullRequestSnapshot) -> Result<Vec<Review>> {
        debug!(repo = %pr.repo, pr = pr.number, "listing reviews");
        let page = self
            .client
            .pulls(&self.owner, &pr.repo)
            .list_reviews(pr.number)
            .send()
            .await?;

        let reviews = self.client.all_pages(page).await?;
        Ok(reviews.iter().filter_map(review_from_octocrab).collect())
    }

    async fn mergeable_state(&self, pr: &PullRequestSnapshot) -> Result<MergeabilityState> {
        #[derive(Deserialize)]
        struct PullMergeability {
            mergeable_state: Option<String>,
        }

        let url = self.pull_url(pr, "")?;
        let response = self
            .send(Method::GET, url, None)
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to get info for {pr}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::GitHubApi(format!(
                "Failed to get info for {pr}: status {}",
                response.status()
            )));
        }

        let pull: PullMergeability = response
            .json()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to parse {pr}: {e}")))?;

        let state = MergeabilityState::from_api(pull.mergeable_state.as_deref());
        debug!(repo = %pr.repo, pr = pr.number, %state, "fetched mergeable state");
        Ok(state)
    }

    async fn approve(&self, pr: &PullRequestSnapshot) -> Result<()> {
        debug!(repo = %pr.repo, pr = pr.number, "approving PR");
        let url = self.pull_url(pr, "/reviews")?;
        self.send_required(
            "approve",
            pr,
            Method::POST,
            url,
            Some(json!({ "event": "APPROVE" })),
            StatusCode::OK,
        )
        .await
    }

    async fn update_branch(&self, pr: &PullRequestSnapshot) -> Result<()> {
        debug!(repo = %pr.repo, pr = pr.number, "updating branch");
        let url = self.pull_url(pr, "/update-branch")?;
        self.send_required(
            "update branch of",
            pr,
            Method::PUT,
            url,
            None,
            StatusCode::ACCEPTED,
        )
        .await
    }

    async fn merge(&self, pr: &PullRequestSnapshot) -> Result<()> {
        debug!(repo = %pr.repo, pr = pr.number, "merging PR");
        let url = self.pull_url(pr, "/merge")?;
        self.send_required(
            "merge",
            pr,
            Method::PUT,
            url,
            Some(json!({ "merge_method": "squash" })),
            StatusCode::OK,
        )
        .await
    }

    async fn post_comment(&self, pr: &PullRequestSnapshot, body: &str) -> Result<()> {
        debug!(repo = %pr.repo, pr = pr.number, body, "creating PR comment");
        self.client
            .issues(&self.owner, &pr.repo)
            .create_comment(pr.number, body)
            .await?;
        Ok(())
    }

    async fn apply_label(&self, pr: &PullRequestSnapshot, label: &str) -> Result<()> {
        debug!(repo = %pr.repo, pr = pr.number, label, "adding label");
        self.client
            .issues(&self.owner, &pr.repo)
            .add_labels(pr.number, &[label.to_string()])
            .await?;
        Ok(())
    }

    async fn close(&self, pr: &PullRequestSnapshot) -> Result<()> {
        debug!(repo = %pr.repo, pr = pr.number, "closing PR");
        self.client
            .issues(&self.owner, &pr.repo)
            .update(pr.number)
            .state(octocrab::models::IssueState::Closed)
            .send()
            .await?;
        Ok(())
    }
}
