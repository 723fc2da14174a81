//! GitHub REST (v3) endpoints used by the harvester

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::github::error::GitHubResult;
use crate::github::fetch::ApiClient;
use crate::github::paginate::{Page, PageSource};
use crate::github::transport::{ApiRequest, ApiResponse, Transport};

/// Envelope of every `/search/*` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage<T> {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// Repository fields read from `/repos/{owner}/{repo}` and repository search
#[derive(Debug, Clone, Deserialize)]
pub struct RestRepository {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub open_issues_count: u64,
}

/// Parsed RFC 8288 `Link` header, as GitHub sends it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkHeader {
    pub next: Option<String>,
    pub last: Option<String>,
}

impl LinkHeader {
    pub fn parse(value: &str) -> Self {
        lazy_static! {
            static ref LINK_RE: Result<Regex, regex::Error> =
                Regex::new(r#"<([^>]+)>\s*;\s*rel="([^"]+)""#);
        }

        let mut header = Self::default();
        let Ok(link_re) = LINK_RE.as_ref() else {
            return header;
        };

        for caps in link_re.captures_iter(value) {
            let url = caps[1].to_string();
            match &caps[2] {
                "next" => header.next = Some(url),
                "last" => header.last = Some(url),
                _ => {}
            }
        }
        header
    }

    pub fn next_page(&self) -> Option<u32> {
        self.next.as_deref().and_then(page_param)
    }

    pub fn last_page(&self) -> Option<u32> {
        self.last.as_deref().and_then(page_param)
    }
}

/// `page=N` query parameter of a GitHub pagination URL
fn page_param(url: &str) -> Option<u32> {
    lazy_static! {
        static ref PAGE_RE: Result<Regex, regex::Error> = Regex::new(r"[?&]page=(\d+)");
    }

    PAGE_RE
        .as_ref()
        .ok()?
        .captures(url)
        .and_then(|caps| caps[1].parse().ok())
}

fn link_of(response: &ApiResponse) -> LinkHeader {
    response
        .headers
        .link
        .as_deref()
        .map(LinkHeader::parse)
        .unwrap_or_default()
}

fn repo_path(owner: &str, name: &str) -> String {
    format!(
        "/repos/{}/{}",
        urlencoding::encode(owner),
        urlencoding::encode(name)
    )
}

/// One page of repository search results sorted by stars, descending.
pub async fn search_repositories_page<T: Transport>(
    client: &ApiClient<T>,
    query: &str,
    page: u32,
    per_page: u8,
) -> GitHubResult<(SearchPage<RestRepository>, LinkHeader)> {
    let request = ApiRequest::get(client.rest_url("/search/repositories"))
        .query("q", query)
        .query("sort", "stars")
        .query("order", "desc")
        .query("per_page", per_page)
        .query("page", page);
    let response = client.execute(request).await?;
    Ok((response.json()?, link_of(&response)))
}

/// Page-numbered REST repository search; the cursor is the page number.
pub struct RepositorySearch<'a, T> {
    client: &'a ApiClient<T>,
    query: String,
    per_page: u8,
}

impl<'a, T: Transport> RepositorySearch<'a, T> {
    pub fn new(client: &'a ApiClient<T>, query: impl Into<String>, per_page: u8) -> Self {
        Self {
            client,
            query: query.into(),
            per_page,
        }
    }
}

impl<T: Transport> PageSource for RepositorySearch<'_, T> {
    type Item = RestRepository;

    async fn fetch(&mut self, cursor: Option<String>) -> Page<RestRepository> {
        let page = cursor.and_then(|c| c.parse().ok()).unwrap_or(1);
        match search_repositories_page(self.client, &self.query, page, self.per_page).await {
            Ok((results, link)) => {
                Page::new(results.items, link.next_page().map(|p| p.to_string()))
            }
            Err(e) => Page::stop(e),
        }
    }
}

/// Full repository details
pub async fn get_repository<T: Transport>(
    client: &ApiClient<T>,
    owner: &str,
    name: &str,
) -> GitHubResult<RestRepository> {
    let request = ApiRequest::get(client.rest_url(&repo_path(owner, name)));
    Ok(client.execute(request).await?.json()?)
}

/// `total_count` of an issue/PR search, fetching a single result.
pub async fn search_total_count<T: Transport>(
    client: &ApiClient<T>,
    query: &str,
) -> GitHubResult<u64> {
    let request = ApiRequest::get(client.rest_url("/search/issues"))
        .query("q", query)
        .query("per_page", 1);
    let page: SearchPage<serde_json::Value> = client.execute(request).await?.json()?;
    Ok(page.total_count)
}

/// Exact number of releases.
///
/// A single page is counted directly; otherwise the last page is fetched and
/// the count is `(last - 1) * 100 + len(last page)`.
pub async fn count_releases<T: Transport>(
    client: &ApiClient<T>,
    owner: &str,
    name: &str,
) -> GitHubResult<u64> {
    const PER_PAGE: u64 = 100;
    let url = client.rest_url(&format!("{}/releases", repo_path(owner, name)));

    let first = client
        .execute(ApiRequest::get(url.clone()).query("per_page", PER_PAGE))
        .await?;
    let first_items: Vec<serde_json::Value> = first.json()?;

    let last_page = match link_of(&first).last_page() {
        Some(last) if last > 1 => last,
        _ => return Ok(first_items.len() as u64),
    };

    let last = client
        .execute(
            ApiRequest::get(url)
                .query("per_page", PER_PAGE)
                .query("page", last_page),
        )
        .await?;
    let last_items: Vec<serde_json::Value> = last.json()?;
    Ok(u64::from(last_page - 1) * PER_PAGE + last_items.len() as u64)
}
