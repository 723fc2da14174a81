//! GitHub GraphQL (v4) documents and response shapes

use chrono::{DateTime, Utc};
use log::warn;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;

use crate::github::error::{GitHubError, GitHubResult};
use crate::github::fetch::ApiClient;
use crate::github::paginate::{Page, PageSource};
use crate::github::transport::Transport;

/// Repository search ordered by GitHub's default relevance for `$q`.
pub const REPOSITORY_SEARCH_QUERY: &str = r#"
query($q: String!, $cursor: String) {
  search(query: $q, type: REPOSITORY, first: 100, after: $cursor) {
    pageInfo {
      hasNextPage
      endCursor
    }
    nodes {
      ... on Repository {
        name
        nameWithOwner
        owner {
          login
        }
        stargazerCount
        forkCount
        primaryLanguage {
          name
        }
        createdAt
        url
        pullRequests(states: [MERGED, CLOSED]) {
          totalCount
        }
      }
    }
  }
}
"#;

/// Closed and merged pull requests, most recently updated first.
pub const PULL_REQUESTS_QUERY: &str = r#"
query($owner: String!, $name: String!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(first: 100, after: $cursor, states: [MERGED, CLOSED], orderBy: {field: UPDATED_AT, direction: DESC}) {
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        number
        title
        state
        createdAt
        closedAt
        mergedAt
        additions
        deletions
        changedFiles
        commits {
          totalCount
        }
        reviews {
          totalCount
        }
        comments {
          totalCount
        }
        author {
          login
        }
      }
    }
  }
}
"#;

/// Standard `{ data, errors }` envelope
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<D> {
    pub data: Option<D>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

impl<D> GraphQlResponse<D> {
    /// `data`, unless the server reported errors or sent nothing.
    pub fn into_data(self) -> GitHubResult<D> {
        if !self.errors.is_empty() {
            let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(GitHubError::GraphQl(messages.join("; ")));
        }
        self.data
            .ok_or_else(|| GitHubError::GraphQl("response without data".to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// Cursor of the following page, if there is one
    pub fn next_cursor(&self) -> Option<String> {
        if self.has_next_page {
            self.end_cursor.clone()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub page_info: PageInfo,
    #[serde(default = "Vec::new")]
    pub nodes: Vec<Option<T>>,
}

impl<T> Connection<T> {
    fn into_page(self) -> Page<T> {
        let next = self.page_info.next_cursor();
        Page::new(self.nodes.into_iter().flatten().collect(), next)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Login {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

/// Repository as returned by [`REPOSITORY_SEARCH_QUERY`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name: String,
    pub name_with_owner: String,
    pub owner: Login,
    pub stargazer_count: u64,
    pub fork_count: u64,
    pub primary_language: Option<Named>,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub pull_requests: TotalCount,
}

/// Pull request as returned by [`PULL_REQUESTS_QUERY`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changed_files: u64,
    #[serde(default)]
    pub commits: TotalCount,
    #[serde(default)]
    pub reviews: TotalCount,
    #[serde(default)]
    pub comments: TotalCount,
    pub author: Option<Login>,
}

#[derive(Debug, Deserialize)]
struct SearchData<T> {
    search: Connection<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestsData {
    repository: Option<RepositoryPullRequests>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryPullRequests {
    pull_requests: Connection<PullRequestNode>,
}

async fn page_of<T, D, N>(
    client: &ApiClient<T>,
    query: &str,
    variables: serde_json::Value,
    connection: impl FnOnce(D) -> GitHubResult<Connection<N>>,
) -> Page<N>
where
    T: Transport,
    D: DeserializeOwned,
{
    match client.graphql::<D>(query, variables).await.and_then(connection) {
        Ok(connection) => connection.into_page(),
        Err(e) => Page::stop(e),
    }
}

/// Cursor-paged GraphQL repository search
pub struct RepositorySearchSource<'a, T> {
    client: &'a ApiClient<T>,
    search: String,
}

impl<'a, T: Transport> RepositorySearchSource<'a, T> {
    pub fn new(client: &'a ApiClient<T>, search: impl Into<String>) -> Self {
        Self {
            client,
            search: search.into(),
        }
    }
}

impl<T: Transport> PageSource for RepositorySearchSource<'_, T> {
    type Item = RepositoryNode;

    async fn fetch(&mut self, cursor: Option<String>) -> Page<RepositoryNode> {
        page_of(
            self.client,
            REPOSITORY_SEARCH_QUERY,
            json!({ "q": self.search, "cursor": cursor }),
            |data: SearchData<RepositoryNode>| Ok(data.search),
        )
        .await
    }
}

/// Cursor-paged closed/merged pull requests of one repository
pub struct PullRequestSource<'a, T> {
    client: &'a ApiClient<T>,
    owner: String,
    name: String,
}

impl<'a, T: Transport> PullRequestSource<'a, T> {
    pub fn new(client: &'a ApiClient<T>, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl<T: Transport> PageSource for PullRequestSource<'_, T> {
    type Item = PullRequestNode;

    async fn fetch(&mut self, cursor: Option<String>) -> Page<PullRequestNode> {
        let full_name = format!("{}/{}", self.owner, self.name);
        page_of(
            self.client,
            PULL_REQUESTS_QUERY,
            json!({ "owner": self.owner, "name": self.name, "cursor": cursor }),
            |data: PullRequestsData| {
                data.repository
                    .map(|repo| repo.pull_requests)
                    .ok_or(GitHubError::NotFound(full_name))
            },
        )
        .await
    }
}

/// One aliased `pullRequest(number:)` lookup per PR, `pr0` .. `prN`.
pub fn descriptions_query(numbers: &[u64]) -> String {
    let lookups: Vec<String> = numbers
        .iter()
        .enumerate()
        .map(|(i, number)| format!("    pr{i}: pullRequest(number: {number}) {{\n      number\n      body\n    }}"))
        .collect();
    format!(
        "query($owner: String!, $name: String!) {{\n  repository(owner: $owner, name: $name) {{\n{}\n  }}\n}}\n",
        lookups.join("\n")
    )
}

#[derive(Debug, Deserialize)]
struct DescriptionsData {
    repository: Option<HashMap<String, Option<DescriptionNode>>>,
}

#[derive(Debug, Deserialize)]
struct DescriptionNode {
    number: u64,
    body: Option<String>,
}

/// Body length (in characters) of each requested pull request.
///
/// A pull request or repository that no longer exists counts as 0. A failed
/// request returns nothing, so the numbers stay unfilled and a later run asks
/// again.
pub async fn fetch_description_lengths<T: Transport>(
    client: &ApiClient<T>,
    owner: &str,
    name: &str,
    numbers: &[u64],
) -> HashMap<u64, usize> {
    if numbers.is_empty() {
        return HashMap::new();
    }

    let query = descriptions_query(numbers);
    let result = client
        .graphql::<DescriptionsData>(&query, json!({ "owner": owner, "name": name }))
        .await;

    match result {
        Ok(DescriptionsData {
            repository: Some(aliases),
        }) => {
            let mut lengths: HashMap<u64, usize> = numbers.iter().map(|n| (*n, 0)).collect();
            for node in aliases.into_values().flatten() {
                let length = node.body.map(|b| b.chars().count()).unwrap_or(0);
                lengths.insert(node.number, length);
            }
            lengths
        }
        Ok(DescriptionsData { repository: None }) => {
            warn!("Repository {owner}/{name} not found while fetching descriptions");
            numbers.iter().map(|n| (*n, 0)).collect()
        }
        Err(e) => {
            warn!("Failed to fetch descriptions for {owner}/{name}: {e}");
            HashMap::new()
        }
    }
}
