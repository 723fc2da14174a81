//! REST vs GraphQL timing experiment
//!
//! Each scenario asks for the same information through both APIs. REST
//! scenarios that need several endpoints issue the requests one after the
//! other and combine the bodies, so the measured size is what a client would
//! hold in memory. Runs are interleaved in random order to spread network
//! drift evenly across both APIs.

use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{Instant, sleep};

use crate::error::HarvestResult;
use crate::github::{ApiClient, ApiRequest, ApiResponse, GitHubError, GitHubResult, Transport};
use crate::harvest::export::write_csv;
use crate::harvest::stats::{mean, sample_std_dev};

/// Results file under the data directory
pub const RESULTS_FILE: &str = "resultados_experimento.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ApiKind {
    #[serde(rename = "REST")]
    Rest,
    #[serde(rename = "GraphQL")]
    GraphQl,
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApiKind::Rest => "REST",
            ApiKind::GraphQl => "GraphQL",
        })
    }
}

/// One REST request of a scenario; `key` names its part of the combined body
#[derive(Debug, Clone, PartialEq)]
pub struct RestCall {
    pub key: &'static str,
    pub path: String,
    pub query: Vec<(&'static str, &'static str)>,
}

impl RestCall {
    fn new(key: &'static str, path: impl Into<String>) -> Self {
        Self {
            key,
            path: path.into(),
            query: Vec::new(),
        }
    }

    fn with(mut self, key: &'static str, value: &'static str) -> Self {
        self.query.push((key, value));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: &'static str,
    pub rest: Vec<RestCall>,
    pub graphql: &'static str,
    pub variables: Value,
}

const SIMPLE_QUERY: &str = r#"
query($owner: String!, $repo: String!) {
  repository(owner: $owner, name: $repo) {
    name
    description
    stargazerCount
    forkCount
    createdAt
    updatedAt
  }
}
"#;

const MEDIUM_QUERY: &str = r#"
query($owner: String!, $repo: String!) {
  repository(owner: $owner, name: $repo) {
    name
    description
    stargazerCount
    issues(first: 10) {
      nodes {
        title
        state
        createdAt
        author {
          login
        }
      }
    }
  }
}
"#;

const COMPLEX_QUERY: &str = r#"
query($owner: String!, $repo: String!) {
  repository(owner: $owner, name: $repo) {
    name
    description
    stargazerCount
    issues(first: 5) {
      nodes {
        title
        state
      }
    }
    pullRequests(first: 5) {
      nodes {
        title
        state
      }
    }
    mentionableUsers(first: 5) {
      nodes {
        login
        name
      }
    }
  }
}
"#;

const LIST_QUERY: &str = r#"
query($org: String!) {
  organization(login: $org) {
    repositories(first: 10) {
      nodes {
        name
        description
        stargazerCount
      }
    }
  }
}
"#;

const NESTED_QUERY: &str = r#"
query($owner: String!, $repo: String!) {
  repository(owner: $owner, name: $repo) {
    name
    description
    defaultBranchRef {
      target {
        ... on Commit {
          history(first: 5) {
            nodes {
              message
              author {
                name
                email
                date
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// The five scenarios, from a single object up to nested collections
pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "Query 1 - Simple",
            rest: vec![RestCall::new("repository", "/repos/torvalds/linux")],
            graphql: SIMPLE_QUERY,
            variables: json!({ "owner": "torvalds", "repo": "linux" }),
        },
        Scenario {
            name: "Query 2 - Medium",
            rest: vec![
                RestCall::new("repository", "/repos/facebook/react"),
                RestCall::new("issues", "/repos/facebook/react/issues")
                    .with("per_page", "10")
                    .with("state", "all"),
            ],
            graphql: MEDIUM_QUERY,
            variables: json!({ "owner": "facebook", "repo": "react" }),
        },
        Scenario {
            name: "Query 3 - Complex",
            rest: vec![
                RestCall::new("repository", "/repos/microsoft/vscode"),
                RestCall::new("issues", "/repos/microsoft/vscode/issues").with("per_page", "5"),
                RestCall::new("pulls", "/repos/microsoft/vscode/pulls").with("per_page", "5"),
                RestCall::new("contributors", "/repos/microsoft/vscode/contributors")
                    .with("per_page", "5"),
            ],
            graphql: COMPLEX_QUERY,
            variables: json!({ "owner": "microsoft", "repo": "vscode" }),
        },
        Scenario {
            name: "Query 4 - List",
            rest: vec![RestCall::new("repositories", "/orgs/google/repos").with("per_page", "10")],
            graphql: LIST_QUERY,
            variables: json!({ "org": "google" }),
        },
        Scenario {
            name: "Query 5 - Nested",
            rest: vec![
                RestCall::new("repository", "/repos/nodejs/node"),
                RestCall::new("commits", "/repos/nodejs/node/commits").with("per_page", "5"),
            ],
            graphql: NESTED_QUERY,
            variables: json!({ "owner": "nodejs", "repo": "node" }),
        },
    ]
}

/// One row of the results file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub query: String,
    pub api_type: ApiKind,
    pub time_ms: f64,
    pub size_bytes: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperimentOptions {
    /// Runs per API and scenario
    pub repetitions: usize,
    /// Pause after every measurement
    pub delay: Duration,
}

impl Default for ExperimentOptions {
    fn default() -> Self {
        Self {
            repetitions: 30,
            delay: Duration::from_secs(1),
        }
    }
}

/// Mean and spread of one scenario on one API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSummary {
    pub query: String,
    pub api_type: ApiKind,
    pub runs: usize,
    pub mean_time_ms: f64,
    pub std_dev_time_ms: Option<f64>,
    pub mean_size_bytes: f64,
}

/// Measurements grouped by scenario and API, in first-seen scenario order
pub fn summarize(measurements: &[Measurement]) -> Vec<ScenarioSummary> {
    let mut queries: Vec<&str> = Vec::new();
    for m in measurements {
        if !queries.contains(&m.query.as_str()) {
            queries.push(&m.query);
        }
    }

    let mut summaries = Vec::new();
    for query in queries {
        for api in [ApiKind::Rest, ApiKind::GraphQl] {
            let runs: Vec<&Measurement> = measurements
                .iter()
                .filter(|m| m.query == query && m.api_type == api)
                .collect();
            let times: Vec<f64> = runs.iter().map(|m| m.time_ms).collect();
            let sizes: Vec<f64> = runs.iter().map(|m| m.size_bytes as f64).collect();
            let (Some(mean_time_ms), Some(mean_size_bytes)) = (mean(&times), mean(&sizes)) else {
                continue;
            };
            summaries.push(ScenarioSummary {
                query: query.to_string(),
                api_type: api,
                runs: runs.len(),
                mean_time_ms,
                std_dev_time_ms: sample_std_dev(&times),
                mean_size_bytes,
            });
        }
    }
    summaries
}

/// Single request straight through the transport: no cooldown, no retry.
async fn send_ok<T: Transport>(
    client: &ApiClient<T>,
    request: ApiRequest,
) -> GitHubResult<ApiResponse> {
    let url = request.url.clone();
    let response = client.transport().send(request).await?;
    if !response.is_success() {
        return Err(GitHubError::Status {
            status: response.status,
            url,
        });
    }
    Ok(response)
}

/// Issue the scenario's REST requests; returns the response size in bytes.
async fn run_rest<T: Transport>(client: &ApiClient<T>, scenario: &Scenario) -> GitHubResult<usize> {
    if let [call] = scenario.rest.as_slice() {
        return Ok(send_ok(client, rest_request(client, call)).await?.size());
    }

    let mut combined = Map::new();
    for call in &scenario.rest {
        let response = send_ok(client, rest_request(client, call)).await?;
        combined.insert(call.key.to_string(), response.json::<Value>()?);
    }
    Ok(serde_json::to_string(&Value::Object(combined))?.len())
}

fn rest_request<T: Transport>(client: &ApiClient<T>, call: &RestCall) -> ApiRequest {
    call.query.iter().fold(
        ApiRequest::get(client.rest_url(&call.path)),
        |request, (key, value)| request.query(*key, value),
    )
}

async fn run_graphql<T: Transport>(
    client: &ApiClient<T>,
    scenario: &Scenario,
) -> GitHubResult<usize> {
    let request = ApiRequest::graphql(
        client.config().graphql_url.clone(),
        scenario.graphql,
        scenario.variables.clone(),
    );
    Ok(send_ok(client, request).await?.size())
}

/// Time one run of `scenario` on `api`
pub async fn measure<T: Transport>(
    client: &ApiClient<T>,
    scenario: &Scenario,
    api: ApiKind,
) -> GitHubResult<Measurement> {
    let started = Instant::now();
    let size_bytes = match api {
        ApiKind::Rest => run_rest(client, scenario).await?,
        ApiKind::GraphQl => run_graphql(client, scenario).await?,
    };
    Ok(Measurement {
        query: scenario.name.to_string(),
        api_type: api,
        time_ms: started.elapsed().as_secs_f64() * 1000.0,
        size_bytes,
        timestamp: Utc::now(),
    })
}

/// Run every scenario `repetitions` times per API in shuffled order.
/// Failed runs are logged and left out.
pub async fn run_scenarios<T: Transport, G: Rng + ?Sized>(
    client: &ApiClient<T>,
    scenarios: &[Scenario],
    options: &ExperimentOptions,
    rng: &mut G,
) -> Vec<Measurement> {
    info!(
        "Running {} scenarios, {} repetitions each, {} measurements in total",
        scenarios.len(),
        options.repetitions,
        scenarios.len() * 2 * options.repetitions
    );

    let mut measurements = Vec::new();
    for scenario in scenarios {
        info!("Scenario: {}", scenario.name);
        let mut order: Vec<ApiKind> = [ApiKind::Rest, ApiKind::GraphQl]
            .into_iter()
            .cycle()
            .take(2 * options.repetitions)
            .collect();
        order.shuffle(rng);

        for (i, api) in order.iter().enumerate() {
            match measure(client, scenario, *api).await {
                Ok(m) => {
                    info!(
                        "Measurement {}/{} - {api}: {:.2}ms, {} bytes",
                        i + 1,
                        order.len(),
                        m.time_ms,
                        m.size_bytes
                    );
                    measurements.push(m);
                }
                Err(e) => warn!("Measurement {}/{} - {api} failed: {e}", i + 1, order.len()),
            }
            if !options.delay.is_zero() {
                sleep(options.delay).await;
            }
        }
    }
    measurements
}

/// Run the experiment and write [`RESULTS_FILE`] into `data_dir`.
pub async fn run<T: Transport>(
    client: &ApiClient<T>,
    data_dir: &Path,
    options: &ExperimentOptions,
) -> HarvestResult<Option<PathBuf>> {
    let mut rng = StdRng::from_os_rng();
    let measurements = run_scenarios(client, &scenarios(), options, &mut rng).await;
    if measurements.is_empty() {
        warn!("No results to save");
        return Ok(None);
    }

    let path = data_dir.join(RESULTS_FILE);
    write_csv(&path, &measurements)?;
    info!("Results saved to {}", path.display());

    for summary in summarize(&measurements) {
        let spread = summary
            .std_dev_time_ms
            .map(|sd| format!(" (±{sd:.2})"))
            .unwrap_or_default();
        info!(
            "{} / {}: {:.2}ms{spread}, {:.2} bytes over {} runs",
            summary.query,
            summary.api_type,
            summary.mean_time_ms,
            summary.mean_size_bytes,
            summary.runs
        );
    }
    Ok(Some(path))
}
