use anyhow::{bail, Context, Result};
use futures::future::{BoxFuture, FutureExt};
use headers::{ContentType, HeaderMapExt, UserAgent};
use hyper::{Body, Client, Method, Request, StatusCode, Uri};
use tracing::debug;

use std::str::FromStr;

use crate::config::Config;
use crate::model::{Issue, IssueState};

/// Where the sync loop gets its issues from.
pub trait IssueSource {
    fn assigned_open_issues<'a>(&'a self, config: &'a Config) -> BoxFuture<'a, Result<Vec<Issue>>>;
}

pub struct GitLab {
    client: Client<hyper_tls::HttpsConnector<hyper::client::HttpConnector>>,
    user_agent: UserAgent,
}

impl GitLab {
    const API_PATH: &'static str = "/api/v4";

    pub fn new() -> Self {
        Self {
            client: Client::builder().build(hyper_tls::HttpsConnector::new()),
            user_agent: UserAgent::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            )),
        }
    }

    pub async fn get<T>(&self, endpoint: &str, token: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = Uri::from_str(endpoint).with_context(|| format!("Invalid url {}", endpoint))?;
        let mut req = Request::builder()
            .method(Method::GET)
            .uri(url)
            .header("PRIVATE-TOKEN", token)
            .body(Body::empty())?;
        req.headers_mut().typed_insert(self.user_agent.clone());
        req.headers_mut().typed_insert(ContentType::json());

        let resp = self.client.request(req).await?;
        let status = resp.status();
        let body = hyper::body::to_bytes(resp.into_body()).await?;
        decode(status, &body)
    }

    pub async fn issues(
        &self,
        config: &Config,
        assignee: &str,
        state: IssueState,
    ) -> Result<Vec<Issue>> {
        self.get(
            &format!(
                "{}{}/issues?assignee_username={}&state={}",
                config.gitlab_url,
                Self::API_PATH,
                assignee,
                state
            ),
            &config.gitlab_token,
        )
        .await
    }
}

impl Default for GitLab {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueSource for GitLab {
    fn assigned_open_issues<'a>(&'a self, config: &'a Config) -> BoxFuture<'a, Result<Vec<Issue>>> {
        self.issues(config, &config.gitlab_username, IssueState::Opened)
            .boxed()
    }
}

/// Anything but 200 is a fetch error; a 200 that isn't `T` is a decode error.
fn decode<T>(status: StatusCode, body: &[u8]) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    if status != StatusCode::OK {
        debug!(body = %String::from_utf8_lossy(body), "request failed");
        bail!("API request failed with status: {}", status);
    }
    serde_json::from_slice(body).context("Could not parse response from server")
}
