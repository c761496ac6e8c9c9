//! VCS-host API: pull requests and tags.
//!
//! [`PullRequestHost`] is the seam the reconciler talks through. The
//! production implementation is [`GitHubClient`] (GitHub REST v3 over a
//! blocking `reqwest` client); tests substitute an in-memory host.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identity of an open pull request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    /// Short name of the head branch.
    pub head_ref: String,
    pub html_url: String,
}

/// Fields of a pull request to open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
    pub maintainer_can_modify: bool,
}

/// A git tag as listed by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures talking to the VCS host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host answered with a non-success status.
    #[error("{method} {url} returned {status}: {message}")]
    Http {
        method: &'static str,
        url: String,
        status: u16,
        message: String,
    },

    /// The request never got a response.
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not what the API documents.
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The client could not be constructed.
    #[error("could not build HTTP client: {message}")]
    Client { message: String },

    /// A repository has no tags.
    #[error("no tags found for {owner}/{repo}")]
    NoTags { owner: String, repo: String },
}

impl HostError {
    /// True for 409 Conflict and 422 Unprocessable Entity, which the host
    /// returns when a mutation clashes with current state (e.g. a PR for the
    /// same head already exists).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Http { status: 409 | 422, .. })
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The pull-request and tag primitives the reconciler needs from a host.
pub trait PullRequestHost {
    /// All open pull requests of `owner/repo`.
    ///
    /// # Errors
    /// Any transport or API failure.
    fn list_open_pull_requests(&self, owner: &str, repo: &str)
    -> Result<Vec<PullRequest>, HostError>;

    /// Open a pull request.
    ///
    /// # Errors
    /// [`HostError::Http`] with status 409/422 when the host refuses it as
    /// conflicting, or any other failure.
    fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, HostError>;

    /// Replace the body of pull request `number`.
    ///
    /// # Errors
    /// Any transport or API failure.
    fn update_pull_request_body(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<PullRequest, HostError>;

    /// The first tag of `owner/repo` in the host's order (most recent
    /// first), or `None` when there are no tags.
    ///
    /// # Errors
    /// Any transport or API failure.
    fn first_tag(&self, owner: &str, repo: &str) -> Result<Option<Tag>, HostError>;
}

/// The most recent tag of `owner/repo`.
///
/// # Errors
/// [`HostError::NoTags`] when the repository has none.
pub fn latest_tag(host: &dyn PullRequestHost, owner: &str, repo: &str) -> Result<Tag, HostError> {
    host.first_tag(owner, repo)?.ok_or_else(|| HostError::NoTags {
            owner: owner.to_owned(),
            repo: repo.to_owned(),
        })
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WirePullRequest {
    number: u64,
    title: String,
    html_url: String,
    head: WireHead,
}

#[derive(Deserialize)]
struct WireHead {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<WirePullRequest> for PullRequest {
    fn from(w: WirePullRequest) -> Self {
        Self {
            number: w.number,
            title: w.title,
            head_ref: w.head.ref_name,
            html_url: w.html_url,
        }
    }
}

#[derive(Deserialize)]
struct WireError {
    message: String,
}

#[derive(Serialize)]
struct BodyPatch<'a> {
    body: &'a str,
}

/// GitHub REST v3 client.
pub struct GitHubClient {
    http: Client,
    api_url: String,
}

impl GitHubClient {
    /// A client for `api_url` (e.g. `https://api.github.com`) authenticating
    /// with `token` when non-empty.
    ///
    /// # Errors
    /// [`HostError::Client`] if the TLS backend or headers cannot be set up.
    pub fn new(api_url: &str, token: &str) -> Result<Self, HostError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("sdk-regen/", env!("CARGO_PKG_VERSION"))),
        );
        if !token.is_empty() {
            let mut auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                HostError::Client {
                    message: format!("invalid access token: {e}"),
                }
            })?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HostError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn send<T: DeserializeOwned>(
        method: &'static str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<T, HostError> {
        let response = request.send().map_err(|source| HostError::Transport {
            method,
            url: url.to_owned(),
            source,
        })?;
        let response = check_status(method, url, response)?;
        response.json().map_err(|source| HostError::Decode {
            url: url.to_owned(),
            source,
        })
    }

    /// Follow `page=` until a short page comes back.
    fn paginate<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, HostError> {
        let mut all = Vec::new();
        for page in 1.. {
            let url = self.url(path);
            let request = self
                .http
                .get(&url)
                .query(&[("per_page", PAGE_SIZE), ("page", page)]);
            let batch: Vec<T> = Self::send("GET", &url, request)?;
            let done = batch.len() < PAGE_SIZE;
            all.extend(batch);
            if done {
                break;
            }
        }
        Ok(all)
    }
}

fn check_status(method: &'static str, url: &str, response: Response) -> Result<Response, HostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().unwrap_or_default();
    let message = serde_json::from_str::<WireError>(&text)
        .map(|e| e.message)
        .unwrap_or(text);
    Err(HostError::Http {
        method,
        url: url.to_owned(),
        status: status.as_u16(),
        message: if message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_owned()
        } else {
            message
        },
    })
}

impl PullRequestHost for GitHubClient {
    #[instrument(skip(self))]
    fn list_open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequest>, HostError> {
        let prs: Vec<WirePullRequest> =
            self.paginate(&format!("/repos/{owner}/{repo}/pulls?state=open"))?;
        debug!(count = prs.len(), "listed open pull requests");
        Ok(prs.into_iter().map(PullRequest::from).collect())
    }

    #[instrument(skip(self, pr), fields(head = %pr.head, base = %pr.base))]
    fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, HostError> {
        let url = self.url(&format!("/repos/{owner}/{repo}/pulls"));
        let created: WirePullRequest = Self::send("POST", &url, self.http.post(&url).json(pr))?;
        Ok(created.into())
    }

    #[instrument(skip(self, body))]
    fn update_pull_request_body(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<PullRequest, HostError> {
        let url = self.url(&format!("/repos/{owner}/{repo}/pulls/{number}"));
        let updated: WirePullRequest =
            Self::send("PATCH", &url, self.http.patch(&url).json(&BodyPatch { body }))?;
        Ok(updated.into())
    }

    /// One page of one tag; the rest of the list is never fetched.
    #[instrument(skip(self))]
    fn first_tag(&self, owner: &str, repo: &str) -> Result<Option<Tag>, HostError> {
        let url = self.url(&format!("/repos/{owner}/{repo}/tags"));
        let request = self.http.get(&url).query(&[("per_page", 1)]);
        let tags: Vec<Tag> = Self::send("GET", &url, request)?;
        Ok(tags.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> HostError {
        HostError::Http {
            method: "POST",
            url: "https://api.github.com/repos/acme/sdk/pulls".to_owned(),
            status,
            message: "Validation Failed".to_owned(),
        }
    }

    #[test]
    fn conflict_statuses() {
        assert!(http(409).is_conflict());
        assert!(http(422).is_conflict());
        assert!(!http(404).is_conflict());
        assert!(!http(500).is_conflict());
    }

    #[test]
    fn wire_pull_request_maps_head_ref() {
        let json = r#"{
            "number": 42,
            "title": "chore: speakeasy sdk regeneration - Generate",
            "html_url": "https://github.com/acme/sdk/pull/42",
            "head": {"ref": "speakeasy-sdk-regen-1700000000", "sha": "abc"},
            "state": "open"
        }"#;
        let wire: WirePullRequest = serde_json::from_str(json).unwrap();
        let pr = PullRequest::from(wire);
        assert_eq!(pr.number, 42);
        assert_eq!(pr.head_ref, "speakeasy-sdk-regen-1700000000");
    }

    #[test]
    fn new_pull_request_serializes_github_fields() {
        let pr = NewPullRequest {
            title: "t".to_owned(),
            head: "h".to_owned(),
            base: "main".to_owned(),
            body: "b".to_owned(),
            maintainer_can_modify: true,
        };
        let value = serde_json::to_value(&pr).unwrap();
        assert_eq!(value["maintainer_can_modify"], true);
        assert_eq!(value["base"], "main");
    }

    #[test]
    fn client_trims_api_url() {
        let client = GitHubClient::new("https://api.github.com/", "").unwrap();
        assert_eq!(
            client.url("/repos/a/b/tags"),
            "https://api.github.com/repos/a/b/tags"
        );
    }

    struct Tags(Vec<&'static str>);

    impl PullRequestHost for Tags {
        fn list_open_pull_requests(&self, _: &str, _: &str) -> Result<Vec<PullRequest>, HostError> {
            Ok(Vec::new())
        }
        fn create_pull_request(
            &self,
            _: &str,
            _: &str,
            _: &NewPullRequest,
        ) -> Result<PullRequest, HostError> {
            unreachable!()
        }
        fn update_pull_request_body(
            &self,
            _: &str,
            _: &str,
            _: u64,
            _: &str,
        ) -> Result<PullRequest, HostError> {
            unreachable!()
        }
        fn first_tag(&self, _: &str, _: &str) -> Result<Option<Tag>, HostError> {
            Ok(self.0.first().map(|n| Tag {
                name: (*n).to_owned(),
            }))
        }
    }

    #[test]
    fn latest_tag_is_first() {
        let host = Tags(vec!["v1.2.0", "v1.1.0"]);
        assert_eq!(
            latest_tag(&host, "speakeasy-api", "speakeasy").unwrap().name,
            "v1.2.0"
        );
        let err = latest_tag(&Tags(vec![]), "speakeasy-api", "speakeasy").unwrap_err();
        assert!(matches!(err, HostError::NoTags { .. }));
    }

    /// Serve one canned JSON response on a local port and hand back the
    /// request line it received.
    fn serve_once(body: &'static str) -> (String, std::thread::JoinHandle<String>) {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut header = String::new();
            while reader.read_line(&mut header).unwrap() > 2 {
                header.clear();
            }
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            request_line.trim_end().to_owned()
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn first_tag_requests_a_single_entry() {
        let (api_url, server) = serve_once(r#"[{"name":"v1.19.2"}]"#);
        let client = GitHubClient::new(&api_url, "").unwrap();

        let tag = latest_tag(&client, "speakeasy-api", "speakeasy").unwrap();
        assert_eq!(tag.name, "v1.19.2");

        let request_line = server.join().unwrap();
        assert!(
            request_line.starts_with("GET /repos/speakeasy-api/speakeasy/tags?per_page=1 "),
            "got {request_line}"
        );
    }

    #[test]
    fn empty_tag_page_is_no_tags() {
        let (api_url, server) = serve_once("[]");
        let client = GitHubClient::new(&api_url, "").unwrap();
        let err = latest_tag(&client, "speakeasy-api", "speakeasy").unwrap_err();
        assert!(matches!(err, HostError::NoTags { .. }), "got {err:?}");
        server.join().unwrap();
    }
}
