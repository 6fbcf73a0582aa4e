//! HTTP client for the directory API.
//!
//! Every operation is a JSON `POST`. A `404` on a `get` is a confirmed miss;
//! an error body mentioning "page limit exceeded" on a paged call becomes
//! [`CanonicError::PageLimitExceeded`] so pagination can adapt.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use canonic_shared::{CanonicError, DirectoryConfig, Result};

use crate::records::{Company, CompanyBrief, Employee, EmployeeBrief, Project, ProjectBrief};
use crate::{Directory, EmployeeQuery, Page, ProjectQuery};

// ---------------------------------------------------------------------------
// Wire envelopes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct IdRequest<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct PagedRequest<'a, Q: Serialize> {
    offset: usize,
    limit: usize,
    #[serde(flatten)]
    query: &'a Q,
}

#[derive(Serialize)]
struct NoFilter {}

#[derive(serde::Deserialize)]
struct EmployeeEnvelope {
    employee: Option<Employee>,
}

#[derive(serde::Deserialize)]
struct ProjectEnvelope {
    project: Option<Project>,
}

#[derive(serde::Deserialize)]
struct CompanyEnvelope {
    company: Option<Company>,
}

#[derive(serde::Deserialize)]
struct CompaniesEnvelope {
    #[serde(default)]
    companies: Vec<CompanyBrief>,
}

#[derive(serde::Deserialize)]
struct ProjectsEnvelope {
    #[serde(default)]
    projects: Vec<ProjectBrief>,
}

#[derive(serde::Deserialize)]
struct EmployeesEnvelope {
    #[serde(default)]
    employees: Vec<EmployeeBrief>,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Directory backed by the remote API.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpDirectory {
    /// Build a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| CanonicError::config(format!("invalid directory URL '{base_url}': {e}")))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("Canonic/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| CanonicError::Transport(format!("client build: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &DirectoryConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// POST `body` to `path`. `Ok(None)` on 404.
    async fn call<B, R>(&self, path: &str, body: &B, limit: Option<usize>) -> Result<Option<R>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| CanonicError::config(format!("bad endpoint '{path}': {e}")))?;

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| CanonicError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(%url, "not found");
            return Ok(None);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);

            if let Some(limit) = limit {
                if message.to_lowercase().contains("page limit exceeded") {
                    return Err(CanonicError::PageLimitExceeded { limit });
                }
            }
            return Err(CanonicError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map(Some)
            .map_err(|e| CanonicError::parse(format!("{url}: {e}")))
    }

    /// Paged POST; a 404 here is a protocol error, not a miss.
    async fn call_page<Q, R>(&self, path: &str, query: &Q, page: Page) -> Result<R>
    where
        Q: Serialize,
        R: DeserializeOwned,
    {
        let body = PagedRequest {
            offset: page.offset,
            limit: page.limit,
            query,
        };
        self.call(path, &body, Some(page.limit))
            .await?
            .ok_or_else(|| CanonicError::Api {
                status: 404,
                message: format!("endpoint {path} not found"),
            })
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    #[instrument(skip(self))]
    async fn get_employee(&self, id: &str) -> Result<Option<Employee>> {
        let envelope: Option<EmployeeEnvelope> =
            self.call("employees/get", &IdRequest { id }, None).await?;
        Ok(envelope.and_then(|e| e.employee))
    }

    #[instrument(skip(self))]
    async fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let envelope: Option<ProjectEnvelope> =
            self.call("projects/get", &IdRequest { id }, None).await?;
        Ok(envelope.and_then(|e| e.project))
    }

    #[instrument(skip(self))]
    async fn get_customer(&self, id: &str) -> Result<Option<Company>> {
        let envelope: Option<CompanyEnvelope> =
            self.call("customers/get", &IdRequest { id }, None).await?;
        Ok(envelope.and_then(|e| e.company))
    }

    async fn list_customers_page(&self, page: Page) -> Result<Vec<CompanyBrief>> {
        let envelope: CompaniesEnvelope =
            self.call_page("customers/list", &NoFilter {}, page).await?;
        Ok(envelope.companies)
    }

    async fn search_projects_page(
        &self,
        query: &ProjectQuery,
        page: Page,
    ) -> Result<Vec<ProjectBrief>> {
        let envelope: ProjectsEnvelope = self.call_page("projects/search", query, page).await?;
        Ok(envelope.projects)
    }

    async fn search_employees_page(
        &self,
        query: &EmployeeQuery,
        page: Page,
    ) -> Result<Vec<EmployeeBrief>> {
        let envelope: EmployeesEnvelope =
            self.call_page("employees/search", query, page).await?;
        Ok(envelope.employees)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::pagination::list_all_customers;

    fn client(server: &MockServer) -> HttpDirectory {
        HttpDirectory::new(&server.uri(), Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn get_employee_found_and_missing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/employees/get"))
            .and(body_partial_json(json!({"id": "BwFV_151"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "employee": {"id": "BwFV_151", "name": "Marta Bianchi", "department": "Quality & HSE"}
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/employees/get"))
            .and(body_partial_json(json!({"id": "nobody_1"})))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = client(&server);
        let found = dir.get_employee("BwFV_151").await.expect("get");
        assert_eq!(found.map(|e| e.name), Some("Marta Bianchi".to_string()));

        let missing = dir.get_employee("nobody_1").await.expect("get");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn server_error_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/projects/get"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
            .mount(&server)
            .await;

        let err = client(&server).get_project("proj_x").await.unwrap_err();
        match err {
            CanonicError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "db down");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn paginates_with_limit_discovery() {
        let server = MockServer::start().await;
        let brief = |i: usize| json!({"id": format!("cust_{i}"), "name": format!("Customer {i}")});

        Mock::given(method("POST"))
            .and(path("/customers/list"))
            .and(body_partial_json(json!({"offset": 0, "limit": 2})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"companies": [brief(0), brief(1)]})),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/customers/list"))
            .and(body_partial_json(json!({"offset": 2, "limit": 4})))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"companies": [brief(2), brief(3), brief(4), brief(5)]}),
            ))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/customers/list"))
            .and(body_partial_json(json!({"limit": 8})))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "Page limit exceeded: 5"})),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/customers/list"))
            .and(body_partial_json(json!({"offset": 6, "limit": 6})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"companies": [brief(6)]})))
            .mount(&server)
            .await;

        let customers = list_all_customers(&client(&server)).await.expect("list");
        let ids: Vec<_> = customers.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["cust_0", "cust_1", "cust_2", "cust_3", "cust_4", "cust_5", "cust_6"]
        );
    }

    #[tokio::test]
    async fn unreachable_store_is_transport_error() {
        let dir = HttpDirectory::new("http://127.0.0.1:9", Duration::from_secs(1)).expect("client");
        let err = dir.get_customer("cust_1").await.unwrap_err();
        assert!(matches!(err, CanonicError::Transport(_)));
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(HttpDirectory::new("not a url", Duration::from_secs(1)).is_err());
    }
}
