//! GitHub organization target.
//!
//! Authenticates as a GitHub App: a short-lived RS256 app JWT is exchanged
//! for an installation token, which is cached and refreshed when it nears
//! expiry. Teams map to departments; the organization itself is surfaced as
//! the root department.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use config::GithubTargetConfig;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use ob_core::{
    DepartmentCreateOptions, DepartmentUserOptions, DepartmentUserRole, ExternalIdentity,
    FederationError, FederationResult, Pager, ROOT_DEPARTMENT_ID, Target, TargetEntry,
    UnionDepartment, UnionUser,
};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use validator::Validate;

pub const GITHUB_PLATFORM: &str = "github";

const USER_AGENT: &str = "orgbridge";

/// Translation from the abstract role vocabulary to GitHub's team roles.
/// Exhaustive for GitHub; a platform that cannot represent a role returns
/// `UnmappedRole` here instead of approximating.
fn github_team_role(role: DepartmentUserRole) -> FederationResult<&'static str> {
    match role {
        DepartmentUserRole::Member => Ok("member"),
        DepartmentUserRole::Admin => Ok("maintainer"),
    }
}

fn native_id(ext_id: &ExternalIdentity) -> FederationResult<u64> {
    ext_id
        .entry_id()
        .parse()
        .map_err(|e: std::num::ParseIntError| FederationError::InvalidIdentifier {
            entry_id: ext_id.entry_id().to_string(),
            platform: GITHUB_PLATFORM.to_string(),
            reason: e.to_string(),
        })
}

fn extract_next_link(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get("link")
        .and_then(|v| v.to_str().ok())
        .and_then(|link| {
            for part in link.split(',') {
                if part.contains("rel=\"next\"") {
                    let url_part = part.split(';').next()?;
                    let url = url_part
                        .trim()
                        .trim_start_matches('<')
                        .trim_end_matches('>');
                    return Some(url.to_string());
                }
            }
            None
        })
}

#[derive(Debug, Serialize)]
struct AppJwtClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct InstallationTokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RawOrg {
    id: u64,
    login: String,
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTeam {
    id: u64,
    name: String,
    slug: String,
    #[serde(default)]
    parent: Option<RawTeamRef>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTeamRef {
    #[allow(unused)]
    id: u64,
}

struct GithubInner {
    client: Client,
    config: GithubTargetConfig,
    encoding_key: EncodingKey,
    org_id: u64,
    org_name: String,
    token: RwLock<Option<CachedToken>>,
}

/// A configured, authenticated handle to one GitHub organization.
///
/// Cheap to clone; entity views returned from lookups hold a clone and
/// forward attribution calls to it.
#[derive(Clone)]
pub struct GithubTarget {
    inner: Arc<GithubInner>,
}

impl GithubTarget {
    /// Builds the HTTP client, parses the App key, and probes the
    /// organization — resolving its numeric id (unless pinned in the config)
    /// and display name. Bad credentials or an unknown org fail here, at
    /// startup.
    pub async fn connect(config: GithubTargetConfig) -> FederationResult<Self> {
        config
            .validate()
            .map_err(|e| FederationError::configuration(format!("github target: {e}")))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FederationError::adapter("github.build_client", e))?;

        let encoding_key = EncodingKey::from_rsa_pem(config.private_key_pem.as_bytes())
            .map_err(|e| {
                FederationError::configuration(format!("github app private key: {e}"))
            })?;

        let mut inner = GithubInner {
            client,
            config,
            encoding_key,
            org_id: 0,
            org_name: String::new(),
            token: RwLock::new(None),
        };

        let url = inner.api_url(&format!("/orgs/{}", inner.config.org));
        let org: RawOrg = inner
            .get_opt(&url, "github.get_org")
            .await?
            .ok_or_else(|| {
                FederationError::configuration(format!(
                    "github organization {} not found",
                    inner.config.org
                ))
            })?;
        inner.org_id = inner.config.org_id.unwrap_or(org.id);
        inner.org_name = org.name.unwrap_or(org.login);

        info!(
            org = %inner.config.org,
            org_id = inner.org_id,
            slug = %inner.config.slug,
            "Connected GitHub target"
        );
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    fn team_view(&self, raw: Option<RawTeam>) -> GithubTeam {
        GithubTeam {
            target: self.clone(),
            raw,
        }
    }
}

impl GithubInner {
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn app_jwt(&self) -> FederationResult<String> {
        let now = Utc::now().timestamp();
        // Backdated against clock drift; GitHub caps app JWTs at 10 minutes.
        let claims = AppJwtClaims {
            iat: now - 60,
            exp: now + 540,
            iss: self.config.app_id.to_string(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| FederationError::adapter("github.sign_app_jwt", e))
    }

    async fn installation_token(&self) -> FederationResult<String> {
        {
            let cached = self.token.read().await;
            if let Some(ref token) = *cached {
                if token.expires_at > Utc::now() + chrono::Duration::minutes(5) {
                    return Ok(token.token.clone());
                }
            }
        }

        let operation = "github.create_installation_token";
        let jwt = self.app_jwt()?;
        let url = self.api_url(&format!(
            "/app/installations/{}/access_tokens",
            self.config.installation_id
        ));
        debug!(url = %url, "Requesting GitHub installation token");

        let response = self
            .client
            .post(&url)
            .bearer_auth(jwt)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| FederationError::adapter(operation, e))?;
        let response = self.check_status(response, operation).await?;
        let token: InstallationTokenResponse = response
            .json()
            .await
            .map_err(|e| FederationError::adapter(operation, e))?;

        let mut cached = self.token.write().await;
        *cached = Some(CachedToken {
            token: token.token.clone(),
            expires_at: token.expires_at,
        });
        Ok(token.token)
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
        operation: &str,
    ) -> FederationResult<reqwest::Response> {
        let token = self.installation_token().await?;
        debug!(url = %url, operation, "GitHub API request");

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json");
        if let Some(body) = body {
            request = request.json(&body);
        }
        request
            .send()
            .await
            .map_err(|e| FederationError::adapter(operation, e))
    }

    /// Maps a non-2xx response to a tagged adapter error, preserving status
    /// and body. A 401 also drops the cached installation token.
    async fn check_status(
        &self,
        response: reqwest::Response,
        operation: &str,
    ) -> FederationResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            let mut cached = self.token.write().await;
            *cached = None;
        }
        let body = response.text().await.unwrap_or_default();
        Err(FederationError::adapter_message(
            operation,
            format!("{} - {}", status.as_u16(), body),
        ))
    }

    /// GET one page of a listing endpoint, returning the parsed body and the
    /// `rel="next"` Link target if any.
    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        operation: &str,
    ) -> FederationResult<(T, Option<String>)> {
        let response = self.request(Method::GET, url, None, operation).await?;
        let next_link = extract_next_link(response.headers());
        let response = self.check_status(response, operation).await?;
        let body = response
            .json::<T>()
            .await
            .map_err(|e| FederationError::adapter(operation, e))?;
        Ok((body, next_link))
    }

    /// GET a single entity; 404 becomes `None` so point lookups can attach
    /// their own `NotFound` context.
    async fn get_opt<T: DeserializeOwned>(
        &self,
        url: &str,
        operation: &str,
    ) -> FederationResult<Option<T>> {
        let response = self.request(Method::GET, url, None, operation).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.check_status(response, operation).await?;
        let body = response
            .json::<T>()
            .await
            .map_err(|e| FederationError::adapter(operation, e))?;
        Ok(Some(body))
    }

    /// Exhausts a Link-paginated listing. The cursor is the next-page URL;
    /// the pager caps runaway paging; the first page error aborts the fetch.
    async fn collect_pages<T: DeserializeOwned>(
        &self,
        first_url: String,
        operation: &str,
    ) -> FederationResult<Vec<T>> {
        let mut pager = Pager::new(operation);
        let mut items = Vec::new();
        let mut url = Some(first_url);
        while let Some(current) = url {
            pager.advance()?;
            let (page, next): (Vec<T>, _) = self.get_page(&current, operation).await?;
            items.extend(page);
            url = next;
        }
        Ok(items)
    }

    async fn raw_user_by_identity(&self, ext_id: &ExternalIdentity) -> FederationResult<RawUser> {
        let user_id = native_id(ext_id)?;
        let url = self.api_url(&format!("/user/{user_id}"));
        self.get_opt(&url, "github.get_user_by_id")
            .await?
            .ok_or_else(|| FederationError::NotFound {
                entry_type: ext_id.entry_type(),
                identity: ext_id.to_string(),
            })
    }
}

#[async_trait]
impl TargetEntry for GithubTarget {
    async fn user_by_internal_identity(
        &self,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<Box<dyn UnionUser>> {
        let raw = self.inner.raw_user_by_identity(ext_id).await?;
        Ok(Box::new(GithubUser { raw }))
    }

    async fn department_by_internal_identity(
        &self,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<Box<dyn UnionDepartment>> {
        let team_id = native_id(ext_id)?;
        let url = self
            .inner
            .api_url(&format!("/organizations/{}/team/{}", self.inner.org_id, team_id));
        let raw: RawTeam = self
            .inner
            .get_opt(&url, "github.get_team_by_id")
            .await?
            .ok_or_else(|| FederationError::NotFound {
                entry_type: ext_id.entry_type(),
                identity: ext_id.to_string(),
            })?;
        Ok(Box::new(self.team_view(Some(raw))))
    }
}

#[async_trait]
impl Target for GithubTarget {
    fn platform(&self) -> &str {
        GITHUB_PLATFORM
    }

    fn slug(&self) -> &str {
        &self.inner.config.slug
    }

    fn root_department(&self) -> Box<dyn UnionDepartment> {
        Box::new(self.team_view(None))
    }

    async fn all_users(&self) -> FederationResult<Vec<Box<dyn UnionUser>>> {
        let url = self.inner.api_url(&format!(
            "/orgs/{}/members?role=all&per_page=100",
            self.inner.config.org
        ));
        let members: Vec<RawUser> = self
            .inner
            .collect_pages(url, "github.list_org_members")
            .await?;
        Ok(members
            .into_iter()
            .map(|raw| Box::new(GithubUser { raw }) as Box<dyn UnionUser>)
            .collect())
    }
}

struct GithubUser {
    raw: RawUser,
}

impl UnionUser for GithubUser {
    fn id(&self) -> String {
        self.raw.id.to_string()
    }

    fn name(&self) -> String {
        self.raw
            .name
            .clone()
            .unwrap_or_else(|| self.raw.login.clone())
    }

    fn email_set(&self) -> Vec<String> {
        // Zero or one public address.
        self.raw.email.clone().into_iter().collect()
    }
}

/// A team, or the root department when `raw` is absent.
struct GithubTeam {
    target: GithubTarget,
    raw: Option<RawTeam>,
}

impl GithubTeam {
    fn team_slug(&self, operation: &str) -> FederationResult<&str> {
        self.raw.as_ref().map(|t| t.slug.as_str()).ok_or_else(|| {
            FederationError::adapter_message(
                operation,
                "the root department has no backing team",
            )
        })
    }
}

#[async_trait]
impl UnionDepartment for GithubTeam {
    fn id(&self) -> String {
        match &self.raw {
            Some(team) => team.id.to_string(),
            None => ROOT_DEPARTMENT_ID.to_string(),
        }
    }

    fn name(&self) -> String {
        match &self.raw {
            Some(team) => team.name.clone(),
            None => self.target.inner.org_name.clone(),
        }
    }

    async fn child_departments(&self) -> FederationResult<Vec<Box<dyn UnionDepartment>>> {
        let inner = &self.target.inner;
        let teams: Vec<RawTeam> = match &self.raw {
            // The org has no direct top-level query; list everything and
            // keep the parentless teams.
            None => {
                let url = inner.api_url(&format!("/orgs/{}/teams?per_page=100", inner.config.org));
                let all: Vec<RawTeam> = inner.collect_pages(url, "github.list_teams").await?;
                all.into_iter().filter(|t| t.parent.is_none()).collect()
            }
            Some(team) => {
                let url = inner.api_url(&format!(
                    "/orgs/{}/teams/{}/teams?per_page=100",
                    inner.config.org, team.slug
                ));
                inner.collect_pages(url, "github.list_child_teams").await?
            }
        };
        Ok(teams
            .into_iter()
            .map(|raw| Box::new(self.target.team_view(Some(raw))) as Box<dyn UnionDepartment>)
            .collect())
    }

    async fn users(&self) -> FederationResult<Vec<Box<dyn UnionUser>>> {
        // Org membership is not root-group membership; the root yields no
        // direct members.
        let Some(team) = &self.raw else {
            return Ok(Vec::new());
        };
        let inner = &self.target.inner;
        let url = inner.api_url(&format!(
            "/orgs/{}/teams/{}/members?per_page=100",
            inner.config.org, team.slug
        ));
        let members: Vec<RawUser> = inner.collect_pages(url, "github.list_team_members").await?;
        Ok(members
            .into_iter()
            .map(|raw| Box::new(GithubUser { raw }) as Box<dyn UnionUser>)
            .collect())
    }

    async fn create_sub_department(
        &self,
        options: DepartmentCreateOptions,
    ) -> FederationResult<Box<dyn UnionDepartment>> {
        let operation = "github.create_team";
        let inner = &self.target.inner;
        let mut body = serde_json::json!({ "name": options.name });
        if let Some(description) = options.description {
            body["description"] = serde_json::Value::String(description);
        }
        if let Some(team) = &self.raw {
            body["parent_team_id"] = serde_json::Value::from(team.id);
        }

        let url = inner.api_url(&format!("/orgs/{}/teams", inner.config.org));
        let response = inner.request(Method::POST, &url, Some(body), operation).await?;
        let response = inner.check_status(response, operation).await?;
        let raw: RawTeam = response
            .json()
            .await
            .map_err(|e| FederationError::adapter(operation, e))?;
        Ok(Box::new(self.target.team_view(Some(raw))))
    }

    async fn add_member(
        &self,
        options: DepartmentUserOptions,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<()> {
        let operation = "github.add_team_membership";
        // Local checks first: internality, role vocabulary, and a backing
        // team. Only then touch the network.
        ext_id.check_internal(&self.target)?;
        let role = github_team_role(options.role)?;
        let team_slug = self.team_slug(operation)?;
        let user = self.target.inner.raw_user_by_identity(ext_id).await?;

        let inner = &self.target.inner;
        let url = inner.api_url(&format!(
            "/orgs/{}/teams/{}/memberships/{}",
            inner.config.org, team_slug, user.login
        ));
        let body = serde_json::json!({ "role": role });
        let response = inner.request(Method::PUT, &url, Some(body), operation).await?;
        inner.check_status(response, operation).await?;
        Ok(())
    }

    async fn remove_member(
        &self,
        options: DepartmentUserOptions,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<()> {
        let operation = "github.remove_team_membership";
        ext_id.check_internal(&self.target)?;
        // The role is not sent on removal but still must be mappable, so
        // both mutations fail closed on vocabulary gaps.
        github_team_role(options.role)?;
        let team_slug = self.team_slug(operation)?;
        let user = self.target.inner.raw_user_by_identity(ext_id).await?;

        let inner = &self.target.inner;
        let url = inner.api_url(&format!(
            "/orgs/{}/teams/{}/memberships/{}",
            inner.config.org, team_slug, user.login
        ));
        let response = inner.request(Method::DELETE, &url, None, operation).await?;
        inner.check_status(response, operation).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_table_is_total_for_github() {
        assert_eq!(
            github_team_role(DepartmentUserRole::Member).unwrap(),
            "member"
        );
        assert_eq!(
            github_team_role(DepartmentUserRole::Admin).unwrap(),
            "maintainer"
        );
    }

    #[test]
    fn non_numeric_entry_ids_are_invalid_identifiers() {
        let ext_id: ExternalIdentity = "ei.user.octocat@acme.github".parse().unwrap();
        let err = native_id(&ext_id).unwrap_err();
        match err {
            FederationError::InvalidIdentifier {
                entry_id, platform, ..
            } => {
                assert_eq!(entry_id, "octocat");
                assert_eq!(platform, "github");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            native_id(&"ei.user.42@acme.github".parse().unwrap()).unwrap(),
            42
        );
    }

    #[test]
    fn next_link_extraction() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "link",
            "<https://api.github.com/orgs/acme/members?page=2>; rel=\"next\", \
             <https://api.github.com/orgs/acme/members?page=5>; rel=\"last\""
                .parse()
                .unwrap(),
        );
        assert_eq!(
            extract_next_link(&headers).as_deref(),
            Some("https://api.github.com/orgs/acme/members?page=2")
        );

        let mut last_only = reqwest::header::HeaderMap::new();
        last_only.insert(
            "link",
            "<https://api.github.com/orgs/acme/members?page=5>; rel=\"last\""
                .parse()
                .unwrap(),
        );
        assert_eq!(extract_next_link(&last_only), None);
        assert_eq!(extract_next_link(&reqwest::header::HeaderMap::new()), None);
    }
}
