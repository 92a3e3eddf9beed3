use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://cloud-api.yandex.net";
const TRASH_ROOT: &str = "trash:/";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("api response missing embedded items")]
    MissingEmbedded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    RateLimit,
    Transient,
    Permanent,
}

/// Sort, page size and offset of one listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Remote sort key, `-` prefixed for descending order.
    pub sort: String,
    pub limit: u32,
    pub offset: u32,
}

impl ListQuery {
    pub fn new(sort: impl Into<String>, limit: u32, offset: u32) -> Self {
        Self {
            sort: sort.into(),
            limit,
            offset,
        }
    }

    fn append_to(&self, url: &mut Url) {
        url.query_pairs_mut()
            .append_pair("sort", &self.sort)
            .append_pair("limit", &self.limit.to_string())
            .append_pair("offset", &self.offset.to_string());
    }
}

#[derive(Clone)]
pub struct DiskClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl DiskClient {
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            token: token.into(),
        })
    }

    pub async fn get_resource(&self, path: &str) -> Result<Resource, ApiError> {
        let mut url = self.endpoint("/v1/disk/resources")?;
        url.query_pairs_mut()
            .append_pair("path", path)
            .append_pair("limit", "0");
        let response = self.authorized(self.http.get(url)).send().await?;
        Self::handle_response(response).await
    }

    /// Children of the folder at `path` in remote sort order.
    pub async fn list_directory(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<ResourcePage, ApiError> {
        let mut url = self.endpoint("/v1/disk/resources")?;
        url.query_pairs_mut().append_pair("path", path);
        query.append_to(&mut url);
        let response = self.authorized(self.http.get(url)).send().await?;
        let payload: EmbeddedResponse = Self::handle_response(response).await?;
        payload.embedded.ok_or(ApiError::MissingEmbedded)
    }

    /// Flat list of every file on the disk, optionally narrowed to one media type.
    pub async fn list_files(
        &self,
        media_type: Option<&str>,
        query: &ListQuery,
    ) -> Result<ResourcePage, ApiError> {
        let mut url = self.endpoint("/v1/disk/resources/files")?;
        if let Some(media_type) = media_type {
            url.query_pairs_mut().append_pair("media_type", media_type);
        }
        query.append_to(&mut url);
        let response = self.authorized(self.http.get(url)).send().await?;
        Self::handle_response(response).await
    }

    pub async fn list_trash(&self, query: &ListQuery) -> Result<ResourcePage, ApiError> {
        let mut url = self.endpoint("/v1/disk/trash/resources")?;
        url.query_pairs_mut().append_pair("path", TRASH_ROOT);
        query.append_to(&mut url);
        let response = self.authorized(self.http.get(url)).send().await?;
        let payload: EmbeddedResponse = Self::handle_response(response).await?;
        payload.embedded.ok_or(ApiError::MissingEmbedded)
    }

    pub async fn create_folder(&self, path: &str) -> Result<Link, ApiError> {
        let mut url = self.endpoint("/v1/disk/resources")?;
        url.query_pairs_mut().append_pair("path", path);
        let response = self.authorized(self.http.put(url)).send().await?;
        Self::handle_response(response).await
    }

    /// Renames or moves a resource. Folders may complete asynchronously.
    pub async fn move_resource(
        &self,
        from: &str,
        path: &str,
        overwrite: bool,
    ) -> Result<Link, ApiError> {
        let mut url = self.endpoint("/v1/disk/resources/move")?;
        url.query_pairs_mut()
            .append_pair("from", from)
            .append_pair("path", path)
            .append_pair("overwrite", if overwrite { "true" } else { "false" });
        let response = self.authorized(self.http.put(url)).send().await?;
        Self::handle_response(response).await
    }

    /// Moves to trash, or deletes for good when `permanently` is set.
    ///
    /// `None` means the remote finished synchronously.
    pub async fn delete_resource(
        &self,
        path: &str,
        permanently: bool,
    ) -> Result<Option<Link>, ApiError> {
        let mut url = self.endpoint("/v1/disk/resources")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("path", path);
            if permanently {
                query.append_pair("permanently", "true");
            }
        }
        let response = self.authorized(self.http.delete(url)).send().await?;
        Self::optional_link(response).await
    }

    /// Removes a trashed resource for good.
    pub async fn delete_from_trash(&self, trash_path: &str) -> Result<Option<Link>, ApiError> {
        let mut url = self.endpoint("/v1/disk/trash/resources")?;
        url.query_pairs_mut().append_pair("path", trash_path);
        let response = self.authorized(self.http.delete(url)).send().await?;
        Self::optional_link(response).await
    }

    /// Restores a trashed resource, optionally under a new `name`.
    pub async fn restore_from_trash(
        &self,
        trash_path: &str,
        name: Option<&str>,
    ) -> Result<Link, ApiError> {
        let mut url = self.endpoint("/v1/disk/trash/resources/restore")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("path", trash_path);
            if let Some(name) = name {
                query.append_pair("name", name);
            }
        }
        let response = self.authorized(self.http.put(url)).send().await?;
        Self::handle_response(response).await
    }

    pub async fn get_operation_status(
        &self,
        operation_url: &str,
    ) -> Result<OperationStatus, ApiError> {
        let url = Url::parse(operation_url)?;
        let response = self.authorized(self.http.get(url)).send().await?;
        let info: OperationInfo = Self::handle_response(response).await?;
        Ok(info.status)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("OAuth {}", self.token))
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    async fn optional_link(response: reqwest::Response) -> Result<Option<Link>, ApiError> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(Self::handle_response(response).await?))
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Api { status, body })
        }
    }
}

impl ApiError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            ApiError::Api { status, .. } => Some(classify_api_status(*status)),
            ApiError::Request(err) if err.is_timeout() || err.is_connect() => {
                Some(ApiErrorClass::Transient)
            }
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.classification(),
            Some(ApiErrorClass::RateLimit | ApiErrorClass::Transient)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_EARLY
        )
    {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Resource {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    /// Original location of a trashed resource.
    #[serde(default)]
    pub origin_path: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    File,
    Dir,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OperationStatus {
    Success,
    Failure,
    InProgress,
}

#[derive(Debug, Deserialize, Serialize)]
struct OperationInfo {
    status: OperationStatus,
}

/// One page of a listing. `total` is absent for flat file lists.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourcePage {
    pub items: Vec<Resource>,
    pub limit: u32,
    pub offset: u32,
    #[serde(default)]
    pub total: Option<u32>,
}

impl ResourcePage {
    /// Offset of the following page, or `None` once the listing is exhausted.
    pub fn next_offset(&self) -> Option<u32> {
        let received = u32::try_from(self.items.len()).unwrap_or(u32::MAX);
        let next = self.offset.saturating_add(received);
        match self.total {
            Some(total) if next >= total => None,
            None if received < self.limit => None,
            _ if received == 0 => None,
            _ => Some(next),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct EmbeddedResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<ResourcePage>,
}

/// Link returned by mutations; for asynchronous operations it points at
/// the operation status.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Link {
    pub href: Url,
    pub method: String,
    #[serde(default)]
    pub templated: bool,
}

impl Link {
    pub fn is_operation(&self) -> bool {
        self.href.path().contains("/v1/disk/operations/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(items: usize, limit: u32, offset: u32, total: Option<u32>) -> ResourcePage {
        ResourcePage {
            items: (0..items)
                .map(|index| Resource {
                    path: format!("/Docs/{index}"),
                    name: index.to_string(),
                    resource_type: ResourceType::File,
                    size: None,
                    created: None,
                    modified: None,
                    resource_id: None,
                    media_type: None,
                    origin_path: None,
                })
                .collect(),
            limit,
            offset,
            total,
        }
    }

    #[test]
    fn next_offset_uses_total_when_known() {
        assert_eq!(page(2, 2, 0, Some(5)).next_offset(), Some(2));
        assert_eq!(page(1, 2, 4, Some(5)).next_offset(), None);
        assert_eq!(page(2, 2, 3, Some(5)).next_offset(), None);
    }

    #[test]
    fn next_offset_falls_back_to_short_page() {
        assert_eq!(page(3, 3, 0, None).next_offset(), Some(3));
        assert_eq!(page(2, 3, 3, None).next_offset(), None);
        assert_eq!(page(0, 3, 6, None).next_offset(), None);
    }

    #[test]
    fn classifies_statuses() {
        assert_eq!(
            classify_api_status(StatusCode::UNAUTHORIZED),
            ApiErrorClass::Auth
        );
        assert_eq!(
            classify_api_status(StatusCode::TOO_MANY_REQUESTS),
            ApiErrorClass::RateLimit
        );
        assert_eq!(
            classify_api_status(StatusCode::BAD_GATEWAY),
            ApiErrorClass::Transient
        );
        assert_eq!(
            classify_api_status(StatusCode::NOT_FOUND),
            ApiErrorClass::Permanent
        );
    }

    #[test]
    fn operation_links_are_detected() {
        let link = Link {
            href: Url::parse("https://cloud-api.yandex.net/v1/disk/operations/7").unwrap(),
            method: "GET".into(),
            templated: false,
        };
        assert!(link.is_operation());
        let meta = Link {
            href: Url::parse("https://cloud-api.yandex.net/v1/disk/resources?path=%2FA").unwrap(),
            method: "GET".into(),
            templated: false,
        };
        assert!(!meta.is_operation());
    }
}
