use std::future::Future;

use cloudshelf_api::{ApiError, DiskClient, ListQuery, ResourcePage};
use cloudshelf_core::{CollectionKey, Cursor, Page, SortSpec};
use thiserror::Error;

use crate::convert::{ConvertError, node_from_resource};
use crate::retry::Retryable;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    #[error("conversion error: {0}")]
    Convert(#[from] ConvertError),
    #[error("cursor {0:?} is not an offset")]
    InvalidCursor(String),
}

impl Retryable for SourceError {
    fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Api(err) if err.is_retryable())
    }
}

/// Paginated access to sorted remote collections.
pub trait PageSource {
    fn fetch_first_page(
        &self,
        collection: &CollectionKey,
        sort: &SortSpec,
        page_size: u32,
    ) -> impl Future<Output = Result<Page, SourceError>> + Send;

    fn fetch_next_page(
        &self,
        collection: &CollectionKey,
        sort: &SortSpec,
        cursor: &Cursor,
        page_size: u32,
    ) -> impl Future<Output = Result<Page, SourceError>> + Send;

    /// Adjusts a continuation token after `delta` items were inserted ahead
    /// of it (negative for removals). Opaque tokens cannot be adjusted.
    fn shift_cursor(&self, _cursor: &Cursor, _delta: i64) -> Option<Cursor> {
        None
    }
}

/// Offset-paginated source backed by the disk REST API.
///
/// Cursors carry the offset of the next page as a decimal string.
#[derive(Clone)]
pub struct HttpPageSource {
    client: DiskClient,
}

impl HttpPageSource {
    pub fn new(client: DiskClient) -> Self {
        Self { client }
    }

    async fn fetch(
        &self,
        collection: &CollectionKey,
        sort: &SortSpec,
        offset: u32,
        page_size: u32,
    ) -> Result<Page, SourceError> {
        let query = ListQuery::new(sort.to_query(), page_size.max(1), offset);
        let page = match collection {
            CollectionKey::Folder(path) => self.client.list_directory(path, &query).await?,
            CollectionKey::Search(filter) => {
                self.client
                    .list_files(filter.media_type.as_deref(), &query)
                    .await?
            }
            CollectionKey::Trash => self.client.list_trash(&query).await?,
        };
        page_from_resources(&page)
    }
}

impl PageSource for HttpPageSource {
    async fn fetch_first_page(
        &self,
        collection: &CollectionKey,
        sort: &SortSpec,
        page_size: u32,
    ) -> Result<Page, SourceError> {
        self.fetch(collection, sort, 0, page_size).await
    }

    async fn fetch_next_page(
        &self,
        collection: &CollectionKey,
        sort: &SortSpec,
        cursor: &Cursor,
        page_size: u32,
    ) -> Result<Page, SourceError> {
        let offset = parse_offset(cursor)?;
        self.fetch(collection, sort, offset, page_size).await
    }

    fn shift_cursor(&self, cursor: &Cursor, delta: i64) -> Option<Cursor> {
        shift_offset_cursor(cursor, delta).ok()
    }
}

fn page_from_resources(page: &ResourcePage) -> Result<Page, SourceError> {
    let items = page
        .items
        .iter()
        .map(node_from_resource)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page {
        items,
        cursor: page.next_offset().map(offset_cursor),
    })
}

pub fn offset_cursor(offset: u32) -> Cursor {
    Cursor::new(offset.to_string())
}

pub fn parse_offset(cursor: &Cursor) -> Result<u32, SourceError> {
    cursor
        .as_str()
        .parse()
        .map_err(|_| SourceError::InvalidCursor(cursor.as_str().to_string()))
}

/// Moves an offset cursor by `delta`, clamping at zero.
pub fn shift_offset_cursor(cursor: &Cursor, delta: i64) -> Result<Cursor, SourceError> {
    let offset = i64::from(parse_offset(cursor)?);
    let shifted = (offset + delta).clamp(0, i64::from(u32::MAX));
    Ok(offset_cursor(shifted as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudshelf_core::SearchFilter;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> HttpPageSource {
        HttpPageSource::new(DiskClient::with_base_url(&server.uri(), "test-token").unwrap())
    }

    #[test]
    fn cursor_helpers() {
        assert_eq!(parse_offset(&offset_cursor(20)).unwrap(), 20);
        assert!(matches!(
            parse_offset(&Cursor::new("abc")),
            Err(SourceError::InvalidCursor(value)) if value == "abc"
        ));
        assert_eq!(shift_offset_cursor(&offset_cursor(20), 1).unwrap().as_str(), "21");
        assert_eq!(shift_offset_cursor(&offset_cursor(0), -1).unwrap().as_str(), "0");
    }

    #[tokio::test]
    async fn folder_pages_carry_offset_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/disk/resources"))
            .and(query_param("path", "/Docs"))
            .and(query_param("sort", "-size"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_embedded": {
                    "limit": 2,
                    "offset": 2,
                    "total": 5,
                    "items": [
                        {"path": "disk:/Docs/c", "name": "c", "type": "file", "size": 3},
                        {"path": "disk:/Docs/d", "name": "d", "type": "file", "size": 2}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let page = source(&server)
            .fetch_next_page(
                &CollectionKey::folder("/Docs"),
                &"-size".parse().unwrap(),
                &offset_cursor(2),
                2,
            )
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].path, "/Docs/c");
        assert_eq!(page.cursor, Some(offset_cursor(4)));
    }

    #[tokio::test]
    async fn search_pages_end_on_short_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/disk/resources/files"))
            .and(query_param("media_type", "image"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "limit": 10,
                "offset": 0,
                "items": [
                    {"path": "disk:/cat.jpg", "name": "cat.jpg", "type": "file", "media_type": "image"}
                ]
            })))
            .mount(&server)
            .await;

        let page = source(&server)
            .fetch_first_page(
                &CollectionKey::Search(SearchFilter::media_type("image")),
                &SortSpec::by_name(),
                10,
            )
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(page.cursor.is_none());
    }

    #[tokio::test]
    async fn invalid_cursor_is_rejected_before_request() {
        let server = MockServer::start().await;
        let err = source(&server)
            .fetch_next_page(&CollectionKey::Trash, &SortSpec::by_name(), &Cursor::new("x"), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidCursor(_)));
    }
}
