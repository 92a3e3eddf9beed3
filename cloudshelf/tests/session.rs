use cloudshelf::mutations::DiskMutations;
use cloudshelf::retry::{Pacing, RetryPolicy};
use cloudshelf::session::BrowseSession;
use cloudshelf::source::HttpPageSource;
use cloudshelf_api::DiskClient;
use cloudshelf_core::{CollectionKey, Cursor, Listing, NodeId, SortSpec};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn instant_retry() -> RetryPolicy {
    RetryPolicy::new(3).with_pacing(Pacing::Immediate)
}

fn session(server: &MockServer, page_size: u32) -> BrowseSession<HttpPageSource> {
    let client = DiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    BrowseSession::new(HttpPageSource::new(client.clone()), page_size)
        .with_retry(instant_retry())
        .with_mutations(DiskMutations::new(client).with_retry(instant_retry()))
}

fn file(name: &str) -> Value {
    json!({
        "path": format!("disk:/Docs/{name}"),
        "name": name,
        "type": "file",
        "size": 1,
        "resource_id": format!("id:{name}")
    })
}

fn listing_page(offset: u32, limit: u32, total: u32, names: &[&str]) -> Value {
    json!({
        "path": "disk:/Docs",
        "name": "Docs",
        "type": "dir",
        "_embedded": {
            "offset": offset,
            "limit": limit,
            "total": total,
            "items": names.iter().map(|name| file(name)).collect::<Vec<_>>()
        }
    })
}

async fn mount_page(server: &MockServer, offset: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Docs"))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn names(listing: &Listing) -> Vec<&str> {
    listing.items.iter().map(|node| node.name.as_str()).collect()
}

fn docs() -> CollectionKey {
    CollectionKey::folder("/Docs")
}

#[tokio::test]
async fn pages_are_fetched_with_offsets_until_exhausted() {
    let server = MockServer::start().await;
    mount_page(&server, 0, listing_page(0, 2, 3, &["a.txt", "b.txt"])).await;
    mount_page(&server, 2, listing_page(2, 2, 3, &["c.txt"])).await;

    let mut session = session(&server, 2);
    let first = session.open(docs(), SortSpec::by_name()).await.unwrap();
    assert_eq!(names(&first), ["a.txt", "b.txt"]);
    assert_eq!(session.window().unwrap().cursor(), Some(&Cursor::new("2")));

    let all = session.load_all().await.unwrap();
    assert_eq!(names(&all), ["a.txt", "b.txt", "c.txt"]);
    assert!(!all.has_more);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 0, listing_page(0, 20, 1, &["a.txt"])).await;

    let mut session = session(&server, 20);
    let listing = session.open(docs(), SortSpec::by_name()).await.unwrap();
    assert_eq!(names(&listing), ["a.txt"]);
}

#[tokio::test]
async fn trashed_item_leaves_listing_and_next_page_starts_earlier() {
    let server = MockServer::start().await;
    mount_page(&server, 0, listing_page(0, 2, 4, &["a.txt", "b.txt"])).await;
    mount_page(&server, 1, listing_page(1, 2, 3, &["c.txt", "d.txt"])).await;
    Mock::given(method("DELETE"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Docs/a.txt"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session(&server, 2);
    session.open(docs(), SortSpec::by_name()).await.unwrap();
    session.trash(&NodeId::new("id:a.txt")).await.unwrap();

    assert_eq!(session.window().unwrap().cursor(), Some(&Cursor::new("1")));
    let listing = session.load_all().await.unwrap();
    assert_eq!(names(&listing), ["b.txt", "c.txt", "d.txt"]);
}

#[tokio::test]
async fn created_folder_is_listed_before_files() {
    let server = MockServer::start().await;
    mount_page(&server, 0, listing_page(0, 20, 2, &["a.txt", "b.txt"])).await;
    Mock::given(method("PUT"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Docs/New"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "href": format!("{}/v1/disk/resources?path=disk%3A%2FDocs%2FNew", server.uri()),
            "method": "GET",
            "templated": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Docs/New"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "path": "disk:/Docs/New",
            "name": "New",
            "type": "dir",
            "resource_id": "id:New"
        })))
        .mount(&server)
        .await;

    let mut session = session(&server, 20);
    session.open(docs(), SortSpec::by_name()).await.unwrap();
    let moves = session.create_folder("/Docs", "New").await.unwrap();

    assert_eq!(moves.len(), 1);
    let listing = session.read().unwrap().unwrap();
    assert_eq!(names(&listing), ["New", "a.txt", "b.txt"]);
}

#[tokio::test]
async fn rename_repositions_item() {
    let server = MockServer::start().await;
    mount_page(&server, 0, listing_page(0, 20, 3, &["a.txt", "b.txt", "c.txt"])).await;
    Mock::given(method("PUT"))
        .and(path("/v1/disk/resources/move"))
        .and(query_param("from", "/Docs/a.txt"))
        .and(query_param("path", "/Docs/z.txt"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "href": format!("{}/v1/disk/resources?path=disk%3A%2FDocs%2Fz.txt", server.uri()),
            "method": "GET",
            "templated": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Docs/z.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "path": "disk:/Docs/z.txt",
            "name": "z.txt",
            "type": "file",
            "size": 1,
            "resource_id": "id:a.txt"
        })))
        .mount(&server)
        .await;

    let mut session = session(&server, 20);
    session.open(docs(), SortSpec::by_name()).await.unwrap();
    session.rename(&NodeId::new("id:a.txt"), "z.txt").await.unwrap();

    let listing = session.read().unwrap().unwrap();
    assert_eq!(names(&listing), ["b.txt", "c.txt", "z.txt"]);
}
