//! KubeListerWatcher against a mocked apiserver
use futures::TryStreamExt;
use hyper::http::{Request, Response};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::serde_json::{self, json, Value};
use kinformer::k8s::informer::{Cursor, InformerConfig, KubeListerWatcher, ListerWatcher, RawEvent, Selectors};
use kube::client::Body;
use kube::core::ApiResource;
use kube::Client;
use tokio::task::JoinHandle;
use tower_test::mock::{self, Handle};

type MockHandle = Handle<Request<Body>, Response<Body>>;

fn mock_source(config: &InformerConfig) -> (KubeListerWatcher, MockHandle) {
    let (service, handle) = mock::pair::<Request<Body>, Response<Body>>();
    let client = Client::new(service, "default");
    let resource = ApiResource::erase::<Pod>(&());
    let source = KubeListerWatcher::new(client, &resource, true, Some("default"), config);
    (source, handle)
}

fn pod_json(name: &str, version: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": { "name": name, "namespace": "default", "resourceVersion": version },
    })
}

fn pod_list(items: Vec<Value>, version: &str, continue_token: Option<&str>) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "PodList",
        "metadata": { "resourceVersion": version, "continue": continue_token.unwrap_or("") },
        "items": items,
    })
}

fn respond(body: Vec<u8>) -> Response<Body> {
    Response::builder().body(Body::from(body)).unwrap()
}

/// Serve one canned response per request, handing back each request's path and query
fn serve(mut handle: MockHandle, responses: Vec<Vec<u8>>) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        for body in responses {
            let (request, send) = handle.next_request().await.expect("service not called");
            seen.push(request.uri().to_string());
            send.send_response(respond(body));
        }
        seen
    })
}

#[tokio::test]
async fn test_list_follows_continue_tokens() {
    let config = InformerConfig::default().with_list_page_size(Some(1));
    let (source, handle) = mock_source(&config);
    let server = serve(
        handle,
        vec![
            serde_json::to_vec(&pod_list(vec![pod_json("a", "3")], "9", Some("tok"))).unwrap(),
            serde_json::to_vec(&pod_list(vec![pod_json("b", "8")], "10", None)).unwrap(),
        ],
    );

    let selectors = Selectors::new("", "app=web").unwrap();
    let listing = source.list(&selectors).await.unwrap();
    let names: Vec<&str> = listing.items.iter().map(|s| s.id().name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(listing.cursor, Cursor::new("10"));

    let uris = server.await.unwrap();
    assert!(uris[0].starts_with("/api/v1/namespaces/default/pods?"));
    assert!(uris[0].contains("labelSelector=app%3Dweb"));
    assert!(uris[0].contains("limit=1"));
    assert!(!uris[0].contains("continue="));
    assert!(uris[1].contains("continue=tok"));
}

#[tokio::test]
async fn test_list_without_resource_version_fails() {
    let (source, handle) = mock_source(&InformerConfig::default());
    let list = json!({ "apiVersion": "v1", "kind": "PodList", "metadata": {}, "items": [] });
    let server = serve(handle, vec![serde_json::to_vec(&list).unwrap()]);

    assert!(source.list(&Selectors::everything()).await.is_err());
    server.await.unwrap();
}

#[tokio::test]
async fn test_watch_translates_stream_events() {
    let (source, handle) = mock_source(&InformerConfig::default());
    let lines = [
        json!({ "type": "ADDED", "object": pod_json("a", "11") }),
        json!({
            "type": "BOOKMARK",
            "object": { "apiVersion": "v1", "kind": "Pod", "metadata": { "resourceVersion": "12" } },
        }),
        json!({
            "type": "ERROR",
            "object": {
                "apiVersion": "v1",
                "kind": "Status",
                "metadata": {},
                "status": "Failure",
                "message": "too old resource version: 10 (12)",
                "reason": "Expired",
                "code": 410,
            },
        }),
    ];
    let mut body = Vec::new();
    for line in &lines {
        body.extend(serde_json::to_vec(line).unwrap());
        body.push(b'\n');
    }
    let server = serve(handle, vec![body]);

    let stream = source.watch(&Selectors::everything(), &Cursor::new("10")).await.unwrap();
    let events: Vec<RawEvent> = stream.try_collect().await.unwrap();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], RawEvent::Added(s) if s.id().name == "a"));
    assert!(matches!(&events[1], RawEvent::Bookmark(c) if c.as_str() == "12"));
    assert!(matches!(events[2], RawEvent::Expired));

    let uris = server.await.unwrap();
    assert!(uris[0].contains("watch=true"));
    assert!(uris[0].contains("resourceVersion=10"));
    assert!(uris[0].contains("allowWatchBookmarks=true"));
}
