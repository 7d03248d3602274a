//! End-to-end CGI calls over a real HTTP listener.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use mars_cgi::{
    Client, ClientConfig, ClientError, Dispatcher, ErrorKind, Reply, Router, Server, ServerConfig,
    cgi_fn,
};
use mars_proto::{
    ConversationList, ConversationListRequest, DecodeError, Hello, HelloRequest, HelloResponse,
    RETCODE_OK,
};
use tokio::sync::oneshot;

fn hello(req: HelloRequest) -> HelloResponse {
    if req.user.is_empty() {
        return HelloResponse {
            retcode: -1,
            errmsg: "user required".into(),
            dump_content: Vec::new(),
        };
    }
    HelloResponse {
        retcode: RETCODE_OK,
        errmsg: format!("congratulations, {}", req.user),
        dump_content: req.dump_content,
    }
}

/// Routes shared by most tests.
fn routes() -> Router {
    let mut routes = Router::builder();
    routes.endpoint::<Hello, _>(cgi_fn(hello)).unwrap();
    routes
        .route(
            "mars/panic",
            cgi_fn(|_: HelloRequest| -> HelloResponse { panic!("handler exploded") }),
        )
        .unwrap();
    routes.route("mars/a:b@c", cgi_fn(hello)).unwrap();
    routes.build()
}

/// Starts a server on an ephemeral port and returns a client for it.
async fn start(max_body_bytes: usize) -> (Client, oneshot::Sender<()>) {
    start_with(routes(), max_body_bytes).await
}

async fn start_with(router: Router, max_body_bytes: usize) -> (Client, oneshot::Sender<()>) {
    let config = ServerConfig {
        listen: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        max_body_bytes,
    };
    let server = Server::bind(&config, Dispatcher::new(router))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();

    let (tx, rx) = oneshot::channel();
    tokio::spawn(server.run_until(async move {
        rx.await.ok();
    }));

    let client = Client::new(&ClientConfig {
        base_url: format!("http://{addr}"),
        timeout: Some(Duration::from_secs(10)),
    });
    (client, tx)
}

async fn post(client: &Client, path: &'static str, body: Vec<u8>) -> Reply {
    let client = client.clone();
    tokio::task::spawn_blocking(move || client.post(path, &body))
        .await
        .unwrap()
        .unwrap()
}

fn hello_request() -> HelloRequest {
    HelloRequest {
        user: "dkyang".into(),
        text: "hello".into(),
        dump_content: Vec::new(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn hello_returns_ok() {
    let (client, _stop) = start(1024).await;
    let body = mars_proto::encode(&hello_request()).unwrap();

    let reply = post(&client, "mars/hello", body).await;
    assert_eq!(reply.status, 200);
    assert!(reply.envelope.is_none());

    let resp: HelloResponse = mars_proto::decode(&reply.body).unwrap();
    assert_eq!(resp.retcode, 0);
    assert_eq!(resp.errmsg, "congratulations, dkyang");
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_bytes_yield_undecodable_response() {
    let (client, _stop) = start(1024).await;

    let reply = post(&client, "mars/hello", vec![0u8; 100]).await;
    assert_eq!(reply.status, 400);
    assert_eq!(
        reply.envelope.map(|e| e.kind),
        Some(ErrorKind::MalformedRequest)
    );

    let decoded: Result<HelloResponse, DecodeError> = mars_proto::decode(&reply.body);
    assert!(decoded.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn typed_call_and_business_error() {
    let (client, _stop) = start(1024).await;

    let ok = {
        let client = client.clone();
        tokio::task::spawn_blocking(move || client.call::<Hello>(&hello_request()))
            .await
            .unwrap()
            .unwrap()
    };
    assert!(ok.is_ok());

    let rejected = {
        let client = client.clone();
        let req = HelloRequest {
            user: String::new(),
            ..hello_request()
        };
        tokio::task::spawn_blocking(move || client.call::<Hello>(&req))
            .await
            .unwrap()
            .unwrap()
    };
    assert_eq!(rejected.retcode, -1);
    assert_eq!(rejected.errmsg, "user required");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_route_is_not_found() {
    let (client, _stop) = start(1024).await;

    let reply = post(&client, "mars/Hello", Vec::new()).await;
    assert_eq!(reply.status, 404);
    assert_eq!(reply.envelope.map(|e| e.kind), Some(ErrorKind::RouteNotFound));
    assert!(reply.body.is_empty());

    let err = tokio::task::spawn_blocking(move || {
        client.call::<ConversationList>(&ConversationListRequest {
            access_token: String::new(),
            kind: 0,
        })
    })
    .await
    .unwrap()
    .unwrap_err();
    assert!(matches!(err, ClientError::Remote(e) if e.kind == ErrorKind::RouteNotFound));
}

#[tokio::test(flavor = "multi_thread")]
async fn handler_panic_is_internal_error() {
    let (client, _stop) = start(1024).await;
    let body = mars_proto::encode(&hello_request()).unwrap();

    let reply = post(&client, "mars/panic", body).await;
    assert_eq!(reply.status, 500);
    let envelope = reply.envelope.unwrap();
    assert_eq!(envelope.kind, ErrorKind::Internal);
    assert!(envelope.message.contains("handler exploded"));

    // The server keeps serving after a handler panic.
    let body = mars_proto::encode(&hello_request()).unwrap();
    assert_eq!(post(&client, "mars/hello", body).await.status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_body_is_rejected() {
    let (client, _stop) = start(64).await;

    let reply = post(&client, "mars/hello", vec![1u8; 65]).await;
    assert_eq!(reply.status, 413);
    assert!(reply.envelope.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_calls_are_independent() {
    let (client, _stop) = start(1024).await;
    let body = mars_proto::encode(&hello_request()).unwrap();

    let first = post(&client, "mars/hello", body.clone()).await;
    let second = post(&client, "mars/hello", body).await;
    assert_eq!(first.body, second.body);
    let resp: HelloResponse = mars_proto::decode(&second.body).unwrap();
    assert!(resp.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn only_post_is_accepted() {
    let (client, _stop) = start(1024).await;
    let url = client.url("mars/hello");

    let status = tokio::task::spawn_blocking(move || {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        agent.get(url.as_str()).call().map(|r| r.status().as_u16())
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(status, 405);
}

#[tokio::test(flavor = "multi_thread")]
async fn sub_delimiter_route_is_reachable() {
    let (client, _stop) = start(1024).await;
    let body = mars_proto::encode(&hello_request()).unwrap();

    let reply = post(&client, "mars/a:b@c", body).await;
    assert_eq!(reply.status, 200);
    let resp: HelloResponse = mars_proto::decode(&reply.body).unwrap();
    assert!(resp.is_ok());
}

/// Set by `mars/release`, awaited by `mars/wait`.
static RELEASED: (Mutex<bool>, Condvar) = (Mutex::new(false), Condvar::new());

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn blocking_handler_does_not_stall_other_calls() {
    let mut routes = Router::builder();
    routes
        .route(
            "mars/wait",
            cgi_fn(|_: HelloRequest| {
                let (lock, cvar) = &RELEASED;
                let guard = lock.lock().unwrap();
                let (guard, _) = cvar
                    .wait_timeout_while(guard, Duration::from_secs(5), |released| !*released)
                    .unwrap();
                HelloResponse {
                    retcode: if *guard { RETCODE_OK } else { -1 },
                    errmsg: String::new(),
                    dump_content: Vec::new(),
                }
            }),
        )
        .unwrap();
    routes
        .route(
            "mars/release",
            cgi_fn(|_: HelloRequest| {
                let (lock, cvar) = &RELEASED;
                *lock.lock().unwrap() = true;
                cvar.notify_all();
                HelloResponse {
                    retcode: RETCODE_OK,
                    errmsg: String::new(),
                    dump_content: Vec::new(),
                }
            }),
        )
        .unwrap();
    let (client, _stop) = start_with(routes.build(), 1024).await;
    let body = mars_proto::encode(&hello_request()).unwrap();

    let waiting = {
        let client = client.clone();
        let body = body.clone();
        tokio::task::spawn_blocking(move || client.post("mars/wait", &body))
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    // With the handler on the only worker, this call could not be served
    // until `mars/wait` timed out.
    assert_eq!(post(&client, "mars/release", body).await.status, 200);

    let reply = waiting.await.unwrap().unwrap();
    let resp: HelloResponse = mars_proto::decode(&reply.body).unwrap();
    assert_eq!(resp.retcode, RETCODE_OK);
}
