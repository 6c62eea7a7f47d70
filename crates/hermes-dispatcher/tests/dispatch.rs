//! End-to-end dispatch behavior over the public API.

use std::sync::Arc;

use bytes::Bytes;
use hermes_core::{Body, BodyError, Handler, MediaType, Response};
use hermes_dispatcher::{Dispatcher, DispatcherOptions, Registry, ResourceMethod};
use hermes_interceptor::{RequestIdInterceptor, REQUEST_ID_HEADER};
use hermes_test::{
    EventLog, RecordingHandler, RecordingInterceptor, RecordingStreamHandler, DeliveryCapture,
    TestRequest,
};
use http::header::{ALLOW, CONNECTION};
use http::{Method, StatusCode, Version};

fn get(template: &str, operation: &str, handler: Handler) -> ResourceMethod {
    ResourceMethod::builder(Method::GET, template)
        .operation(operation)
        .handler(handler)
        .build()
        .unwrap()
}

fn ok_handler(log: &EventLog, body: &'static str) -> Handler {
    RecordingHandler::responding(log, Response::new().with_body(body)).into_handler()
}

fn users_registry(log: &EventLog) -> Registry {
    Registry::builder()
        .resource(get("/users/{id}", "getUser", ok_handler(log, "user")))
        .resource(get("/users/me", "getMe", ok_handler(log, "me")))
        .resource(
            ResourceMethod::builder(Method::POST, "/users")
                .operation("createUser")
                .consumes("application/json")
                .produces("application/json")
                .handler(ok_handler(log, "created"))
                .build()
                .unwrap(),
        )
        .resource(
            ResourceMethod::builder(Method::PUT, "/uploads/{name}")
                .operation("upload")
                .handler(RecordingStreamHandler::new(log).into_handler())
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

async fn dispatch(dispatcher: &Dispatcher, request: hermes_core::Request) -> DeliveryCapture {
    let capture = DeliveryCapture::new();
    dispatcher.dispatch(request, capture.callback()).await;
    capture
}

// ---- routing outcomes ----

#[tokio::test]
async fn test_literal_template_beats_variable() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    dispatch(&dispatcher, TestRequest::get("/users/me").build())
        .await
        .assert_delivered_once()
        .assert_status(StatusCode::OK)
        .assert_body_eq("me");

    dispatch(&dispatcher, TestRequest::get("/users/42").build())
        .await
        .assert_delivered_once()
        .assert_body_eq("user");
}

#[tokio::test]
async fn test_unregistered_path_is_404() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    dispatch(&dispatcher, TestRequest::get("/orders/1").build())
        .await
        .assert_delivered_once()
        .assert_status(StatusCode::NOT_FOUND)
        .assert_empty_body();
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn test_wrong_method_is_405_with_allow() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    dispatch(&dispatcher, TestRequest::delete("/users/42").build())
        .await
        .assert_delivered_once()
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header(ALLOW.as_str(), "GET")
        .assert_empty_body();
}

#[tokio::test]
async fn test_wrong_content_type_is_415() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    dispatch(
        &dispatcher,
        TestRequest::post("/users")
            .content_type("text/plain")
            .body("alice")
            .build(),
    )
    .await
    .assert_delivered_once()
    .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE)
    .assert_empty_body();
}

#[tokio::test]
async fn test_unparseable_content_type_is_415() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    dispatch(
        &dispatcher,
        TestRequest::post("/users")
            .content_type("garbage")
            .body("{}")
            .build(),
    )
    .await
    .assert_delivered_once()
    .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE)
    .assert_empty_body();
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn test_unparseable_content_type_reaches_wildcard_consumer() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    dispatch(
        &dispatcher,
        TestRequest::put("/uploads/blob")
            .content_type("garbage")
            .chunks(["a"])
            .build(),
    )
    .await
    .assert_delivered_once()
    .assert_status(StatusCode::OK);
    assert_eq!(log.events(), ["start", "chunk:a", "end"]);
}

#[tokio::test]
async fn test_unacceptable_accept_is_406() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    dispatch(
        &dispatcher,
        TestRequest::post("/users")
            .content_type("application/json")
            .accept("text/csv")
            .body("{}")
            .build(),
    )
    .await
    .assert_delivered_once()
    .assert_status(StatusCode::NOT_ACCEPTABLE)
    .assert_empty_body();
}

#[tokio::test]
async fn test_accept_without_valid_entries_is_406() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    dispatch(
        &dispatcher,
        TestRequest::post("/users")
            .content_type("application/json")
            .accept("garbage")
            .body("{}")
            .build(),
    )
    .await
    .assert_delivered_once()
    .assert_status(StatusCode::NOT_ACCEPTABLE)
    .assert_empty_body();

    // a resource producing anything still needs one valid accepted type
    dispatch(
        &dispatcher,
        TestRequest::get("/users/42").accept("garbage, ;;").build(),
    )
    .await
    .assert_delivered_once()
    .assert_status(StatusCode::NOT_ACCEPTABLE);

    assert!(log.events().is_empty());
}

#[tokio::test]
async fn test_unparseable_content_type_reported_before_accept() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    dispatch(
        &dispatcher,
        TestRequest::post("/users")
            .content_type("garbage")
            .accept("garbage")
            .body("{}")
            .build(),
    )
    .await
    .assert_delivered_once()
    .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_routing_failures_skip_interceptors() {
    let log = EventLog::new();
    let registry = Registry::builder()
        .resource(get("/ping", "ping", ok_handler(&log, "pong")))
        .interceptor(RecordingInterceptor::new("audit", &log))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    dispatch(&dispatcher, TestRequest::get("/pong").build())
        .await
        .assert_delivered_once()
        .assert_status(StatusCode::NOT_FOUND);
    assert!(log.events().is_empty());
}

// ---- negotiation ----

#[tokio::test]
async fn test_negotiated_media_type_reaches_response() {
    let log = EventLog::new();
    let registry = Registry::builder()
        .resource(
            ResourceMethod::builder(Method::GET, "/report")
                .produces("application/json")
                .produces("text/plain")
                .handler(ok_handler(&log, "{}"))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    dispatch(&dispatcher, TestRequest::get("/report").accept("*/*").build())
        .await
        .assert_delivered_once()
        .assert_media_type("application/json");

    dispatch(
        &dispatcher,
        TestRequest::get("/report")
            .accept("text/plain, application/json")
            .build(),
    )
    .await
    .assert_delivered_once()
    .assert_media_type("application/json");

    dispatch(&dispatcher, TestRequest::get("/report").accept("text/*").build())
        .await
        .assert_delivered_once()
        .assert_media_type("text/plain");

    let response = dispatch(&dispatcher, TestRequest::get("/report").build())
        .await
        .assert_delivered_once();
    assert!(response.media_type().is_wildcard());
}

// ---- interceptor chain ----

#[tokio::test]
async fn test_interceptors_wrap_handler_in_order() {
    let log = EventLog::new();
    let registry = Registry::builder()
        .resource(get("/ping", "ping", ok_handler(&log, "pong")))
        .interceptor(RecordingInterceptor::new("first", &log))
        .interceptor(RecordingInterceptor::new("second", &log))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    dispatch(&dispatcher, TestRequest::get("/ping").build())
        .await
        .assert_delivered_once()
        .assert_body_eq("pong");
    assert_eq!(
        log.events(),
        ["pre:first", "pre:second", "handler", "post:first:200", "post:second:200"]
    );
}

#[tokio::test]
async fn test_abort_skips_handler_and_post_calls() {
    let log = EventLog::new();
    let registry = Registry::builder()
        .resource(get("/ping", "ping", ok_handler(&log, "pong")))
        .interceptor(RecordingInterceptor::new("first", &log))
        .interceptor(
            RecordingInterceptor::new("auth", &log)
                .aborting(Response::empty(StatusCode::UNAUTHORIZED).with_body("denied")),
        )
        .interceptor(RecordingInterceptor::new("never", &log))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    dispatch(&dispatcher, TestRequest::get("/ping").build())
        .await
        .assert_delivered_once()
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_body_eq("denied");
    assert_eq!(log.events(), ["pre:first", "pre:auth"]);
}

#[tokio::test]
async fn test_pre_call_failure_is_generic_500() {
    let log = EventLog::new();
    let registry = Registry::builder()
        .resource(get("/ping", "ping", ok_handler(&log, "pong")))
        .interceptor(RecordingInterceptor::new("broken", &log).failing_pre("secret detail"))
        .interceptor(RecordingInterceptor::new("never", &log))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    dispatch(&dispatcher, TestRequest::get("/ping").build())
        .await
        .assert_delivered_once()
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_empty_body();
    assert_eq!(log.events(), ["pre:broken"]);
}

#[tokio::test]
async fn test_post_call_failure_is_generic_500() {
    let log = EventLog::new();
    let registry = Registry::builder()
        .resource(get("/ping", "ping", ok_handler(&log, "pong")))
        .interceptor(RecordingInterceptor::new("broken", &log).failing_post("boom"))
        .interceptor(RecordingInterceptor::new("skipped", &log))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    dispatch(&dispatcher, TestRequest::get("/ping").build())
        .await
        .assert_delivered_once()
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_empty_body();
    assert_eq!(
        log.events(),
        ["pre:broken", "pre:skipped", "handler", "post:broken:200"]
    );
}

#[tokio::test]
async fn test_request_id_interceptor_echoes_trusted_id() {
    let log = EventLog::new();
    let registry = Registry::builder()
        .resource(get("/ping", "ping", ok_handler(&log, "pong")))
        .interceptor(RequestIdInterceptor::new())
        .build()
        .unwrap();
    let dispatcher = Dispatcher::with_options(
        registry,
        DispatcherOptions {
            trust_request_id: true,
            ..DispatcherOptions::default()
        },
    );

    let id = "01890a5d-ac96-774b-bcce-b302099a8057";
    dispatch(
        &dispatcher,
        TestRequest::get("/ping").header(REQUEST_ID_HEADER, id).build(),
    )
    .await
    .assert_delivered_once()
    .assert_header(REQUEST_ID_HEADER, id);
}

// ---- handler failures ----

#[tokio::test]
async fn test_business_failure_is_verbatim() {
    let log = EventLog::new();
    let failure = Response::empty(StatusCode::CONFLICT)
        .with_media_type(MediaType::json())
        .with_body(r#"{"error":"version mismatch"}"#);
    let registry = Registry::builder()
        .resource(get(
            "/doc",
            "doc",
            RecordingHandler::failing(&log, failure.clone()).into_handler(),
        ))
        .interceptor(RecordingInterceptor::new("audit", &log))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    let delivered = dispatch(&dispatcher, TestRequest::get("/doc").build())
        .await
        .assert_delivered_once();
    assert_eq!(delivered.clone().into_inner(), failure);
    delivered.assert_no_header(CONNECTION.as_str());
    assert_eq!(log.events(), ["pre:audit", "handler"]);
}

#[tokio::test]
async fn test_unmapped_failure_is_empty_500() {
    let log = EventLog::new();
    let registry = Registry::builder()
        .resource(get(
            "/doc",
            "doc",
            RecordingHandler::erroring(&log, "database password is hunter2").into_handler(),
        ))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    dispatch(&dispatcher, TestRequest::get("/doc").build())
        .await
        .assert_delivered_once()
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_empty_body();
}

#[tokio::test]
async fn test_handler_panic_is_caught() {
    let log = EventLog::new();
    let registry = Registry::builder()
        .resource(get(
            "/doc",
            "doc",
            RecordingHandler::panicking(&log, "handler exploded").into_handler(),
        ))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    dispatch(&dispatcher, TestRequest::get("/doc").build())
        .await
        .assert_delivered_once()
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_empty_body();
}

#[tokio::test]
async fn test_interceptor_panic_is_caught() {
    let log = EventLog::new();
    let registry = Registry::builder()
        .resource(get("/doc", "doc", ok_handler(&log, "doc")))
        .interceptor(RecordingInterceptor::new("wild", &log).panicking_pre("interceptor exploded"))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    dispatch(&dispatcher, TestRequest::get("/doc").build())
        .await
        .assert_delivered_once()
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!log.contains("handler"));
}

// ---- streaming ----

#[tokio::test]
async fn test_streaming_three_chunks() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    dispatch(
        &dispatcher,
        TestRequest::put("/uploads/report.csv")
            .chunks(["id,name\n", "1,ada\n", "2,grace\n"])
            .build(),
    )
    .await
    .assert_delivered_once()
    .assert_status(StatusCode::OK)
    .assert_header("x-chunk-count", "3")
    .assert_body_eq("id,name\n1,ada\n2,grace\n");

    assert_eq!(
        log.events(),
        ["start", "chunk:id,name\n", "chunk:1,ada\n", "chunk:2,grace\n", "end"]
    );
    assert_eq!(log.count("end"), 1);
}

#[tokio::test]
async fn test_streaming_business_failure_mid_body() {
    let log = EventLog::new();
    let registry = Registry::builder()
        .resource(
            ResourceMethod::builder(Method::PUT, "/uploads/{name}")
                .handler(
                    RecordingStreamHandler::new(&log)
                        .failing_on_chunk(2)
                        .into_handler(),
                )
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    dispatch(
        &dispatcher,
        TestRequest::put("/uploads/x").chunks(["a", "b", "c"]).build(),
    )
    .await
    .assert_delivered_once()
    .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(log.events(), ["start", "chunk:a", "chunk-failed"]);
}

#[tokio::test]
async fn test_streaming_transport_error_never_ends() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    let body = Body::from_stream(futures_util::stream::iter(vec![
        Ok(Bytes::from_static(b"a")),
        Err(BodyError::Transport("connection reset".into())),
    ]));
    dispatch(
        &dispatcher,
        TestRequest::put("/uploads/x").raw_body(body).build(),
    )
    .await
    .assert_delivered_once()
    .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(log.events(), ["start", "chunk:a"]);
}

// ---- framing ----

#[tokio::test]
async fn test_connection_header() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));

    dispatch(&dispatcher, TestRequest::get("/users/1").build())
        .await
        .assert_delivered_once()
        .assert_header(CONNECTION.as_str(), "keep-alive");

    dispatch(
        &dispatcher,
        TestRequest::get("/users/1").connection("close").build(),
    )
    .await
    .assert_delivered_once()
    .assert_header(CONNECTION.as_str(), "close");

    dispatch(
        &dispatcher,
        TestRequest::get("/nowhere").version(Version::HTTP_10).build(),
    )
    .await
    .assert_delivered_once()
    .assert_status(StatusCode::NOT_FOUND)
    .assert_header(CONNECTION.as_str(), "close");

    dispatch(
        &dispatcher,
        TestRequest::get("/users/1").version(Version::HTTP_2).build(),
    )
    .await
    .assert_delivered_once()
    .assert_no_header(CONNECTION.as_str());
}

#[tokio::test]
async fn test_keep_alive_disabled() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::with_options(
        users_registry(&log),
        DispatcherOptions {
            keep_alive: false,
            ..DispatcherOptions::default()
        },
    );

    dispatch(&dispatcher, TestRequest::get("/users/1").build())
        .await
        .assert_delivered_once()
        .assert_header(CONNECTION.as_str(), "close");
}

// ---- concurrency ----

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatches_each_deliver_once() {
    let log = EventLog::new();
    let dispatcher = Arc::new(Dispatcher::new(users_registry(&log)));

    let mut tasks = Vec::new();
    for i in 0..64 {
        let dispatcher = Arc::clone(&dispatcher);
        tasks.push(tokio::spawn(async move {
            let capture = DeliveryCapture::new();
            let path = if i % 2 == 0 { "/users/me".to_string() } else { format!("/users/{i}") };
            dispatcher
                .dispatch(TestRequest::get(path).build(), capture.callback())
                .await;
            (i, capture)
        }));
    }

    for task in tasks {
        let (i, capture) = task.await.unwrap();
        let expected = if i % 2 == 0 { "me" } else { "user" };
        capture.assert_delivered_once().assert_body_eq(expected);
    }
    assert_eq!(log.count("handler"), 64);
}

#[tokio::test]
async fn test_registry_swap_during_dispatch_keeps_snapshot() {
    let log = EventLog::new();
    let dispatcher = Dispatcher::new(users_registry(&log));
    let snapshot = dispatcher.registry();

    dispatcher.replace_registry(Registry::default());
    assert_eq!(snapshot.table().len(), 4);

    dispatch(&dispatcher, TestRequest::get("/users/me").build())
        .await
        .assert_delivered_once()
        .assert_status(StatusCode::NOT_FOUND);
}
