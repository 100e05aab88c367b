//! End-to-end: router -> middleware -> ring -> collector -> sink.

use accesslog::{access_log, Collector, LogEvent, VecSink};
use fastroute::testing::RecordedResponse;
use fastroute::{Params, Request, ResponseWriter, Router};
use logring::{Config, Ring};

fn ok(w: &mut dyn ResponseWriter, _req: &Request<'_>, params: &Params<'_>) {
    w.set_status(200);
    w.write_body(params.get("id").unwrap_or("root").as_bytes());
}

#[test]
fn test_pipeline_logs_every_request() {
    let ring = Ring::<LogEvent>::new(Config::new(8, 32, true));
    let sink = VecSink::new();
    let events = sink.handle();
    let collector = Collector::spawn(ring.clone(), sink).unwrap();

    let router = Router::default();
    router.use_middleware(access_log(ring)).unwrap();
    router.get("/users/:id", ok).unwrap();
    router.get("/health", ok).unwrap();

    for i in 0..20 {
        let path = format!("/users/{i}");
        let mut w = RecordedResponse::new();
        router.serve(&mut w, &Request::new("GET", &path));
        assert_eq!(w.status(), 200);
    }
    let mut w = RecordedResponse::new();
    router.serve(&mut w, &Request::new("GET", "/missing"));
    assert_eq!(w.status(), 404);

    collector.join().unwrap();

    let events = events.lock().unwrap();
    // 404s never reach a handler, so only matched requests were logged.
    assert_eq!(events.len(), 20);
    assert!(events.iter().all(|e| e.status == 200));
    assert_eq!(events[0].path.as_str(), "/users/0");
    assert_eq!(events[19].path.as_str(), "/users/19");
}

#[test]
fn test_full_ring_drops_events_without_blocking() {
    // Capacity 2 and no consumer: the middleware keeps serving requests
    // while writes past capacity are silently dropped.
    let ring = Ring::<LogEvent>::new(Config::new(1, 8, true));

    let router = Router::default();
    router.use_middleware(access_log(ring.clone())).unwrap();
    router.get("/r", ok).unwrap();

    for _ in 0..10 {
        let mut w = RecordedResponse::new();
        router.serve(&mut w, &Request::new("GET", "/r"));
        assert_eq!(w.status(), 200);
    }

    let metrics = ring.metrics();
    assert_eq!(metrics.events_written, 2);
    assert_eq!(metrics.events_dropped, 8);

    // The two retained events arrive in order once a consumer shows up.
    let sink = VecSink::new();
    let events = sink.handle();
    let collector = Collector::spawn(ring, sink).unwrap();
    collector.join().unwrap();
    assert_eq!(events.lock().unwrap().len(), 2);
}
