//! Dispatch benchmarks: static fast path, parametric trie, frozen spans.

use criterion::{criterion_group, criterion_main, Criterion};
use fastroute::testing::RecordedResponse;
use fastroute::{Params, Request, ResponseWriter, Router, RouterConfig};

fn ok(w: &mut dyn ResponseWriter, _req: &Request<'_>, _params: &Params<'_>) {
    w.set_status(200);
}

fn build_router() -> Router {
    let router = Router::new(RouterConfig::new());
    router.get("/", ok).unwrap();
    router.get("/index", ok).unwrap();
    for i in 0..50 {
        router.get(&format!("/static/route/number/{i}"), ok).unwrap();
    }
    router.get("/api/v1/users/:id", ok).unwrap();
    router.get("/api/v1/users/:id/posts/:post", ok).unwrap();
    router.get("/api/v1/teams/:team/members/:member/roles", ok).unwrap();
    router.get("/assets/*path", ok).unwrap();
    router
}

fn bench_dispatch(c: &mut Criterion) {
    let router = build_router();
    let frozen = router.freeze();

    let mut group = c.benchmark_group("dispatch");

    group.bench_function("static_hit", |b| {
        let req = Request::new("GET", "/static/route/number/25");
        b.iter(|| {
            let mut w = RecordedResponse::new();
            router.serve(&mut w, &req);
            w.status()
        });
    });

    group.bench_function("param_hit", |b| {
        let req = Request::new("GET", "/api/v1/users/12345/posts/9");
        b.iter(|| {
            let mut w = RecordedResponse::new();
            router.serve(&mut w, &req);
            w.status()
        });
    });

    group.bench_function("param_hit_frozen", |b| {
        let req = Request::new("GET", "/api/v1/users/12345/posts/9");
        b.iter(|| {
            let mut w = RecordedResponse::new();
            frozen.serve(&mut w, &req);
            w.status()
        });
    });

    group.bench_function("wildcard_hit", |b| {
        let req = Request::new("GET", "/assets/js/vendor/app.min.js");
        b.iter(|| {
            let mut w = RecordedResponse::new();
            router.serve(&mut w, &req);
            w.status()
        });
    });

    group.bench_function("miss_404", |b| {
        let req = Request::new("GET", "/definitely/not/registered");
        b.iter(|| {
            let mut w = RecordedResponse::new();
            router.serve(&mut w, &req);
            w.status()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
