use async_trait::async_trait;
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use http::{HeaderMap, Method, StatusCode, Version};
use restnet::middleware::{Middleware, MiddlewareChain, Next, TerminalHandler};
use restnet::{Request, Response, RestError};
use tokio::runtime::Runtime;
use url::Url;

struct PassThrough;

#[async_trait]
impl Middleware for PassThrough {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, RestError> {
        next.run(request).await
    }
}

fn terminal() -> Box<TerminalHandler> {
    Box::new(|request: Request| {
        Box::pin(async move {
            Ok(Response::new(
                StatusCode::OK,
                Version::HTTP_11,
                HeaderMap::new(),
                Bytes::from_static(b"ok"),
                request.url().clone(),
            ))
        })
    })
}

fn chain(depth: usize) -> MiddlewareChain {
    let mut chain = MiddlewareChain::new();
    for _ in 0..depth {
        chain.with(PassThrough);
    }
    chain
}

fn benchmark_chain_execute(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let url = Url::parse("http://localhost/bench").unwrap();
    let terminal = terminal();

    for depth in [0usize, 4, 16] {
        let chain = chain(depth);
        c.bench_function(&format!("middleware_chain_depth_{depth}"), |b| {
            b.to_async(&rt).iter(|| {
                let request = Request::from_parts(Method::GET, url.clone());
                chain.execute(black_box(request), terminal.as_ref())
            })
        });
    }
}

criterion_group!(benches, benchmark_chain_execute);
criterion_main!(benches);
