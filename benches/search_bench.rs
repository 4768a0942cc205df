use criterion::{criterion_group, criterion_main, Criterion};
use drkonqi_harness::a11y::{find_in, MemoryNode, NameMatcher};
use drkonqi_harness::bugzilla::{Expectations, Fixtures, IncomingRequest, Method, RouteTable};

// Run with:
//    cargo bench --bench search_bench

/// A window with `pages` pages of `rows` labelled rows each, one of them the target.
fn build_tree(pages: usize, rows: usize) -> MemoryNode {
    let window = MemoryNode::new("Crash Reporting Assistant");
    for p in 0..pages {
        let page = MemoryNode::new(format!("page {}", p));
        for r in 0..rows {
            page.push_child(MemoryNode::new(format!("row {}.{}", p, r)).with_action("Toggle"));
        }
        window.push_child(page);
    }
    window.push_child(MemoryNode::new("Next").with_action("Press"));
    window
}

fn bench_find_in(c: &mut Criterion) {
    let window = build_tree(8, 64);

    c.bench_function("find_in_exact", |b| {
        b.iter(|| find_in(&window, "Next").unwrap())
    });

    let pattern = NameMatcher::pattern("^row 7\\.63$").unwrap();
    c.bench_function("find_in_pattern", |b| {
        b.iter(|| find_in(&window, &pattern).unwrap())
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let table = RouteTable::duplicate_attach(&Expectations::default(), &Fixtures::builtin());
    let login = IncomingRequest::new(Method::Get, "/rest/login?login=xxx&password=yyy", "");
    let comment = format!(r#"{{"ids":[375161],"comment":"{}"}}"#, "y".repeat(128));
    let attach = IncomingRequest::new(Method::Post, "/rest/bug/375161/attachment", comment);

    c.bench_function("dispatch_login", |b| b.iter(|| table.dispatch(&login).is_some()));
    c.bench_function("dispatch_attachment", |b| b.iter(|| table.dispatch(&attach).is_some()));
}

criterion_group!(benches, bench_find_in, bench_dispatch);
criterion_main!(benches);
