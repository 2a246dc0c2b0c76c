use criterion::{black_box, criterion_group, criterion_main, Criterion};

use conversation_sync::cache::SegmentCache;
use conversation_sync::models::{AuthorKind, Message};
use conversation_sync::scanner::EntityScanner;

const PLAIN: &str = "Thanks for waiting, I checked with the warehouse and your order is on its way.";
const DENSE: &str = "Docs at https://docs.example.com/guide?id=7, mail help@example.com, \
                     call +1 (555) 123-4567, mirror example.org or 10.0.0.12 if the site is down.";

fn bench_scanner(c: &mut Criterion) {
    let Ok(scanner) = EntityScanner::new() else {
        return;
    };

    c.bench_function("scan_plain", |b| b.iter(|| scanner.scan(black_box(PLAIN))));
    c.bench_function("scan_entity_dense", |b| b.iter(|| scanner.scan(black_box(DENSE))));

    let long = DENSE.repeat(50);
    c.bench_function("scan_long_body", |b| b.iter(|| scanner.scan(black_box(&long))));
}

fn bench_cache(c: &mut Criterion) {
    let messages: Vec<Message> = (0..200)
        .map(|i| {
            let body = if i % 3 == 0 { DENSE } else { PLAIN };
            Message::new(format!("m{i}"), body, AuthorKind::Customer)
        })
        .collect();

    let cache = SegmentCache::new(1_024);
    cache.annotate(&messages);
    c.bench_function("annotate_warm_200", |b| b.iter(|| cache.annotate(black_box(&messages))));
}

criterion_group!(benches, bench_scanner, bench_cache);
criterion_main!(benches);
