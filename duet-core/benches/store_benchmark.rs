use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use duet_core::{PathStore, PathStyle, Point, Provenance, RenderablePath};
use std::hint::black_box;
use std::sync::Arc;

fn stroke(style: &Arc<PathStyle>, vertices: usize) -> RenderablePath {
    let mut path = RenderablePath::new(Point::new(0.0, 0.0), style.clone(), Provenance::Local);
    for i in 1..vertices {
        path.line_to(Point::new(i as f32, (i * 2) as f32));
    }
    path
}

fn bench_push(c: &mut Criterion) {
    let style = Arc::new(PathStyle::local_default());
    let template = stroke(&style, 64);

    let mut group = c.benchmark_group("PathStore");
    group.throughput(Throughput::Elements(1));
    group.bench_function("push_64_vertices", |b| {
        let store = PathStore::new();
        b.iter(|| {
            black_box(store.push(template.clone()));
        })
    });
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let style = Arc::new(PathStyle::local_default());
    let store = PathStore::new();
    for _ in 0..1000 {
        store.push(stroke(&style, 64));
    }

    c.bench_function("snapshot_1000_paths", |b| {
        b.iter(|| {
            black_box(store.snapshot());
        })
    });
}

fn bench_extend_open_path(c: &mut Criterion) {
    let style = Arc::new(PathStyle::remote_default());
    let store = PathStore::new();
    let id = store.push(stroke(&style, 1));

    c.bench_function("extend_open_path", |b| {
        b.iter(|| {
            store.extend(id, |p| p.line_to(black_box(Point::new(1.0, 1.0))));
        })
    });
}

criterion_group!(benches, bench_push, bench_snapshot, bench_extend_open_path);
criterion_main!(benches);
