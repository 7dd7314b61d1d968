use criterion::{Criterion, black_box, criterion_group, criterion_main};
use eventflow_bench::util;
use eventflow_graph::{Canvas, Explorer, LayoutEngine, SpringLayoutConfig, TransitionExplorer};

fn bench_spring_layout(c: &mut Criterion) {
    let explorer = TransitionExplorer::default();
    let mut group = c.benchmark_group("spring_layout");

    for event_count in [20, 60, 150] {
        let log = util::generate_synthetic_log(200, event_count, 12);
        let edges = explorer.create_edge_list(&log);
        let engine = LayoutEngine::spring(SpringLayoutConfig::default(), Canvas::default());

        group.bench_function(format!("{event_count}_events"), |b| {
            b.iter(|| {
                let positions = engine.compute(black_box(&edges), "events", None);
                black_box(positions)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_spring_layout);
criterion_main!(benches);
