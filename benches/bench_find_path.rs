use city_traffic::simulation_engine::grid::Grid;
use city_traffic::simulation_engine::route_generation::find_path;
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};
use std::time::Duration;

fn bench_find_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_path");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    // Grid widths: the reference city plus two larger ones.
    for &width in [16, 30, 58].iter() {
        let grid = Grid::new(width);
        let streets = grid.street_cells();
        let pairs: Vec<_> = streets
            .iter()
            .zip(streets.iter().rev())
            .filter(|(start, goal)| start != goal)
            .take(20)
            .map(|(start, goal)| (*start, *goal))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(width), &pairs, |b, pairs| {
            b.iter(|| {
                for (start, goal) in pairs {
                    let _ = black_box(find_path(&grid, *start, *goal));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_find_path);
criterion_main!(benches);
