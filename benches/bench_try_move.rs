use city_traffic::simulation_engine::grid::{Grid, Position};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

// Shuttles one car along row 0 and back to its start each iteration.
fn bench_try_move(c: &mut Criterion) {
    let grid = Grid::default();
    let start = Position::new(0, 6);
    let lane: Vec<Position> = (2..6).rev().map(|col| Position::new(0, col)).collect();

    c.bench_function("try_move_row", |b| {
        b.iter(|| {
            grid.occupy(start);
            let mut here = start;
            for next in &lane {
                black_box(grid.try_move(here, *next));
                here = *next;
            }
            grid.release(here);
        });
    });

    c.bench_function("try_move_blocked", |b| {
        grid.occupy(Position::new(8, 3));
        grid.occupy(Position::new(8, 4));
        b.iter(|| black_box(grid.try_move(Position::new(8, 3), Position::new(8, 4))));
    });
}

criterion_group!(benches, bench_try_move);
criterion_main!(benches);
