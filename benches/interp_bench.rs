// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ttloc::interp::holint2d;
use ttloc::table::{GeoTable, HOLE};
use ttloc::TravelTimeTable;

/// Table of `nx` distances (0..180 deg) by `ny` depths (0..700 km), with a
/// hole band in the core shadow when `holes` is set.
fn make_table(nx: usize, ny: usize, holes: bool) -> GeoTable {
    let x: Vec<f64> = (0..nx).map(|i| 180.0 * i as f64 / (nx - 1) as f64).collect();
    let y: Vec<f64> = (0..ny).map(|j| 700.0 * j as f64 / (ny - 1) as f64).collect();
    let mut values = Vec::with_capacity(nx * ny);
    for &depth in &y {
        for &dist in &x {
            if holes && (100.0..140.0).contains(&dist) {
                values.push(HOLE);
            } else {
                values.push(dist * 11.0 - depth * 0.1 + (dist * 0.05).sin() * 4.0);
            }
        }
    }
    GeoTable::new("bench", x, y, values).unwrap()
}

fn make_ttt() -> TravelTimeTable {
    let tables = vec![
        ("P".to_string(), make_table(181, 36, true)),
        ("S".to_string(), make_table(181, 36, false)),
        ("PKP".to_string(), make_table(181, 36, false)),
    ];
    TravelTimeTable::from_tables("bench", tables).unwrap()
}

/// Single-point interpolation inside the table and across the hole band.
fn bench_holint2d(c: &mut Criterion) {
    let table = make_table(181, 36, true);
    let mut group = c.benchmark_group("holint2d_181x36");
    group.bench_function("interior", |b| {
        b.iter(|| holint2d(&table, HOLE, black_box(47.3), black_box(123.0)))
    });
    group.bench_function("hole_edge", |b| {
        b.iter(|| holint2d(&table, HOLE, black_box(99.7), black_box(35.0)))
    });
    group.finish();
}

/// Full lookups; consecutive calls share a depth so the row cache is warm.
fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("travel_times_3_phases");
    group.bench_function("compute_distance", |b| {
        let mut ttt = make_ttt();
        let mut d = 0.0;
        b.iter(|| {
            d = (d + 1.7) % 180.0;
            black_box(ttt.compute_distance(d, 33.0))
        })
    });
    group.bench_function("compute", |b| {
        let mut ttt = make_ttt();
        b.iter(|| black_box(ttt.compute(10.0, 20.0, 33.0, black_box(-5.0), 60.0, 250.0)))
    });
    group.bench_function("depth_change", |b| {
        let mut ttt = make_ttt();
        let mut z = 0.0;
        b.iter(|| {
            z = (z + 13.0) % 700.0;
            black_box(ttt.compute_distance(black_box(60.0), z))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_holint2d, bench_compute);
criterion_main!(benches);
