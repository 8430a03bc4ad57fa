use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use pisa_core::prelude::*;
use pisa_core::{EdgeWeights, NetworkEdge, NetworkNode, compute_ego_subgraphs};

const SIDE: i64 = 120;
const SPACING: f64 = 0.001;
const BLOCK_LENGTH: f64 = 100.0;

/// Square street grid with `SIDE * SIDE` intersections
fn grid_network() -> SpatialGraphIndex {
    let id = |row: i64, col: i64| row * SIDE + col;

    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for row in 0..SIDE {
        for col in 0..SIDE {
            nodes.push(NetworkNode::new(
                id(row, col),
                col as f64 * SPACING,
                row as f64 * SPACING,
            ));
            let weights = EdgeWeights::from_speed(BLOCK_LENGTH, 4.5);
            if col + 1 < SIDE {
                edges.push(NetworkEdge::new(id(row, col), id(row, col + 1), weights));
            }
            if row + 1 < SIDE {
                edges.push(NetworkEdge::new(id(row, col), id(row + 1, col), weights));
            }
        }
    }

    SpatialGraphIndex::build(nodes, edges).expect("grid network is well formed")
}

fn bench_ego_subgraphs(c: &mut Criterion) {
    let network = grid_network();
    let center = (SIDE / 2) * SIDE + SIDE / 2;

    c.bench_function("ego_subgraphs_grid", |b| {
        b.iter(|| {
            compute_ego_subgraphs(
                black_box(&network),
                black_box(center),
                DistanceType::Length,
                &[500.0, 1000.0, 2000.0],
            )
        });
    });
}

fn bench_isopolygon_table(c: &mut Criterion) {
    let network = grid_network();
    let facilities = QueryPoints::from_pairs(
        &(0..16)
            .map(|i| {
                let offset = 0.02 + 0.005 * f64::from(i);
                (offset, 0.12 - offset)
            })
            .collect::<Vec<_>>(),
    );
    let config = IsopolygonConfig::new(DistanceType::Length, SPACING / 4.0, SPACING / 8.0);

    let mut group = c.benchmark_group("isopolygons");
    group.sample_size(10);
    group.bench_function("grid_16_points", |b| {
        b.iter(|| {
            calculate_isopolygons(
                black_box(&network),
                black_box(&facilities),
                &[500.0, 1000.0],
                &config,
            )
        });
    });
    group.finish();
}

criterion_group!(benches, bench_ego_subgraphs, bench_isopolygon_table);
criterion_main!(benches);
