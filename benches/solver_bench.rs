use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use connect4_solver::{
    bitboard::BitBoard, solver::Solver, transposition_table::TranspositionTable,
};

const POSITIONS: &[(&str, &str)] = &[
    ("28_moves", "6611663656535731732514123272"),
    ("25_moves", "5457417134661166365643473"),
    ("drawn_36_moves", "656173566152215676422337377473141445"),
];

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve");
    for &(name, moves) in POSITIONS {
        let board = BitBoard::from_moves(moves).expect("valid position");
        let table = TranspositionTable::with_log_size(20).expect("table allocation");
        let mut solver = Solver::with_transposition_table(table);

        group.bench_with_input(BenchmarkId::new("strong", name), &board, |b, board| {
            b.iter(|| black_box(solver.solve(black_box(board), false)))
        });
        group.bench_with_input(BenchmarkId::new("weak", name), &board, |b, board| {
            b.iter(|| black_box(solver.solve(black_box(board), true)))
        });
    }
    group.finish();
}

fn bench_move_generation(c: &mut Criterion) {
    let board = BitBoard::from_moves("4453").expect("valid position");
    c.bench_function("possible_non_losing_moves", |b| {
        b.iter(|| black_box(black_box(&board).possible_non_losing_moves()))
    });
}

criterion_group!(benches, bench_solve, bench_move_generation);
criterion_main!(benches);
