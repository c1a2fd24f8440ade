//! Evaluation Benchmarks
//!
//! Measures the hot path of a compiled straight-line program: repeated
//! evaluation of a system plus its Jacobian at changing arguments, the way
//! a path tracker calls it. Compilation cost is measured separately since
//! it is paid once per system.
//!
//! Run with: `cargo bench --bench evaluation`

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use num_complex::Complex64;
use rug::Complex;
use straightline::node;
use straightline::prelude::*;

/// A small dense polynomial system in three variables, with enough shared
/// structure that dedup matters.
fn polynomial_system() -> System {
    let x = node::variable("x");
    let y = node::variable("y");
    let z = node::variable("z");

    let xy = node::mul(&x, &y);
    let f1 = node::add(&node::pow_int(&x, 3), &node::mul(&xy, &z));
    let f2 = node::sub(&node::mul(&xy, &xy), &node::pow_int(&z, 2));
    let f3 = node::add(&node::mul(&node::sin(&x), &node::exp(&y)), &xy);

    System::new(vec![x, y, z], vec![f1, f2, f3]).unwrap()
}

/// The same shape with a path variable, as a homotopy would have.
fn homotopy_system() -> System {
    let x = node::variable("x");
    let y = node::variable("y");
    let t = node::variable("t");

    let start = node::sub(&node::pow_int(&x, 2), &node::integer(1));
    let target = node::sub(&node::mul(&x, &y), &node::integer(2));
    // (1 - t) * target + t * start
    let f = node::add(
        &node::mul(&node::sub(&node::integer(1), &t), &target),
        &node::mul(&t, &start),
    );
    let g = node::sub(&node::pow_int(&y, 3), &x);

    System::with_path_variable(vec![x, y], t, vec![f, g]).unwrap()
}

fn benchmark_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Evaluation");

    let mut program = StraightLineProgram::compile(&polynomial_system()).unwrap();
    let inputs = [
        Complex64::new(0.8, 0.2),
        Complex64::new(-0.4, 0.9),
        Complex64::new(1.1, -0.3),
    ];
    let mut values: Vec<Complex64> = Vec::new();
    let mut jacobian: Vec<Vec<Complex64>> = Vec::new();

    group.bench_function("machine precision", |b| {
        b.iter(|| {
            program.eval(black_box(&inputs)).unwrap();
            program.function_values_into(&mut values);
            program.jacobian_into(&mut jacobian);
            black_box(&values);
            black_box(&jacobian);
        })
    });

    let mut homotopy = StraightLineProgram::compile(&homotopy_system()).unwrap();
    let point = [Complex64::new(0.5, 0.5), Complex64::new(1.5, -0.5)];
    let time = Complex64::new(0.25, 0.0);
    group.bench_function("machine precision with time", |b| {
        b.iter(|| {
            homotopy
                .eval_with_time(black_box(&point), black_box(&time))
                .unwrap();
            homotopy.function_values_into(&mut values);
            black_box(&values);
        })
    });

    let mut program = StraightLineProgram::compile(&polynomial_system()).unwrap();
    for digits in [50u32, 200] {
        program.set_precision(digits).unwrap();
        let bits = program.precision_bits();
        let inputs: Vec<Complex> = [(0.8, 0.2), (-0.4, 0.9), (1.1, -0.3)]
            .iter()
            .map(|&p| Complex::with_val(bits, p))
            .collect();
        let mut values: Vec<Complex> = Vec::new();

        group.bench_with_input(
            BenchmarkId::new("arbitrary precision", digits),
            &digits,
            |b, _| {
                b.iter(|| {
                    program.eval(black_box(&inputs)).unwrap();
                    program.function_values_into(&mut values);
                    black_box(&values);
                })
            },
        );
    }

    group.finish();
}

fn benchmark_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Compilation");

    group.bench_function("build system", |b| {
        b.iter(|| black_box(polynomial_system()))
    });

    let system = polynomial_system();
    group.bench_function("compile", |b| {
        b.iter(|| black_box(StraightLineProgram::compile(&system).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, benchmark_evaluation, benchmark_compilation);
criterion_main!(benches);
