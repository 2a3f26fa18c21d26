//! Shared helpers for numeric unit tests.

use rand::prelude::*;

use crate::buffer::PixelBuffer;
use crate::model::DegradationOperator;

/// Buffer filled with uniform values in [0, 1).
pub(crate) fn random_buffer(
    rng: &mut StdRng,
    channels: usize,
    rows: usize,
    cols: usize,
) -> PixelBuffer {
    let mut buf = PixelBuffer::zeros(channels, rows, cols);
    for v in buf.as_mut_slice() {
        *v = rng.gen::<f64>();
    }
    buf
}

/// Assert the defining adjoint property `⟨A u, v⟩ = ⟨u, Aᵗ v⟩` on random
/// buffers, with `u` in the operator's input domain and `v` in its output
/// domain.
pub(crate) fn assert_adjoint_identity(
    op: &dyn DegradationOperator,
    index: usize,
    rows: usize,
    cols: usize,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let out_size = op.output_size(crate::ImageSize::new(rows, cols));
    let u = random_buffer(&mut rng, 1, rows, cols);
    let v = random_buffer(&mut rng, 1, out_size.rows, out_size.cols);

    let mut au = u.clone();
    op.apply(&mut au, index).unwrap();
    let mut atv = v.clone();
    op.apply_transpose(&mut atv, index).unwrap();

    let lhs = au.dot(&v);
    let rhs = u.dot(&atv);
    assert!(
        (lhs - rhs).abs() <= 1e-10 * (1.0 + lhs.abs().max(rhs.abs())),
        "adjoint identity violated: <Au,v>={lhs} vs <u,Atv>={rhs}"
    );
}

/// Assert the matrix-free apply agrees with the explicit operator matrix.
pub(crate) fn assert_matrix_agreement(
    op: &dyn DegradationOperator,
    index: usize,
    rows: usize,
    cols: usize,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = random_buffer(&mut rng, 1, rows, cols);
    let m = op
        .operator_matrix(crate::ImageSize::new(rows, cols), index)
        .unwrap();

    let mut applied = x.clone();
    op.apply(&mut applied, index).unwrap();

    let xv = nalgebra::DVector::from_column_slice(x.channel(0));
    let yv = &m * xv;
    assert_eq!(yv.len(), applied.num_values());
    for (i, v) in applied.channel(0).iter().enumerate() {
        assert!(
            (yv[i] - v).abs() < 1e-10,
            "matrix/apply disagreement at {i}: {} vs {v}",
            yv[i]
        );
    }
}
