use ndarray::{ArrayD, IxDyn};
use nifti_mrs::{DimensionTag, NiftiMrs};
use num_complex::Complex32;

/// Dwell time of the test objects, for a 2 kHz bandwidth.
#[allow(dead_code)]
pub const DWELLTIME: f64 = 5e-4;

/// Data of the given shape where the element at row-major position `n`
/// is `n - nj`.
pub fn ramp_data(shape: &[usize]) -> ArrayD<Complex32> {
    let len: usize = shape.iter().product();
    let elements = (0..len)
        .map(|i| Complex32::new(i as f32, -(i as f32)))
        .collect();
    ArrayD::from_shape_vec(IxDyn(shape), elements).unwrap()
}

/// A proton object at 123.2 MHz holding `ramp_data(shape)`.
#[allow(dead_code)]
pub fn test_object(shape: &[usize], tags: &[Option<DimensionTag>]) -> NiftiMrs {
    NiftiMrs::generate(ramp_data(shape), DWELLTIME, &[123.2], &["1H"], None, tags).unwrap()
}
