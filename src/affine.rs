//! Affine transformations between voxel and world coordinates, and their
//! storage in the sform and qform fields of a NIfTI header.

use nalgebra::{Matrix3, Matrix4, Quaternion, RowVector4, SymmetricEigen, Vector3};
use nifti::NiftiHeader;

/// 3x3 rotation/zoom matrix.
pub type Affine3 = Matrix3<f64>;
/// 4x4 affine transformation matrix.
pub type Affine4 = Matrix4<f64>;

const QUATERNION_THRESHOLD: f64 = -::std::f64::EPSILON * 3.0;

/// NIfTI xform code for coordinates aligned to another file or anatomical truth.
pub const XFORM_ALIGNED: i16 = 2;

/// The NIfTI-MRS default affine, used when none is given: a scaling of
/// 10000 mm on each spatial axis.
pub fn default_affine() -> Affine4 {
    let mut affine = Affine4::identity() * 10000.0;
    affine[(3, 3)] = 1.0;
    affine
}

/// Separate a 4x4 affine into its 3x3 affine and translation components.
pub fn get_affine_and_translation(affine: &Affine4) -> (Affine3, Vector3<f64>) {
    let translation = Vector3::new(affine[(0, 3)], affine[(1, 3)], affine[(2, 3)]);
    let linear = Affine3::from_fn(|r, c| affine[(r, c)]);
    (linear, translation)
}

/// Get the best affine transformation available in a header:
/// sform, then qform, then one implied by the voxel sizes.
pub fn affine_from_header(header: &NiftiHeader) -> Affine4 {
    if header.sform_code > 0 {
        let rows = [header.srow_x, header.srow_y, header.srow_z];
        let mut affine = Affine4::identity();
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                affine[(r, c)] = f64::from(*v);
            }
        }
        affine
    } else if header.qform_code > 0 {
        qform_affine(header)
    } else {
        let shape = [header.dim[1], header.dim[2], header.dim[3]];
        let spacing = [header.pixdim[1], header.pixdim[2], header.pixdim[3]];
        shape_zoom_affine(&shape, &spacing)
    }
}

/// Store `affine` in both the sform and the qform of a header.
///
/// The qform is only written if the affine has non-zero voxel sizes.
pub fn set_header_affine(header: &mut NiftiHeader, affine: &Affine4) {
    for (r, row) in [&mut header.srow_x, &mut header.srow_y, &mut header.srow_z]
        .iter_mut()
        .enumerate()
    {
        for c in 0..4 {
            row[c] = affine[(r, c)] as f32;
        }
    }
    if header.sform_code == 0 {
        header.sform_code = XFORM_ALIGNED;
    }

    let (linear, translation) = get_affine_and_translation(affine);
    let mut zooms = Vector3::from_fn(|c, _| linear.column(c).norm());
    if zooms.iter().any(|z| *z == 0.0) {
        header.qform_code = 0;
        return;
    }
    let mut rotation = Affine3::from_fn(|r, c| linear[(r, c)] / zooms[c]);
    let qfac = if rotation.determinant() < 0.0 {
        zooms[2] = -zooms[2];
        for r in 0..3 {
            rotation[(r, 2)] = -rotation[(r, 2)];
        }
        -1.0
    } else {
        1.0
    };
    let quaternion = affine_to_quaternion(&rotation);

    header.pixdim[0] = qfac;
    for i in 0..3 {
        header.pixdim[i + 1] = zooms[i].abs() as f32;
    }
    header.quatern_b = quaternion[1] as f32;
    header.quatern_c = quaternion[2] as f32;
    header.quatern_d = quaternion[3] as f32;
    header.quatern_x = translation[0] as f32;
    header.quatern_y = translation[1] as f32;
    header.quatern_z = translation[2] as f32;
    if header.qform_code == 0 {
        header.qform_code = XFORM_ALIGNED;
    }
}

fn qform_affine(header: &NiftiHeader) -> Affine4 {
    let quaternion = fill_positive(Vector3::new(
        f64::from(header.quatern_b),
        f64::from(header.quatern_c),
        f64::from(header.quatern_d),
    ));
    let rotation = quaternion_to_affine(quaternion);
    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let zooms = [
        f64::from(header.pixdim[1]),
        f64::from(header.pixdim[2]),
        f64::from(header.pixdim[3]) * qfac,
    ];
    let translation = [
        f64::from(header.quatern_x),
        f64::from(header.quatern_y),
        f64::from(header.quatern_z),
    ];
    let mut affine = Affine4::identity();
    for r in 0..3 {
        for c in 0..3 {
            affine[(r, c)] = rotation[(r, c)] * zooms[c];
        }
        affine[(r, 3)] = translation[r];
    }
    affine
}

/// Get affine implied by given shape and zooms.
///
/// We get the translations from the center of the image (implied by `shape`).
pub(crate) fn shape_zoom_affine(shape: &[u16], spacing: &[f32]) -> Affine4 {
    let origin = Vector3::new(
        (f64::from(shape[0]) - 1.0) / 2.0,
        (f64::from(shape[1]) - 1.0) / 2.0,
        (f64::from(shape[2]) - 1.0) / 2.0,
    );
    let spacing = [
        -f64::from(spacing[0]),
        f64::from(spacing[1]),
        f64::from(spacing[2]),
    ];
    #[rustfmt::skip]
    let affine = Affine4::new(
        spacing[0], 0.0, 0.0, -origin[0] * spacing[0],
        0.0, spacing[1], 0.0, -origin[1] * spacing[1],
        0.0, 0.0, spacing[2], -origin[2] * spacing[2],
        0.0, 0.0, 0.0, 1.0,
    );
    affine
}

/// Compute unit quaternion from last 3 values.
///
/// w is assumed positive and given by `(1.0 - (x*x + y*y + z*z)).sqrt()`.
/// Slightly negative estimates of w*w are rounded to zero, which
/// corresponds to a 180 degree rotation.
pub(crate) fn fill_positive(xyz: Vector3<f64>) -> Quaternion<f64> {
    let w2 = 1.0 - xyz.dot(&xyz);
    let w = if w2 < 0.0 {
        if w2 < QUATERNION_THRESHOLD {
            log::warn!("qform quaternion is not a unit quaternion (w*w = {})", w2);
        }
        0.0
    } else {
        w2.sqrt()
    };
    Quaternion::new(w, xyz.x, xyz.y, xyz.z)
}

/// Calculate quaternion corresponding to given rotation matrix.
///
/// Constructs quaternion by calculating maximum eigenvector for matrix `k`
/// (constructed from input `affine`). The sign of the quaternion is
/// arbitrary, so the one with positive `w` is returned.
///
/// Bar-Itzhack, Itzhack Y. "New method for extracting the quaternion from a rotation
/// matrix", AIAA Journal of Guidance, Control and Dynamics 23(6):1085-1087, 2000
pub(crate) fn affine_to_quaternion(affine: &Affine3) -> RowVector4<f64> {
    // qyx is the contribution of the y input component to the x output
    // component, that is M[0, 1]
    let (qxx, qyx, qzx) = (affine[(0, 0)], affine[(0, 1)], affine[(0, 2)]);
    let (qxy, qyy, qzy) = (affine[(1, 0)], affine[(1, 1)], affine[(1, 2)]);
    let (qxz, qyz, qzz) = (affine[(2, 0)], affine[(2, 1)], affine[(2, 2)]);

    // only the lower half of the symmetric matrix is read
    #[rustfmt::skip]
    let k = Affine4::new(
        qxx - qyy - qzz, 0.0,             0.0,             0.0,
        qyx + qxy,       qyy - qxx - qzz, 0.0,             0.0,
        qzx + qxz,       qzy + qyz,       qzz - qxx - qyy, 0.0,
        qyz - qzy,       qzx - qxz,       qxy - qyx,       qxx + qyy + qzz,
    ) / 3.0;

    let SymmetricEigen {
        eigenvalues: values,
        eigenvectors: vectors,
    } = k.symmetric_eigen();

    let mut max_idx = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[max_idx] {
            max_idx = i;
        }
    }
    let max_vector = vectors.column(max_idx);
    let quaternion = RowVector4::new(max_vector[3], max_vector[0], max_vector[1], max_vector[2]);

    if quaternion[0] < 0.0 {
        quaternion * -1.0
    } else {
        quaternion
    }
}

/// Calculate rotation matrix corresponding to quaternion.
///
/// Algorithm from https://en.wikipedia.org/wiki/Rotation_matrix#Quaternion
pub(crate) fn quaternion_to_affine(q: Quaternion<f64>) -> Affine3 {
    let nq = q.w * q.w + q.i * q.i + q.j * q.j + q.k * q.k;
    if nq < ::std::f64::EPSILON {
        return Affine3::identity();
    }
    let s = 2.0 / nq;
    let x = q.i * s;
    let y = q.j * s;
    let z = q.k * s;
    let wx = q.w * x;
    let wy = q.w * y;
    let wz = q.w * z;
    let xx = q.i * x;
    let xy = q.i * y;
    let xz = q.i * z;
    let yy = q.j * y;
    let yz = q.j * z;
    let zz = q.k * z;
    #[rustfmt::skip]
    let affine = Affine3::new(
        1.0 - (yy + zz), xy - wz, xz + wy,
        xy + wz, 1.0 - (xx + zz), yz - wx,
        xz - wy, yz + wx, 1.0 - (xx + yy),
    );
    affine
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn default_affine_is_scaled_identity() {
        let affine = default_affine();
        assert_eq!(affine[(0, 0)], 10000.0);
        assert_eq!(affine[(2, 2)], 10000.0);
        assert_eq!(affine[(3, 3)], 1.0);
        assert_eq!(affine[(0, 3)], 0.0);
    }

    #[test]
    fn header_round_trip() {
        #[rustfmt::skip]
        let affine = Affine4::new(
            -2.0, 0.0, 0.0, 10.0,
            0.0, 3.0, 0.0, -20.0,
            0.0, 0.0, 4.0, 30.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let mut header = NiftiHeader {
            sform_code: 0,
            qform_code: 0,
            ..NiftiHeader::default()
        };
        set_header_affine(&mut header, &affine);
        assert_eq!(header.sform_code, 2);
        assert_eq!(header.qform_code, 2);
        assert_abs_diff_eq!(affine_from_header(&header), affine, epsilon = 1e-5);

        header.sform_code = 0;
        assert_abs_diff_eq!(affine_from_header(&header), affine, epsilon = 1e-3);

        // existing codes are kept
        let mut header = NiftiHeader {
            sform_code: 1,
            qform_code: 1,
            ..NiftiHeader::default()
        };
        set_header_affine(&mut header, &affine);
        assert_eq!(header.sform_code, 1);
        assert_eq!(header.qform_code, 1);
    }

    #[test]
    fn quaternion_round_trip() {
        use std::f64::consts::FRAC_1_SQRT_2;
        let rotation =
            quaternion_to_affine(Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2));
        assert_abs_diff_eq!(rotation[(0, 1)], -1.0, epsilon = 1e-12);
        let q = affine_to_quaternion(&rotation);
        assert_abs_diff_eq!(
            q,
            RowVector4::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2),
            epsilon = 1e-6
        );
    }
}
