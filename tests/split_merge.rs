mod util;

use ndarray::Axis;
use nifti_mrs::tools::{merge, split};
use nifti_mrs::{DimRef, DimensionHeader, DimensionTag, HeaderValue, NiftiMrsError, SplitSelector};
use pretty_assertions::assert_eq;
use serde_json::json;
use util::{ramp_data, test_object};

use DimensionTag::*;

fn dyn_header() -> DimensionHeader {
    let mut header = DimensionHeader::new();
    let _ = header.insert("EchoTime".to_owned(), HeaderValue::short(0, 1));
    let _ = header.insert(
        "Offset".to_owned(),
        HeaderValue::user_defined(
            HeaderValue::Long((0..16).map(|i| json!(i * i)).collect()),
            "Offset in Hz",
        ),
    );
    header
}

#[test]
fn merge_two_objects() {
    let a = test_object(&[1, 1, 1, 4096, 4, 2], &[Some(Coil), Some(Dyn)]);
    let b = a.clone();
    let merged = merge(&[a.clone(), b.clone()], Dyn).unwrap();
    assert_eq!(merged.shape(), vec![1, 1, 1, 4096, 4, 4]);
    assert_eq!(merged.dim_tags(), [Some(Coil), Some(Dyn), None]);
    assert_eq!(merged.data().select(Axis(5), &[0, 1]), *a.data());
    assert_eq!(merged.data().select(Axis(5), &[2, 3]), *b.data());
}

#[test]
fn split_then_merge() {
    let mut obj = test_object(&[1, 1, 1, 8, 16], &[Some(Dyn)]);
    obj.set_dim_tag(DimRef::Index(4), Dyn, Some("averages"), Some(dyn_header()))
        .unwrap();

    let (low, high) = split(&obj, Dyn, SplitSelector::At(7)).unwrap();
    assert_eq!(low.shape(), vec![1, 1, 1, 8, 8]);
    assert_eq!(high.shape(), vec![1, 1, 1, 8, 8]);
    let low_header = low.hdr_ext().dim_info(0).unwrap().header.clone().unwrap();
    let high_header = high.hdr_ext().dim_info(0).unwrap().header.clone().unwrap();
    assert_eq!(low_header["EchoTime"], HeaderValue::short(0, 1));
    assert_eq!(high_header["EchoTime"], HeaderValue::short(8, 1));
    assert_eq!(
        high_header["Offset"],
        HeaderValue::user_defined(
            HeaderValue::Long((8..16).map(|i| json!(i * i)).collect()),
            "Offset in Hz",
        )
    );
    assert_eq!(
        low.hdr_ext().dim_info(0).unwrap().info.as_deref(),
        Some("averages")
    );

    let merged = merge(&[low, high], Dyn).unwrap();
    assert_eq!(merged.data(), obj.data());
    assert_eq!(merged.hdr_ext(), obj.hdr_ext());
}

#[test]
fn split_at_every_index_is_reversible() {
    let obj = test_object(&[1, 1, 1, 4, 3, 5], &[Some(Coil), Some(Edit)]);
    for k in 0..4 {
        let (first, second) = split(&obj, DimRef::Index(5), SplitSelector::At(k)).unwrap();
        assert_eq!(first.shape()[5], k + 1);
        assert_eq!(second.shape()[5], 4 - k);
        let merged = merge(&[first, second], Edit).unwrap();
        assert_eq!(merged.data(), obj.data());
    }
}

#[test]
fn split_selected_indices() {
    let mut obj = test_object(&[1, 1, 1, 8, 4], &[Some(Edit)]);
    let mut header = DimensionHeader::new();
    let _ = header.insert("EchoTime".to_owned(), HeaderValue::short(0, 1));
    let _ = header.insert(
        "EditCondition".to_owned(),
        HeaderValue::Long(vec![json!("ON"), json!("OFF"), json!("ON"), json!("OFF")]),
    );
    obj.set_dim_tag(Edit, Edit, None, Some(header)).unwrap();

    let (others, selected) = split(&obj, Edit, SplitSelector::Indices(vec![1, 3])).unwrap();
    assert_eq!(others.shape(), vec![1, 1, 1, 8, 2]);
    assert_eq!(selected.data(), &obj.data().select(Axis(4), &[1, 3]));
    let header = selected.hdr_ext().dim_info(0).unwrap().header.clone().unwrap();
    assert_eq!(header["EchoTime"], HeaderValue::short(1, 2));
    assert_eq!(
        header["EditCondition"],
        HeaderValue::Long(vec![json!("OFF"), json!("OFF")])
    );
}

#[test]
fn split_errors() {
    let obj = test_object(&[1, 1, 1, 8, 4], &[Some(Dyn)]);
    assert!(matches!(
        split(&obj, Dyn, SplitSelector::At(3)),
        Err(NiftiMrsError::IndexOutOfRange(3, 4))
    ));
    assert!(matches!(
        split(&obj, Dyn, SplitSelector::Indices(vec![0, 4])),
        Err(NiftiMrsError::IndexOutOfRange(4, 4))
    ));
    assert!(matches!(
        split(&obj, Coil, SplitSelector::At(1)),
        Err(NiftiMrsError::DimensionNotFound(_))
    ));
    assert!(matches!(
        split(&obj, DimRef::Index(3), SplitSelector::At(1)),
        Err(NiftiMrsError::InvalidDimension(3, 5))
    ));
    assert!(matches!(
        split(&obj, DimRef::Index(5), SplitSelector::At(1)),
        Err(NiftiMrsError::InvalidDimension(5, 5))
    ));
}

#[test]
fn merge_along_squeezed_dimension() {
    let a = test_object(&[1, 1, 1, 8, 4], &[Some(Coil), Some(Dyn)]);
    assert_eq!(a.data().ndim(), 5);
    assert_eq!(a.shape(), vec![1, 1, 1, 8, 4, 1]);
    let merged = merge(&[a.clone(), a.clone(), a], Dyn).unwrap();
    assert_eq!(merged.shape(), vec![1, 1, 1, 8, 4, 3]);
}

#[test]
fn merge_errors() {
    let a = test_object(&[1, 1, 1, 8, 4, 2], &[Some(Coil), Some(Dyn)]);
    let other_tags = test_object(&[1, 1, 1, 8, 4, 2], &[Some(Coil), Some(Edit)]);
    let other_coils = test_object(&[1, 1, 1, 8, 2, 2], &[Some(Coil), Some(Dyn)]);

    assert!(matches!(
        merge(&[a.clone()], Dyn),
        Err(NiftiMrsError::InvalidArgument(_))
    ));
    assert!(matches!(
        merge(&[a.clone(), other_tags], Dyn),
        Err(NiftiMrsError::TagMismatch(_))
    ));
    match merge(&[a.clone(), other_coils], Dyn) {
        Err(NiftiMrsError::ShapeMismatch(msg)) => assert!(msg.contains("axis 4")),
        other => panic!("unexpected result {:?}", other),
    }

    let mut with_header = a.clone();
    let mut header = DimensionHeader::new();
    let _ = header.insert(
        "RxCoil".to_owned(),
        HeaderValue::Long(vec![json!("a"), json!("b"), json!("c"), json!("d")]),
    );
    with_header
        .set_dim_tag(Coil, Coil, None, Some(header))
        .unwrap();
    match merge(&[a, with_header], Dyn) {
        Err(NiftiMrsError::TagMismatch(msg)) => assert!(msg.contains("RxCoil")),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn merge_keeps_long_headers_long() {
    let mut a = test_object(&[1, 1, 1, 8, 2], &[Some(Dyn)]);
    let mut header = DimensionHeader::new();
    let _ = header.insert(
        "EchoTime".to_owned(),
        HeaderValue::Long(vec![json!(0.01), json!(0.02)]),
    );
    a.set_dim_tag(Dyn, Dyn, None, Some(header)).unwrap();
    let mut b = test_object(&[1, 1, 1, 8, 2], &[Some(Dyn)]);
    let mut header = DimensionHeader::new();
    let _ = header.insert(
        "EchoTime".to_owned(),
        HeaderValue::Long(vec![json!(0.03), json!(0.04)]),
    );
    b.set_dim_tag(Dyn, Dyn, None, Some(header)).unwrap();

    let merged = merge(&[a, b], Dyn).unwrap();
    let header = merged.hdr_ext().dim_info(0).unwrap().header.clone().unwrap();
    assert_eq!(
        header["EchoTime"],
        HeaderValue::Long(vec![json!(0.01), json!(0.02), json!(0.03), json!(0.04)])
    );
    assert_eq!(ramp_data(&[1, 1, 1, 8, 2]), merged.data().select(Axis(4), &[0, 1]));
}

#[test]
fn merge_rejects_differing_dimension_info() {
    let mut a = test_object(&[1, 1, 1, 8, 4, 2], &[Some(Coil), Some(Dyn)]);
    let mut b = a.clone();
    a.set_dim_tag(Coil, Coil, Some("array A"), None).unwrap();
    b.set_dim_tag(Coil, Coil, Some("array B"), None).unwrap();
    match merge(&[a.clone(), b], Dyn) {
        Err(NiftiMrsError::TagMismatch(msg)) => assert!(msg.contains("dim_5_info")),
        other => panic!("unexpected result {:?}", other),
    }

    let mut c = a.clone();
    c.set_dim_tag(Dyn, Dyn, Some("second half"), None).unwrap();
    match merge(&[a.clone(), c], Dyn) {
        Err(NiftiMrsError::TagMismatch(msg)) => assert!(msg.contains("dim_6_info")),
        other => panic!("unexpected result {:?}", other),
    }

    let merged = merge(&[a.clone(), a], Dyn).unwrap();
    assert_eq!(
        merged.hdr_ext().dim_info(0).unwrap().info.as_deref(),
        Some("array A")
    );
}

#[test]
fn split_short_header_at_integer_limit() {
    let mut obj = test_object(&[1, 1, 1, 8, 2], &[Some(Dyn)]);
    let mut header = DimensionHeader::new();
    let _ = header.insert("EchoTime".to_owned(), HeaderValue::short(i64::MAX, 1));
    obj.set_dim_tag(Dyn, Dyn, None, Some(header)).unwrap();
    assert!(obj.validate().is_ok());

    let (first, second) = split(&obj, Dyn, SplitSelector::At(0)).unwrap();
    let first_header = first.hdr_ext().dim_info(0).unwrap().header.clone().unwrap();
    assert_eq!(first_header["EchoTime"].values(1), vec![json!(i64::MAX)]);
    assert_eq!(second.shape(), vec![1, 1, 1, 8, 1]);

    let values = obj.dynamic_hdr_vals().unwrap();
    assert_eq!(values.len(), 2);
}
