use nifti_mrs::{validate_hdr_ext, HeaderExtension, NiftiMrsError};
use serde_json::json;

fn check(value: serde_json::Value, sizes: &[usize], ndim: Option<usize>) -> nifti_mrs::Result<()> {
    validate_hdr_ext(&value.to_string(), sizes, ndim)
}

#[test]
fn rank_boundary() {
    let without_tag = json!({"SpectrometerFrequency": [123.2], "ResonantNucleus": ["1H"]});
    match check(without_tag, &[1, 1, 1, 512, 4], Some(5)) {
        Err(NiftiMrsError::DimensionTagExceedsRank(key, 5)) => assert_eq!(key, "dim_5"),
        other => panic!("unexpected result {:?}", other),
    }

    let with_tag = json!({
        "SpectrometerFrequency": [123.2],
        "ResonantNucleus": ["1H"],
        "dim_5": "DIM_DYN",
        "dim_5_header": {"EchoTime": [0.01, 0.02, 0.03, 0.04]},
    });
    assert!(check(with_tag.clone(), &[1, 1, 1, 512, 4], Some(5)).is_ok());
    assert!(check(with_tag, &[1, 1, 1, 512, 4], None).is_ok());
}

#[test]
fn header_length_mismatch() {
    let hdr = json!({
        "SpectrometerFrequency": [123.2],
        "ResonantNucleus": ["1H"],
        "dim_5": "DIM_DYN",
        "dim_5_header": {"EchoTime": [0, 1, 3]},
    });
    match check(hdr, &[1, 1, 1, 512, 4], None) {
        Err(NiftiMrsError::BadDynamicHeaderShape(key, 4, 3)) => assert_eq!(key, "EchoTime"),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn failures_in_order() {
    assert!(matches!(
        validate_hdr_ext("{not json", &[1, 1, 1, 512], None),
        Err(NiftiMrsError::NotJson(_))
    ));
    assert!(matches!(
        check(json!({"ResonantNucleus": ["1H"]}), &[1, 1, 1, 512], None),
        Err(NiftiMrsError::MissingField(_))
    ));
    assert!(matches!(
        check(
            json!({"SpectrometerFrequency": 123.2, "ResonantNucleus": ["1H"]}),
            &[1, 1, 1, 512],
            None
        ),
        Err(NiftiMrsError::WrongType(_, _))
    ));
    assert!(matches!(
        check(
            json!({"SpectrometerFrequency": [123.2], "ResonantNucleus": [1]}),
            &[1, 1, 1, 512],
            None
        ),
        Err(NiftiMrsError::WrongType(_, _))
    ));

    let base = || json!({"SpectrometerFrequency": [123.2], "ResonantNucleus": ["1H"]});

    let mut hdr = base();
    hdr["dim_5"] = json!("DIM_NOTHING");
    assert!(matches!(
        check(hdr, &[1, 1, 1, 512, 2], None),
        Err(NiftiMrsError::UnknownTag(_))
    ));

    let mut hdr = base();
    hdr["dim_5"] = json!("DIM_DYN");
    hdr["dim_5_info"] = json!(5);
    assert!(matches!(
        check(hdr, &[1, 1, 1, 512, 2], None),
        Err(NiftiMrsError::WrongType(_, _))
    ));

    let mut hdr = base();
    hdr["dim_6"] = json!("DIM_DYN");
    assert!(matches!(
        check(hdr, &[1, 1, 1, 512, 2], Some(5)),
        Err(NiftiMrsError::DimensionTagExceedsRank(_, 5))
    ));

    let mut hdr = base();
    hdr["dim_4"] = json!("DIM_DYN");
    match check(hdr, &[1, 1, 1, 512], None) {
        Err(NiftiMrsError::ForbiddenKey(key)) => assert_eq!(key, "dim_4"),
        other => panic!("unexpected result {:?}", other),
    }

    let mut hdr = base();
    hdr["EchoTime"] = json!("long");
    assert!(matches!(
        check(hdr, &[1, 1, 1, 512], None),
        Err(NiftiMrsError::WrongType(_, _))
    ));

    let mut hdr = base();
    hdr["MyField"] = json!({"Value": 1});
    match check(hdr, &[1, 1, 1, 512], None) {
        Err(NiftiMrsError::MalformedUserField(key)) => assert_eq!(key, "MyField"),
        other => panic!("unexpected result {:?}", other),
    }

    let mut hdr = base();
    hdr["dim_5"] = json!("DIM_DYN");
    hdr["dim_5_header"] = json!({"EchoTime": 0.01});
    assert!(matches!(
        check(hdr, &[1, 1, 1, 512, 2], None),
        Err(NiftiMrsError::BadDynamicHeaderFormat(_, _))
    ));

    let mut hdr = base();
    hdr["dim_5"] = json!("DIM_DYN");
    hdr["dim_5_header"] = json!({"Offset": [1, 2]});
    assert!(matches!(
        check(hdr, &[1, 1, 1, 512, 2], None),
        Err(NiftiMrsError::MalformedUserField(_))
    ));
}

#[test]
fn accepts_well_formed_headers() {
    let hdr = json!({
        "SpectrometerFrequency": [123.2, 49.8],
        "ResonantNucleus": ["1H", "31P"],
        "dim_5": "DIM_COIL",
        "dim_6": "DIM_EDIT",
        "dim_6_info": "MEGA editing",
        "dim_6_header": {
            "EditCondition": ["ON", "OFF"],
            "Offset": {"Value": {"start": 0, "increment": 100}, "Description": "Offset in Hz"},
        },
        "EchoTime": 0.068,
        "WaterSuppressed": true,
        "EditPulse": {"ON": {"PulseOffset": 1.9}},
        "Notes": {"Description": "free text", "Text": "first scan"},
    });
    assert!(check(hdr, &[1, 1, 1, 2048, 32, 2], None).is_ok());

    // only the first element of an array is type checked
    let hdr = json!({
        "SpectrometerFrequency": [123.2],
        "ResonantNucleus": ["1H"],
        "VOI": [[1.0, 0.0, 0.0, 0.0], "x"],
    });
    assert!(check(hdr, &[1, 1, 1, 512], None).is_ok());
}

#[test]
fn dimension_like_keys_are_user_fields() {
    let undescribed = json!({
        "SpectrometerFrequency": [123.2],
        "ResonantNucleus": ["1H"],
        "dim_05": 3,
    });
    match check(undescribed.clone(), &[1, 1, 1, 512], None) {
        Err(NiftiMrsError::MalformedUserField(key)) => assert_eq!(key, "dim_05"),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(matches!(
        HeaderExtension::from_value(&undescribed),
        Err(NiftiMrsError::MalformedUserField(_))
    ));

    let described = json!({
        "SpectrometerFrequency": [123.2],
        "ResonantNucleus": ["1H"],
        "dim_05": {"Value": 3, "Description": "not a dimension"},
    });
    assert!(check(described.clone(), &[1, 1, 1, 512], None).is_ok());
    let hdr = HeaderExtension::from_value(&described).unwrap();
    assert_eq!(hdr.ndim(), 4);
    assert!(hdr.has_field("dim_05"));

    assert!(matches!(
        check(
            json!({"SpectrometerFrequency": [123.2], "ResonantNucleus": ["1H"], "dim_4": "DIM_DYN"}),
            &[1, 1, 1, 512],
            None
        ),
        Err(NiftiMrsError::ForbiddenKey(_))
    ));
}
