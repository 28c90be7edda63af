use nifti_mrs::{
    DimensionHeader, DimensionTag, HeaderExtension, HeaderValue, NiftiMrsError,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn new_then_tag_coils() {
    let mut hdr = HeaderExtension::new(&[128.0], &["1H"], Some(5)).unwrap();
    hdr.set_dim_info(0, DimensionTag::Coil, None, None).unwrap();
    let value = hdr.to_value();
    assert_eq!(value["dim_5"], json!("DIM_COIL"));
    assert_eq!(hdr.ndim(), 5);
}

#[test]
fn from_value_round_trip() {
    let value = json!({
        "SpectrometerFrequency": [297.219948],
        "ResonantNucleus": ["1H"],
        "dim_5": "DIM_COIL",
        "dim_6": "DIM_DYN",
        "dim_6_info": "averages",
        "dim_6_header": {
            "RepetitionTime": {"start": 1, "increment": 1},
            "EchoTime": [0.01, 0.02, 0.04, 0.08],
            "Frequency_offset": {"Value": [0, 10, 20, 30], "Description": "Offset in Hz"},
        },
        "EchoTime": 0.03,
        "Manufacturer": "Siemens",
        "Shim": {"Value": [1, 2, 3], "Description": "Shim currents"},
    });
    let hdr = HeaderExtension::from_value(&value).unwrap();
    assert_eq!(
        hdr.dim_tags(),
        [Some(DimensionTag::Coil), Some(DimensionTag::Dyn), None]
    );
    assert_eq!(hdr.dim_info(1).unwrap().info.as_deref(), Some("averages"));
    let header = hdr.dim_info(1).unwrap().header.as_ref().unwrap();
    assert_eq!(header["RepetitionTime"], HeaderValue::short(1, 1));
    assert_eq!(
        header["Frequency_offset"],
        HeaderValue::user_defined(
            HeaderValue::Long(vec![json!(0), json!(10), json!(20), json!(30)]),
            "Offset in Hz"
        )
    );
    assert_eq!(hdr.get_standard_def("Manufacturer"), Some(&json!("Siemens")));
    assert!(hdr.get_user_def("Shim").is_some());

    assert_eq!(hdr.to_value(), value);
    assert_eq!(HeaderExtension::from_value(&hdr.to_value()).unwrap(), hdr);
    assert_eq!(HeaderExtension::from_json(&hdr.to_json_pretty()).unwrap(), hdr);

    let via_serde: HeaderExtension = serde_json::from_str(&hdr.to_json()).unwrap();
    assert_eq!(via_serde, hdr);
}

#[test]
fn scalar_required_fields() {
    let hdr = HeaderExtension::from_value(&json!({
        "SpectrometerFrequency": 123.2,
        "ResonantNucleus": "1H",
    }))
    .unwrap();
    assert_eq!(hdr.spectrometer_frequency(), &[123.2]);
    assert_eq!(hdr.resonant_nucleus(), &["1H".to_owned()]);
    assert_eq!(hdr.ndim(), 4);
}

#[test]
fn from_value_errors() {
    match HeaderExtension::from_value(&json!({"ResonantNucleus": ["1H"]})) {
        Err(NiftiMrsError::MissingField(key)) => assert_eq!(key, "SpectrometerFrequency"),
        other => panic!("unexpected result {:?}", other),
    }
    match HeaderExtension::from_value(&json!({
        "SpectrometerFrequency": [123.2],
        "ResonantNucleus": ["1H"],
        "Shim": 3,
    })) {
        Err(NiftiMrsError::MalformedUserField(key)) => assert_eq!(key, "Shim"),
        other => panic!("unexpected result {:?}", other),
    }
    match HeaderExtension::from_value(&json!({
        "SpectrometerFrequency": [123.2],
        "ResonantNucleus": ["1H"],
        "dim_5": "DIM_SOMETHING",
    })) {
        Err(NiftiMrsError::UnknownTag(tag)) => assert_eq!(tag, "DIM_SOMETHING"),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn standard_and_user_fields() {
    let mut hdr = HeaderExtension::new(&[123.2], &["1H"], None).unwrap();
    assert!(matches!(
        hdr.set_standard_def("Shim", json!(1)),
        Err(NiftiMrsError::UnknownStandardKey(_))
    ));
    assert!(matches!(
        hdr.remove_standard_def("EchoTime"),
        Err(NiftiMrsError::KeyNotFound(_))
    ));
    assert!(matches!(
        hdr.set_user_def("EchoTime", json!(1), "doc"),
        Err(NiftiMrsError::ReservedKey(_))
    ));

    hdr.set_standard_def("EchoTime", json!(0.03)).unwrap();
    hdr.set_user_def("Sequence", json!({"TE1": 0.01}), "Sequence timings")
        .unwrap();
    assert_eq!(
        hdr.get_user_def("Sequence"),
        Some(&json!({"TE1": 0.01, "Description": "Sequence timings"}))
    );
    assert_eq!(hdr.remove_standard_def("EchoTime").unwrap(), json!(0.03));
    assert!(hdr.remove_user_def("Sequence").is_ok());
    assert_eq!(hdr, HeaderExtension::new(&[123.2], &["1H"], None).unwrap());
}

#[test]
fn set_dim_info_clears_omitted_fields() {
    let mut header = DimensionHeader::new();
    let _ = header.insert("EchoTime".to_owned(), HeaderValue::short(1, 1));
    let mut hdr = HeaderExtension::new(&[123.2], &["1H"], None).unwrap();
    hdr.set_dim_info(0, DimensionTag::Dyn, Some("averages"), Some(header))
        .unwrap();
    hdr.set_dim_info(0, DimensionTag::Edit, None, None).unwrap();
    let dim = hdr.dim_info(0).unwrap();
    assert_eq!(dim.tag, Some(DimensionTag::Edit));
    assert_eq!(dim.info, None);
    assert_eq!(dim.header, None);
    assert!(hdr.set_dim_info(3, DimensionTag::Edit, None, None).is_err());
}
