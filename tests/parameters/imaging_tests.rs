use approx::assert_relative_eq;
use drprobe_rs::aberration::Aberration;
use drprobe_rs::parameters::{
    FieldType, FieldValue, ParameterFile, StructuralError, ValidationError,
};
use drprobe_rs::{DrProbeError, ImagingParameters, LoopDefinition};

use crate::test_helpers::{fixture, value_columns};

const DEFAULT_VALUES: [&str; 21] = [
    "'wav/xxx.wav'",
    "256, 256",
    "0.0, 0.0",
    "80.0",
    "1",
    "'img/xxx.dat'",
    "256, 256",
    "0, 1.0, 1.0, 0.0",
    "0",
    "0.0",
    "0.0, 0.0",
    "0.0",
    "1",
    "1, 0.5",
    "1, 0.4",
    "1, 1.0, 'PICO-US4k-080_mtf_bin1_4096.mtf'",
    "1, 0.022, 0.022, 0.0",
    "0",
    "15.0",
    "0.0, 0.0",
    "0",
];

#[test]
fn test_default_file_text() {
    let text = ImagingParameters::new().to_prm_string().unwrap();
    assert_eq!(value_columns(&text), DEFAULT_VALUES);

    // Every line carries a comment, aligned to one column
    let columns: Vec<usize> = text.lines().map(|line| line.find(" ! ").unwrap()).collect();
    assert!(columns.iter().all(|&column| column == columns[0]));
    assert!(text.ends_with('\n'));
}

#[test]
fn test_load_fixture() {
    let params = ImagingParameters::load(fixture("wavimg.prm")).unwrap();

    assert_eq!(params.wave_files(), "wav/STO_sl010.wav");
    assert_eq!(params.wave_dim(), &(256, 256));
    assert_relative_eq!(params.wave_sampling().0, 0.0152);
    assert_relative_eq!(*params.high_tension(), 300.0);
    assert_eq!(params.output_format(), &0);
    assert_eq!(params.output_dim(), &(40, 40));
    assert_eq!(params.coherence_model(), &5);
    assert_relative_eq!(params.temp_coherence().params, 4.0);
    assert!(!params.mtf().is_on());
    assert_eq!(params.mtf().params.1, "mtf/detector.mtf");

    assert_eq!(params.number_of_aberrations(), 2);
    assert_relative_eq!(params.aberration(1).unwrap().x, -5.5);
    assert_relative_eq!(params.aberration(5).unwrap().x, 1200.0);
    assert_relative_eq!(*params.oa_radius(), 200.0);
    assert_eq!(params.number_of_loops(), 0);
}

#[test]
fn test_malformed_line_is_reported() {
    let text = ImagingParameters::new().to_prm_string().unwrap();
    let broken: Vec<String> = text
        .lines()
        .enumerate()
        .map(|(index, line)| {
            if index == 6 {
                "256 ! Image output size".to_string()
            } else {
                line.to_string()
            }
        })
        .collect();

    let error = ImagingParameters::from_prm_str(&broken.join("\n")).unwrap_err();
    assert_eq!(error.line, 7);
    assert_eq!(error.field, "output_dim");
    assert!(matches!(error.source, StructuralError::TokenCount { found: 1, .. }));
    assert!(error.to_string().starts_with("line 7 (output_dim)"));
}

#[test]
fn test_wrong_token_type() {
    let text = ImagingParameters::new()
        .to_prm_string()
        .unwrap()
        .replacen("80.0", "high", 1);

    let error = ImagingParameters::from_prm_str(&text).unwrap_err();
    assert_eq!(error.line, 4);
    assert!(matches!(error.source, StructuralError::InvalidToken { .. }));
}

#[test]
fn test_truncated_file() {
    let text = ImagingParameters::new().to_prm_string().unwrap();
    let truncated: Vec<&str> = text.lines().take(10).collect();

    let error = ImagingParameters::from_prm_str(&truncated.join("\n")).unwrap_err();
    assert_eq!(error.field, "img_frame_offset");
    assert!(matches!(error.source, StructuralError::UnexpectedEof));
}

#[test]
fn test_aberration_count_follows_list() {
    let mut params = ImagingParameters::new();
    params.set_aberration(Aberration::defocus(-5.5)).unwrap();
    params.set_aberration(Aberration::new(2, 0.3, 0.1)).unwrap();
    params.set_aberration(Aberration::spherical(1200.0)).unwrap();

    let text = params.to_prm_string().unwrap();
    let values = value_columns(&text);
    let count_line = values.iter().position(|line| line == "3").unwrap();
    assert_eq!(
        &values[count_line + 1..count_line + 4],
        ["1, -5.5, 0.0", "2, 0.3, 0.1", "5, 1200.0, 0.0"]
    );

    let back = ImagingParameters::from_prm_str(&text).unwrap();
    assert_eq!(back.aberrations(), params.aberrations());
}

#[test]
fn test_aberration_count_mismatch() {
    // Count announces three records, only two follow before the aperture line
    let text = std::fs::read_to_string(fixture("wavimg.prm")).unwrap();
    let text: Vec<&str> = text
        .lines()
        .enumerate()
        .map(|(index, line)| if index == 17 { "3 ! aberrations" } else { line })
        .collect();
    let text = text.join("\n");

    let error = ImagingParameters::from_prm_str(&text).unwrap_err();
    assert_eq!(error.field, "aberrations");
    assert_eq!(error.line, 21);
}

#[test]
fn test_huge_record_count_is_truncation() {
    let text = std::fs::read_to_string(fixture("wavimg.prm")).unwrap();
    let text: Vec<&str> = text
        .lines()
        .enumerate()
        .map(|(index, line)| if index == 22 { "1000000000000000000 ! loops" } else { line })
        .collect();
    let text = text.join("\n");

    let error = ImagingParameters::from_prm_str(&text).unwrap_err();
    assert_eq!(error.field, "loops");
    assert_eq!(error.line, 24);
    assert!(matches!(error.source, StructuralError::UnexpectedEof));
}

#[test]
fn test_generic_access() {
    let mut params = ImagingParameters::new();

    assert_eq!(params.get("coherence_model"), Some(FieldValue::int(1)));
    assert_eq!(params.get("no_such_field"), None);

    params.set("high_tension", &FieldValue::real(300.0)).unwrap();
    assert_relative_eq!(*params.high_tension(), 300.0);

    match params.set("coherence_model", &FieldValue::int(7)) {
        Err(ValidationError::NotAChoice { field, .. }) => assert_eq!(field, "coherence_model"),
        other => panic!("Expected NotAChoice, got {:?}", other),
    }
    assert!(matches!(
        params.set("no_such_field", &FieldValue::int(1)),
        Err(ValidationError::UnknownField { .. })
    ));
}

#[test]
fn test_loop_series_survives_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prm").join("wavimg.prm");

    let mut params = ImagingParameters::new();
    params
        .add_loop(LoopDefinition::aberration_series(1, -20.0, 20.0, 9, "foc"))
        .unwrap();
    params.save(&path).unwrap();

    let back = ImagingParameters::load(&path).unwrap();
    assert_eq!(back.loops(), params.loops());
    assert_eq!(back.loops()[0].samples, 9);
}

#[test]
fn test_load_missing_file() {
    match ImagingParameters::load(fixture("does_not_exist.prm")) {
        Err(DrProbeError::NotFound { path }) => assert!(path.ends_with("does_not_exist.prm")),
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_json_export() {
    let params = ImagingParameters::load(fixture("wavimg.prm")).unwrap();
    let json = params.to_json().unwrap();
    let back = ImagingParameters::from_json(&json).unwrap();
    assert_eq!(back, params);

    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["coherence_model"] = serde_json::json!(9);
    let invalid = value.to_string();
    assert!(matches!(
        ImagingParameters::from_json(&invalid),
        Err(DrProbeError::Validation(_))
    ));

    // Tuples convert through the generic field form as well
    assert_eq!(params.get("output_dim"), Some((40usize, 40usize).to_field()));
}
