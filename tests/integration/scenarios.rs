use drprobe_rs::parameters::{FieldValue, ParameterFile, ValidationError};
use drprobe_rs::{DrProbeError, ImagingParameters};

use crate::test_helpers::{fixture, value_columns};

/// Load, change one field, save and load again: only that field differs
#[test]
fn test_edit_output_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wavimg.prm");

    let original = ImagingParameters::load(fixture("wavimg.prm")).unwrap();
    assert_eq!(original.output_dim(), &(40, 40));

    let mut edited = original.clone();
    edited.set_output_dim((256, 256)).unwrap();
    edited.save(&path).unwrap();

    let reloaded = ImagingParameters::load(&path).unwrap();
    assert_eq!(reloaded.output_dim(), &(256, 256));

    for name in ImagingParameters::field_names() {
        if name != "output_dim" {
            assert_eq!(reloaded.get(name), original.get(name), "field {} changed", name);
        }
    }

    let changed_lines = |before: &[String], after: &[String]| -> Vec<usize> {
        assert_eq!(before.len(), after.len());
        (0..before.len()).filter(|&i| before[i] != after[i]).collect()
    };
    let after = value_columns(&std::fs::read_to_string(&path).unwrap());

    // Against an unedited save only the output size line differs
    let baseline = dir.path().join("baseline.prm");
    original.save(&baseline).unwrap();
    let before = value_columns(&std::fs::read_to_string(&baseline).unwrap());
    assert_eq!(changed_lines(&before, &after), vec![6]);
    assert_eq!(after[6], "256, 256");

    // Against the fixture the reals `300.` and `1.2d3` are also normalized
    let fixture_columns = value_columns(&std::fs::read_to_string(fixture("wavimg.prm")).unwrap());
    assert_eq!(changed_lines(&fixture_columns, &after), vec![3, 6, 19]);
    assert_eq!(after[3], "300.0");
    assert_eq!(after[19], "5, 1200.0, 0.0");
}

/// A save that cannot create the target reports a write error and leaves no file
#[test]
fn test_save_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let target = blocker.join("wavimg.prm");

    let error = ImagingParameters::new().save(&target).unwrap_err();
    match error {
        DrProbeError::Write { path, .. } => assert_eq!(path, target),
        other => panic!("Expected Write error, got {:?}", other),
    }

    assert!(!target.exists());
    assert!(blocker.is_file());
    assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "not a directory");
}

/// An out-of-range setting is rejected and the model is unchanged
#[test]
fn test_invalid_coherence_model() {
    let mut params = ImagingParameters::load(fixture("wavimg.prm")).unwrap();
    let before = params.clone();

    let error = params.set_coherence_model(9).unwrap_err();
    assert!(matches!(error, ValidationError::NotAChoice { field: "coherence_model", .. }));

    let error = params.set("coherence_model", &FieldValue::int(0)).unwrap_err();
    assert!(matches!(error, ValidationError::NotAChoice { .. }));

    assert_eq!(params, before);
}

/// A malformed file names the offending line and nothing is returned
#[test]
fn test_load_reports_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wavimg.prm");

    let text = std::fs::read_to_string(fixture("wavimg.prm")).unwrap();
    let text = text.replacen("40, 40 ", "40, forty ", 1);
    std::fs::write(&path, text).unwrap();

    match ImagingParameters::load(&path) {
        Err(DrProbeError::Load { path: failed, source }) => {
            assert_eq!(failed, path);
            assert_eq!(source.line, 7);
            assert_eq!(source.field, "output_dim");
        }
        other => panic!("Expected Load error, got {:?}", other),
    }
}

/// Saving writes only after the whole model validates
#[test]
fn test_invalid_model_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wavimg.prm");

    let mut params = ImagingParameters::new();
    let mut value: serde_json::Value = serde_json::from_str(&params.to_json().unwrap()).unwrap();
    value["output_dim"] = serde_json::json!([0, 256]);
    assert!(ImagingParameters::from_json(&value.to_string()).is_err());

    params.set_output_dim((128, 128)).unwrap();
    params.save(&path).unwrap();
    assert!(path.is_file());
}
