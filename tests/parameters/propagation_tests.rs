use approx::assert_relative_eq;
use drprobe_rs::aberration::Aberration;
use drprobe_rs::parameters::{ParameterFile, StructuralError, ValidationError};
use drprobe_rs::propagation::{periodic_slice_sequence, random_slice_sequence};
use drprobe_rs::{Convergence, DrProbeError, PropagationParameters};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::test_helpers::{fixture, value_columns};

#[test]
fn test_load_fixture() {
    let params = PropagationParameters::load(fixture("msa.prm")).unwrap();

    assert_eq!(params.conv_semi_angle(), &Convergence::Symmetric(21.4));
    assert_relative_eq!(*params.inner_radius_ann_det(), 70.0);
    assert!(params.detector().is_on());
    assert_eq!(params.detector().params, "prm/msa_det.prm");
    assert_relative_eq!(*params.wavelength(), 0.00197);
    assert_eq!(params.number_of_aberrations(), 2);
    assert_relative_eq!(params.aberration(5).unwrap().x, -1500.0);

    assert_eq!(params.scan_columns(), &20);
    assert_eq!(params.super_cell_z(), &2);
    assert_eq!(params.slice_files(), "slc/STO");
    assert_eq!(params.number_of_slices(), &4);
    assert_eq!(params.number_frozen_lattice(), &10);
    assert_eq!(params.total_number_of_slices(), 8);
    assert_eq!(params.slice_sequence(), &vec![0, 1, 2, 3, 0, 1, 2, 3]);
}

#[test]
fn test_save_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("msa.prm");

    let mut params = PropagationParameters::load(fixture("msa.prm")).unwrap();
    params
        .set_conv_semi_angle(Convergence::Asymmetric(25.0, 0.1, 45.0))
        .unwrap();
    params.set_aberration(Aberration::new(2, 1.5, -0.5)).unwrap();
    params.set_periodic_slices(12).unwrap();
    params.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let values = value_columns(&text);
    assert_eq!(values[0], "'[Microscope Parameters]'");
    assert_eq!(values[1], "25.0, 0.1, 45.0");
    assert!(values.contains(&"'[Multislice Parameters]'".to_string()));
    assert_eq!(values.last().map(String::as_str), Some("End of parameter file."));

    let back = PropagationParameters::load(&path).unwrap();
    assert_eq!(back, params);
    assert_eq!(back.total_number_of_slices(), 12);
}

#[test]
fn test_missing_section_line() {
    let text = std::fs::read_to_string(fixture("msa.prm")).unwrap();
    let text = text.replacen("'[Multislice Parameters]'", "'[Scan Parameters]'", 1);

    let error = PropagationParameters::from_prm_str(&text).unwrap_err();
    assert_eq!(error.line, 14);
    assert_eq!(error.field, "multislice_section");
    assert!(matches!(error.source, StructuralError::UnexpectedHeading { .. }));
}

#[test]
fn test_lenient_section_lines() {
    let text = std::fs::read_to_string(fixture("msa.prm")).unwrap();
    let text = text
        .replacen("'[Microscope Parameters]'", "[microscope parameters]", 1)
        .replacen("End of parameter file.\n", "", 1);

    let params = PropagationParameters::from_prm_str(&text).unwrap();
    assert_eq!(params.total_number_of_slices(), 8);
}

#[test]
fn test_slice_ids_checked_on_save() {
    let mut params = PropagationParameters::new();
    params.set_number_of_slices(2).unwrap();

    // Default sequence cycles through five slice files
    match params.save(tempfile::tempdir().unwrap().path().join("msa.prm")) {
        Err(DrProbeError::Validation(ValidationError::Invariant { field, .. })) => {
            assert_eq!(field, "slice_sequence")
        }
        other => panic!("Expected Invariant error, got {:?}", other),
    }

    params.set_periodic_slices(6).unwrap();
    assert_eq!(params.slice_sequence(), &vec![0, 1, 0, 1, 0, 1]);
    assert!(params.to_prm_string().is_ok());
}

#[test]
fn test_positive_counts() {
    let mut params = PropagationParameters::new();
    assert!(params.set_number_of_slices(0).is_err());
    assert!(params.set_super_cell_x(0).is_err());
    assert!(params.set_focus_spread_kernel_size(0).is_err());
    assert!(params.set_scan_columns(0).is_ok());
    assert_eq!(params.number_of_slices(), &5);
}

#[test]
fn test_random_slices_reproducible() {
    let mut params = PropagationParameters::new();
    params.set_number_of_slices(12).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    params.set_random_slices(40, &mut rng).unwrap();
    assert!(params.validate().is_ok());
    assert!(params.slice_sequence().iter().all(|&id| id < 12));

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    assert_eq!(params.slice_sequence(), &random_slice_sequence(12, 40, &mut rng));
}

#[test]
fn test_periodic_sequence() {
    assert_eq!(periodic_slice_sequence(3, 7), vec![0, 1, 2, 0, 1, 2, 0]);
    assert!(periodic_slice_sequence(0, 7).is_empty());
}
