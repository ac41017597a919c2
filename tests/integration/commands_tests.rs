use std::cell::RefCell;
use std::path::PathBuf;

use drprobe_rs::commands::{
    ArgumentError, CelslcCommand, CelslcSwitch, CommandInvoker, CompletionResult, Invocation,
    InvokerConfig, MsaCommand, MsaSwitch, ProcessRunner, Program, WavimgCommand,
};
use drprobe_rs::parameters::ParameterFile;
use drprobe_rs::{DrProbeError, ImagingParameters};

use crate::test_helpers::fixture;

/// Records every launch and answers with a fixed exit code
struct RecordingRunner {
    exit_code: Option<i32>,
    launched: RefCell<Vec<Invocation>>,
}

impl RecordingRunner {
    fn new(exit_code: Option<i32>) -> Self {
        Self {
            exit_code,
            launched: RefCell::new(Vec::new()),
        }
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CompletionResult> {
        self.launched.borrow_mut().push(invocation.clone());
        Ok(CompletionResult {
            exit_code: self.exit_code,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

/// Imaging stage without an output name fails before anything is launched
#[test]
fn test_missing_output_name_spawns_nothing() {
    let invoker =
        CommandInvoker::with_runner(InvokerConfig::default(), RecordingRunner::new(Some(0)));

    let error = invoker.run(&WavimgCommand::new(fixture("wavimg.prm"))).unwrap_err();
    assert!(matches!(
        error,
        DrProbeError::Argument(ArgumentError::Missing {
            program: "wavimg",
            argument: "output"
        })
    ));
    assert!(invoker.runner().launched.borrow().is_empty());
}

#[test]
fn test_simulation_chain() {
    let dir = tempfile::tempdir().unwrap();
    let config = InvokerConfig::new()
        .with_bin_dir("/opt/drprobe")
        .with_working_dir(dir.path());
    let invoker = CommandInvoker::with_runner(config, RecordingRunner::new(Some(0)));

    let slices = CelslcCommand::new("SrTiO3.cel", "slc/STO", 300.0)
        .with_sampling(128, 128, 4)
        .with_switch(CelslcSwitch::DebyeWaller);
    let multislice = MsaCommand::new("msa.prm", "wav/STO.wav").with_switch(MsaSwitch::Ctem);

    let params = ImagingParameters::load(fixture("wavimg.prm")).unwrap();
    let image = WavimgCommand::from_parameters("wavimg.prm", &params);

    invoker.run(&slices).unwrap();
    invoker.run(&multislice).unwrap();
    invoker.run(&image).unwrap();

    let launched = invoker.runner().launched.borrow();
    let programs: Vec<PathBuf> = launched.iter().map(|i| i.program.clone()).collect();
    assert_eq!(
        programs,
        vec![
            PathBuf::from("/opt/drprobe/celslc"),
            PathBuf::from("/opt/drprobe/msa"),
            PathBuf::from("/opt/drprobe/wavimg"),
        ]
    );
    assert_eq!(launched[2].args[2..4], ["-out", "img/STO.dat"]);

    for dir_name in ["slc", "wav", "img"] {
        assert!(dir.path().join(dir_name).is_dir(), "{} not created", dir_name);
    }
}

#[test]
fn test_failure_reports_exit_code() {
    let invoker = CommandInvoker::with_runner(
        InvokerConfig::new().with_create_output_dirs(false),
        RecordingRunner::new(Some(1)),
    );

    let command = MsaCommand::new("msa.prm", "wav/STO.wav");
    match invoker.run(&command) {
        Err(error @ DrProbeError::SimulationFailure { .. }) => {
            assert_eq!(error.to_string(), "msa failed with exit code 1");
        }
        other => panic!("Expected SimulationFailure, got {:?}", other),
    }
}

#[test]
fn test_invocation_preview() {
    let invoker = CommandInvoker::with_config(
        InvokerConfig::new().with_program(Program::Celslc, "celslc.exe"),
    );

    let command = CelslcCommand::new("model/GaN.cif", "slc/GaN", 200.0).with_sampling(64, 64, 2);
    let invocation = invoker.invocation(&command).unwrap();
    assert_eq!(
        invocation.command_line(),
        "celslc.exe -cif model/GaN.cif -slc slc/GaN -nx 64 -ny 64 -nz 2 -ht 200"
    );
}
