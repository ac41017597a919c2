//! Command line of `CellMuncher`, the structure file editor

use super::{check_range, require_path, ArgumentError, Program, Stage};
use crate::parameters::Bounds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

const PROGRAM: &str = "CellMuncher";

/// Cell axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Invocation of `CellMuncher` on a CEL structure file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellMuncherCommand {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Write a CIF file
    pub cif: bool,
    /// Cell attached along an axis
    pub attach: Option<(PathBuf, Axis)>,
    /// Repetitions along axes
    pub repeat: Vec<(Axis, usize)>,
    /// Debye-Waller factor per element [nm^2]
    pub dw_factors: Vec<(String, f64)>,
    /// Axes of the frozen-lattice displacements
    pub frozen_lattice: Vec<Axis>,
    /// Minimum atom distance [A], with an optional file receiving the removed atoms
    pub remove_close_atoms: Option<(f64, Option<PathBuf>)>,
    /// Sort keys, such as `x` or `e` for the element
    pub sort: Vec<String>,
    /// Replace an existing output file
    pub overwrite: bool,
}

impl CellMuncherCommand {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(input: P, output: Q) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn with_cif(mut self) -> Self {
        self.cif = true;
        self
    }

    pub fn with_attached<P: Into<PathBuf>>(mut self, cell: P, axis: Axis) -> Self {
        self.attach = Some((cell.into(), axis));
        self
    }

    pub fn with_repeat(mut self, axis: Axis, times: usize) -> Self {
        self.repeat.push((axis, times));
        self
    }

    pub fn with_dw_factor(mut self, element: &str, factor: f64) -> Self {
        self.dw_factors.push((element.to_string(), factor));
        self
    }

    pub fn with_frozen_lattice(mut self, axes: &[Axis]) -> Self {
        self.frozen_lattice = axes.to_vec();
        self
    }

    pub fn with_remove_close_atoms(mut self, distance: f64, removed: Option<PathBuf>) -> Self {
        self.remove_close_atoms = Some((distance, removed));
        self
    }

    pub fn with_sort(mut self, key: &str) -> Self {
        self.sort.push(key.to_string());
        self
    }

    pub fn with_overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }
}

impl Stage for CellMuncherCommand {
    fn program(&self) -> Program {
        Program::CellMuncher
    }

    fn arguments(&self) -> Result<Vec<String>, ArgumentError> {
        let mut args = vec![
            "-f".to_string(),
            require_path(PROGRAM, "f", &self.input)?,
            "-o".to_string(),
            require_path(PROGRAM, "o", &self.output)?,
        ];

        if self.cif {
            args.push("--cif".to_string());
        }
        if let Some((cell, axis)) = &self.attach {
            let cell = require_path(PROGRAM, "attach-cel", cell)?;
            args.push(format!("--attach-cel={},XMS,{}", cell, axis));
        }
        for (axis, times) in &self.repeat {
            check_range(PROGRAM, "repeat", *times as f64, Bounds::min_only(1.0))?;
            args.push(format!("--repeat={},{}", axis, times));
        }
        for (element, factor) in &self.dw_factors {
            if element.trim().is_empty() {
                return Err(ArgumentError::Missing {
                    program: PROGRAM,
                    argument: "set-dw-factor",
                });
            }
            check_range(PROGRAM, "set-dw-factor", *factor, Bounds::min_only(0.0))?;
            args.push(format!("--set-dw-factor={},{}", element, factor));
        }
        if !self.frozen_lattice.is_empty() {
            let axes: Vec<String> = self.frozen_lattice.iter().map(Axis::to_string).collect();
            args.push(format!("--frozen-lattice={}", axes.join(",")));
        }
        if let Some((distance, removed)) = &self.remove_close_atoms {
            check_range(PROGRAM, "remove-close-atoms", *distance, Bounds::min_only(0.0))?;
            match removed {
                Some(file) => args.push(format!(
                    "--remove-close-atoms={},{}",
                    distance,
                    require_path(PROGRAM, "remove-close-atoms", file)?
                )),
                None => args.push(format!("--remove-close-atoms={}", distance)),
            }
        }
        args.extend(self.sort.iter().map(|key| format!("-s={}", key)));
        if self.overwrite {
            args.push("--override".to_string());
        }

        Ok(args)
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        vec![self.output.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments() {
        let command = CellMuncherCommand::new("SrTiO3.cel", "model/STO_5x5.cel")
            .with_repeat(Axis::X, 5)
            .with_repeat(Axis::Y, 5)
            .with_dw_factor("Sr", 0.0046)
            .with_frozen_lattice(&[Axis::X, Axis::Y])
            .with_overwrite();

        assert_eq!(
            command.arguments().unwrap(),
            vec![
                "-f",
                "SrTiO3.cel",
                "-o",
                "model/STO_5x5.cel",
                "--repeat=x,5",
                "--repeat=y,5",
                "--set-dw-factor=Sr,0.0046",
                "--frozen-lattice=x,y",
                "--override",
            ]
        );
    }

    #[test]
    fn test_attach_and_remove() {
        let command = CellMuncherCommand::new("a.cel", "b.cel")
            .with_cif()
            .with_attached("c.cel", Axis::Z)
            .with_remove_close_atoms(0.5, Some(PathBuf::from("removed.cel")))
            .with_sort("e");

        assert_eq!(
            &command.arguments().unwrap()[4..],
            &[
                "--cif",
                "--attach-cel=c.cel,XMS,z",
                "--remove-close-atoms=0.5,removed.cel",
                "-s=e"
            ]
        );
    }

    #[test]
    fn test_invalid() {
        let command = CellMuncherCommand::new("a.cel", "b.cel").with_repeat(Axis::X, 0);
        assert!(matches!(
            command.arguments(),
            Err(ArgumentError::Invalid { argument: "repeat", .. })
        ));

        let command = CellMuncherCommand::new("a.cel", "b.cel").with_dw_factor(" ", 0.1);
        assert!(matches!(command.arguments(), Err(ArgumentError::Missing { .. })));

        let command = CellMuncherCommand::new("", "b.cel");
        assert!(matches!(
            command.arguments(),
            Err(ArgumentError::Missing { argument: "f", .. })
        ));
    }
}
