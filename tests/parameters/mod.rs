//! Tests for the parameter file models

mod imaging_tests;
mod propagation_tests;
