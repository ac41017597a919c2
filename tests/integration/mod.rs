//! Integration tests covering files on disk and the command invoker

mod commands_tests;
mod scenarios;
