//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a slice of the publish
//! path against the host simulation adapters. All tests run on the host
//! (x86_64) with no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod mock_hw;
mod pipeline_tests;
mod supervisor_flow_tests;
