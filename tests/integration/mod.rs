//! Integration Tests Module
//!
//! End-to-end tests of the survey pipeline through the public library API,
//! with scripted providers standing in for the cloud model and a refused
//! port standing in for a stopped local service.

// Scripted provider shared by the tests
mod support;

// Structured extraction properties
mod extraction_test;

// Design, questions, script and persistence
mod pipeline_test;

// Local provider unreachable
mod local_provider_test;
