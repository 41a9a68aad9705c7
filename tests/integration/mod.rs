//! Integration Tests Module
//!
//! End-to-end tests of the scanlens client core against an in-memory backend:
//! threat derivation from wire JSON, the analysis lifecycle, summary streams,
//! and the workbench flow.


// Threat context derivation from wire payloads
mod threat_context_test;

// Analysis lifecycle and single-flight refresh
mod lifecycle_test;

// AI summary stream sessions
mod summary_test;

// Workbench flow: upload, history, mode switching
mod workbench_test;
