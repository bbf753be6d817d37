//! Scanner edge-case and property tests.
