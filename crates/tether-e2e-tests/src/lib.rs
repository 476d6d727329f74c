//! Test-only crate. All content lives in `tests/`.
