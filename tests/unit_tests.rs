//! Unit-level tests for individual components, grouped under `tests/unit`.

mod unit;
