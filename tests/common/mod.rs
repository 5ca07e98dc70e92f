#![allow(dead_code)]
#![allow(unused_imports)]

pub use rex_test_utils::builders::{start_uri, stop_uri, GraphBuilder, TemplateBuilder};
pub use rex_test_utils::{init_tracing, FakeInvoker, Harness};

use std::collections::BTreeSet;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}
