//! Layering guardrails to keep the scan core independent of the embedded interpreter.
//!
//! Only the default capability implementations (`runner/embedded.rs`, `coverage.rs`) and the CLI
//! wiring may name `runtest_runtime`; everything else goes through the traits in
//! `runner/interfaces.rs`.

const CORE_SOURCES: &[(&str, &str)] = &[
    ("src/config.rs", include_str!("../src/config.rs")),
    ("src/driver.rs", include_str!("../src/driver.rs")),
    ("src/unittest.rs", include_str!("../src/unittest.rs")),
    ("src/discovery/mod.rs", include_str!("../src/discovery/mod.rs")),
    ("src/discovery/module.rs", include_str!("../src/discovery/module.rs")),
    ("src/doctest/mod.rs", include_str!("../src/doctest/mod.rs")),
    ("src/doctest/parser.rs", include_str!("../src/doctest/parser.rs")),
    ("src/doctest/checker.rs", include_str!("../src/doctest/checker.rs")),
    ("src/report/mod.rs", include_str!("../src/report/mod.rs")),
    ("src/report/style.rs", include_str!("../src/report/style.rs")),
    ("src/report/wrap.rs", include_str!("../src/report/wrap.rs")),
    ("src/report/terminal.rs", include_str!("../src/report/terminal.rs")),
    ("src/runner/mod.rs", include_str!("../src/runner/mod.rs")),
    ("src/runner/interfaces.rs", include_str!("../src/runner/interfaces.rs")),
    ("src/runner/outcome.rs", include_str!("../src/runner/outcome.rs")),
];

#[test]
fn scan_core_does_not_name_the_runtime() {
    for (path, source) in CORE_SOURCES {
        for (index, line) in source.lines().enumerate() {
            let code = line.split("//").next().unwrap_or("");
            assert!(
                !code.contains("runtest_runtime"),
                "{path}:{} uses `runtest_runtime` directly; go through runner::interfaces",
                index + 1
            );
        }
    }
}

#[test]
fn runtime_is_not_a_dev_only_dependency() {
    let manifest = include_str!("../Cargo.toml");
    let mut in_dependencies = false;
    let mut found = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }
        if in_dependencies && line.split('#').next().unwrap_or("").trim().starts_with("runtest_runtime") {
            found = true;
        }
    }
    assert!(found, "`runtest_runtime` must be a regular dependency of the runtest crate");
}
