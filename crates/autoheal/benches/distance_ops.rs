//! Healing Hot-Path Benchmarks
//!
//! Benchmarks for edit distance, closest-value ranking and candidate
//! generation.
//!
//! Run with: `cargo bench --bench distance_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use autoheal::distance::distance;
use autoheal::fuzzy::closest;
use autoheal::mock::{MockDriver, MockElement};
use autoheal::pipeline::{propose, HealRequest};
use autoheal::{Locator, LocatorRecord, RuleBasedPipeline, WaitOptions};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use std::time::Duration;

fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("distance");

    let pairs = vec![
        ("login-btn-prmary", "login-btn-primary", "typo_16"),
        ("username", "user_name_field", "prefix_8"),
        ("delete-alice-btn-primary", "delete-bob-btn-danger", "diverged_24"),
        (
            "navigation-sidebar-collapse-toggle-button",
            "navigation-sidebar-expand-toggle-button",
            "long_41",
        ),
    ];

    for (a, b, label) in pairs {
        group.bench_with_input(BenchmarkId::from_parameter(label), &(a, b), |bench, &(a, b)| {
            bench.iter(|| black_box(distance(black_box(a), black_box(b))));
        });
    }

    group.finish();
}

fn bench_closest(c: &mut Criterion) {
    let mut group = c.benchmark_group("closest");

    for count in [10, 100, 1000] {
        let values: Vec<String> = (0..count).map(|i| format!("widget-{i}-btn")).collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{count}_ids")),
            &values,
            |bench, values| {
                bench.iter(|| black_box(closest(black_box("widget-42-bnt"), values)));
            },
        );
    }

    group.finish();
}

fn bench_propose(c: &mut Criterion) {
    let mut group = c.benchmark_group("propose");

    let mut attrs = BTreeMap::new();
    attrs.insert("id".to_string(), "login-btn-primary".to_string());
    attrs.insert("name".to_string(), "login".to_string());
    attrs.insert("class".to_string(), "btn btn-primary".to_string());
    attrs.insert("text".to_string(), "Login".to_string());
    let record = LocatorRecord::observed(Locator::id("login-btn")).with_attributes(Some(attrs));

    let failures = vec![
        (Locator::id("login-btn"), "id"),
        (Locator::css("button.btn-danger"), "css_class"),
        (Locator::xpath("//a[text()='Logout']"), "xpath_text"),
    ];

    for (failed, label) in &failures {
        group.bench_with_input(BenchmarkId::new("no_memory", label), failed, |bench, failed| {
            bench.iter(|| {
                let request = HealRequest::new("element", failed, None, WaitOptions::new());
                black_box(propose(&request).count());
            });
        });
        group.bench_with_input(BenchmarkId::new("with_memory", label), failed, |bench, failed| {
            bench.iter(|| {
                let request = HealRequest::new("element", failed, Some(&record), WaitOptions::new());
                black_box(propose(&request).count());
            });
        });
    }

    group.finish();
}

fn bench_rule_based_heal(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_based_heal");

    for count in [10, 100] {
        let mut driver = MockDriver::new();
        for i in 0..count {
            driver.add_element(MockElement::new("div").with_attr("id", format!("row-{i}")));
        }
        driver.add_element(MockElement::new("input").with_attr("id", "profile_email"));
        let driver = driver.with_broken_query(Locator::id("profile_email"));
        let failed = Locator::id("profile_email");
        let wait = WaitOptions::new().with_timeout(Duration::ZERO);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{count}_elements")),
            &driver,
            |bench, driver| {
                bench.iter(|| {
                    let request = HealRequest::new("profile_email_input", &failed, None, wait);
                    let outcome = RuleBasedPipeline::new().heal(driver, &request);
                    black_box(outcome.is_healed());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_distance,
    bench_closest,
    bench_propose,
    bench_rule_based_heal
);
criterion_main!(benches);
