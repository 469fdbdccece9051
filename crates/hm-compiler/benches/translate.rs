use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hm_compiler::{plan_update, translate_rules};
use hm_core::rule::{DeclaredRule, Operation};

fn sample_rules(count: usize) -> Vec<DeclaredRule> {
    (0..count)
        .map(|i| DeclaredRule {
            id: format!("rule_17000000{i:05}_abc{:04}", i % 9973),
            domain_pattern: if i % 3 == 0 {
                String::new()
            } else {
                format!("*://*.site{i}.example/*")
            },
            operation: if i % 2 == 0 { Operation::Set } else { Operation::Remove },
            header_name: format!("X-Header-{i}"),
            header_value: "value".to_string(),
            enabled: i % 5 != 0,
        })
        .collect()
}

fn bench_translate(c: &mut Criterion) {
    let rules = sample_rules(5000);
    c.bench_function("translate_5000", |b| {
        b.iter(|| translate_rules(black_box(&rules)))
    });
}

fn bench_plan(c: &mut Criterion) {
    let rules = sample_rules(5000);
    let active = translate_rules(&rules[..2500]);
    let desired = translate_rules(&rules);
    c.bench_function("plan_update_5000", |b| {
        b.iter(|| plan_update(black_box(&active), black_box(&desired)))
    });
}

criterion_group!(benches, bench_translate, bench_plan);
criterion_main!(benches);
