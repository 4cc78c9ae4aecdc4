use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use csv_scrub::{clean::clean_dataset, dataset::Dataset, rules::RuleSet};

const RULES: &str = r#"
defaults:
  string: { violation: remove }
  numeric: { bounds: clip }
columns:
  - name: Category
    type: string
    rules: { white_list: [A, B, C] }
  - name: Description
    type: string
    rules:
      black_list: [Invalid, Unknown]
      regex: ['[A-Za-z ]+\d*']
    behavior: { violation: flag }
  - name: Amount
    type: numeric
    rules:
      fill_na: median
      bounds: [0, 200]
      category_bounds: { A: [50, 200], B: [100, 250] }
"#;

fn generate_transactions(rows: usize) -> Dataset {
    let categories = ["A", "B", "C", "D"];
    let descriptions = ["Office supplies", "Invalid", "Travel 2", "Unknown", "Hardware"];
    let data = (0..rows)
        .map(|i| {
            let amount = if i % 17 == 0 {
                String::new()
            } else {
                format!("{}", (i as i64 % 400) - 100)
            };
            vec![
                i.to_string(),
                categories[i % categories.len()].to_string(),
                descriptions[i % descriptions.len()].to_string(),
                amount,
            ]
        })
        .collect::<Vec<_>>();
    Dataset::from_raw(
        ["ID", "Category", "Description", "Amount"].map(String::from),
        data,
    )
}

fn bench_clean(c: &mut Criterion) {
    let rules = RuleSet::from_yaml_str(RULES).expect("rules parse");
    let mut group = c.benchmark_group("clean_dataset");
    for rows in [1_000usize, 50_000] {
        let dataset = generate_transactions(rows);
        group.bench_function(format!("{rows}_rows"), |b| {
            b.iter_batched(
                || (),
                |_| {
                    clean_dataset(&dataset, &rules).expect("clean");
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_clean);
criterion_main!(benches);
