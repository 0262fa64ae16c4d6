use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tablewash_core::data::{ColumnType, Dataset, Value, profile};
use tablewash_core::pipeline::Pipeline;
use tablewash_core::query::parse_query;
use tablewash_core::transform::{
    AggFunc, AggregationSpec, Bucketize, ImputePolicy, ImputeStrategy, Normalize, NormalizeRule,
    aggregate, bucketize, impute, normalize,
};

const DEPTS: [&str; 5] = [" it ", "IT", "hr", "Sales ", "ops"];

fn employees(rows: usize) -> Dataset {
    let rows = (0..rows)
        .map(|i| {
            let salary = if i % 7 == 0 {
                Value::Null
            } else {
                Value::Int(30_000 + (i as i64 * 137) % 60_000)
            };
            vec![Value::from(DEPTS[i % DEPTS.len()]), salary]
        })
        .collect();
    Dataset::from_columns(
        &[("dept", ColumnType::String), ("salary", ColumnType::Integer)],
        rows,
    )
    .unwrap()
    .with_name("employees")
}

fn bench_components(c: &mut Criterion) {
    let ds = employees(10_000);

    c.bench_function("normalize_10k", |b| {
        b.iter(|| {
            normalize(
                black_box(&ds),
                "dept",
                &[NormalizeRule::Trim, NormalizeRule::Uppercase],
            )
        })
    });

    let mean = ImputePolicy::new().strategy("salary", ImputeStrategy::Mean);
    c.bench_function("impute_mean_10k", |b| {
        b.iter(|| impute(black_box(&ds), &mean))
    });

    let median = ImputePolicy::new().strategy("salary", ImputeStrategy::Median);
    c.bench_function("impute_median_10k", |b| {
        b.iter(|| impute(black_box(&ds), &median))
    });

    c.bench_function("bucketize_10k", |b| {
        b.iter(|| {
            bucketize(
                black_box(&ds),
                "salary",
                &[40_000.0, 70_000.0],
                &["Junior", "Mid-Level", "Senior"],
                "salary_band",
            )
        })
    });

    let spec = AggregationSpec::group_by(["dept"])
        .agg("*", AggFunc::Count, "n")
        .agg("salary", AggFunc::Avg, "avg_salary")
        .agg("salary", AggFunc::Max, "top");
    c.bench_function("aggregate_10k", |b| {
        b.iter(|| aggregate(black_box(&ds), &spec))
    });

    c.bench_function("profile_10k", |b| b.iter(|| profile(black_box(&ds))));
}

fn bench_pipeline(c: &mut Criterion) {
    let ds = employees(10_000);
    let pipeline = Pipeline::new()
        .add_step(Normalize::new("dept", [NormalizeRule::Trim, NormalizeRule::Uppercase]))
        .add_step(ImputePolicy::new().strategy("salary", ImputeStrategy::Median))
        .add_step(Bucketize::new(
            "salary",
            [40_000.0, 70_000.0],
            ["Junior", "Mid-Level", "Senior"],
            "salary_band",
        ))
        .add_step(AggregationSpec::group_by(["dept", "salary_band"]).agg(
            "salary",
            AggFunc::Avg,
            "avg_salary",
        ));

    c.bench_function("pipeline_run_10k", |b| {
        b.iter(|| pipeline.run(black_box(&ds)))
    });
}

fn bench_query(c: &mut Criterion) {
    let sql = "SELECT dept, count(*) AS n, avg(salary) AS pay FROM employees \
               WHERE salary >= 40000 AND dept IS NOT NULL GROUP BY dept \
               ORDER BY pay DESC LIMIT 3";

    c.bench_function("query_parse", |b| b.iter(|| parse_query(black_box(sql))));

    let ds = employees(10_000);
    c.bench_function("query_run_10k", |b| {
        b.iter(|| tablewash_core::query::run(black_box(&ds), sql))
    });
}

criterion_group!(benches, bench_components, bench_pipeline, bench_query);
criterion_main!(benches);
