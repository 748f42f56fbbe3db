//! Criterion benchmarks for the S# front end live under `benches/`.
