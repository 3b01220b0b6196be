use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use labelflow::{ContextData, FlowError, Handler, Pipeline, PipelineControl, PipelineResult, Registry, StepDef};
use tokio::runtime::Runtime;

#[derive(Clone, Debug, Default)]
struct BenchCtx {
  counter: u64,
}

fn increment_handler() -> Handler<BenchCtx, FlowError> {
  Box::new(|ctx: ContextData<BenchCtx>| {
    Box::pin(async move {
      ctx.write().counter += 1;
      Ok(PipelineControl::Continue)
    })
  })
}

fn failing_handler() -> Handler<BenchCtx, FlowError> {
  Box::new(|_ctx: ContextData<BenchCtx>| Box::pin(async move { Err(FlowError::Internal("bench".to_string())) }))
}

fn build_pipeline(num_steps: usize, best_effort_failures: bool) -> Pipeline<BenchCtx, FlowError> {
  let steps = (0..num_steps)
    .map(|i| {
      if best_effort_failures && i % 2 == 1 {
        StepDef::best_effort(format!("step_{}", i))
      } else {
        StepDef::required(format!("step_{}", i))
      }
    })
    .collect();
  let mut pipeline = Pipeline::new(steps);
  for i in 0..num_steps {
    let name = format!("step_{}", i);
    if best_effort_failures && i % 2 == 1 {
      pipeline.on_boxed(&name, failing_handler());
    } else {
      pipeline.on_boxed(&name, increment_handler());
    }
  }
  pipeline
}

fn bench_pipeline_run(c: &mut Criterion) {
  let mut group = c.benchmark_group("PipelineRun");
  let rt = Runtime::new().expect("tokio runtime");

  for num_steps in [1usize, 4, 8] {
    let pipeline = build_pipeline(num_steps, false);
    group.bench_with_input(BenchmarkId::new("required_steps", num_steps), &num_steps, |b, _| {
      b.to_async(&rt).iter(|| async {
        let result = pipeline.run(ContextData::new(BenchCtx::default())).await;
        assert_eq!(result.ok(), Some(PipelineResult::Completed));
      })
    });

    let pipeline = build_pipeline(num_steps, true);
    group.bench_with_input(BenchmarkId::new("best_effort_failures", num_steps), &num_steps, |b, _| {
      b.to_async(&rt).iter(|| async {
        let _ = pipeline.run(ContextData::new(BenchCtx::default())).await;
      })
    });
  }
  group.finish();
}

fn bench_registry_dispatch(c: &mut Criterion) {
  let rt = Runtime::new().expect("tokio runtime");
  let registry = Registry::<FlowError>::new();
  registry.register(build_pipeline(4, false));

  c.bench_function("RegistryDispatch/4_steps", |b| {
    b.to_async(&rt).iter(|| async {
      let _ = registry.run(ContextData::new(BenchCtx::default())).await;
    })
  });
}

criterion_group!(benches, bench_pipeline_run, bench_registry_dispatch);
criterion_main!(benches);
