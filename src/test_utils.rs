use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}

pub fn run_test<F>(test_fn: F) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    init_tracing();
    test_fn()
}
