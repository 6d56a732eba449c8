use batch_pipeline::console::{self, FAREWELL_MESSAGE, OUTPUT_HEADER, START_MESSAGE};
use batch_pipeline::{
    install_interrupt_handler, PipelineBuilder, PipelineConfig, PipelineObserver, ShutdownSignal,
    TracingObserver,
};
use std::io::{self, BufReader};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> batch_pipeline::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "batch_pipeline=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let observer: Arc<dyn PipelineObserver> = Arc::new(TracingObserver);
    let shutdown = ShutdownSignal::new();
    install_interrupt_handler(shutdown.clone(), Arc::clone(&observer))?;

    tracing::info!(version = batch_pipeline::VERSION, "program started");
    println!("{START_MESSAGE}");

    let mut running = PipelineBuilder::from_config(&PipelineConfig::default())
        .with_observer(Arc::clone(&observer))
        .with_shutdown_signal(shutdown.clone())
        .build()?
        .start()?;

    let input = running.take_input()?;
    // The producer blocks on stdin and is only joined if it already
    // finished; otherwise it dies with the process.
    let producer = console::spawn_producer(
        BufReader::new(io::stdin()),
        io::stdout(),
        input,
        shutdown.clone(),
        Arc::clone(&observer),
    )?;

    println!("{OUTPUT_HEADER}");
    console::run_consumer(running.output(), &shutdown, io::stdout(), observer.as_ref())?;

    let mut stdout = io::stdout();
    for value in running.stop()? {
        console::deliver(&mut stdout, value, observer.as_ref())?;
    }

    if producer.is_finished() {
        match producer.join() {
            Ok(Ok(summary)) => tracing::debug!(?summary, "producer finished"),
            Ok(Err(e)) => tracing::error!(error = %e, "producer failed"),
            Err(_) => tracing::error!("producer thread panicked"),
        }
    }

    println!("\n{FAREWELL_MESSAGE}");
    tracing::debug!("{}", running.metrics_summary());
    Ok(())
}
