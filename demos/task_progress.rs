//! Demonstrates submitting a countdown task and polling its status document once per second.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
// self
use audit_sentry::{
	config::SentryConfig,
	task::{CountdownJob, MemoryTaskBackend, TaskPoller},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = SentryConfig::default();
	let backend = MemoryTaskBackend::default().with_config(&config.backend);
	let poller = TaskPoller::new(Arc::new(backend.clone()), config.poller);
	let handle = backend.submit(CountdownJob::new(3))?;

	println!("Submitted task {handle}.");

	let last = poller
		.watch(&handle, Duration::from_secs(1), |status| match status.to_json() {
			Ok(json) => println!("{json}"),
			Err(e) => eprintln!("Failed to render status: {e}."),
		})
		.await?;

	println!("Task finished with {}.", last.state);

	let unknown = poller.get_status_raw("no-such-task").await?;

	println!("Unknown handle: {}", unknown.to_json()?);

	backend.forget(&handle);

	Ok(())
}
