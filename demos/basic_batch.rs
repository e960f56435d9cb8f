//! Basic batch example: retries, a timeout and a handler that decides what is fatal

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use trybatch::batch::BatchExecutor;
use trybatch::engine::Backoff;
use trybatch::logging::init_tracing;
use trybatch::operation::{Json, Operation};
use trybatch::{ErrorHandler, TryError};

#[tokio::main]
async fn main() -> Result<(), TryError> {
    init_tracing();

    let attempts = Arc::new(AtomicU32::new(0));
    let flaky = {
        let attempts = attempts.clone();
        Operation::new(move || {
            let attempts = attempts.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(anyhow::anyhow!("service unavailable"))
                } else {
                    Ok(("flaky", "recovered"))
                }
            }
        })
    };

    let slow = Operation::new(|| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok::<_, anyhow::Error>("too late")
    });

    let report = Operation::from_fn(|| {
        Ok::<_, anyhow::Error>(Json(serde_json::json!({ "rows": 42 })))
    });

    let executor = BatchExecutor::new()
        .with_parallel(true)
        .with_retries(3)
        .with_backoff(Backoff::Fixed(Duration::from_millis(200)))
        .with_timeout(Duration::from_secs(2));

    // Timeouts are tolerated, anything else aborts the batch
    let handler = ErrorHandler::new(|error: TryError| {
        if error.is_timeout() {
            println!("⚠️  skipped: {error}");
            None
        } else {
            Some(anyhow::anyhow!("unrecoverable: {error}"))
        }
    });

    let result = executor.execute(handler, vec![flaky, slow, report]).await;
    println!("📊 {:?}", result.stats);

    for value in result.into_result()? {
        println!("  {value}");
    }
    println!("flaky operation took {} attempts", attempts.load(Ordering::SeqCst));

    Ok(())
}
