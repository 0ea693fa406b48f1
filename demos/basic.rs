//! Throttled document submission.
//!
//! Six submissions per second against a simulated remote API. Ten workers
//! submit at once: six go out immediately, the rest wait for the next
//! window.
//!
//! The subscriber logs at DEBUG, so the gate's rollover and blocking events
//! are printed alongside the responses.

use rate_gate::{RateGate, Throttled, Transport, WindowUnit};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Stand-in for the HTTP client: pretends to post a document.
struct SimulatedApi {
    started: Instant,
}

impl Transport for SimulatedApi {
    type Request = (String, String);
    type Response = String;
    type Error = std::convert::Infallible;

    fn send(&self, (document, signature): (String, String)) -> Result<String, Self::Error> {
        thread::sleep(Duration::from_millis(20));
        Ok(format!(
            "{document} accepted (signature {signature}) at +{}ms",
            self.started.elapsed().as_millis()
        ))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_thread_names(true)
        .init();

    println!("=== Throttled Submission Example ===\n");
    println!("Limit: 6 submissions per second, 10 concurrent workers\n");

    let gate = RateGate::per_unit(WindowUnit::Seconds, 6).expect("valid gate config");
    let client = Arc::new(Throttled::new(
        gate,
        SimulatedApi {
            started: Instant::now(),
        },
    ));

    let workers: Vec<_> = (1..=10)
        .map(|i| {
            let client = Arc::clone(&client);
            thread::Builder::new()
                .name(format!("worker-{i}"))
                .spawn(move || {
                    let document = format!("doc_{i:03}");
                    match client.send((document, "some signature".to_string())) {
                        Ok(response) => info!(%response, "create document response"),
                        Err(never) => match never {},
                    }
                })
                .expect("spawn worker")
        })
        .collect();

    for worker in workers {
        let _ = worker.join();
    }

    let snapshot = client.gate().metrics().snapshot();
    println!("\n=== Example Complete ===");
    println!(
        "admitted: {}, had to wait: {}, window rollovers: {}",
        snapshot.admissions, snapshot.waits, snapshot.rollovers
    );
}
