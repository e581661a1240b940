//! Simple SDK example.
//!
//! 1. Start the daemon: `cargo run --package jobq-daemon`
//! 2. Run this example: `cargo run --package jobq-sdk --example simple`

use jobq_sdk::{EnqueueRequest, JobqClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("jobq SDK - simple example\n");

    println!("1. connecting to daemon...");
    let client = JobqClient::connect("http://127.0.0.1:7878").await?;
    println!("   connected\n");

    println!("2. enqueuing a job...");
    let enqueued = client
        .enqueue(EnqueueRequest {
            command: "echo hello from jobq".to_string(),
            ..Default::default()
        })
        .await?;
    println!("   job id: {}\n", enqueued.id);

    println!("3. waiting for it to run...");
    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

    println!("4. fetching logs...");
    let logs = client.logs(enqueued.id.clone()).await?;
    println!("   state: {}", logs.job.state);
    for line in &logs.logs {
        println!("   | {}", line.message);
    }

    println!("\n5. queue status:");
    let status = client.status().await?;
    println!("   pending={} processing={} completed={} dead={}",
        status.pending, status.processing, status.completed, status.dead);

    Ok(())
}
