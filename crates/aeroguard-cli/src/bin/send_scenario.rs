//! CLI tool to send preset telemetry to the AeroGuard server.

use aeroguard_cli::scenarios::{send_period, MAX_RATE_HZ, MIN_RATE_HZ};
use aeroguard_cli::{RiskClient, Scenario};
use clap::Parser;
use tokio::time;

/// Send preset vehicle telemetry to AeroGuard Server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// AeroGuard Server URL
    #[arg(long, default_value = "http://localhost:5000")]
    url: String,

    /// Telemetry preset
    #[arg(long, value_enum, default_value_t = Scenario::Normal)]
    mode: Scenario,

    /// Vehicle identifier
    #[arg(long, default_value = "UAV-1")]
    vehicle: String,

    /// Number of records to send
    #[arg(long, default_value_t = 10)]
    count: u32,

    /// Update rate in Hz
    #[arg(long, default_value_t = 1.0)]
    rate: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if !(args.rate.is_finite() && args.rate > 0.0) {
        anyhow::bail!("--rate must be a positive number");
    }
    let period = send_period(args.rate);
    if !(MIN_RATE_HZ..=MAX_RATE_HZ).contains(&args.rate) {
        eprintln!(
            "--rate {} Hz is outside [{}, {}], sending every {:?}",
            args.rate, MIN_RATE_HZ, MAX_RATE_HZ, period
        );
    }

    let client = RiskClient::new(&args.url);
    let mut rng = rand::rng();

    println!("Sending {} {} record(s) to {} as {}", args.count, args.mode.name(), args.url, args.vehicle);
    println!();

    let mut interval = time::interval(period);
    let mut sent = 0u32;

    for seq in 1..=args.count {
        interval.tick().await;

        let record = args.mode.sample(&args.vehicle, &mut rng);
        match client.send_record(&record).await {
            Ok(reply) => {
                sent += 1;
                println!(
                    "[{:3}] zone={:<7} risk={:3} level={:<7} feedback={}  {}",
                    seq,
                    reply.zone.as_str(),
                    reply.risk,
                    reply.level.as_str(),
                    reply.feedback.as_wire(),
                    reply.message
                );
            }
            Err(e) => eprintln!("[{:3}] Error sending telemetry: {:#}", seq, e),
        }
    }

    println!("\nDone. {} of {} record(s) accepted.", sent, args.count);
    Ok(())
}
