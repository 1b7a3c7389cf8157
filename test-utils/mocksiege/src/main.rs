//! mocksiege - benchmark client double.
//!
//! Invoked without arguments it performs the warm-up run and exits with
//! `MOCKSIEGE_WARMUP_EXIT` (default 0). Otherwise it accepts the benchmark
//! arguments the harness passes and prints a JSON report.
//!
//! `MOCKSIEGE_MODE` selects the behaviour of the benchmark run:
//! - `live` (default): issue `concurrent * reps` GET requests and report the
//!   share that got a non-5xx response, or `MOCKSIEGE_AVAILABILITY` when set
//! - `garbage`: print output that is not a report
//! - `fail`: exit with code 2 without a report

use clap::Parser;
use futures::future::join_all;
use serde_json::json;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "mocksiege")]
struct Args {
    /// Target URL; absent means warm-up
    url: Option<String>,

    #[arg(short = 'c', long = "concurrent", default_value = "1")]
    concurrent: u32,

    #[arg(short = 'r', long = "reps", default_value = "1")]
    reps: u32,

    /// Without it each simulated user pauses between requests
    #[arg(short = 'b', long)]
    benchmark: bool,

    #[arg(short = 'q', long)]
    quiet: bool,

    #[arg(long = "json-output")]
    json_output: bool,
}

#[derive(Default)]
struct Tally {
    ok: u64,
    failed: u64,
    bytes: u64,
    longest: Duration,
    shortest: Option<Duration>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let Some(url) = args.url else {
        let code = env_parse("MOCKSIEGE_WARMUP_EXIT").unwrap_or(0);
        if code == 0 && !args.quiet {
            println!("New configuration template added to ~/.siege");
        }
        std::process::exit(code);
    };

    match std::env::var("MOCKSIEGE_MODE").as_deref() {
        Ok("garbage") => {
            println!("** SIEGE 4.1.6\n** Preparing {} concurrent users", args.concurrent);
            println!("this is not a report");
            return;
        }
        Ok("fail") => {
            eprintln!("[error] socket: unable to connect sock.c:282: Connection refused");
            std::process::exit(2);
        }
        _ => {}
    }

    let started = Instant::now();
    let tally = if env_parse::<f64>("MOCKSIEGE_AVAILABILITY").is_some() {
        Tally::default()
    } else {
        let pause = if args.benchmark {
            Duration::ZERO
        } else {
            Duration::from_millis(5)
        };
        hammer(&url, args.concurrent.max(1), args.reps.max(1), pause).await
    };
    let elapsed = started.elapsed().as_secs_f64();

    let transactions = tally.ok;
    let total = tally.ok + tally.failed;
    let availability = env_parse::<f64>("MOCKSIEGE_AVAILABILITY").unwrap_or(if total == 0 {
        0.0
    } else {
        tally.ok as f64 * 100.0 / total as f64
    });

    let report = json!({
        "transactions": transactions,
        "availability": availability,
        "elapsed_time": elapsed,
        "data_transferred": tally.bytes as f64 / (1024.0 * 1024.0),
        "response_time": if total == 0 { 0.0 } else { elapsed / total as f64 },
        "transaction_rate": if elapsed > 0.0 { transactions as f64 / elapsed } else { 0.0 },
        "throughput": if elapsed > 0.0 { tally.bytes as f64 / (1024.0 * 1024.0) / elapsed } else { 0.0 },
        "concurrency": args.concurrent,
        "successful_transactions": tally.ok,
        "failed_transactions": tally.failed,
        "longest_transaction": tally.longest.as_secs_f64(),
        "shortest_transaction": tally.shortest.unwrap_or_default().as_secs_f64(),
    });

    if args.json_output {
        println!("{}", report);
    } else {
        println!("Transactions: {} hits", transactions);
        println!("Availability: {:.2} %", availability);
    }
}

async fn hammer(url: &str, concurrent: u32, reps: u32, pause: Duration) -> Tally {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[error] cannot build client: {}", e);
            std::process::exit(2);
        }
    };

    let workers = (0..concurrent).map(|_| {
        let client = client.clone();
        async move {
            let mut tally = Tally::default();
            for _ in 0..reps {
                let started = Instant::now();
                let outcome = match client.get(url).send().await {
                    Ok(resp) if !resp.status().is_server_error() => {
                        resp.bytes().await.map(|b| b.len() as u64).ok()
                    }
                    _ => None,
                };
                let took = started.elapsed();
                match outcome {
                    Some(bytes) => {
                        tally.ok += 1;
                        tally.bytes += bytes;
                    }
                    None => tally.failed += 1,
                }
                tally.longest = tally.longest.max(took);
                tally.shortest = Some(tally.shortest.map_or(took, |s| s.min(took)));
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
            }
            tally
        }
    });

    join_all(workers)
        .await
        .into_iter()
        .fold(Tally::default(), |mut acc, t| {
            acc.ok += t.ok;
            acc.failed += t.failed;
            acc.bytes += t.bytes;
            acc.longest = acc.longest.max(t.longest);
            acc.shortest = match (acc.shortest, t.shortest) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            acc
        })
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
