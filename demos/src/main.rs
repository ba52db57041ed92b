//! Hybrid RL demos
//!
//! ```bash
//! # PPO with an imitation warm start, then save / load
//! RUST_LOG=info cargo run --release -p demos -- pg
//!
//! # Munchausen DQN with dueling heads and binned continuous actions
//! RUST_LOG=info cargo run --release -p demos -- dqn
//! ```

mod dqn_demo;
mod pg_demo;
mod target_env;

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let result = match args.get(1).map(String::as_str) {
        Some("pg") => pg_demo::run(),
        Some("dqn") => dqn_demo::run(),
        Some(other) => {
            println!("Unknown demo: {}", other);
            println!();
            print_usage();
            return;
        }
        None => {
            print_usage();
            return;
        }
    };

    if let Err(err) = result {
        log::error!("demo failed: {}", err);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("Usage: cargo run --release -p demos -- <demo>");
    println!();
    println!("  pg     PPO over 2 discrete heads + 2 bounded continuous dims");
    println!("         Imitation warm start, masked decoy action, checkpoint round trip");
    println!();
    println!("  dqn    Munchausen DQN, dueling heads, 11 bins per continuous dim");
    println!();
}
