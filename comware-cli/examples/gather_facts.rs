//! Gather facts from a Comware switch.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example gather_facts -- --host 10.0.0.1 --user admin --password secret
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use comware_cli::{Resource, SessionBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("Connecting to {}:{}...", args.host, args.port);
    let mut builder = SessionBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout));

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    }

    let session = builder.connect().await?;

    let info = session.get_device_info().await?;
    println!("{}", serde_json::to_string_pretty(&info)?);

    let facts = session.gather_facts(&Resource::ALL).await?;
    println!("{}", serde_json::to_string_pretty(&facts)?);

    session.close().await?;
    Ok(())
}

/// Simple argument parser.
struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            host: "localhost".to_string(),
            port: 22,
            user: env::var("USER").unwrap_or_else(|_| "admin".to_string()),
            password: None,
            key: None,
            timeout: 30,
        };

        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--host" | "-h" => parsed.host = iter.next().cloned().unwrap_or(parsed.host),
                "--port" | "-p" => {
                    parsed.port = iter.next().and_then(|v| v.parse().ok()).unwrap_or(22)
                }
                "--user" | "-u" => parsed.user = iter.next().cloned().unwrap_or(parsed.user),
                "--password" | "-P" => parsed.password = iter.next().cloned(),
                "--key" | "-k" => parsed.key = iter.next().map(PathBuf::from),
                "--timeout" | "-t" => {
                    parsed.timeout = iter.next().and_then(|v| v.parse().ok()).unwrap_or(30)
                }
                other => eprintln!("Unknown argument: {}", other),
            }
        }
        parsed
    }
}
