use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use api_tester::utils::config::{Config, BASE_URL_ENV};
use api_tester::{report, runner};

#[derive(Parser)]
#[command(name = "api-tester")]
#[command(version)]
#[command(about = "Run the API integration test sequence and write reports", long_about = None)]
struct Cli {
    /// Base URL of the API under test
    #[arg(long, env = BASE_URL_ENV)]
    base_url: Option<String>,

    /// Directory for the JSON and text reports
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Site URL registered for monitoring
    #[arg(long)]
    site_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Retries after the first attempt on connection failure or 5xx
    #[arg(long)]
    max_retries: Option<u32>,

    /// Delay between retries (ms)
    #[arg(long)]
    retry_delay: Option<u64>,

    /// Pause between steps (ms)
    #[arg(long)]
    step_delay: Option<u64>,

    /// Pause after heavy monitor steps (ms)
    #[arg(long)]
    slow_step_delay: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::from_env();
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if let Some(dir) = self.output {
            config.output_dir = dir;
        }
        if let Some(url) = self.site_url {
            config.site_url = url;
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_ms = secs * 1000;
        }
        if let Some(n) = self.max_retries {
            config.max_retries = n;
        }
        if let Some(ms) = self.retry_delay {
            config.retry_delay_ms = ms;
        }
        if let Some(ms) = self.step_delay {
            config.step_delay_ms = ms;
        }
        if let Some(ms) = self.slow_step_delay {
            config.slow_step_delay_ms = ms;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Cli::parse().into_config();
    log::debug!("{:?}", config);

    let outcome = runner::run_tests(&config).await;

    // reports go to disk before anything else touches stdout
    let paths = report::emit_all(&outcome.log, &config.output_dir)?;
    println!("\n{} Reports written", "📊".to_string().blue());
    for path in &paths {
        println!(
            "  {} Report generated: {}",
            "✅".green(),
            path.display().to_string().cyan()
        );
    }

    if outcome.aborted() {
        std::process::exit(1);
    }

    println!("\n{} Tests completed", "🎉".green().bold());
    Ok(())
}
