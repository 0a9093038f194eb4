use clap::Parser;
use std::process::ExitCode;
use walkthrough_scraper::{ExitStatus, RunOutcome, ScraperConfig, Walkthrough};

mod args;
use args::Args;

const MANUAL_FALLBACK: &str = "Manual fallback: open the pages in your normal browser, \
save them (Ctrl+S) into one folder, then rerun with --saved-html <folder>.";

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match ScraperConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                ::log::error!("Failed to load configuration {}: {}", path.display(), e);
                return ExitCode::from(ExitStatus::NothingExtracted.code());
            }
        },
        None => ScraperConfig::default(),
    };
    config.apply_env();
    args.apply_to(&mut config);

    let Some(source) = args.source() else {
        ::log::error!("One of --start, --urls or --saved-html is required");
        return ExitCode::from(ExitStatus::NothingExtracted.code());
    };

    if config.attach_to.is_none() {
        println!("Note: scraping requires a WebDriver server (e.g. chromedriver --port=4444).");
    }

    let start_time = std::time::Instant::now();
    let outcome = Walkthrough::new(source, &args.output)
        .with_config(config)
        .run()
        .await;

    let status = match outcome {
        Ok(outcome) => {
            report(&outcome);
            outcome.status
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", MANUAL_FALLBACK);
            ExitStatus::from(&e)
        }
    };

    ::log::info!(
        "Finished with exit code {} after {:.2} seconds",
        status.code(),
        start_time.elapsed().as_secs_f64()
    );
    ExitCode::from(status.code())
}

fn report(outcome: &RunOutcome) {
    if outcome.status == ExitStatus::Success {
        if let Some(stop) = &outcome.stop {
            println!("Scraped {} pages ({}).", outcome.pages, stop);
        }
        return;
    }

    match (&outcome.stop, outcome.status) {
        (_, ExitStatus::NothingExtracted) => eprintln!("No pages scraped."),
        (Some(stop), _) => eprintln!("Stopped: {}.", stop),
        (None, _) => {}
    }
    if let Some(partial) = &outcome.partial_html {
        eprintln!(
            "The {} pages collected so far were saved to {}",
            outcome.pages,
            partial.display()
        );
    }
    eprintln!("{}", MANUAL_FALLBACK);
}
