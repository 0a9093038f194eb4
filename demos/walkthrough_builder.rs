use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use walkthrough_scraper::{Source, Walkthrough};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive the Walkthrough builder directly", long_about = None)]
struct Args {
    /// First page of the walkthrough
    #[arg(short, long)]
    url: String,

    /// Output PDF path
    #[arg(short, long, default_value = "walkthrough.pdf")]
    output: PathBuf,

    /// JSON configuration string
    #[arg(short, long)]
    config: Option<String>,

    /// Path to JSON configuration file
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Safety cap on recorded pages
    #[arg(short, long)]
    max_pages: Option<usize>,

    /// Run the browser headless
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Args::parse();
    println!("Scraping walkthrough starting at {}", args.url);

    let mut walkthrough = Walkthrough::new(Source::StartUrl(args.url), &args.output);

    if let Some(config_file) = args.config_file {
        println!("Loading configuration from file: {}", config_file.display());
        walkthrough = walkthrough.with_config_file(config_file)?;
    }

    // A config string overrides the file
    if let Some(config_str) = args.config {
        walkthrough = walkthrough.with_config_str(&config_str)?;
    }

    if let Some(max_pages) = args.max_pages {
        walkthrough = walkthrough.with_max_pages(max_pages);
    }
    if args.headless {
        walkthrough = walkthrough.with_headless(true);
    }

    println!("Using configuration: {:?}", walkthrough.config());

    let outcome = walkthrough.run().await?;
    println!(
        "Collected {} pages, exit status {}",
        outcome.pages,
        outcome.status.code()
    );
    if let Some(stop) = &outcome.stop {
        println!("Traversal ended: {}", stop);
    }
    if let Some(pdf) = &outcome.pdf {
        println!("PDF written to {}", pdf.display());
    }
    if let Some(partial) = &outcome.partial_html {
        println!("Partial document saved to {}", partial.display());
    }

    Ok(())
}
