use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "picture-show")]
#[command(about = "Scrapes a cloud-storage listing page and downloads every image it links to")]
#[command(version)]
pub struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listing page to scrape (overrides the configuration)
    #[arg(short, long)]
    pub url: Option<String>,

    /// WebDriver server used to render the page (e.g. http://localhost:4444)
    #[arg(short, long)]
    pub webdriver: Option<String>,

    /// Directory to save downloaded images into as PNG
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Only list the discovered image links, don't download them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
