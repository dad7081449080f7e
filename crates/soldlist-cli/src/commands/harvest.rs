use crate::report::{default_output_path, print_summary, render_json, write_xlsx};
use crate::{OutputFormat, parse_utc_offset};
use anyhow::{Context, Result, bail};
use chrono::FixedOffset;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use soldlist_browser::{
    ChromeFinder, ChromeLauncher, ChromeSession, DEFAULT_DEBUGGING_PORT, LaunchOptions,
    ProfileManager,
};
use soldlist_core::{Harvester, RecordAssembler, RunOptions, RunReport};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Sold-out sneakers between ¥3,000 and ¥5,000
pub const DEFAULT_SEARCH_URL: &str = "https://www.mercari.com/jp/search/?sort_order=&keyword=%E3%83%8A%E3%82%A4%E3%82%AD&category_root=2&category_child=&brand_name=&brand_id=&size_group=&price_min=3000&price_max=5000&item_condition_id%5B1%5D=1&status_trading_sold_out=1";

#[derive(Args, Debug, Clone)]
pub struct HarvestArgs {
    /// Search results page to harvest
    #[arg(value_name = "SEARCH_URL", default_value = DEFAULT_SEARCH_URL, hide_default_value = true)]
    pub search_url: String,

    /// Base URL that listing links are resolved against (default: origin of the search URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Harvest at most this many listings
    #[arg(long)]
    pub limit: Option<usize>,

    /// Snapshot pages without waiting for them to render
    #[arg(long)]
    pub no_wait: bool,

    /// Seconds to wait for a page to render
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub page_timeout: u64,

    /// Seconds to wait for a listing's detail table
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub detail_timeout: u64,

    /// Offset of the marketplace's timestamps, e.g. +09:00 (default: local time)
    #[arg(long, value_name = "OFFSET", value_parser = parse_utc_offset, allow_hyphen_values = true)]
    pub utc_offset: Option<FixedOffset>,

    /// Path to Chrome binary (auto-detected if not specified)
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Run Chrome without a window
    #[arg(long)]
    pub headless: bool,

    /// Open an incognito window (no persistent profile)
    #[arg(long)]
    pub incognito: bool,

    /// Unpacked extension to load into Chrome
    #[arg(long, value_name = "DIR")]
    pub extension: Option<PathBuf>,

    /// Named profile under ~/.soldlist/profiles
    #[arg(long, conflicts_with = "profile_path")]
    pub profile: Option<String>,

    /// Chrome user-data directory to use
    #[arg(long, env = "CHROME_PROFILE_PATH")]
    pub profile_path: Option<PathBuf>,

    /// Remote debugging port
    #[arg(long, default_value_t = DEFAULT_DEBUGGING_PORT)]
    pub port: u16,

    /// Leave Chrome running after the run
    #[arg(long)]
    pub keep_open: bool,

    /// Report file (default: <start time>_listings.<format>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl HarvestArgs {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            wait_for_visible: !self.no_wait,
            page_timeout: Duration::from_secs(self.page_timeout),
            detail_timeout: Duration::from_secs(self.detail_timeout),
            limit: self.limit,
            ..RunOptions::default()
        }
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.headless,
            incognito: self.incognito,
            extension: self.extension.clone(),
        }
    }

    pub fn assembler(&self) -> RecordAssembler {
        match self.utc_offset {
            Some(offset) => RecordAssembler::with_offset(offset),
            None => RecordAssembler::new(),
        }
    }
}

/// Origin of `search_url`, unless `base_url` overrides it
pub fn base_url_for(search_url: &Url, base_url: Option<&str>) -> Result<Url> {
    if let Some(base) = base_url {
        return Url::parse(base).with_context(|| format!("Invalid base URL: {}", base));
    }

    if !search_url.has_host() {
        bail!("Search URL has no host: {}", search_url);
    }
    let origin = search_url.origin().ascii_serialization();
    Url::parse(&origin).with_context(|| format!("Invalid origin: {}", origin))
}

/// Pick the Chrome profile for a run
pub fn select_profile(args: &HarvestArgs) -> Result<ProfileManager> {
    if !args.launch_options().uses_profile() {
        if args.profile.is_some() || args.profile_path.is_some() {
            tracing::warn!("Ignoring profile: not used with these browser options");
        }
        return Ok(ProfileManager::temporary()?);
    }

    let profile = match (&args.profile_path, &args.profile) {
        (Some(path), _) => ProfileManager::persistent(path.clone())?,
        (None, Some(name)) => ProfileManager::named(name)?,
        (None, None) => ProfileManager::temporary()?,
    };
    Ok(profile)
}

pub fn execute(args: &HarvestArgs, format: OutputFormat) -> Result<()> {
    let search_url = Url::parse(&args.search_url)
        .with_context(|| format!("Invalid search URL: {}", args.search_url))?;
    let base_url = base_url_for(&search_url, args.base_url.as_deref())?;
    let harvester = Harvester::new(args.run_options(), args.assembler());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(run_with_chrome(args, &harvester, &search_url, &base_url))?;

    write_report(&report, format, args.output.as_deref())?;

    if let Some(abort) = &report.aborted {
        bail!(
            "Run aborted at {} after {} listings: {}",
            abort.url,
            report.processed,
            abort.reason
        );
    }
    Ok(())
}

/// Launch Chrome, harvest, then shut Chrome down whether or not the run succeeded
async fn run_with_chrome(
    args: &HarvestArgs,
    harvester: &Harvester,
    search_url: &Url,
    base_url: &Url,
) -> Result<RunReport> {
    let chrome_binary = ChromeFinder::new(args.chrome_path.clone()).find()?;
    tracing::info!("Found Chrome at: {}", chrome_binary.display());

    let profile = select_profile(args)?;
    tracing::debug!("Using profile: {}", profile.path().display());

    let launcher = ChromeLauncher::new(
        chrome_binary,
        profile.path().to_path_buf(),
        args.launch_options(),
    )
    .with_debugging_port(args.port);
    tracing::debug!("User agent: {}", launcher.user_agent());

    let mut process = launcher.launch()?;
    let mut session = match ChromeSession::connect(launcher.debugging_port()).await {
        Ok(session) => session.attach_process(process),
        Err(e) => {
            let _ = process.kill();
            let _ = process.wait();
            return Err(e.into());
        }
    };

    let result = harvest(harvester, &mut session, search_url, base_url).await;

    if let Err(e) = session.shutdown(args.keep_open).await {
        tracing::warn!("Failed to close Chrome: {}", e);
    }
    if args.keep_open && profile.is_temporary() {
        let path = profile.keep();
        tracing::info!("Chrome profile left at {}", path.display());
    }

    result
}

async fn harvest(
    harvester: &Harvester,
    session: &mut ChromeSession,
    search_url: &Url,
    base_url: &Url,
) -> Result<RunReport> {
    let references = harvester.discover(session, search_url, base_url).await?;

    let progress = ProgressBar::new(references.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let report = harvester
        .run_listings(session, &references, |report| {
            progress.set_position(report.processed as u64);
            progress.set_message(format!("{} skipped", report.failed()));
        })
        .await;
    progress.finish_and_clear();

    Ok(report)
}

fn write_report(report: &RunReport, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    match format {
        OutputFormat::Xlsx => {
            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| default_output_path(&report.started_at, "xlsx"));
            write_xlsx(&report.records, &path)?;
            print_summary(report);
            println!("Report saved to {}", path.display());
        }
        OutputFormat::Json => {
            let json = render_json(report)?;
            match output {
                Some(path) => {
                    std::fs::write(path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Report saved to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        OutputFormat::Pretty => print_summary(report),
    }

    Ok(())
}
