use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use listmover_browser::BrowserSession;
use listmover_browser::DEFAULT_START_URL;
use listmover_browser::SessionOptions;
use listmover_core::MigrationRun;
use listmover_core::RunSummary;
use listmover_core::config::ConfigOverrides;
use listmover_core::persistence::JsonFileSink;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;

use crate::EXIT_CANCELLED;

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Config file (defaults to ./listmover.toml when present).
    #[arg(long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    /// Name of the list to move items into.
    #[arg(long = "target", short = 't')]
    pub target: Option<String>,

    /// Page to open before the run starts.
    #[arg(long = "url", default_value = DEFAULT_START_URL)]
    pub url: String,

    /// Chrome executable to launch.
    #[arg(long = "chrome-path")]
    pub chrome_path: Option<PathBuf>,

    /// Chrome profile directory; keeps the login between runs.
    #[arg(long = "profile-dir")]
    pub profile_dir: Option<PathBuf>,

    /// Launch Chrome without a window.
    #[arg(long = "headless")]
    pub headless: bool,

    /// Attach to a running Chrome (DevTools websocket URL) instead of launching one.
    #[arg(long = "ws-url", conflicts_with_all = ["chrome_path", "profile_dir", "headless"])]
    pub ws_url: Option<String>,

    /// Pause after each committed action, in milliseconds.
    #[arg(long = "settle-pause-ms")]
    pub settle_pause_ms: Option<u64>,

    /// How long to wait for the list popup, in milliseconds.
    #[arg(long = "popup-timeout-ms")]
    pub popup_timeout_ms: Option<u64>,

    /// Delete attempts per promoted item.
    #[arg(long = "max-delete-retries")]
    pub max_delete_retries: Option<u32>,

    /// Directory for the audit files.
    #[arg(long = "log-dir")]
    pub log_dir: Option<PathBuf>,

    /// Leave the browser open after the run until Ctrl-C.
    #[arg(long = "keep-open")]
    pub keep_open: bool,

    /// Start immediately instead of waiting for ENTER.
    #[arg(long = "no-prompt")]
    pub no_prompt: bool,
}

impl RunArgs {
    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            ws_url: self.ws_url.clone(),
            chrome_path: self.chrome_path.clone(),
            profile_dir: self.profile_dir.clone(),
            headless: self.headless,
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            target_collection_name: self.target.clone(),
            settle_pause_ms: self.settle_pause_ms,
            popup_timeout_ms: self.popup_timeout_ms,
            max_delete_retries: self.max_delete_retries,
            log_dir: self.log_dir.clone(),
        }
    }
}


pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let config = crate::load_config(args.config.as_ref(), args.overrides())
        .context("failed to load configuration")?;
    let sink = JsonFileSink::new(&config.log_dir).with_context(|| {
        format!("failed to create log directory {}", config.log_dir.display())
    })?;

    let cancel = CancellationToken::new();
    spawn_interrupt_listener(cancel.clone());

    let session = BrowserSession::start(&args.session_options())
        .await
        .context("failed to start browser")?;
    session.goto(&args.url).await?;

    if !args.no_prompt && !wait_for_operator(&cancel).await? {
        warn!("Interrupted before the run started");
        session.close().await?;
        return Ok(EXIT_CANCELLED);
    }

    let surface = session.surface(&config.selectors.identifier_attribute);
    let summary = MigrationRun::new(config)
        .execute(&surface, &sink, &cancel)
        .await;
    print_summary(&summary);

    if args.keep_open && !cancel.is_cancelled() {
        info!("Browser left open; press Ctrl-C to exit");
        cancel.cancelled().await;
    }
    session.close().await?;
    Ok(summary.exit_code())
}

fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing up");
            cancel.cancel();
        }
    });
}

/// Waits for ENTER on stdin. `Ok(false)` when interrupted first.
async fn wait_for_operator(cancel: &CancellationToken) -> anyhow::Result<bool> {
    eprintln!(
        "Log in and make sure your cart and saved items are visible, then press ENTER to continue..."
    );
    let mut line = String::new();
    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
    tokio::select! {
        () = cancel.cancelled() => Ok(false),
        read = stdin.read_line(&mut line) => {
            read.context("failed to read from stdin")?;
            Ok(true)
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("Run {}", summary.run_key);
    println!("  moved to saved-for-later: {}", summary.cart.moved());
    if let Some(abort) = &summary.cart.aborted {
        println!("  cart stage stopped early: {}", abort.detail);
    }
    match &summary.promotion {
        Some(promotion) => {
            println!("  added to list:            {}", promotion.promoted());
            println!("  deleted from saved:       {}", promotion.deleted());
            println!("  failed:                   {}", promotion.failed());
            if promotion.unresolved > 0 {
                println!("  unresolved, left in place: {}", promotion.unresolved);
            }
            if let Some(abort) = &promotion.aborted {
                println!("  promotion stopped early:  {}", abort.detail);
            }
        }
        None => println!("  list promotion did not run"),
    }
    match &summary.audit {
        Some(location) => println!("  audit: {location}"),
        None => println!("  audit: not written"),
    }
    if let Err(err) = &summary.result {
        println!("  result: {err}");
    }
}
