use std::path::PathBuf;

use chromiumoxide::browser::Browser;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::BrowserError;
use crate::Result;
use crate::surface::ChromeSurface;

pub const DEFAULT_START_URL: &str = "https://www.amazon.com/gp/cart/view.html";

/// How to reach Chrome.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Attach to an already running browser instead of launching one.
    pub ws_url: Option<String>,
    pub chrome_path: Option<PathBuf>,
    /// Profile directory; keeps the login between runs.
    pub profile_dir: Option<PathBuf>,
    pub headless: bool,
}

impl SessionOptions {
    fn launch_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder().viewport(None);
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(dir) = &self.profile_dir {
            builder = builder.user_data_dir(dir);
        }
        builder.build().map_err(BrowserError::Launch)
    }
}

/// A browser connection plus the page the workflow runs in.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    launched: bool,
}

impl BrowserSession {
    /// Launches or attaches to Chrome and settles on its first page.
    pub async fn start(options: &SessionOptions) -> Result<Self> {
        let (launched, (browser, mut handler)) = match &options.ws_url {
            Some(ws_url) => {
                info!("Connecting to browser at {ws_url}");
                (false, Browser::connect(ws_url.clone()).await?)
            }
            None => {
                let config = options.launch_config()?;
                info!(headless = options.headless, "Launching browser");
                (true, Browser::launch(config).await?)
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!("browser handler error: {err}");
                }
            }
        });

        let page = match browser.pages().await?.into_iter().next() {
            Some(page) => page,
            None => browser.new_page("about:blank").await?,
        };

        Ok(Self {
            browser,
            handler,
            page,
            launched,
        })
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        info!("Navigating to {url}");
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Surface over the session's page.
    pub fn surface(&self, identifier_attr: &str) -> ChromeSurface {
        ChromeSurface::new(self.page.clone(), identifier_attr)
    }

    /// Closes a launched browser; only detaches from an attached one.
    pub async fn close(mut self) -> Result<()> {
        if self.launched {
            if let Err(err) = self.browser.close().await {
                warn!("Failed to close browser: {err}");
            }
            self.browser.wait().await?;
        }
        self.handler.abort();
        Ok(())
    }
}
