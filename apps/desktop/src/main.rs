use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{config::load_settings_from, execute_blocking, ServiceRegistry};
use event_bus::{EventBus, Owner, UiLoop};
use shared::{domain::RESULT_OK, envelope::resolve};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use view_model::{ScreenBinding, ScreenOptions};

mod api;
mod articles;
mod console;

use api::ArticleApi;
use articles::ArticlesViewModel;
use console::ConsoleHost;

#[derive(Parser, Debug)]
struct Args {
    /// Overrides `base_url` from the settings file.
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long, default_value = client_core::config::SETTINGS_FILE)]
    config: PathBuf,
    #[arg(long, default_value_t = 20)]
    page_size: u32,
    #[arg(long)]
    max_pages: Option<i32>,
    #[arg(long, default_value_t = 60)]
    wait_secs: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings_from(&args.config, std::env::vars())?;
    if let Some(base_url) = args.base_url {
        settings.base_url = Some(base_url);
    }
    ServiceRegistry::global().configure(&settings)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    let api = ServiceRegistry::global().get_default_service::<ArticleApi>()?;
    match execute_blocking(runtime.handle(), api.health()) {
        Ok(Some(envelope)) => match resolve(Some(envelope)) {
            Ok(status) => info!(status = status.as_deref().unwrap_or("ok"), "remote reachable"),
            Err(failure) => warn!("health check rejected: {failure}"),
        },
        Ok(None) => warn!("remote unreachable; listing will report the failure"),
        Err(err) => warn!("health check failed: {err:#}"),
    }

    let ui = UiLoop::new();
    let bus = EventBus::new();
    let owner = Owner::new(ui.handle());
    let host = Arc::new(ConsoleHost::default());

    let screen = ArticlesViewModel::new(bus.clone(), runtime.handle().clone(), args.page_size, args.max_pages)?;
    let mut binding = ScreenBinding::attach(&owner, screen.base(), Arc::clone(&host), ScreenOptions::all())?;
    bus.subscribe(
        &owner,
        screen.articles(),
        |articles| {
            if let Some(last) = articles.last() {
                println!(
                    "{:>4} articles, latest: #{} {} ({})",
                    articles.len(),
                    last.id,
                    last.title,
                    last.author.as_deref().unwrap_or("anonymous")
                );
            }
        },
        true,
    )?;

    screen.start();
    let done = ui.run_until(Duration::from_secs(args.wait_secs), || host.is_finished());

    binding.detach();
    screen.base().clear();
    drop(screen);
    runtime.shutdown_timeout(Duration::from_secs(1));

    if !done {
        bail!("listing did not finish within {}s", args.wait_secs);
    }
    if host.result_code() != RESULT_OK {
        bail!("listing failed with code {}", host.result_code());
    }
    Ok(())
}
