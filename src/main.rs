use std::sync::Arc;
use tracing::{info, warn};

use blockbar::config::{Invocation, print_help};
use blockbar::daemon::{Hooks, TickLoop};
use blockbar::dispatch::Dispatcher;
use blockbar::hooks::{Bash, Desktop, Notifier, Silent};
use blockbar::hypr::Hyprctl;
use blockbar::pomodoro::Session;
use blockbar::ws::{client, websocket_server};
use blockbar::{config::Config, logging};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("blockbar: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Invocation::from_env()? {
        Invocation::Help => print_help(),
        Invocation::DumpConfig { config, path } => {
            config.write(&path)?;
            eprintln!("wrote configuration to {}", path.display());
        }
        Invocation::Ctl { addr, command } => {
            let reply = client::send(&format!("ws://{addr}"), &command).await?;
            if let Some(message) = reply.message {
                println!("{}", message.trim_end());
            }
            if !reply.success {
                std::process::exit(1);
            }
        }
        Invocation::Run(config) => run_daemon(config).await?,
    }
    Ok(())
}

/// Run in daemon mode - command server + block timer + activity sampling
async fn run_daemon(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    logging::init(config.log_file.as_deref())?;

    let session = Session::shared(config.cooldown());
    let listener = websocket_server::bind(config.listen).await?;
    tokio::spawn(websocket_server::serve(
        listener,
        Dispatcher::new(Arc::clone(&session)),
    ));

    let notifier: Arc<dyn Notifier> = if config.notify {
        Arc::new(Desktop)
    } else {
        Arc::new(Silent)
    };
    let hooks = Hooks {
        sampler: Arc::new(Hyprctl),
        shell: Arc::new(Bash),
        notifier,
    };
    let ticker = TickLoop::new(session, &config, hooks);

    info!(
        listen = %config.listen,
        poll_ms = config.poll_ms,
        cooldown_secs = config.cooldown_secs,
        "blockbar started"
    );

    tokio::select! {
        _ = ticker.run(tokio::io::stdout()) => {}
        _ = shutdown_signal() => {}
    }

    info!("blockbar stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
