//! The periodic driver: expiry checks, window sampling, status output.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, trace, warn};

use crate::clock::Stamp;
use crate::config::Config;
use crate::error::SampleError;
use crate::hooks::{Notifier, ShellRunner};
use crate::hypr::Sampler;
use crate::pomodoro::{BlockState, SharedSession, Transition, lock};
use crate::status::Palette;

/// The external collaborators the tick loop calls into.
#[derive(Clone)]
pub struct Hooks {
    pub sampler: Arc<dyn Sampler>,
    pub shell: Arc<dyn ShellRunner>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct TickLoop {
    session: SharedSession,
    hooks: Hooks,
    palette: Palette,
    poll_interval: Duration,
    sample_timeout: Duration,
    end_command: Option<String>,
    sampling: Arc<AtomicBool>,
}

impl TickLoop {
    pub fn new(session: SharedSession, config: &Config, hooks: Hooks) -> Self {
        Self {
            session,
            hooks,
            palette: config.palette.clone(),
            poll_interval: config.poll_interval(),
            sample_timeout: config.sample_timeout(),
            end_command: config.end_command.clone(),
            sampling: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run forever, writing one status line per tick to `out`.
    pub async fn run<W: AsyncWrite + Unpin>(&self, mut out: W) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let line = self.tick(Stamp::now());
            let written = async {
                out.write_all(line.as_bytes()).await?;
                out.write_all(b"\n").await?;
                out.flush().await
            };
            if let Err(e) = written.await {
                warn!(error = %e, "failed to write status line");
            }
        }
    }

    /// Apply due transitions, kick off a window sample when running, and
    /// return the status line for `now`.
    ///
    /// The line never waits for the sample; the sample lands in the log
    /// whenever the window query returns.
    pub fn tick(&self, now: Stamp) -> String {
        let (transition, state, line) = {
            let mut session = lock(&self.session);
            let transition = session.tick(now);
            let state = session.state();
            (transition, state, session.status_line(now, &self.palette))
        };

        if let Some(transition) = transition {
            self.on_transition(transition);
        }
        if state == BlockState::Running {
            self.spawn_sample();
        }
        line
    }

    fn on_transition(&self, transition: Transition) {
        match transition {
            Transition::BlockFinished { duration } => {
                if let Some(command) = &self.end_command {
                    self.hooks.shell.run(command);
                }
                let cooldown = lock(&self.session).cooldown();
                self.notify(
                    "Block complete",
                    format!(
                        "{} minute block done. Cooldown for {} minutes.",
                        duration.as_secs() / 60,
                        cooldown.as_secs() / 60
                    ),
                );
            }
            Transition::CooldownFinished => {
                self.notify("Cooldown over", "Ready for the next block.".to_string());
            }
        }
    }

    fn notify(&self, summary: &'static str, body: String) {
        let notifier = Arc::clone(&self.hooks.notifier);
        tokio::task::spawn_blocking(move || notifier.notify(summary, &body));
    }

    fn spawn_sample(&self) {
        // A hung window query keeps the flag set, so queries never pile up
        if self.sampling.swap(true, Ordering::AcqRel) {
            debug!("previous window query still running; skipping sample");
            return;
        }

        let sampler = Arc::clone(&self.hooks.sampler);
        let in_flight = Arc::clone(&self.sampling);
        let panicked = Arc::clone(&self.sampling);
        let session = Arc::clone(&self.session);
        let limit = self.sample_timeout;
        tokio::spawn(async move {
            let query = tokio::task::spawn_blocking(move || {
                let title = sampler.focused_window_title();
                in_flight.store(false, Ordering::Release);
                title
            });
            let title = match timeout(limit, query).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    // the closure never got to clear the flag
                    panicked.store(false, Ordering::Release);
                    warn!(error = %e, "window query task failed");
                    return;
                }
                Err(_) => Err(SampleError::Timeout),
            };
            match title {
                Ok(title) => {
                    let label = lock(&session).record_sample(&title, Stamp::now());
                    trace!(title = %title, ?label, "sampled focused window");
                }
                Err(e) => debug!(error = %e, "dropping window sample"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pomodoro::Session;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    struct FixedTitle(&'static str);

    impl Sampler for FixedTitle {
        fn focused_window_title(&self) -> Result<String, SampleError> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;

    struct Hung {
        calls: AtomicUsize,
    }

    impl Sampler for Hung {
        fn focused_window_title(&self) -> Result<String, SampleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(500));
            Ok("Terminal".to_string())
        }
    }

    struct Panicking;

    impl Sampler for Panicking {
        fn focused_window_title(&self) -> Result<String, SampleError> {
            panic!("window query blew up");
        }
    }

    impl Sampler for Broken {
        fn focused_window_title(&self) -> Result<String, SampleError> {
            Err(SampleError::Empty)
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ShellRunner for Recorder {
        fn run(&self, command: &str) {
            self.0.lock().unwrap().push(command.to_string());
        }
    }

    impl Notifier for Recorder {
        fn notify(&self, summary: &str, _body: &str) {
            self.0.lock().unwrap().push(summary.to_string());
        }
    }

    fn config() -> Config {
        Config {
            end_command: Some("keyboard.sh".to_string()),
            ..Config::default()
        }
    }

    fn hooks(sampler: Arc<dyn Sampler>, shell: Arc<Recorder>) -> Hooks {
        Hooks {
            sampler,
            shell,
            notifier: Arc::new(Recorder::default()),
        }
    }

    #[tokio::test]
    async fn test_end_command_runs_once_per_block() {
        let session = Session::shared(Duration::from_secs(300));
        let shell = Arc::new(Recorder::default());
        let ticker = TickLoop::new(
            Arc::clone(&session),
            &config(),
            hooks(Arc::new(Broken), Arc::clone(&shell)),
        );

        let t0 = Stamp::now();
        lock(&session).start_block(Duration::from_secs(60), t0).unwrap();
        assert_eq!(ticker.tick(t0 + Duration::from_secs(30)), "<fc=#40ff00>00:30</fc>");
        ticker.tick(t0 + Duration::from_secs(60));
        let line = ticker.tick(t0 + Duration::from_secs(61));
        assert!(line.contains("~04:59"));
        ticker.tick(t0 + Duration::from_secs(360));
        assert_eq!(ticker.tick(t0 + Duration::from_secs(361)), "<fc=#aaaaaa>--</fc>");

        assert_eq!(*shell.0.lock().unwrap(), vec!["keyboard.sh".to_string()]);
    }

    #[tokio::test]
    async fn test_running_tick_samples_focused_window() {
        let session = Session::shared(Duration::from_secs(300));
        let ticker = TickLoop::new(
            Arc::clone(&session),
            &config(),
            hooks(
                Arc::new(FixedTitle("nvim (tmux:work/blockbar)")),
                Arc::new(Recorder::default()),
            ),
        );

        let t0 = Stamp::now();
        {
            let mut s = lock(&session);
            s.task_log_add("coding", t0);
            s.start_block(Duration::from_secs(600), t0).unwrap();
        }
        ticker.tick(Stamp::now());

        let mut labels = Vec::new();
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let report = lock(&session).task_log_output(false, Stamp::now());
            labels = report.totals.into_iter().map(|t| t.label).collect();
            if !labels.is_empty() {
                break;
            }
        }
        assert_eq!(labels, vec!["tmux/work/blockbar".to_string()]);
    }

    #[tokio::test]
    async fn test_hung_query_never_blocks_ticks() {
        let session = Session::shared(Duration::from_secs(300));
        let sampler = Arc::new(Hung {
            calls: AtomicUsize::new(0),
        });
        let cfg = Config {
            sample_timeout_ms: 50,
            ..config()
        };
        let ticker = TickLoop::new(
            Arc::clone(&session),
            &cfg,
            hooks(sampler.clone(), Arc::new(Recorder::default())),
        );
        let t0 = Stamp::now();
        {
            let mut s = lock(&session);
            s.task_log_add("coding", t0);
            s.start_block(Duration::from_secs(600), t0).unwrap();
        }

        let started = Instant::now();
        for i in 1..=5 {
            assert!(ticker.tick(t0 + Duration::from_secs(i)).contains("09:5"));
        }
        assert!(started.elapsed() < Duration::from_millis(200));

        // past the timeout, the query is still running and nothing piles up
        tokio::time::sleep(Duration::from_millis(150)).await;
        ticker.tick(t0 + Duration::from_secs(6));
        assert_eq!(sampler.calls.load(Ordering::SeqCst), 1);
        assert!(ticker.sampling.load(Ordering::Acquire));
        assert!(lock(&session).task_log_output(false, Stamp::now()).totals.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_sampler_releases_flag() {
        let session = Session::shared(Duration::from_secs(300));
        let ticker = TickLoop::new(
            Arc::clone(&session),
            &config(),
            hooks(Arc::new(Panicking), Arc::new(Recorder::default())),
        );
        let t0 = Stamp::now();
        lock(&session).start_block(Duration::from_secs(600), t0).unwrap();
        ticker.tick(t0);

        let mut released = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if !ticker.sampling.load(Ordering::Acquire) {
                released = true;
                break;
            }
        }
        assert!(released);
    }

    #[tokio::test]
    async fn test_idle_tick_does_not_sample() {
        let session = Session::shared(Duration::from_secs(300));
        let ticker = TickLoop::new(
            Arc::clone(&session),
            &config(),
            hooks(Arc::new(FixedTitle("Terminal")), Arc::new(Recorder::default())),
        );
        lock(&session).task_log_add("coding", Stamp::now());
        ticker.tick(Stamp::now());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!ticker.sampling.load(Ordering::Acquire));
        assert!(lock(&session).task_log_output(false, Stamp::now()).totals.is_empty());
    }

    #[tokio::test]
    async fn test_run_writes_lines() {
        let session = Session::shared(Duration::from_secs(300));
        let cfg = Config {
            poll_ms: 10,
            ..config()
        };
        let ticker = TickLoop::new(
            session,
            &cfg,
            hooks(Arc::new(Broken), Arc::new(Recorder::default())),
        );
        let (writer, reader) = tokio::io::duplex(4096);
        let handle = tokio::spawn(async move { ticker.run(writer).await });

        let mut reader = tokio::io::BufReader::new(reader);
        let mut line = String::new();
        tokio::io::AsyncBufReadExt::read_line(&mut reader, &mut line)
            .await
            .unwrap();
        assert_eq!(line, "<fc=#aaaaaa>--</fc>\n");
        handle.abort();
    }
}
