//! `rigvisor`: run one mining worker under supervision until a termination signal.
//!
//! ```bash
//! rigvisor --config rigvisor.toml
//! rigvisor --path /opt/rigs/ethash.rn --args "-P stratum://pool:4444" --max-zero-samples 3
//! ```
//!
//! Flags override values from the config file. Logging follows `RUST_LOG`
//! (default `info`); worker output is logged under the `worker` target.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rigvisor::{
    Config, FileConfig, LogWriter, RestartPolicy, StartOutcome, Subscribe, Supervisor, WorkerSpec,
    wait_for_shutdown_signal,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "rigvisor")]
#[command(about = "Supervise a GPU mining worker and restart it when it misbehaves")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "RIGVISOR_CONFIG")]
    config: Option<PathBuf>,

    /// Worker executable (overrides `[worker].path`)
    #[arg(long)]
    path: Option<PathBuf>,

    /// Worker arguments as one space-separated string (overrides `[worker].args`)
    #[arg(long, allow_hyphen_values = true)]
    args: Option<String>,

    /// Stop the worker instead of restarting it when a watchdog trips
    #[arg(long)]
    no_auto_restart: bool,

    /// Consecutive zero hashrate samples tolerated before a restart
    #[arg(long)]
    max_zero_samples: Option<u32>,

    /// Delay between stop and start of a restart, in seconds
    #[arg(long)]
    restart_cooldown_secs: Option<u64>,

    /// Warmup after each start during which zero samples are ignored, in seconds
    #[arg(long)]
    zero_output_grace_secs: Option<u64>,

    /// Stall detector period in seconds (0 disables it)
    #[arg(long)]
    stall_interval_secs: Option<u64>,

    /// Only log accepted/rejected share lines
    #[arg(long)]
    share_only: bool,
}

impl Args {
    /// Config file (if any) with flags applied on top, plus the worker to launch.
    fn resolve(&self) -> Result<(Config, WorkerSpec)> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let worker = file.worker.clone();
        let mut cfg = file.into_config()?;

        if self.no_auto_restart {
            cfg.restart = RestartPolicy::Manual;
        }
        if let Some(n) = self.max_zero_samples {
            cfg.max_zero_samples = n;
        }
        if let Some(s) = self.restart_cooldown_secs {
            cfg.restart_cooldown = Duration::from_secs(s);
        }
        if let Some(s) = self.zero_output_grace_secs {
            cfg.zero_output_grace = Duration::from_secs(s);
        }
        if let Some(s) = self.stall_interval_secs {
            cfg.stall_interval = Duration::from_secs(s);
        }
        if self.share_only {
            cfg.share_only = true;
        }

        let path = match (&self.path, &worker) {
            (Some(p), _) => p.clone(),
            (None, Some(w)) => PathBuf::from(&w.path),
            (None, None) => bail!("no worker executable: pass --path or set [worker].path"),
        };
        let args = match (&self.args, &worker) {
            (Some(a), _) => a.clone(),
            (None, Some(w)) => w.args.clone(),
            (None, None) => String::new(),
        };
        Ok((cfg, WorkerSpec::from_arg_string(path, &args)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let (cfg, spec) = args.resolve().context("invalid configuration")?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg).with_subscribers(subs).build();

    match sup.start(spec.clone()).await {
        Ok(StartOutcome::Spawned { pid }) => info!(?pid, cmd = %spec, "worker launched"),
        Ok(StartOutcome::AlreadyActive) => {}
        Err(e) => {
            sup.shutdown().await.ok();
            return Err(e).context("cannot launch worker");
        }
    }

    let signal = wait_for_shutdown_signal()
        .await
        .context("cannot listen for termination signals")?;
    info!(%signal, "shutting down");

    if let Err(e) = sup.shutdown().await {
        warn!(error = %e, "supervisor already closed");
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rigvisor.toml");
        std::fs::write(
            &path,
            "max_zero_samples = 9\n[worker]\npath = \"/opt/rigs/ethash.rn\"\nargs = \"-P pool\"\n",
        )
        .unwrap();

        let args = Args::try_parse_from([
            "rigvisor",
            "--config",
            path.to_str().unwrap(),
            "--max-zero-samples",
            "2",
            "--args",
            "-P other -R",
            "--no-auto-restart",
        ])
        .unwrap();
        let (cfg, spec) = args.resolve().unwrap();

        assert_eq!(cfg.max_zero_samples, 2);
        assert_eq!(cfg.restart, RestartPolicy::Manual);
        assert_eq!(spec.path(), std::path::Path::new("/opt/rigs/ethash.rn"));
        assert_eq!(spec.args(), ["-P", "other", "-R"]);
    }

    #[test]
    fn missing_worker_path_is_rejected() {
        let args = Args::try_parse_from(["rigvisor"]).unwrap();
        assert!(args.resolve().is_err());
    }
}
