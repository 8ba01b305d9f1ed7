//! Step runners
//!
//! [`StepRunner`] is the seam between scheduling and doing. The executor
//! only decides what runs when; a runner turns one step into a
//! [`StepStatus`]. [`CommandRunner`] runs commands through the platform
//! shell and handles the standard actions locally.

use crate::cache::{CacheOutcome, LocalCache, cache_key, lockfile_digest};
use crate::plan::JobInstance;
use crate::status::{FailureKind, StepStatus};
use crate::workflow::{ActionRef, StepAction, StepDef};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often a running command is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Time between SIGTERM and kill.
#[cfg_attr(not(unix), allow(dead_code))]
const GRACE_PERIOD: Duration = Duration::from_secs(2);

/// What a runner knows about the step it runs.
pub struct StepContext<'a> {
    /// Instance the step belongs to.
    pub instance: &'a JobInstance,
    /// Directory commands run in.
    pub workspace: &'a Path,
    /// Time limit for the step.
    pub timeout: Option<Duration>,
    /// Set when a sibling instance failed under fail-fast.
    pub cancelled: &'a AtomicBool,
}

impl StepContext<'_> {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Runs a single step.
pub trait StepRunner: Sync {
    /// Run `step` and report its outcome.
    fn run_step(&self, ctx: &StepContext<'_>, step: &StepDef) -> StepStatus;
}

impl<R: StepRunner + ?Sized> StepRunner for &R {
    fn run_step(&self, ctx: &StepContext<'_>, step: &StepDef) -> StepStatus {
        (**self).run_step(ctx, step)
    }
}

/// Runs `run` steps through the shell and emulates the standard actions.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    cache: LocalCache,
}

impl CommandRunner {
    /// Runner that keeps cache markers in `cache`.
    pub fn new(cache: LocalCache) -> Self {
        Self { cache }
    }

    fn run_command(&self, ctx: &StepContext<'_>, command: &str, kind: FailureKind) -> StepStatus {
        info!(
            job = %ctx.instance.name,
            platform = %ctx.instance.platform,
            command,
            "running command"
        );
        let child = match shell(command, ctx.workspace, &ctx.instance.env).spawn() {
            Ok(child) => child,
            Err(e) => {
                return StepStatus::failed(
                    FailureKind::Setup,
                    None,
                    format!("failed to spawn `{command}`: {e}"),
                );
            }
        };

        match wait(child, ctx) {
            Ok(Exit::Completed(status)) if status.success() => StepStatus::Success,
            Ok(Exit::Completed(status)) => StepStatus::failed(
                kind,
                status.code(),
                match status.code() {
                    Some(code) => format!("`{command}` exited with status {code}"),
                    None => format!("`{command}` was terminated by a signal"),
                },
            ),
            Ok(Exit::TimedOut(limit)) => StepStatus::failed(
                FailureKind::Timeout,
                None,
                format!("`{command}` exceeded {limit:?}"),
            ),
            Ok(Exit::Cancelled) => StepStatus::Cancelled,
            Err(e) => StepStatus::failed(FailureKind::Setup, None, format!("waiting for `{command}`: {e}")),
        }
    }

    fn run_action(
        &self,
        ctx: &StepContext<'_>,
        action: &ActionRef,
        with: &BTreeMap<String, String>,
    ) -> StepStatus {
        match action.name.as_str() {
            "actions/checkout" => {
                if ctx.workspace.join("Cargo.toml").is_file() {
                    StepStatus::Success
                } else {
                    StepStatus::failed(
                        FailureKind::Setup,
                        None,
                        format!("no Cargo.toml in {}", ctx.workspace.display()),
                    )
                }
            }
            name if name.ends_with("/rust-toolchain") || name.ends_with("/rust-toolchain-action") => {
                check_toolchain(with.get("components").map(String::as_str))
            }
            "actions/cache" => self.restore_cache(ctx),
            _ => StepStatus::Warned {
                message: format!("no local handler for {action}; skipped"),
            },
        }
    }

    fn restore_cache(&self, ctx: &StepContext<'_>) -> StepStatus {
        let digest = match lockfile_digest(ctx.workspace) {
            Ok(digest) => digest,
            Err(e) => {
                return StepStatus::Warned {
                    message: format!("cache key unavailable: {e}"),
                };
            }
        };
        let key = cache_key(&ctx.instance.platform, &digest);
        match self.cache.restore(&key) {
            CacheOutcome::Hit => {
                info!(job = %ctx.instance.name, key = %key, "cache hit");
                StepStatus::Success
            }
            CacheOutcome::Miss => {
                info!(job = %ctx.instance.name, key = %key, "cache miss");
                match self.cache.save(&key) {
                    Ok(()) => StepStatus::Success,
                    Err(e) => StepStatus::Warned {
                        message: format!("cache save failed: {e}"),
                    },
                }
            }
        }
    }
}

impl StepRunner for CommandRunner {
    fn run_step(&self, ctx: &StepContext<'_>, step: &StepDef) -> StepStatus {
        match &step.action {
            StepAction::Run { command, kind } => self.run_command(ctx, command, (*kind).into()),
            StepAction::Uses { action, with } => self.run_action(ctx, action, with),
        }
    }
}

/// Verify cargo runs, and that every requested component with a cargo
/// subcommand answers `--version`.
fn check_toolchain(components: Option<&str>) -> StepStatus {
    if let Err(status) = cargo_version(None) {
        return status;
    }
    for component in requested_components(components.unwrap_or_default()) {
        match component_subcommand(component) {
            Some(subcommand) => {
                if let Err(status) = cargo_version(Some(subcommand)) {
                    return status;
                }
            }
            None => debug!(component, "no local check for toolchain component"),
        }
    }
    StepStatus::Success
}

fn requested_components(list: &str) -> impl Iterator<Item = &str> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|c| !c.is_empty())
}

fn component_subcommand(component: &str) -> Option<&'static str> {
    match component {
        "rustfmt" => Some("fmt"),
        "clippy" => Some("clippy"),
        _ => None,
    }
}

/// `cargo [subcommand] --version`, mapped to a setup failure.
fn cargo_version(subcommand: Option<&str>) -> Result<(), StepStatus> {
    let shown = match subcommand {
        Some(sub) => format!("cargo {sub} --version"),
        None => "cargo --version".to_string(),
    };
    let mut cmd = Command::new("cargo");
    cmd.args(subcommand)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    match cmd.status() {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(StepStatus::failed(
            FailureKind::Setup,
            status.code(),
            format!("`{shown}` failed; is the component installed?"),
        )),
        Err(e) => Err(StepStatus::failed(
            FailureKind::Setup,
            None,
            format!("cargo not found: {e}"),
        )),
    }
}

/// Shell command in its own process group on Unix, so termination reaches
/// everything it spawned.
fn shell(command: &str, dir: &Path, env: &BTreeMap<String, String>) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };
    cmd.current_dir(dir)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    cmd
}

enum Exit {
    Completed(ExitStatus),
    TimedOut(Duration),
    Cancelled,
}

fn wait(mut child: Child, ctx: &StepContext<'_>) -> std::io::Result<Exit> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Exit::Completed(status));
        }
        if let Some(limit) = ctx.timeout.filter(|limit| start.elapsed() >= *limit) {
            warn!(job = %ctx.instance.name, timeout = ?limit, "step timed out");
            terminate(&mut child);
            return Ok(Exit::TimedOut(limit));
        }
        if ctx.is_cancelled() {
            info!(job = %ctx.instance.name, "step cancelled");
            terminate(&mut child);
            return Ok(Exit::Cancelled);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// SIGTERM the child's process group, wait out the grace period for the
/// shell, then SIGKILL the group and reap.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = -(child.id() as libc::pid_t);
        // SAFETY: kill(2) on the process group led by a child we spawned.
        let _ = unsafe { libc::kill(group, libc::SIGTERM) };
        let deadline = Instant::now() + GRACE_PERIOD;
        while Instant::now() < deadline && !matches!(child.try_wait(), Ok(Some(_))) {
            std::thread::sleep(POLL_INTERVAL);
        }
        // descendants that ignored SIGTERM or outlived the shell
        // SAFETY: as above.
        let _ = unsafe { libc::kill(group, libc::SIGKILL) };
    }
    let _ = child.kill();
    let _ = child.wait();
}
