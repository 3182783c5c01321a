use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::models::{ApplicationIdentity, SweepSettings};
use crate::scheduler::Sentinel;
use crate::utils::brew::{brew_path, cask_token_for};
use crate::utils::command::run_command_with_timeout;
use crate::utils::{AppError, AppResult};

/// What a hook learns about the finished removal.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub identity: ApplicationIdentity,
    pub bundle_removed: bool,
    /// The trash watch was running before the batch paused it.
    pub sentinel_was_active: bool,
}

/// Side effect run after a removal batch. Hooks are spawned and never
/// awaited by the removal itself.
#[async_trait]
pub trait RemovalHook: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self, settings: &SweepSettings, ctx: &HookContext) -> bool;
    async fn run(&self, ctx: &HookContext) -> AppResult<()>;
}

/// Spawns every enabled hook. The handles are returned for callers that
/// want to wait; dropping them leaves the hooks running.
pub fn spawn_hooks(
    hooks: &[Arc<dyn RemovalHook>],
    settings: &SweepSettings,
    ctx: HookContext,
) -> Vec<JoinHandle<()>> {
    hooks
        .iter()
        .filter(|hook| hook.is_enabled(settings, &ctx))
        .map(|hook| {
            let hook = Arc::clone(hook);
            let ctx = ctx.clone();
            tokio::spawn(async move {
                match hook.run(&ctx).await {
                    Ok(()) => log::info!("Hook {} finished", hook.name()),
                    Err(e) => log::warn!("Hook {} failed: {}", hook.name(), e),
                }
            })
        })
        .collect()
}

/// Lets Homebrew forget a cask whose app was just removed by hand.
pub struct BrewCaskCleanup;

#[async_trait]
impl RemovalHook for BrewCaskCleanup {
    fn name(&self) -> &str {
        "brew-cask-cleanup"
    }

    /// Only once the bundle itself is gone: `--zap` would also remove an
    /// app the user chose to keep.
    fn is_enabled(&self, settings: &SweepSettings, ctx: &HookContext) -> bool {
        settings.brew_cleanup && ctx.bundle_removed
    }

    async fn run(&self, ctx: &HookContext) -> AppResult<()> {
        let brew = brew_path().ok_or_else(|| AppError::NotFound("brew".into()))?;
        let brew = brew.to_string_lossy().to_string();
        let token = cask_token_for(&ctx.identity.display_name).ok_or_else(|| {
            AppError::Custom(format!("No cask token for {}", ctx.identity.display_name))
        })?;

        let output = run_command_with_timeout(
            &brew,
            &["uninstall", "--cask", "--zap", "--force", &token],
            300,
        )
        .await?;
        if !output.status.success() {
            // Most apps weren't installed through a cask.
            log::debug!(
                "brew uninstall --cask {}: {}",
                token,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let output = run_command_with_timeout(&brew, &["cleanup"], 300).await?;
        if !output.status.success() {
            return Err(AppError::CommandFailed(format!(
                "brew cleanup: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Restarts the trash watch paused for the removal batch.
pub struct SentinelRearm {
    sentinel: Arc<Sentinel>,
}

impl SentinelRearm {
    pub fn new(sentinel: Arc<Sentinel>) -> Self {
        Self { sentinel }
    }
}

#[async_trait]
impl RemovalHook for SentinelRearm {
    fn name(&self) -> &str {
        "sentinel-rearm"
    }

    fn is_enabled(&self, _settings: &SweepSettings, ctx: &HookContext) -> bool {
        ctx.sentinel_was_active
    }

    async fn run(&self, _ctx: &HookContext) -> AppResult<()> {
        self.sentinel.start()
    }
}
