use clap::Args;

use termfs::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Key the tree is stored under on the content store
    #[arg(long)]
    pub user_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            remote: ctx.client.remote.clone(),
            user_key: self.user_key.clone(),
            ..AppConfig::default()
        };
        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        tracing::info!(remote = %state.config.remote, "initialized termfs config");

        Ok(format!(
            "Initialized termfs at {}\n  remote: {}\n  user key: {}",
            state.termfs_dir.display(),
            state.config.remote,
            if state.config.user_key.is_some() { "set" } else { "not set" }
        ))
    }
}
