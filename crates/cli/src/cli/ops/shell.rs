use std::io::IsTerminal;
use std::sync::Arc;

use clap::Args;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use common::prelude::{ContentStore, ContentStoreError, Fs, MemoryContentStore, UserKey};
use termfs::remote::HttpContentStore;
use termfs::shell::{Flow, Session};
use termfs::state::{AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Shell {
    /// Key to sync under (defaults to the configured user key)
    #[arg(long)]
    pub user_key: Option<String>,

    /// Keep push/pull in memory instead of talking to the remote
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),

    #[error("invalid user key: {0}")]
    UserKey(#[from] ContentStoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Shell {
    type Error = ShellError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load_or_default(ctx.config_path.clone())?;
        let user_key = match &self.user_key {
            Some(raw) => Some(UserKey::parse(raw)?),
            None => state.user_key()?,
        };

        let store: Arc<dyn ContentStore> = if self.offline {
            Arc::new(MemoryContentStore::new())
        } else {
            Arc::new(HttpContentStore::new(ctx.client.clone()))
        };
        tracing::info!(
            remote = %ctx.client.remote,
            offline = self.offline,
            has_user_key = user_key.is_some(),
            "starting shell"
        );

        let mut session = Session::new(Fs::new(), store, user_key);
        let interactive = std::io::stdin().is_terminal();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            if interactive {
                stdout.write_all(session.prompt().as_bytes()).await?;
                stdout.flush().await?;
            }
            let Some(line) = lines.next_line().await? else {
                break;
            };
            match session.run_line(&line).await {
                Ok(Flow::Continue(output)) => {
                    if !output.is_empty() {
                        stdout.write_all(output.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                    }
                }
                Ok(Flow::Exit) => break,
                Err(e) => eprintln!("{}", e),
            }
        }
        stdout.flush().await?;

        Ok(String::new())
    }
}
