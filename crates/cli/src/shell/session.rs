use std::sync::Arc;

use clap::Parser;
use common::prelude::*;

use super::commands::{entry_kind, ShellCommand, ShellLine, HELP};
use super::tokenizer::{tokenize, TokenizeError};

/// What the shell loop should do after a line has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Print the output (if any) and read the next line
    Continue(String),
    Exit,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    Parse(String),
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error("no user key configured; pass --user-key or set user_key in config.toml")]
    NoUserKey,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// State carried between shell lines: the tree, where we are in it and
///  where it syncs to.
#[derive(Debug)]
pub struct Session {
    fs: Fs,
    cursor: Cursor,
    store: Arc<dyn ContentStore>,
    user_key: Option<UserKey>,
}

impl Session {
    pub fn new(fs: Fs, store: Arc<dyn ContentStore>, user_key: Option<UserKey>) -> Self {
        let cursor = fs.cursor();
        Self {
            fs,
            cursor,
            store,
            user_key,
        }
    }

    pub fn fs(&self) -> &Fs {
        &self.fs
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn prompt(&self) -> String {
        format!("termfs:{}$ ", self.cursor.full_path())
    }

    /// Tokenize, parse and run one line. Blank lines are a no-op.
    pub async fn run_line(&mut self, line: &str) -> Result<Flow, SessionError> {
        let words = tokenize(line)?;
        if words.is_empty() {
            return Ok(Flow::Continue(String::new()));
        }
        let parsed =
            ShellLine::try_parse_from(&words).map_err(|e| SessionError::Parse(e.to_string()))?;
        self.execute(parsed.command).await
    }

    pub async fn execute(&mut self, command: ShellCommand) -> Result<Flow, SessionError> {
        tracing::debug!(?command, cwd = %self.cursor.full_path(), "executing");
        let output = match command {
            ShellCommand::Pwd => self.cursor.full_path(),
            ShellCommand::Cd { path, follow_links } => {
                let path = path.as_deref().unwrap_or("/");
                if follow_links {
                    self.cursor.goto_path_following_links(path)?;
                } else {
                    self.cursor.goto_path(path)?;
                }
                String::new()
            }
            ShellCommand::Ls { path } => self.cursor.list(path.as_deref().unwrap_or("."))?.to_string(),
            ShellCommand::Mkdir { path, parents } => {
                if parents {
                    self.cursor.create_path(&path, false)?;
                } else {
                    self.cursor.make_folder(&path, false)?;
                }
                String::new()
            }
            ShellCommand::Touch { path } => {
                self.cursor.touch(&path)?;
                String::new()
            }
            ShellCommand::Cat { path, follow_links } => {
                let content = if follow_links {
                    self.cursor.read_file_following_links(&path)?
                } else {
                    self.cursor.read_file(&path)?
                };
                String::from_utf8_lossy(&content).into_owned()
            }
            ShellCommand::Write { path, text } => {
                self.cursor.write_file(&path, text.join(" ").into_bytes())?;
                String::new()
            }
            ShellCommand::Cp {
                from,
                to,
                recursive,
                ..
            } => {
                self.cursor.copy_entry(entry_kind(recursive), &from, &to)?;
                String::new()
            }
            ShellCommand::Mv {
                from,
                to,
                recursive,
                ..
            } => {
                self.cursor.move_entry(entry_kind(recursive), &from, &to)?;
                String::new()
            }
            ShellCommand::Rm {
                path, recursive, ..
            } => {
                self.cursor.delete_entry(entry_kind(recursive), &path)?;
                String::new()
            }
            ShellCommand::Ln {
                target,
                name,
                folder,
            } => {
                self.cursor.link(entry_kind(folder), &target, &name, false)?;
                String::new()
            }
            ShellCommand::Unlink { name, folder } => {
                self.cursor.unlink(entry_kind(folder), &name)?;
                String::new()
            }
            ShellCommand::Stat { path } => format_info(&self.cursor.file_info(&path)?),
            ShellCommand::Push => {
                let user_key = self.user_key.as_ref().ok_or(SessionError::NoUserKey)?;
                let summary = push(&self.fs, self.store.as_ref(), user_key).await?;
                format!(
                    "pushed {} file(s), {} byte(s)",
                    summary.files, summary.bytes
                )
            }
            ShellCommand::Pull => {
                let user_key = self.user_key.as_ref().ok_or(SessionError::NoUserKey)?;
                let summary = recover(&self.fs, self.store.as_ref(), user_key).await?;
                // the old tree is gone
                self.cursor.reset();
                format!(
                    "recovered {} file(s), {} byte(s)",
                    summary.files, summary.bytes
                )
            }
            ShellCommand::Zip { output } => {
                let archive = self.cursor.zip_archive().await?;
                tokio::fs::write(&output, &archive).await?;
                format!("wrote {} byte(s) to {}", archive.len(), output.display())
            }
            ShellCommand::Help => HELP.to_string(),
            ShellCommand::Exit => return Ok(Flow::Exit),
        };
        Ok(Flow::Continue(output))
    }
}

fn format_info(info: &FileInfo) -> String {
    format!(
        "name: {}\nserial: {}\nsize: {}\ncreated: {}\nupdated: {}",
        info.name,
        info.serial,
        info.size,
        info.created_at.to_rfc3339(),
        info.updated_at.to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(store: &MemoryContentStore) -> Session {
        Session::new(
            Fs::new(),
            Arc::new(store.clone()),
            Some(UserKey::parse("session_user").unwrap()),
        )
    }

    async fn run(session: &mut Session, line: &str) -> String {
        match session.run_line(line).await.unwrap() {
            Flow::Continue(output) => output,
            Flow::Exit => panic!("unexpected exit on {:?}", line),
        }
    }

    #[tokio::test]
    async fn test_copy_up_and_list() {
        let mut session = session_with(&MemoryContentStore::new());
        run(&mut session, "mkdir -p /a/b").await;
        run(&mut session, "cd /a/b").await;
        run(&mut session, "write c.txt hello there").await;
        run(&mut session, "cp c.txt ../c.txt").await;

        assert_eq!(run(&mut session, "pwd").await, "/a/b");
        assert_eq!(run(&mut session, "ls /a").await, "folders:\n  b/\nfiles:\n  c.txt");
        assert_eq!(run(&mut session, "cat ../c.txt").await, "hello there");
        assert_eq!(session.prompt(), "termfs:/a/b$ ");
    }

    #[tokio::test]
    async fn test_errors_leave_session_usable() {
        let mut session = session_with(&MemoryContentStore::new());
        assert!(matches!(
            session.run_line("cat missing").await,
            Err(SessionError::Fs(FsError::NotFound(_)))
        ));
        assert!(matches!(
            session.run_line("cd /nowhere").await,
            Err(SessionError::Fs(FsError::NotFound(_)))
        ));
        assert!(matches!(
            session.run_line("bogus").await,
            Err(SessionError::Parse(_))
        ));
        assert!(matches!(
            session.run_line("cat 'open").await,
            Err(SessionError::Tokenize(_))
        ));
        assert_eq!(run(&mut session, "pwd").await, "/");
        assert_eq!(run(&mut session, "   ").await, "");
        assert_eq!(session.run_line("exit").await.unwrap(), Flow::Exit);
    }

    #[tokio::test]
    async fn test_move_rename_and_remove() {
        let mut session = session_with(&MemoryContentStore::new());
        run(&mut session, "touch a").await;
        run(&mut session, "mv a b").await;
        assert_eq!(run(&mut session, "ls").await, "files:\n  b");

        run(&mut session, "mkdir dir").await;
        run(&mut session, "mv b dir/b").await;
        run(&mut session, "rm -r dir").await;
        assert_eq!(run(&mut session, "ls").await, "nothing here");
    }

    #[tokio::test]
    async fn test_pwd_follows_moved_ancestor() {
        let mut session = session_with(&MemoryContentStore::new());
        run(&mut session, "mkdir -p /a/b").await;
        run(&mut session, "cd /a/b").await;
        run(&mut session, "mv -r /a /c").await;

        assert_eq!(run(&mut session, "pwd").await, "/c/b");
        assert_eq!(session.prompt(), "termfs:/c/b$ ");
        run(&mut session, "cd ..").await;
        assert_eq!(run(&mut session, "pwd").await, "/c");
    }

    #[tokio::test]
    async fn test_links() {
        let mut session = session_with(&MemoryContentStore::new());
        run(&mut session, "mkdir -p /data/deep").await;
        run(&mut session, "write /data/deep/f.txt linked").await;
        run(&mut session, "ln -d data/deep shortcut").await;
        run(&mut session, "ln data/deep/f.txt f-link").await;

        assert_eq!(run(&mut session, "cat -L f-link").await, "linked");
        run(&mut session, "cd -L shortcut").await;
        assert_eq!(run(&mut session, "pwd").await, "/data/deep");
        assert_eq!(run(&mut session, "cat f.txt").await, "linked");

        run(&mut session, "cd").await;
        run(&mut session, "unlink -d shortcut").await;
        assert!(session.run_line("cd -L shortcut").await.is_err());
    }

    #[tokio::test]
    async fn test_stat() {
        let mut session = session_with(&MemoryContentStore::new());
        run(&mut session, "write notes 12345").await;
        let output = run(&mut session, "stat notes").await;
        assert!(output.starts_with("name: notes\nserial: "));
        assert!(output.contains("\nsize: 5\n"));
    }

    #[tokio::test]
    async fn test_push_pull_round_trip() {
        let store = MemoryContentStore::new();
        let mut first = session_with(&store);
        run(&mut first, "mkdir -p /docs/old").await;
        run(&mut first, "write /docs/readme \"first line\"").await;
        assert_eq!(run(&mut first, "push").await, "pushed 1 file(s), 10 byte(s)");

        let mut second = session_with(&store);
        run(&mut second, "mkdir scratch").await;
        run(&mut second, "cd scratch").await;
        assert_eq!(run(&mut second, "pull").await, "recovered 1 file(s), 10 byte(s)");
        assert_eq!(run(&mut second, "pwd").await, "/");
        assert_eq!(run(&mut second, "ls").await, "folders:\n  docs/");
        assert_eq!(run(&mut second, "cat docs/readme").await, "first line");
    }

    #[tokio::test]
    async fn test_sync_requires_user_key() {
        let mut session = Session::new(Fs::new(), Arc::new(MemoryContentStore::new()), None);
        assert!(matches!(
            session.run_line("push").await,
            Err(SessionError::NoUserKey)
        ));
        assert!(matches!(
            session.run_line("pull").await,
            Err(SessionError::NoUserKey)
        ));
    }

    #[tokio::test]
    async fn test_zip_writes_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("tree.zip");
        let mut session = session_with(&MemoryContentStore::new());
        run(&mut session, "write a.txt content").await;

        let line = format!("zip '{}'", output.display());
        assert!(run(&mut session, &line).await.starts_with("wrote "));
        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
