use std::path::PathBuf;

use clap::{Parser, Subcommand};

use common::vfs::EntryKind;

/// One line typed at the shell prompt.
#[derive(Parser, Debug)]
#[command(
    name = "termfs",
    no_binary_name = true,
    disable_help_flag = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Print the current folder
    Pwd,
    /// Change folder (to the root when no path is given)
    Cd {
        path: Option<String>,
        /// Resolve folder links along the path
        #[arg(short = 'L')]
        follow_links: bool,
    },
    /// List a folder
    Ls { path: Option<String> },
    /// Create a folder
    Mkdir {
        path: String,
        /// Create missing parents too
        #[arg(short = 'p')]
        parents: bool,
    },
    /// Create an empty file, or bump its update time
    Touch { path: String },
    /// Print a file
    Cat {
        path: String,
        /// Resolve a file link at the leaf
        #[arg(short = 'L')]
        follow_links: bool,
    },
    /// Replace a file's content with the given text
    Write {
        path: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Copy a file (-f, the default) or folder (-r)
    Cp {
        from: String,
        to: String,
        #[arg(short = 'f', conflicts_with = "recursive")]
        file: bool,
        #[arg(short = 'r')]
        recursive: bool,
    },
    /// Move a file (-f, the default) or folder (-r)
    Mv {
        from: String,
        to: String,
        #[arg(short = 'f', conflicts_with = "recursive")]
        file: bool,
        #[arg(short = 'r')]
        recursive: bool,
    },
    /// Remove a file (-f, the default) or folder (-r)
    Rm {
        path: String,
        #[arg(short = 'f', conflicts_with = "recursive")]
        file: bool,
        #[arg(short = 'r')]
        recursive: bool,
    },
    /// Create a file link (or a folder link with -d) named `name`
    Ln {
        target: String,
        name: String,
        #[arg(short = 'd')]
        folder: bool,
    },
    /// Remove a file link (or a folder link with -d)
    Unlink {
        name: String,
        #[arg(short = 'd')]
        folder: bool,
    },
    /// Show a file's serial, size and timestamps
    Stat { path: String },
    /// Upload the tree to the content store
    Push,
    /// Replace the tree with the one on the content store
    Pull,
    /// Write the current folder as a zip archive to a local file
    Zip { output: PathBuf },
    /// List commands
    Help,
    /// Leave the shell
    Exit,
}

/// `-r` selects folders; files are the default.
pub fn entry_kind(recursive: bool) -> EntryKind {
    if recursive {
        EntryKind::Folder
    } else {
        EntryKind::File
    }
}

pub const HELP: &str = "\
commands:
  pwd                      print the current folder
  cd [-L] [path]           change folder (-L follows folder links)
  ls [path]                list a folder
  mkdir [-p] <path>        create a folder (-p creates parents)
  touch <path>             create an empty file or bump its update time
  cat [-L] <path>          print a file (-L follows file links)
  write <path> <text...>   replace a file's content
  cp [-f|-r] <from> <to>   copy a file, or a folder with -r
  mv [-f|-r] <from> <to>   move a file, or a folder with -r
  rm [-f|-r] <path>        remove a file, or a folder with -r
  ln [-d] <target> <name>  link to a file, or a folder with -d
  unlink [-d] <name>       remove a file link, or a folder link with -d
  stat <path>              show a file's serial, size and timestamps
  push                     upload the tree to the content store
  pull                     replace the tree with the stored one
  zip <local-file>         archive the current folder to a local file
  help                     show this text
  exit                     leave the shell";
