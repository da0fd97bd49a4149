pub mod init;
pub mod shell;
pub mod version;

pub use init::Init;
pub use shell::Shell;
pub use version::Version;
