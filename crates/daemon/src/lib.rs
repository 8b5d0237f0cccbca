// autocommit-daemon: watch a directory tree and periodically commit it to git.

pub mod config;
pub mod git;
pub mod runtime;
pub mod watcher;
