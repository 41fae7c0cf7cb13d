use std::fs::{self, OpenOptions};

use env_logger::{Builder, Env, Target};

use crate::app_dirs::AppDirs;

/// Log to a file so the terminal UI keeps the screen to itself.
///
/// Falls back to stderr if the state directory cannot be created.
pub fn init_file_logging() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    if let Some(path) = AppDirs::log_path() {
        let opened = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| OpenOptions::new().create(true).append(true).open(&path));
        match opened {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("could not open log file {}: {e}", path.display()),
        }
    }

    let _ = builder.try_init();
}

/// Log to stderr for one-shot subcommands.
pub fn init_stderr_logging() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn")).try_init();
}
