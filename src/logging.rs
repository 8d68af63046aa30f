// ============================================
// src/logging.rs
// ログの初期化 (TUI の画面を汚さないようファイルへ出す)
// ============================================

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::Local;
use env_logger::{Builder, Target};

use crate::config::Settings;

pub fn init(settings: &Settings) {
    let mut builder = Builder::new();
    builder
        .filter_level(settings.log_level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        });

    let path = settings.log_file();
    match open_log_file(&path) {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
        }
        // ファイルが開けなければ標準エラーに出す
        Err(e) => eprintln!("could not open log file {}: {e}", path.display()),
    }

    // テストなどで二重に初期化されても無視する
    let _ = builder.try_init();
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
