// ============================================
// src/config.rs
// コマンドライン引数と保存先パスの決定
// ============================================

use std::env;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use directories::ProjectDirs;
use log::LevelFilter;

/// ログファイル名 (クイズ保存先と同じディレクトリに置く)
pub const LOG_FILE_NAME: &str = "petty-pursuit.log";

#[derive(Debug, Parser)]
#[command(name = "petty-pursuit", version, about = "Play and author quizzes in the terminal.")]
pub struct Cli {
    /// クイズファイルの保存先
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// 初回起動時にコピーするサンプルクイズの場所
    #[arg(long, value_name = "PATH")]
    pub starter_dir: Option<PathBuf>,

    /// ログの詳しさ (RUST_LOG があればそちらが優先)
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// サンプルクイズをコピーしない
    #[arg(long)]
    pub no_starter: bool,

    /// クイズ一覧を表示して終了する
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// 起動時に一度だけ決まる設定
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub starter_dir: PathBuf,
    pub log_level: LevelFilter,
    pub install_starters: bool,
    pub list_only: bool,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Self {
        Self {
            data_dir: cli.data_dir.unwrap_or_else(default_data_dir),
            starter_dir: cli.starter_dir.unwrap_or_else(default_starter_dir),
            log_level: cli.log_level.into(),
            install_starters: !cli.no_starter,
            list_only: cli.list,
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE_NAME)
    }
}

// MARK:保存先ディレクトリのパスを取得する関数
fn default_data_dir() -> PathBuf {
    // OSごとのデータ保存用ディレクトリ (Windows なら LocalAppData)
    if let Some(proj_dirs) = ProjectDirs::from("com", "PettyPursuit", "Petty Pursuit") {
        return proj_dirs.data_local_dir().join("quizzes");
    }

    // 取得できなかったらカレントディレクトリに (フォールバック)
    PathBuf::from("quizzes-data")
}

/// 実行ファイルの隣の `quizzes/`、なければソースツリーの `quizzes/`
fn default_starter_dir() -> PathBuf {
    let beside_exe = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("quizzes")))
        .filter(|dir| dir.is_dir());

    beside_exe.unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("quizzes"))
}
