// ============================================
// src/main.rs (メインファイル)
// ============================================

use std::io::{self, stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

mod app;
mod config;
mod editor;
mod error;
mod logging;
mod model;
mod navigation;
mod notify;
mod play;
mod store;
mod ui;

use app::App;
use config::{Cli, Settings};
use store::QuizStore;

use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{self, Event, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};

use ratatui::prelude::*;

// --------------------------------------------------
// メイン関数 (TUIセットアップと実行ループ)
// --------------------------------------------------

fn main() -> Result<()> {
    let settings = Settings::from_cli(Cli::parse());
    logging::init(&settings);
    let store = QuizStore::new(&settings.data_dir);
    info!("quiz directory: {}", store.dir().display());
    if settings.install_starters {
        // 初回起動時のサンプル配置 (失敗しても続行)
        store.initialize_starter_content(&settings.starter_dir);
    }

    if settings.list_only {
        for quiz in store.load_all() {
            println!("{} ({} questions)", quiz.category, quiz.question_count());
        }
        return Ok(());
    }

    let mut terminal = setup_terminal().context("failed to set up the terminal")?;
    let result = run_app(&mut terminal, App::new(store));
    // 実行ループが失敗しても端末は元に戻す
    restore_terminal().context("failed to restore the terminal")?;

    if let Err(e) = &result {
        error!("app loop failed: {e}");
    }
    result.context("terminal I/O failed")
}

fn setup_terminal() -> io::Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?; // 代替スクリーンを使用
    stdout().execute(Hide)?; // カーソルを非表示
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

fn restore_terminal() -> io::Result<()> {
    stdout().execute(Show)?; // カーソルを再表示
    stdout().execute(LeaveAlternateScreen)?; // 代替スクリーンを終了
    disable_raw_mode()?;
    Ok(())
}

fn run_app(terminal: &mut Terminal<impl Backend>, mut app: App) -> io::Result<()> {
    loop {
        // 変更通知やキー入力があったときだけ描き直す
        if app.take_dirty() {
            terminal.draw(|f| ui::draw(f, &app))?;
        }
        if app.should_quit() {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Resize(_, _) => app.mark_dirty(),
                _ => {}
            }
        }
        app.process_routes();
    }

    info!("bye");
    Ok(())
}
