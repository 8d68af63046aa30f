// ============================================
// src/navigation.rs
// 画面遷移の要求をメインループへ送る
// ============================================

use std::sync::mpsc::{self, Receiver, Sender};

use log::debug;

/// 遷移先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Menu,
    Play,
    Create,
    Edit,
    Quit,
}

/// 各コントローラに渡す遷移要求の送信口
#[derive(Debug, Clone)]
pub struct Navigator {
    tx: Sender<Route>,
}

impl Navigator {
    /// 送信口と、メインループ側で持つ受信口を作る
    pub fn channel() -> (Self, Receiver<Route>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    pub fn go(&self, route: Route) {
        debug!("navigate -> {route:?}");
        // 受信側が先に終了していたら無視してよい
        let _ = self.tx.send(route);
    }
}
