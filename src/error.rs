// ============================================
// src/error.rs
// アプリ全体で使うエラー型
// ============================================

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 保存前の入力チェックで弾かれた理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Quiz category is unavailable for save.")]
    EmptyCategory,
    #[error("Please add at least one question.")]
    NoQuestions,
}

/// クイズファイルの読み書きエラー
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("bad quiz JSON in {}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// プレイ画面の操作エラー
#[derive(Debug, Error)]
pub enum PlayError {
    /// 今の状態では実行できない操作
    #[error("this action is not available right now")]
    Rejected,
    #[error("quiz \"{0}\" no longer exists")]
    QuizMissing(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 作成・編集画面の操作エラー
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to save quiz: {0}")]
    Store(StoreError),
    #[error("Failed to load quiz: {0}")]
    Load(StoreError),
    #[error("no quiz is loaded")]
    NothingLoaded,
    #[error("quiz \"{0}\" no longer exists")]
    QuizMissing(String),
}

impl From<StoreError> for EditError {
    fn from(err: StoreError) -> Self {
        match err {
            // 保存前チェックの失敗は入力エラーとして扱う
            StoreError::Invalid(v) => Self::Validation(v),
            other => Self::Store(other),
        }
    }
}
