// ============================================
// src/store.rs
// クイズファイル (JSON) の読み書きロジック
// ============================================

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::model::Quiz;

/// クイズファイルの拡張子
pub const QUIZ_EXTENSION: &str = "json";

/// 1ディレクトリにクイズを1ファイルずつ置くストア
#[derive(Debug, Clone)]
pub struct QuizStore {
    dir: PathBuf,
}

impl QuizStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// カテゴリ名から保存ファイル名を決める
    ///
    /// ファイル名に使えない文字は `_` に置き換える。
    pub fn file_name_for(category: &str) -> String {
        let stem: String = category
            .trim()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        format!("{stem}.{QUIZ_EXTENSION}")
    }

    // MARK:一覧

    /// ディレクトリ内のクイズファイル (名前順)。ディレクトリがなければ空
    pub fn list_quiz_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.dir, e))?.path();
            if path.is_file() && has_quiz_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// 読み込めたクイズを全部返す。壊れたファイルはログに残して飛ばす
    pub fn load_all(&self) -> Vec<Quiz> {
        let files = match self.list_quiz_files() {
            Ok(files) => files,
            Err(e) => {
                warn!("could not list quizzes: {e}");
                return Vec::new();
            }
        };

        let mut quizzes = Vec::with_capacity(files.len());
        for path in files {
            match self.load_quiz(&path) {
                Ok(Some(quiz)) => quizzes.push(quiz),
                Ok(None) => debug!("{} vanished while listing", path.display()),
                Err(e) => warn!("skipping quiz file: {e}"),
            }
        }
        quizzes
    }

    // MARK:読み込み

    /// ファイルからクイズを読む。ファイルがなければ `Ok(None)`
    pub fn load_quiz(&self, file_name: impl AsRef<Path>) -> Result<Option<Quiz>, StoreError> {
        let path = self.dir.join(file_name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .map(Some)
            .map_err(|source| StoreError::Json { path, source })
    }

    pub fn load_category(&self, category: &str) -> Result<Option<Quiz>, StoreError> {
        self.load_quiz(Self::file_name_for(category))
    }

    // MARK:保存

    /// カテゴリ名のファイルに上書き保存する
    ///
    /// 一時ファイルに書いてから rename するので、途中までの内容が
    /// 見えることはない。入力チェックに通らなければ何も書かない。
    pub fn save_quiz(&self, quiz: &Quiz) -> Result<PathBuf, StoreError> {
        quiz.validate()?;

        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.dir.join(Self::file_name_for(&quiz.category));

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, quiz).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?;
            writer.flush().map_err(|e| StoreError::io(&path, e))?;
        }
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;

        info!("saved quiz \"{}\" to {}", quiz.category, path.display());
        Ok(path)
    }

    // MARK:初回起動時のサンプル配置

    /// 同梱のサンプルクイズをコピーする (既にあるファイルは上書きしない)
    ///
    /// 失敗はログに出すだけで、起動は止めない。コピーした数を返す。
    pub fn initialize_starter_content(&self, source_dir: &Path) -> usize {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            error!("could not create quiz directory {}: {e}", self.dir.display());
            return 0;
        }

        let entries = match fs::read_dir(source_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("starter quizzes not found at {}: {e}", source_dir.display());
                return 0;
            }
        };

        let mut copied = 0;
        for entry in entries.flatten() {
            let source = entry.path();
            if !source.is_file() || !has_quiz_extension(&source) {
                continue;
            }
            let Some(file_name) = source.file_name() else {
                continue;
            };

            let destination = self.dir.join(file_name);
            if destination.exists() {
                continue;
            }
            match fs::copy(&source, &destination) {
                Ok(_) => {
                    info!("copied starter quiz {}", file_name.to_string_lossy());
                    copied += 1;
                }
                Err(e) => error!("error copying starter quiz {}: {e}", source.display()),
            }
        }
        copied
    }
}

fn has_quiz_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(QUIZ_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::model::Question;
    use tempfile::TempDir;

    fn animals() -> Quiz {
        Quiz::new(
            "Animals",
            vec![
                Question::new(
                    "Largest mammal?",
                    ["Elephant", "Blue Whale", "Giraffe", "Lion"],
                    "Blue Whale",
                ),
                Question::new("Fastest land animal?", ["Cheetah", "Horse"], "Cheetah"),
            ],
        )
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = QuizStore::new(dir.path());

        let path = store.save_quiz(&animals()).unwrap();
        assert_eq!(path.file_name().unwrap(), "Animals.json");

        let loaded = store.load_quiz(path.file_name().unwrap()).unwrap().unwrap();
        assert_eq!(loaded, animals());
        assert_eq!(store.load_category("Animals").unwrap(), Some(animals()));
    }

    #[test]
    fn saving_same_category_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = QuizStore::new(dir.path());
        store.save_quiz(&animals()).unwrap();

        let mut smaller = animals();
        smaller.questions.truncate(1);
        store.save_quiz(&smaller).unwrap();

        assert_eq!(store.list_quiz_files().unwrap().len(), 1);
        assert_eq!(store.load_category("Animals").unwrap(), Some(smaller));
    }

    #[test]
    fn empty_category_is_rejected_without_writing() {
        let dir = TempDir::new().unwrap();
        let store = QuizStore::new(dir.path());
        let quiz = Quiz::new("", animals().questions);

        let err = store.save_quiz(&quiz).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(ValidationError::EmptyCategory)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_category_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = QuizStore::new(dir.path().join("not-created-yet"));
        assert!(store.load_category("Nope").unwrap().is_none());
        assert!(store.list_quiz_files().unwrap().is_empty());
    }

    #[test]
    fn corrupt_files_are_skipped_by_load_all() {
        let dir = TempDir::new().unwrap();
        let store = QuizStore::new(dir.path());
        store.save_quiz(&animals()).unwrap();
        fs::write(dir.path().join("Broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert!(matches!(
            store.load_quiz("Broken.json"),
            Err(StoreError::Json { .. })
        ));
        let all = store.load_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].category, "Animals");
    }

    #[test]
    fn file_names_drop_path_separators() {
        assert_eq!(QuizStore::file_name_for("Math/Science"), "Math_Science.json");
        assert_eq!(QuizStore::file_name_for(" Capitals "), "Capitals.json");
        assert_eq!(QuizStore::file_name_for("What?"), "What_.json");
    }

    #[test]
    fn starter_content_never_overwrites() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(source.path().join("Animals.json"), "{\"category\":\"starter\"}").unwrap();
        fs::write(source.path().join("Space.json"), "{\"category\":\"Space\"}").unwrap();
        fs::write(source.path().join("README.md"), "skip me").unwrap();

        let store = QuizStore::new(target.path());
        store.save_quiz(&animals()).unwrap();

        assert_eq!(store.initialize_starter_content(source.path()), 1);
        assert_eq!(store.load_category("Animals").unwrap(), Some(animals()));
        assert!(target.path().join("Space.json").exists());
        assert!(!target.path().join("README.md").exists());

        // 2回目は何もコピーしない
        assert_eq!(store.initialize_starter_content(source.path()), 0);
    }

    #[test]
    fn bundled_starter_quizzes_are_well_formed() {
        let target = TempDir::new().unwrap();
        let store = QuizStore::new(target.path());
        let bundled = Path::new(env!("CARGO_MANIFEST_DIR")).join("quizzes");

        assert!(store.initialize_starter_content(&bundled) >= 3);
        let quizzes = store.load_all();
        assert!(quizzes.iter().any(|q| q.category == "Animals"));
        for quiz in &quizzes {
            assert!(quiz.validate().is_ok(), "{} is invalid", quiz.category);
            for question in &quiz.questions {
                assert!(question.has_matching_answer(), "{}", question.statement);
                // 保存名とカテゴリ名が一致していないと開始時に読み直せない
                assert!(store.load_category(&quiz.category).unwrap().is_some());
            }
        }
    }

    #[test]
    fn missing_starter_directory_is_not_fatal() {
        let target = TempDir::new().unwrap();
        let store = QuizStore::new(target.path());
        assert_eq!(store.initialize_starter_content(&target.path().join("nope")), 0);
    }
}
