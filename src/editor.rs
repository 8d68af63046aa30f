// ============================================
// src/editor.rs
// クイズの作成・編集フォーム
// ============================================

use std::path::PathBuf;

use log::{info, warn};

use crate::error::EditError;
use crate::model::{Question, Quiz};
use crate::navigation::{Navigator, Route};
use crate::notify::{Notifier, ObservableList};
use crate::store::QuizStore;

/// 通知されるプロパティ名
pub mod prop {
    pub const NUMBER: &str = "number";
    pub const STATEMENT: &str = "statement";
    pub const ANSWERS: [&str; 4] = [
        "first_answer",
        "second_answer",
        "third_answer",
        "fourth_answer",
    ];
    pub const ANSWER_OPTIONS: &str = "answer_options";
    pub const CORRECT_ANSWER: &str = "correct_answer";

    pub const CATEGORY: &str = "category";
    pub const STATUS: &str = "status";
    pub const SELECTED_QUIZ: &str = "selected_quiz";
    pub const SELECTED_QUESTION: &str = "selected_question";
    pub const IS_QUESTION_SELECTED: &str = "is_question_selected";
    pub const IS_QUIZ_LOADED: &str = "is_quiz_loaded";
}

/// 1問あたりの選択肢の入力欄の数
pub const ANSWER_SLOTS: usize = 4;

/// フォームの入力欄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionField {
    Statement,
    Answer(usize),
    CorrectAnswer,
}

impl QuestionField {
    /// 画面上の並び順
    pub const ALL: [QuestionField; 6] = [
        QuestionField::Statement,
        QuestionField::Answer(0),
        QuestionField::Answer(1),
        QuestionField::Answer(2),
        QuestionField::Answer(3),
        QuestionField::CorrectAnswer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QuestionField::Statement => "Question",
            QuestionField::Answer(0) => "Answer 1",
            QuestionField::Answer(1) => "Answer 2",
            QuestionField::Answer(2) => "Answer 3",
            QuestionField::Answer(_) => "Answer 4",
            QuestionField::CorrectAnswer => "Correct",
        }
    }
}

// --------------------------------------------------
// 1問分の入力フォーム
// --------------------------------------------------

#[derive(Debug, Default)]
pub struct QuestionForm {
    notifier: Notifier,
    number: usize,
    statement: String,
    answers: [String; ANSWER_SLOTS],
    correct_answer: String,
}

impl QuestionForm {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    /// 既存の問題からフォームを作る (選択肢は先頭4つまで)
    pub fn from_question(number: usize, question: &Question) -> Self {
        let mut form = Self::new(number);
        form.statement = question.statement.clone();
        for (slot, answer) in form.answers.iter_mut().zip(&question.answers) {
            *slot = answer.clone();
        }
        form.correct_answer = question.correct_answer.clone();
        form
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn set_number(&mut self, number: usize) -> bool {
        self.notifier.set(&mut self.number, number, prop::NUMBER)
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn set_statement(&mut self, value: impl Into<String>) -> bool {
        self.notifier
            .set(&mut self.statement, value.into(), prop::STATEMENT)
    }

    pub fn answer(&self, slot: usize) -> &str {
        self.answers.get(slot).map_or("", String::as_str)
    }

    /// 選択肢を書き換える。`answer_options` も合わせて通知する
    pub fn set_answer(&mut self, slot: usize, value: impl Into<String>) -> bool {
        let Some(current) = self.answers.get_mut(slot) else {
            return false;
        };
        let changed = self.notifier.set(current, value.into(), prop::ANSWERS[slot]);
        if changed {
            self.notifier.notify(prop::ANSWER_OPTIONS);
        }
        changed
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn set_correct_answer(&mut self, value: impl Into<String>) -> bool {
        self.notifier
            .set(&mut self.correct_answer, value.into(), prop::CORRECT_ANSWER)
    }

    pub fn field(&self, field: QuestionField) -> &str {
        match field {
            QuestionField::Statement => self.statement(),
            QuestionField::Answer(slot) => self.answer(slot),
            QuestionField::CorrectAnswer => self.correct_answer(),
        }
    }

    pub fn set_field(&mut self, field: QuestionField, value: impl Into<String>) -> bool {
        match field {
            QuestionField::Statement => self.set_statement(value),
            QuestionField::Answer(slot) => self.set_answer(slot, value),
            QuestionField::CorrectAnswer => self.set_correct_answer(value),
        }
    }

    /// 空欄を除いた選択肢 (前後の空白は落とす)
    pub fn answer_options(&self) -> Vec<String> {
        self.answers
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn to_question(&self) -> Question {
        Question {
            statement: self.statement.trim().to_string(),
            answers: self.answer_options(),
            correct_answer: self.correct_answer.trim().to_string(),
        }
    }
}

// --------------------------------------------------
// クイズ全体の入力フォーム
// --------------------------------------------------

#[derive(Debug, Default)]
pub struct QuizForm {
    notifier: Notifier,
    category: String,
    questions: ObservableList<QuestionForm>,
}

impl QuizForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn set_category(&mut self, value: impl Into<String>) -> bool {
        self.notifier
            .set(&mut self.category, value.into(), prop::CATEGORY)
    }

    pub fn questions(&self) -> &[QuestionForm] {
        self.questions.as_slice()
    }

    pub fn question_mut(&mut self, index: usize) -> Option<&mut QuestionForm> {
        self.questions.get_mut(index)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// 空の問題を末尾に追加し、その位置を返す
    pub fn add_question(&mut self) -> usize {
        let number = self.questions.len() + 1;
        self.questions.push(QuestionForm::new(number));
        number - 1
    }

    /// 問題を削除して番号を振り直す
    pub fn remove_question(&mut self, index: usize) -> bool {
        if self.questions.remove(index).is_none() {
            return false;
        }
        for (i, question) in self.questions.iter_mut().enumerate() {
            question.set_number(i + 1);
        }
        true
    }

    /// 既存のクイズの内容でフォームを埋める
    pub fn fill_from(&mut self, quiz: &Quiz) {
        self.set_category(quiz.category.clone());
        self.questions.clear();
        for (i, question) in quiz.questions.iter().enumerate() {
            self.questions.push(QuestionForm::from_question(i + 1, question));
        }
    }

    /// 保存してよいか (カテゴリ名があり、1問以上ある)
    pub fn can_save(&self) -> bool {
        !self.category.trim().is_empty() && !self.questions.is_empty()
    }

    pub fn to_quiz(&self) -> Quiz {
        Quiz {
            category: self.category.trim().to_string(),
            questions: self.questions.iter().map(QuestionForm::to_question).collect(),
        }
    }
}

// --------------------------------------------------
// ステータス表示
// --------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// 画面下に出すメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub kind: StatusKind,
}

impl Status {
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

/// フォームを検証して保存し、結果をステータスに反映する
fn save_form(
    store: &QuizStore,
    form: &QuizForm,
    notifier: &Notifier,
    status: &mut Option<Status>,
) -> Result<PathBuf, EditError> {
    let quiz = form.to_quiz();
    for question in quiz.questions.iter().filter(|q| !q.has_matching_answer()) {
        // 保存は止めない
        warn!("\"{}\": correct answer matches no option", question.statement);
    }
    // 入力チェックは save_quiz の中で先に行われる
    let result = store.save_quiz(&quiz).map_err(EditError::from);

    let next = match &result {
        Ok(_) => Status::new(StatusKind::Success, "Quiz saved successfully!"),
        Err(e) => {
            warn!("save of \"{}\" failed: {e}", quiz.category);
            Status::new(StatusKind::Error, e.to_string())
        }
    };
    notifier.set(status, Some(next), prop::STATUS);
    result
}

// --------------------------------------------------
// 新規作成
// --------------------------------------------------

pub struct CreateQuizController {
    store: QuizStore,
    navigator: Navigator,
    notifier: Notifier,
    form: QuizForm,
    status: Option<Status>,
}

impl CreateQuizController {
    pub fn new(store: QuizStore, navigator: Navigator) -> Self {
        Self {
            store,
            navigator,
            notifier: Notifier::new(),
            form: QuizForm::new(),
            status: None,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn form(&self) -> &QuizForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut QuizForm {
        &mut self.form
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn can_save(&self) -> bool {
        self.form.can_save()
    }

    /// MARK:保存してメニューに戻る
    pub fn save(&mut self) -> Result<PathBuf, EditError> {
        let path = save_form(&self.store, &self.form, &self.notifier, &mut self.status)?;
        info!("created quiz at {}", path.display());
        self.navigator.go(Route::Menu);
        Ok(path)
    }

    pub fn back(&self) {
        self.navigator.go(Route::Menu);
    }
}

// --------------------------------------------------
// 既存クイズの編集
// --------------------------------------------------

pub struct EditQuizController {
    store: QuizStore,
    navigator: Navigator,
    notifier: Notifier,
    available_quizzes: ObservableList<Quiz>,
    selected_index: Option<usize>,
    selected_quiz: Option<Quiz>,
    selected_question: Option<usize>,
    form: QuizForm,
    loaded: bool,
    status: Option<Status>,
}

impl EditQuizController {
    pub fn new(store: QuizStore, navigator: Navigator) -> Self {
        let mut controller = Self {
            store,
            navigator,
            notifier: Notifier::new(),
            available_quizzes: ObservableList::new(),
            selected_index: None,
            selected_quiz: None,
            selected_question: None,
            form: QuizForm::new(),
            loaded: false,
            status: None,
        };
        controller.refresh_available_quizzes();
        controller
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn refresh_available_quizzes(&mut self) {
        self.available_quizzes.clear();
        for quiz in self.store.load_all() {
            self.available_quizzes.push(quiz);
        }
        self.select_quiz(None);
    }

    pub fn available_quizzes(&self) -> &[Quiz] {
        self.available_quizzes.as_slice()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn select_quiz(&mut self, index: Option<usize>) -> bool {
        let index = index.filter(|&i| i < self.available_quizzes.len());
        let quiz = index.and_then(|i| self.available_quizzes.get(i)).cloned();
        self.selected_index = index;
        self.notifier
            .set(&mut self.selected_quiz, quiz, prop::SELECTED_QUIZ)
    }

    pub fn select_next_quiz(&mut self) -> bool {
        let len = self.available_quizzes.len();
        if len == 0 {
            return false;
        }
        self.select_quiz(Some(self.selected_index.map_or(0, |i| (i + 1) % len)))
    }

    pub fn select_previous_quiz(&mut self) -> bool {
        let len = self.available_quizzes.len();
        if len == 0 {
            return false;
        }
        self.select_quiz(Some(
            self.selected_index.map_or(len - 1, |i| (i + len - 1) % len),
        ))
    }

    pub fn can_load_quiz(&self) -> bool {
        self.selected_quiz.is_some()
    }

    /// MARK:選択中のクイズをファイルから読み直してフォームに展開する
    pub fn load_selected_quiz(&mut self) -> Result<(), EditError> {
        let Some(category) = self.selected_quiz.as_ref().map(|q| q.category.clone()) else {
            return Err(EditError::NothingLoaded);
        };
        let quiz = match self.store.load_category(&category) {
            Ok(Some(quiz)) => quiz,
            Ok(None) => return Err(self.load_failed(EditError::QuizMissing(category))),
            Err(e) => return Err(self.load_failed(EditError::Load(e))),
        };

        self.form.fill_from(&quiz);
        self.notifier
            .set(&mut self.selected_quiz, Some(quiz), prop::SELECTED_QUIZ);
        self.loaded = true;
        self.notifier.notify(prop::IS_QUIZ_LOADED);

        let first = (self.form.question_count() > 0).then_some(0);
        self.select_question(first);
        self.set_status(Status::new(StatusKind::Info, format!("Editing \"{category}\"")));
        Ok(())
    }

    /// 読み込みの失敗をステータスに出してからエラーを返す
    fn load_failed(&mut self, err: EditError) -> EditError {
        warn!("could not load quiz for editing: {err}");
        self.set_status(Status::new(StatusKind::Error, err.to_string()));
        err
    }

    /// フォームが編集中か (問題を全部消しても読み込み済みのまま)
    pub fn is_quiz_loaded(&self) -> bool {
        self.loaded
    }

    pub fn form(&self) -> &QuizForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut QuizForm {
        &mut self.form
    }

    pub fn selected_question(&self) -> Option<usize> {
        self.selected_question
    }

    pub fn is_question_selected(&self) -> bool {
        self.selected_question.is_some()
    }

    pub fn select_question(&mut self, index: Option<usize>) -> bool {
        let index = index.filter(|&i| i < self.form.question_count());
        let changed = self
            .notifier
            .set(&mut self.selected_question, index, prop::SELECTED_QUESTION);
        if changed {
            self.notifier.notify(prop::IS_QUESTION_SELECTED);
        }
        changed
    }

    pub fn add_question(&mut self) -> usize {
        let index = self.form.add_question();
        self.select_question(Some(index));
        index
    }

    pub fn remove_selected_question(&mut self) -> bool {
        let Some(index) = self.selected_question else {
            return false;
        };
        if !self.form.remove_question(index) {
            return false;
        }
        let count = self.form.question_count();
        let next = (count > 0).then(|| index.min(count - 1));
        // 同じ位置に次の問題が詰められた場合も選択し直しを通知する
        if !self.select_question(next) {
            self.notifier.notify(prop::SELECTED_QUESTION);
        }
        true
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    fn set_status(&mut self, status: Status) {
        self.notifier
            .set(&mut self.status, Some(status), prop::STATUS);
    }

    /// MARK:変更を保存してメニューに戻る
    ///
    /// 失敗したらフォームはそのまま残し、ステータスにエラーを出す。
    pub fn save_changes(&mut self) -> Result<PathBuf, EditError> {
        if !self.loaded {
            return Err(EditError::NothingLoaded);
        }
        let path = save_form(&self.store, &self.form, &self.notifier, &mut self.status)?;
        self.navigator.go(Route::Menu);
        Ok(path)
    }

    pub fn back(&self) {
        self.navigator.go(Route::Menu);
    }
}
