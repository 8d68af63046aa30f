// ============================================
// src/play.rs
// クイズのプレイ状態 (選択 → 回答中 → 結果) を管理する
// ============================================

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::PlayError;
use crate::model::{Question, Quiz};
use crate::navigation::{Navigator, Route};
use crate::notify::{ListChange, Notifier, ObservableList};
use crate::store::QuizStore;

/// 通知されるプロパティ名
pub mod prop {
    pub const SELECTED_QUIZ: &str = "selected_quiz";
    pub const QUIZ_CATEGORY: &str = "quiz_category";
    pub const CURRENT_QUESTION: &str = "current_question";
    pub const CURRENT_QUESTION_INDEX: &str = "current_question_index";
    pub const CORRECT_ANSWERS: &str = "correct_answers";
    pub const TOTAL_ANSWERED: &str = "total_answered";
    pub const VIEW_STATE: &str = "view_state";
    pub const SCORE_TEXT: &str = "score_text";
    pub const PERCENTAGE_TEXT: &str = "percentage_text";
    pub const QUESTION_COUNTER_TEXT: &str = "question_counter_text";
    pub const FINAL_SCORE_TEXT: &str = "final_score_text";
    pub const FINAL_PERCENTAGE_TEXT: &str = "final_percentage_text";

    /// 表示用の派生値 (カウンタが変わるたびにまとめて通知する)
    pub const STATS: &[&str] = &[
        SCORE_TEXT,
        PERCENTAGE_TEXT,
        QUESTION_COUNTER_TEXT,
        FINAL_SCORE_TEXT,
        FINAL_PERCENTAGE_TEXT,
    ];
}

/// どの画面領域を出すか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Selection,
    Playing,
    Complete,
}

/// `answer_selected` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// 空の入力や回答できない状態。何も変わらない
    Ignored,
    Correct,
    Incorrect,
}

/// プレイ画面のコントローラ
pub struct PlayController {
    store: QuizStore,
    navigator: Navigator,
    notifier: Notifier,
    rng: StdRng,

    available_quizzes: ObservableList<Quiz>,
    selected_index: Option<usize>,
    selected_quiz: Option<Quiz>,
    current_question: Option<Question>,
    current_question_index: usize, // 今何問目か (0始まり)
    correct_answers: usize,
    total_answered: usize,
    view_state: ViewState,
}

impl PlayController {
    pub fn new(store: QuizStore, navigator: Navigator) -> Self {
        Self::with_rng(store, navigator, StdRng::from_os_rng())
    }

    /// シャッフル用の乱数を指定して作る (テストではシード固定)
    pub fn with_rng(store: QuizStore, navigator: Navigator, rng: StdRng) -> Self {
        let mut controller = Self {
            store,
            navigator,
            notifier: Notifier::new(),
            rng,
            available_quizzes: ObservableList::new(),
            selected_index: None,
            selected_quiz: None,
            current_question: None,
            current_question_index: 0,
            correct_answers: 0,
            total_answered: 0,
            view_state: ViewState::Selection,
        };
        controller.refresh_available_quizzes();
        controller
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// 一覧の追加・削除を購読する
    pub fn on_available_quizzes_changed<F>(&mut self, listener: F)
    where
        F: FnMut(ListChange) + 'static,
    {
        self.available_quizzes.subscribe(listener);
    }

    // --------------------------------------------------
    // クイズ一覧と選択
    // --------------------------------------------------

    /// 保存済みクイズを読み直す。読めないファイルは飛ばす
    pub fn refresh_available_quizzes(&mut self) {
        self.available_quizzes.clear();
        for quiz in self.store.load_all() {
            self.available_quizzes.push(quiz);
        }
        info!("{} quizzes available", self.available_quizzes.len());

        // 選択中のカテゴリが残っていれば選び直す
        let keep = self.selected_quiz.as_ref().and_then(|selected| {
            self.available_quizzes
                .iter()
                .position(|q| q.category == selected.category)
        });
        self.selected_index = None;
        self.select_quiz(keep);
    }

    pub fn available_quizzes(&self) -> &[Quiz] {
        self.available_quizzes.as_slice()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected_quiz(&self) -> Option<&Quiz> {
        self.selected_quiz.as_ref()
    }

    /// 一覧からクイズを選ぶ (`None` で選択解除)。選択が変わったら `true`
    pub fn select_quiz(&mut self, index: Option<usize>) -> bool {
        if self.view_state != ViewState::Selection {
            return false;
        }
        let index = index.filter(|&i| i < self.available_quizzes.len());
        let quiz = index.and_then(|i| self.available_quizzes.get(i)).cloned();
        self.selected_index = index;

        if self.notifier.set(&mut self.selected_quiz, quiz, prop::SELECTED_QUIZ) {
            self.notifier.notify(prop::QUIZ_CATEGORY);
            true
        } else {
            false
        }
    }

    pub fn select_next_quiz(&mut self) -> bool {
        let len = self.available_quizzes.len();
        if len == 0 {
            return false;
        }
        let next = self.selected_index.map_or(0, |i| (i + 1) % len);
        self.select_quiz(Some(next))
    }

    pub fn select_previous_quiz(&mut self) -> bool {
        let len = self.available_quizzes.len();
        if len == 0 {
            return false;
        }
        let prev = self.selected_index.map_or(len - 1, |i| (i + len - 1) % len);
        self.select_quiz(Some(prev))
    }

    // --------------------------------------------------
    // 状態遷移
    // --------------------------------------------------

    pub fn can_start_quiz(&self) -> bool {
        self.view_state == ViewState::Selection && self.selected_quiz.is_some()
    }

    /// MARK:クイズ開始 (Selection → Playing)
    ///
    /// ファイルから読み直し、問題の順番と各問題の選択肢の順番を
    /// それぞれシャッフルしてからカウンタを 0 に戻す。
    pub fn start_quiz(&mut self) -> Result<(), PlayError> {
        if !self.can_start_quiz() {
            return Err(PlayError::Rejected);
        }
        let category = match &self.selected_quiz {
            Some(quiz) => quiz.category.clone(),
            None => return Err(PlayError::Rejected),
        };

        // 一覧にあるのは古いかもしれないので読み直す
        let mut quiz = self
            .store
            .load_category(&category)?
            .ok_or_else(|| PlayError::QuizMissing(category.clone()))?;

        quiz.questions.shuffle(&mut self.rng);
        for question in &mut quiz.questions {
            question.answers.shuffle(&mut self.rng);
        }
        info!(
            "starting quiz \"{}\" ({} questions)",
            quiz.category,
            quiz.question_count()
        );

        if self.notifier.set(&mut self.selected_quiz, Some(quiz), prop::SELECTED_QUIZ) {
            self.notifier.notify(prop::QUIZ_CATEGORY);
        }
        self.reset_play_state(ViewState::Playing);
        self.load_next_question();
        Ok(())
    }

    pub fn can_answer(&self) -> bool {
        self.view_state == ViewState::Playing
            && self.current_question.is_some()
            && self.current_question_index < self.question_count()
    }

    /// MARK:回答の処理 (Playing → Playing / Complete)
    pub fn answer_selected(&mut self, answer: Option<&str>) -> AnswerOutcome {
        let Some(answer) = answer.filter(|a| !a.is_empty()) else {
            return AnswerOutcome::Ignored;
        };
        if !self.can_answer() {
            debug!("answer \"{answer}\" ignored in {:?}", self.view_state);
            return AnswerOutcome::Ignored;
        }
        let Some(question) = &self.current_question else {
            return AnswerOutcome::Ignored;
        };

        let is_correct = question.is_correct(answer);
        if is_correct {
            let value = self.correct_answers + 1;
            self.notifier
                .set(&mut self.correct_answers, value, prop::CORRECT_ANSWERS);
        }
        let value = self.total_answered + 1;
        self.notifier
            .set(&mut self.total_answered, value, prop::TOTAL_ANSWERED);
        let value = self.current_question_index + 1;
        self.notifier
            .set(&mut self.current_question_index, value, prop::CURRENT_QUESTION_INDEX);

        // 次の問題へ、なければ結果へ
        self.load_next_question();

        if is_correct {
            AnswerOutcome::Correct
        } else {
            AnswerOutcome::Incorrect
        }
    }

    /// 戻る: プレイ中・結果表示中なら選択画面へ、選択画面ならメニューへ
    pub fn back(&mut self) {
        match self.view_state {
            ViewState::Playing | ViewState::Complete => self.reset_play_state(ViewState::Selection),
            ViewState::Selection => self.navigator.go(Route::Menu),
        }
    }

    /// 進行状況を捨てて選択画面に戻る (一覧と選択は残す)
    pub fn reset_quiz(&mut self) {
        self.reset_play_state(ViewState::Selection);
    }

    /// どの状態からでもメニューに戻る
    pub fn back_to_menu(&mut self) {
        self.reset_play_state(ViewState::Selection);
        self.navigator.go(Route::Menu);
    }

    fn load_next_question(&mut self) {
        let next = match &self.selected_quiz {
            Some(quiz) => quiz.questions.get(self.current_question_index).cloned(),
            None => return,
        };

        match next {
            Some(question) => {
                self.notifier
                    .set(&mut self.current_question, Some(question), prop::CURRENT_QUESTION);
                self.set_view_state(ViewState::Playing);
            }
            None => {
                self.notifier
                    .set(&mut self.current_question, None, prop::CURRENT_QUESTION);
                self.set_view_state(ViewState::Complete);
                info!(
                    "quiz complete: {}/{}",
                    self.correct_answers,
                    self.question_count()
                );
            }
        }
        self.notify_stats();
    }

    fn reset_play_state(&mut self, target: ViewState) {
        self.notifier
            .set(&mut self.current_question_index, 0, prop::CURRENT_QUESTION_INDEX);
        self.notifier
            .set(&mut self.correct_answers, 0, prop::CORRECT_ANSWERS);
        self.notifier
            .set(&mut self.total_answered, 0, prop::TOTAL_ANSWERED);
        self.notifier
            .set(&mut self.current_question, None, prop::CURRENT_QUESTION);

        self.set_view_state(target);
        self.notifier.notify(prop::QUIZ_CATEGORY);
        self.notify_stats();
    }

    fn set_view_state(&mut self, state: ViewState) {
        self.notifier.set(&mut self.view_state, state, prop::VIEW_STATE);
    }

    fn notify_stats(&self) {
        self.notifier.notify_all(prop::STATS);
    }

    // --------------------------------------------------
    // 表示用の値
    // --------------------------------------------------

    pub fn view_state(&self) -> ViewState {
        self.view_state
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_question.as_ref()
    }

    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    pub fn correct_answers(&self) -> usize {
        self.correct_answers
    }

    pub fn total_answered(&self) -> usize {
        self.total_answered
    }

    pub fn question_count(&self) -> usize {
        self.selected_quiz.as_ref().map_or(0, Quiz::question_count)
    }

    pub fn quiz_category(&self) -> &str {
        self.selected_quiz
            .as_ref()
            .map_or("Select a Quiz", |q| q.category.as_str())
    }

    /// 途中経過のスコア (分母は回答済みの数)
    pub fn score_text(&self) -> String {
        format!("Score: {}/{}", self.correct_answers, self.total_answered)
    }

    pub fn percentage_text(&self) -> String {
        percentage(self.correct_answers, self.total_answered)
    }

    pub fn question_counter_text(&self) -> String {
        let count = self.question_count();
        let number = (self.current_question_index + 1).min(count);
        format!("{number} of {count}")
    }

    /// 最終スコア (分母は問題数)
    pub fn final_score_text(&self) -> String {
        format!(
            "Final Score: {}/{}",
            self.correct_answers,
            self.question_count()
        )
    }

    pub fn final_percentage_text(&self) -> String {
        percentage(self.correct_answers, self.question_count())
    }
}

fn percentage(correct: usize, total: usize) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", correct as f64 * 100.0 / total as f64)
}
