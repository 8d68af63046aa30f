// ============================================
// src/app.rs
// 画面の切り替えとキー入力の処理
// ============================================

use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc::Receiver;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, info, warn};

use crate::editor::{
    CreateQuizController, EditQuizController, QuestionField, QuizForm, Status, StatusKind,
};
use crate::navigation::{Navigator, Route};
use crate::notify::Notifier;
use crate::play::{PlayController, ViewState};
use crate::store::QuizStore;

/// メニューの項目
pub const MENU_ITEMS: [(&str, Route); 4] = [
    ("Play a quiz", Route::Play),
    ("Create a quiz", Route::Create),
    ("Edit a quiz", Route::Edit),
    ("Quit", Route::Quit),
];

// --------------------------------------------------
// フォーム入力のカーソル
// --------------------------------------------------

/// フォーム内でフォーカスしている入力欄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Category,
    Question(usize, QuestionField),
}

/// 作成・編集画面で共通のテキスト入力処理
#[derive(Debug, Default)]
pub struct FormEditor {
    pub focus: Focus,
}

impl FormEditor {
    /// タブ移動の順番 (カテゴリ → 問題1の各欄 → 問題2 ...)
    fn order(form: &QuizForm) -> Vec<Focus> {
        let mut order = vec![Focus::Category];
        for i in 0..form.question_count() {
            order.extend(QuestionField::ALL.iter().map(|f| Focus::Question(i, *f)));
        }
        order
    }

    fn step(&mut self, form: &QuizForm, forward: bool) {
        let order = Self::order(form);
        let len = order.len();
        let pos = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
        self.focus = order[next];
    }

    pub fn next(&mut self, form: &QuizForm) {
        self.step(form, true);
    }

    pub fn previous(&mut self, form: &QuizForm) {
        self.step(form, false);
    }

    pub fn question_index(&self) -> Option<usize> {
        match self.focus {
            Focus::Category => None,
            Focus::Question(i, _) => Some(i),
        }
    }

    pub fn focus_question(&mut self, index: Option<usize>) {
        self.focus = index.map_or(Focus::Category, |i| {
            Focus::Question(i, QuestionField::Statement)
        });
    }

    fn value(&self, form: &QuizForm) -> String {
        match self.focus {
            Focus::Category => form.category().to_string(),
            Focus::Question(i, field) => form
                .questions()
                .get(i)
                .map(|q| q.field(field).to_string())
                .unwrap_or_default(),
        }
    }

    fn store(&self, form: &mut QuizForm, value: String) {
        match self.focus {
            Focus::Category => {
                form.set_category(value);
            }
            Focus::Question(i, field) => {
                if let Some(question) = form.question_mut(i) {
                    question.set_field(field, value);
                }
            }
        }
    }

    pub fn type_char(&self, form: &mut QuizForm, c: char) {
        let mut value = self.value(form);
        value.push(c);
        self.store(form, value);
    }

    pub fn backspace(&self, form: &mut QuizForm) {
        let mut value = self.value(form);
        if value.pop().is_some() {
            self.store(form, value);
        }
    }
}

/// フォーム画面で共通のキー操作の結果
enum FormKey {
    Handled,
    Save,
    Add,
    Remove,
    Back,
}

fn handle_form_key(editor: &mut FormEditor, form: &mut QuizForm, key: KeyEvent) -> FormKey {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => FormKey::Back,
        KeyCode::Char('s') if ctrl => FormKey::Save,
        KeyCode::Char('n') if ctrl => FormKey::Add,
        KeyCode::Char('d') if ctrl => FormKey::Remove,
        KeyCode::Tab | KeyCode::Down | KeyCode::Enter => {
            editor.next(form);
            FormKey::Handled
        }
        KeyCode::BackTab | KeyCode::Up => {
            editor.previous(form);
            FormKey::Handled
        }
        KeyCode::Backspace => {
            editor.backspace(form);
            FormKey::Handled
        }
        KeyCode::Char(c) if !ctrl => {
            editor.type_char(form, c);
            FormKey::Handled
        }
        _ => FormKey::Handled,
    }
}

// --------------------------------------------------
// 各画面の状態
// --------------------------------------------------

pub struct PlayScreen {
    pub controller: PlayController,
    /// 回答中にハイライトしている選択肢
    pub answer_cursor: usize,
    pub notice: Option<Status>,
}

pub struct CreateScreen {
    pub controller: CreateQuizController,
    pub editor: FormEditor,
}

pub struct EditScreen {
    pub controller: EditQuizController,
    pub editor: FormEditor,
}

pub enum Screen {
    Menu,
    Play(PlayScreen),
    Create(CreateScreen),
    Edit(EditScreen),
}

// --------------------------------------------------
// アプリ全体
// --------------------------------------------------

pub struct App {
    store: QuizStore,
    navigator: Navigator,
    routes: Receiver<Route>,
    screen: Screen,
    menu_cursor: usize,
    /// メニューに戻ったときに出すメッセージ
    flash: Option<Status>,
    /// 通知を受けたら立つ再描画フラグ
    dirty: Rc<Cell<bool>>,
    should_quit: bool,
}

impl App {
    pub fn new(store: QuizStore) -> Self {
        let (navigator, routes) = Navigator::channel();
        Self {
            store,
            navigator,
            routes,
            screen: Screen::Menu,
            menu_cursor: 0,
            flash: None,
            dirty: Rc::new(Cell::new(true)),
            should_quit: false,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn menu_cursor(&self) -> usize {
        self.menu_cursor
    }

    pub fn flash(&self) -> Option<&Status> {
        self.flash.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    /// 再描画が必要なら `true` を返してフラグを下ろす
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }

    /// コントローラの変更通知で再描画フラグを立てる
    fn watch(&self, notifier: &Notifier) {
        let dirty = Rc::clone(&self.dirty);
        notifier.subscribe_all(move |_| dirty.set(true));
    }

    // MARK:画面遷移

    /// コントローラから届いた遷移要求を処理する
    pub fn process_routes(&mut self) {
        while let Ok(route) = self.routes.try_recv() {
            self.switch_to(route);
        }
    }

    fn switch_to(&mut self, route: Route) {
        info!("switching to {route:?}");
        self.mark_dirty();
        match route {
            Route::Menu => {
                // 保存完了などのメッセージはメニューに持ち越す
                self.flash = match &self.screen {
                    Screen::Create(s) => s.controller.status().cloned(),
                    Screen::Edit(s) => s.controller.status().cloned(),
                    _ => None,
                };
                self.screen = Screen::Menu;
            }
            Route::Play => {
                let mut controller =
                    PlayController::new(self.store.clone(), self.navigator.clone());
                self.watch(controller.notifier());
                let dirty = Rc::clone(&self.dirty);
                controller.on_available_quizzes_changed(move |_| dirty.set(true));
                self.screen = Screen::Play(PlayScreen {
                    controller,
                    answer_cursor: 0,
                    notice: None,
                });
            }
            Route::Create => {
                let controller =
                    CreateQuizController::new(self.store.clone(), self.navigator.clone());
                self.watch(controller.notifier());
                self.watch(controller.form().notifier());
                self.screen = Screen::Create(CreateScreen {
                    controller,
                    editor: FormEditor::default(),
                });
            }
            Route::Edit => {
                let controller =
                    EditQuizController::new(self.store.clone(), self.navigator.clone());
                self.watch(controller.notifier());
                self.watch(controller.form().notifier());
                self.screen = Screen::Edit(EditScreen {
                    controller,
                    editor: FormEditor::default(),
                });
            }
            Route::Quit => self.should_quit = true,
        }
    }

    // MARK:キー入力の処理
    pub fn handle_key(&mut self, key: KeyEvent) {
        // 通知を出さないカーソル移動もあるので毎回描き直す
        self.mark_dirty();

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match &mut self.screen {
            Screen::Menu => {
                let len = MENU_ITEMS.len();
                match key.code {
                    KeyCode::Up => self.menu_cursor = (self.menu_cursor + len - 1) % len,
                    KeyCode::Down => self.menu_cursor = (self.menu_cursor + 1) % len,
                    KeyCode::Enter => {
                        self.flash = None;
                        self.navigator.go(MENU_ITEMS[self.menu_cursor].1);
                    }
                    KeyCode::Esc | KeyCode::Char('q') => self.navigator.go(Route::Quit),
                    _ => {}
                }
            }
            Screen::Play(screen) => handle_play_key(screen, key),
            Screen::Create(screen) => handle_create_key(screen, key),
            Screen::Edit(screen) => handle_edit_key(screen, key),
        }
        self.process_routes();
    }
}

fn handle_play_key(screen: &mut PlayScreen, key: KeyEvent) {
    let controller = &mut screen.controller;
    match controller.view_state() {
        ViewState::Selection => match key.code {
            KeyCode::Up => {
                controller.select_previous_quiz();
            }
            KeyCode::Down => {
                controller.select_next_quiz();
            }
            KeyCode::Enter => match controller.start_quiz() {
                Ok(()) => {
                    screen.answer_cursor = 0;
                    screen.notice = None;
                }
                Err(e) => {
                    warn!("could not start quiz: {e}");
                    screen.notice = Some(Status::new(StatusKind::Error, e.to_string()));
                }
            },
            KeyCode::Char('r') => controller.refresh_available_quizzes(),
            KeyCode::Esc => controller.back(),
            _ => {}
        },
        ViewState::Playing => {
            let options = controller
                .current_question()
                .map(|q| q.answers.clone())
                .unwrap_or_default();
            let chosen = match key.code {
                KeyCode::Up => {
                    screen.answer_cursor = screen.answer_cursor.saturating_sub(1);
                    None
                }
                KeyCode::Down => {
                    if screen.answer_cursor + 1 < options.len() {
                        screen.answer_cursor += 1;
                    }
                    None
                }
                KeyCode::Enter => options.get(screen.answer_cursor).cloned(),
                KeyCode::Char(c @ '1'..='9') => {
                    let index = c as usize - '1' as usize;
                    options.get(index).cloned()
                }
                KeyCode::Esc => {
                    controller.back();
                    None
                }
                _ => None,
            };
            if let Some(answer) = chosen {
                controller.answer_selected(Some(&answer));
                screen.answer_cursor = 0;
            }
        }
        ViewState::Complete => match key.code {
            KeyCode::Enter | KeyCode::Char('r') => controller.reset_quiz(),
            KeyCode::Char('m') => controller.back_to_menu(),
            KeyCode::Esc => controller.back(),
            _ => {}
        },
    }
}

fn handle_create_key(screen: &mut CreateScreen, key: KeyEvent) {
    let CreateScreen { controller, editor } = screen;
    match handle_form_key(editor, controller.form_mut(), key) {
        FormKey::Handled => {}
        FormKey::Back => controller.back(),
        FormKey::Add => {
            let index = controller.form_mut().add_question();
            editor.focus_question(Some(index));
        }
        FormKey::Remove => {
            if let Some(index) = editor.question_index() {
                controller.form_mut().remove_question(index);
                let count = controller.form().question_count();
                editor.focus_question((count > 0).then(|| index.min(count - 1)));
            }
        }
        FormKey::Save => {
            // 失敗はステータスに表示される
            if let Err(e) = controller.save() {
                debug!("create not saved: {e}");
            }
        }
    }
}

fn handle_edit_key(screen: &mut EditScreen, key: KeyEvent) {
    let EditScreen { controller, editor } = screen;

    // まだ読み込んでいないときはクイズの選択
    if !controller.is_quiz_loaded() {
        match key.code {
            KeyCode::Up => {
                controller.select_previous_quiz();
            }
            KeyCode::Down => {
                controller.select_next_quiz();
            }
            KeyCode::Enter if controller.can_load_quiz() => match controller.load_selected_quiz() {
                Ok(()) => editor.focus = Focus::Category,
                // 理由はステータスに表示される
                Err(e) => debug!("edit load failed: {e}"),
            },
            KeyCode::Esc => controller.back(),
            _ => {}
        }
        return;
    }

    match handle_form_key(editor, controller.form_mut(), key) {
        FormKey::Handled => {}
        FormKey::Back => controller.back(),
        FormKey::Add => {
            let index = controller.add_question();
            editor.focus_question(Some(index));
        }
        FormKey::Remove => {
            if controller.remove_selected_question() {
                editor.focus_question(controller.selected_question());
            }
        }
        FormKey::Save => {
            if let Err(e) = controller.save_changes() {
                debug!("edit not saved: {e}");
            }
        }
    }
    // 編集中の問題を選択状態に合わせる
    if let Some(index) = editor.question_index() {
        controller.select_question(Some(index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Question, Quiz};
    use tempfile::TempDir;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut App, c: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn app_with(quizzes: &[Quiz]) -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let store = QuizStore::new(dir.path());
        for quiz in quizzes {
            store.save_quiz(quiz).unwrap();
        }
        (dir, App::new(store))
    }

    #[test]
    fn plays_a_quiz_from_the_menu() {
        let quiz = Quiz::new(
            "Animals",
            vec![Question::new("Largest mammal?", ["Blue Whale", "Lion"], "Blue Whale")],
        );
        let (_dir, mut app) = app_with(&[quiz]);

        press(&mut app, KeyCode::Enter); // Play
        press(&mut app, KeyCode::Down); // 先頭のクイズを選択
        press(&mut app, KeyCode::Enter); // 開始

        let Screen::Play(screen) = app.screen() else {
            panic!("expected play screen");
        };
        assert_eq!(screen.controller.view_state(), ViewState::Playing);
        let right = screen
            .controller
            .current_question()
            .unwrap()
            .answers
            .iter()
            .position(|a| a == "Blue Whale")
            .unwrap();

        let digit = char::from_digit(right as u32 + 1, 10).unwrap();
        press(&mut app, KeyCode::Char(digit));

        let Screen::Play(screen) = app.screen() else {
            panic!("expected play screen");
        };
        assert_eq!(screen.controller.view_state(), ViewState::Complete);
        assert_eq!(screen.controller.final_score_text(), "Final Score: 1/1");

        press(&mut app, KeyCode::Char('m'));
        assert!(matches!(app.screen(), Screen::Menu));
    }

    #[test]
    fn creates_a_quiz_with_the_keyboard() {
        let (dir, mut app) = app_with(&[]);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter); // Create

        type_text(&mut app, "Space");
        ctrl(&mut app, 'n');
        type_text(&mut app, "Red planet?");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Mars");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Venus");
        for _ in 0..3 {
            press(&mut app, KeyCode::Tab);
        }
        type_text(&mut app, "mars");
        ctrl(&mut app, 's');

        assert!(matches!(app.screen(), Screen::Menu));
        assert_eq!(app.flash().unwrap().kind, StatusKind::Success);

        let saved = QuizStore::new(dir.path()).load_category("Space").unwrap().unwrap();
        assert_eq!(saved.questions[0].answers, vec!["Mars", "Venus"]);
        assert!(saved.questions[0].is_correct("Mars"));
    }

    #[test]
    fn failed_save_stays_on_form() {
        let (_dir, mut app) = app_with(&[]);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        ctrl(&mut app, 's');

        let Screen::Create(screen) = app.screen() else {
            panic!("expected create screen");
        };
        assert_eq!(screen.controller.status().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn editing_stays_open_after_deleting_every_question() {
        let quiz = Quiz::new(
            "Animals",
            vec![Question::new("Largest mammal?", ["Blue Whale", "Lion"], "Blue Whale")],
        );
        let (dir, mut app) = app_with(&[quiz]);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter); // Edit
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter); // 読み込み

        press(&mut app, KeyCode::Tab);
        ctrl(&mut app, 'd');
        type_text(&mut app, "!");

        let Screen::Edit(screen) = app.screen() else {
            panic!("expected edit screen");
        };
        assert!(screen.controller.is_quiz_loaded());
        assert_eq!(screen.controller.form().question_count(), 0);
        assert_eq!(screen.controller.form().category(), "Animals!");

        // 問題がないまま保存すると入力エラーが表示される
        ctrl(&mut app, 's');
        let Screen::Edit(screen) = app.screen() else {
            panic!("expected edit screen");
        };
        let status = screen.controller.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, "Please add at least one question.");

        // Enter で読み直されず、編集内容が残る
        press(&mut app, KeyCode::Enter);
        ctrl(&mut app, 'n');
        let Screen::Edit(screen) = app.screen() else {
            panic!("expected edit screen");
        };
        assert_eq!(screen.controller.form().question_count(), 1);
        assert_eq!(screen.controller.form().category(), "Animals!");
        assert_eq!(screen.controller.selected_question(), Some(0));

        let on_disk = QuizStore::new(dir.path()).load_category("Animals").unwrap().unwrap();
        assert_eq!(on_disk.question_count(), 1);
    }

    #[test]
    fn edit_load_error_is_shown() {
        let quiz = Quiz::new(
            "Animals",
            vec![Question::new("Largest mammal?", ["Blue Whale", "Lion"], "Blue Whale")],
        );
        let (dir, mut app) = app_with(&[quiz]);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Down);

        std::fs::write(dir.path().join("Animals.json"), "{ broken").unwrap();
        press(&mut app, KeyCode::Enter);

        let Screen::Edit(screen) = app.screen() else {
            panic!("expected edit screen");
        };
        assert!(!screen.controller.is_quiz_loaded());
        assert_eq!(screen.controller.status().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn form_focus_wraps_around() {
        let mut form = QuizForm::new();
        form.add_question();
        let mut editor = FormEditor::default();

        editor.previous(&form);
        assert_eq!(editor.focus, Focus::Question(0, QuestionField::CorrectAnswer));
        editor.next(&form);
        assert_eq!(editor.focus, Focus::Category);

        editor.type_char(&mut form, 'X');
        editor.type_char(&mut form, 'Y');
        editor.backspace(&mut form);
        assert_eq!(form.category(), "X");
    }

    #[test]
    fn quit_from_menu() {
        let (_dir, mut app) = app_with(&[]);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }
}
