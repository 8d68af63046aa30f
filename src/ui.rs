// ============================================
// src/ui.rs
// 画面の描画
// ============================================

use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

use crate::app::{App, EditScreen, Focus, FormEditor, MENU_ITEMS, PlayScreen, Screen};
use crate::editor::{QuestionField, QuizForm, Status, StatusKind};
use crate::model::Quiz;
use crate::play::ViewState;

pub fn draw(f: &mut Frame, app: &App) {
    let size = f.area();
    // 枠線を描画
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Petty Pursuit ");
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    match app.screen() {
        Screen::Menu => draw_menu(f, inner_area, app),
        Screen::Play(screen) => draw_play(f, inner_area, screen),
        Screen::Create(screen) => draw_form(
            f,
            inner_area,
            "Create a Quiz",
            screen.controller.form(),
            &screen.editor,
            screen.controller.status(),
            screen.controller.can_save(),
            screen.editor.question_index().is_some(),
        ),
        Screen::Edit(screen) => draw_edit(f, inner_area, screen),
    }
}

/// 下部の [本文, ステータス, 操作説明] に分割
fn split_with_footer(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // [0] 本文
            Constraint::Length(1), // [1] ステータス
            Constraint::Length(1), // [2] 操作説明
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

fn status_line(status: Option<&Status>) -> Paragraph<'static> {
    let Some(status) = status else {
        return Paragraph::new("");
    };
    let color = match status.kind {
        StatusKind::Info => Color::Yellow,
        StatusKind::Success => Color::Green,
        StatusKind::Error => Color::Red,
    };
    Paragraph::new(status.message.clone()).style(Style::default().fg(color))
}

/// 操作説明。使えない操作は暗く表示する
fn help_line(items: &[(&'static str, bool)]) -> Paragraph<'static> {
    let mut spans = Vec::new();
    for (i, (text, enabled)) in items.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        let style = if *enabled {
            Style::default().fg(Color::Gray)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(*text, style));
    }
    Paragraph::new(Line::from(spans))
}

fn highlighted(selected: bool) -> Style {
    if selected {
        Style::default().fg(Color::Black).bg(Color::White)
    } else {
        Style::default().fg(Color::White)
    }
}

// --------------------------------------------------
// メニュー
// --------------------------------------------------

fn draw_menu(f: &mut Frame, area: Rect, app: &App) {
    let [body, status, help] = split_with_footer(area);

    let mut lines = vec![
        Line::from("Petty Pursuit").bold().centered(),
        Line::from(""),
    ];
    for (i, (label, _)) in MENU_ITEMS.iter().enumerate() {
        lines.push(Line::from(Span::styled(format!("  {label}  "), highlighted(i == app.menu_cursor()))).centered());
    }
    f.render_widget(Paragraph::new(lines), body);

    f.render_widget(status_line(app.flash()), status);
    f.render_widget(
        help_line(&[("↑↓ move", true), ("Enter select", true), ("q quit", true)]),
        help,
    );
}

// --------------------------------------------------
// プレイ画面
// --------------------------------------------------

fn quiz_lines(quizzes: &[Quiz], selected: Option<usize>) -> Vec<Line<'static>> {
    if quizzes.is_empty() {
        return vec![Line::from("No quizzes found.").fg(Color::DarkGray)];
    }
    quizzes
        .iter()
        .enumerate()
        .map(|(i, quiz)| {
            let text = format!(" {} ({} questions) ", quiz.category, quiz.question_count());
            Line::from(Span::styled(text, highlighted(selected == Some(i))))
        })
        .collect()
}

fn draw_play(f: &mut Frame, area: Rect, screen: &PlayScreen) {
    let controller = &screen.controller;
    let [body, status, help] = split_with_footer(area);
    f.render_widget(status_line(screen.notice.as_ref()), status);

    match controller.view_state() {
        ViewState::Selection => {
            let mut lines = vec![
                Line::from(controller.quiz_category().to_string()).bold(),
                Line::from(""),
            ];
            lines.extend(quiz_lines(
                controller.available_quizzes(),
                controller.selected_index(),
            ));
            f.render_widget(Paragraph::new(lines), body);
            f.render_widget(
                help_line(&[
                    ("↑↓ choose", true),
                    ("Enter start", controller.can_start_quiz()),
                    ("r reload", true),
                    ("Esc menu", true),
                ]),
                help,
            );
        }
        ViewState::Playing => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1), // [0] カテゴリとスコア
                    Constraint::Length(1), // [1] 進捗ゲージ
                    Constraint::Length(1), // [2] 空白
                    Constraint::Length(2), // [3] 問題文
                    Constraint::Min(1),    // [4] 選択肢
                ])
                .split(body);

            let header = format!(
                "{}  |  {}  |  {} ({})",
                controller.quiz_category(),
                controller.question_counter_text(),
                controller.score_text(),
                controller.percentage_text()
            );
            f.render_widget(Paragraph::new(header).fg(Color::Yellow), chunks[0]);

            let count = controller.question_count();
            let ratio = if count > 0 {
                (controller.current_question_index() as f64 / count as f64).min(1.0)
            } else {
                0.0
            };
            let gauge = Gauge::default()
                .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
                .ratio(ratio)
                .label(controller.question_counter_text());
            f.render_widget(gauge, chunks[1]);

            if let Some(question) = controller.current_question() {
                f.render_widget(
                    Paragraph::new(question.statement.clone())
                        .style(Style::default().fg(Color::White).bold())
                        .wrap(Wrap { trim: true })
                        .centered(),
                    chunks[3],
                );

                let answers: Vec<Line> = question
                    .answers
                    .iter()
                    .enumerate()
                    .map(|(i, answer)| {
                        let text = format!(" {}. {answer} ", i + 1);
                        Line::from(Span::styled(text, highlighted(i == screen.answer_cursor)))
                    })
                    .collect();
                f.render_widget(Paragraph::new(answers), chunks[4]);
            }
            f.render_widget(
                help_line(&[
                    ("↑↓ choose", true),
                    ("Enter/1-9 answer", controller.can_answer()),
                    ("Esc give up", true),
                ]),
                help,
            );
        }
        ViewState::Complete => {
            let lines = vec![
                Line::from(controller.quiz_category().to_string()).bold().centered(),
                Line::from(""),
                Line::from(controller.final_score_text()).fg(Color::Green).centered(),
                Line::from(controller.final_percentage_text()).fg(Color::Green).centered(),
            ];
            f.render_widget(Paragraph::new(lines), body);
            f.render_widget(
                help_line(&[("Enter play another", true), ("m menu", true), ("Esc back", true)]),
                help,
            );
        }
    }
}

// --------------------------------------------------
// 作成・編集画面
// --------------------------------------------------

fn field_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let value_style = if focused {
        Style::default().fg(Color::Black).bg(Color::White)
    } else {
        Style::default().fg(Color::White)
    };
    let cursor = if focused { "_" } else { "" };
    Line::from(vec![
        Span::styled(format!("{label:>10}: "), Style::default().fg(Color::Gray)),
        Span::styled(format!("{value}{cursor}"), value_style),
    ])
}

#[allow(clippy::too_many_arguments)]
fn draw_form(
    f: &mut Frame,
    area: Rect,
    title: &str,
    form: &QuizForm,
    editor: &FormEditor,
    status: Option<&Status>,
    can_save: bool,
    can_remove: bool,
) {
    let [body, status_area, help] = split_with_footer(area);

    let mut lines = vec![Line::from(title.to_string()).bold(), Line::from("")];
    let mut focused_line = 0;

    let focused = editor.focus == Focus::Category;
    if focused {
        focused_line = lines.len();
    }
    lines.push(field_line("Category", form.category(), focused));

    for (i, question) in form.questions().iter().enumerate() {
        lines.push(Line::from(""));
        lines.push(Line::from(format!("Question {}", question.number())).fg(Color::Cyan));
        for field in QuestionField::ALL {
            let focused = editor.focus == Focus::Question(i, field);
            if focused {
                focused_line = lines.len();
            }
            lines.push(field_line(field.label(), question.field(field), focused));
        }
    }

    // フォーカス行が見えるようにスクロール
    let height = body.height as usize;
    let offset = (focused_line + 1).saturating_sub(height) as u16;
    f.render_widget(Paragraph::new(lines).scroll((offset, 0)), body);

    f.render_widget(status_line(status), status_area);
    f.render_widget(
        help_line(&[
            ("Tab next", true),
            ("^N add question", true),
            ("^D delete question", can_remove),
            ("^S save", can_save),
            ("Esc menu", true),
        ]),
        help,
    );
}

fn draw_edit(f: &mut Frame, area: Rect, screen: &EditScreen) {
    let controller = &screen.controller;
    if controller.is_quiz_loaded() {
        draw_form(
            f,
            area,
            "Edit Quiz",
            controller.form(),
            &screen.editor,
            controller.status(),
            controller.form().can_save(),
            controller.is_question_selected(),
        );
        return;
    }

    let [body, status, help] = split_with_footer(area);
    let mut lines = vec![Line::from("Choose a quiz to edit").bold(), Line::from("")];
    lines.extend(quiz_lines(
        controller.available_quizzes(),
        controller.selected_index(),
    ));
    f.render_widget(Paragraph::new(lines), body);
    f.render_widget(status_line(controller.status()), status);
    f.render_widget(
        help_line(&[
            ("↑↓ choose", true),
            ("Enter load", controller.can_load_quiz()),
            ("Esc menu", true),
        ]),
        help,
    );
}
