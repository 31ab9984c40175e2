use chrono::Local;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use typecoach::{evaluator::Outcome, export::FREE_PRACTICE_LABEL, metrics, util::key_label};

use crate::{App, AppState, SaveStatus};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn glyph(c: char) -> String {
    match c {
        '\n' => "⏎".to_owned(),
        '\t' => "→".to_owned(),
        c => c.to_string(),
    }
}

// Missed spaces need to show up in red
fn visible(c: char) -> String {
    match c {
        ' ' => "·".to_owned(),
        c => glyph(c),
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let dim_bold_style = Style::default()
            .patch(bold_style)
            .add_modifier(Modifier::DIM);

        match self.state {
            AppState::Typing => {
                render_typing(self, area, buf, bold_style, dim_bold_style, italic_style)
            }
            AppState::Results => render_results(self, area, buf, bold_style, italic_style),
        }
    }
}

fn render_typing(
    app: &App,
    area: Rect,
    buf: &mut Buffer,
    bold_style: Style,
    dim_bold_style: Style,
    italic_style: Style,
) {
    let recorder = &app.recorder;
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);
    let underlined_dim_bold_style = Style::default()
        .patch(dim_bold_style)
        .add_modifier(Modifier::UNDERLINED);

    let prompt: String = recorder.prompt().iter().collect();
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_lines = if prompt.width() <= max_chars_per_line as usize {
        1
    } else {
        ((prompt.width() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
    };
    let padding = area.height.saturating_sub(prompt_lines + 4) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(1), // header
            Constraint::Length(1),
            Constraint::Length(prompt_lines),
            Constraint::Length(1),
            Constraint::Length(1), // live stats
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let header = format!(
        "{}{}",
        app.exercise.lesson().unwrap_or(FREE_PRACTICE_LABEL),
        if recorder.policy().is_strict() {
            "  [strict]"
        } else {
            ""
        }
    );
    Paragraph::new(Span::styled(header, italic_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let mut spans: Vec<Span> = recorder
        .marks()
        .iter()
        .zip(recorder.prompt())
        .map(|(outcome, expected)| match outcome {
            Outcome::Correct => Span::styled(glyph(*expected), green_bold_style),
            Outcome::Incorrect => Span::styled(visible(*expected), red_bold_style),
        })
        .collect();

    if let Some(expected) = recorder.expected_char() {
        let cursor_style = if recorder.pending_miss().is_some() {
            underlined_dim_bold_style.fg(Color::Red)
        } else {
            underlined_dim_bold_style
        };
        spans.push(Span::styled(glyph(expected), cursor_style));

        let rest: String = recorder.prompt()[recorder.cursor_pos() + 1..]
            .iter()
            .map(|c| glyph(*c))
            .collect();
        spans.push(Span::styled(rest, dim_bold_style));
    }

    Paragraph::new(Line::from(spans))
        .alignment(if prompt_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    if recorder.has_started() {
        let session = recorder.session();
        let live = format!(
            "{:.0} wpm   {:.0}% acc   {} errors",
            recorder.live_wpm(Local::now()),
            session.accuracy_percent(),
            session.error_count
        );
        Paragraph::new(Span::styled(live, dim_bold_style))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
    }

    let legend = if recorder.policy().allows_backspace() {
        "(backspace) fix / (esc)ape"
    } else {
        "(esc)ape"
    };
    Paragraph::new(Span::styled(legend, italic_style)).render(chunks[7], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer, bold_style: Style, italic_style: Style) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // headline stats
            Constraint::Length(1), // detail
            Constraint::Length(1), // adjusted for backspaces
            Constraint::Length(1), // save status
            Constraint::Length(1), // problem keys
            Constraint::Length(1), // lesson best
            Constraint::Min(1),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let Some(result) = &app.last_result else {
        return;
    };

    Paragraph::new(Span::styled(
        format!(
            "{:.0} wpm   {:.0}% acc   {:.1}s",
            result.wpm(),
            result.accuracy_percent(),
            result.elapsed_secs()
        ),
        bold_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} typed   {} errors   {} backspaces",
            result.typed_count, result.error_count, result.backspaces
        ),
        italic_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    if result.backspaces > 0 {
        Paragraph::new(Span::styled(
            format!(
                "adjusted {:.0} wpm   {:.0}% acc",
                app.config.adjusted_wpm(result),
                app.config.adjusted_accuracy(result) * 100.0
            ),
            italic_style.add_modifier(Modifier::DIM),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }

    let (status, status_style) = match &app.save_status {
        Some(SaveStatus::Saved) => ("saved".to_string(), Style::default().fg(Color::Green)),
        Some(SaveStatus::Failed(e)) => (
            format!("not saved: {e}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        None => (String::new(), Style::default()),
    };
    Paragraph::new(Span::styled(status, status_style))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[4], buf);

    let keys = metrics::top_problem_keys(&app.store, app.config.top_keys);
    if !keys.is_empty() {
        let listed = keys
            .iter()
            .map(|(k, n)| format!("{} {}", key_label(*k), n))
            .collect::<Vec<_>>()
            .join("  ");
        Paragraph::new(Span::styled(
            format!("problem keys: {listed}"),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);
    }

    if let Some(best) = metrics::best_wpm_by_lesson(&app.store).get(&result.lesson) {
        Paragraph::new(Span::styled(
            format!("best on this lesson: {best:.0} wpm"),
            Style::default().fg(Color::Magenta),
        ))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);
    }

    let legend = if app.has_unsaved() {
        "(r)etry / (n)ew / (s)ave again / (esc)ape"
    } else {
        "(r)etry / (n)ew / (esc)ape"
    };
    Paragraph::new(Span::styled(legend, italic_style)).render(chunks[8], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExerciseSource;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use typecoach::{config::Config, ProgressStore, TypingPolicy};

    fn create_test_app(prompt: &str, path: &std::path::Path) -> App {
        App::new(
            Config::default(),
            TypingPolicy::Normal,
            ExerciseSource::Custom(prompt.to_string()),
            ProgressStore::empty(path),
        )
        .unwrap()
    }

    fn press(app: &mut App, code: KeyCode) {
        assert!(app.on_key(KeyEvent::new(code, KeyModifiers::NONE)).unwrap());
    }

    fn render(app: &App) -> String {
        let area = Rect::new(0, 0, 80, 24);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_typing_screen_shows_prompt_and_label() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_test_app("hello world", &dir.path().join("p.json"));

        let rendered = render(&app);
        assert!(rendered.contains("hello world"));
        assert!(rendered.contains(FREE_PRACTICE_LABEL));
        assert!(rendered.contains("(backspace) fix"));
        assert!(!rendered.contains("wpm"));
    }

    #[test]
    fn test_typing_screen_shows_live_stats_once_started() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = create_test_app("hello", &dir.path().join("p.json"));
        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Char('x'));

        let rendered = render(&app);
        assert!(rendered.contains("wpm"));
        assert!(rendered.contains("1 errors"));
    }

    #[test]
    fn test_results_screen_after_saved_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = create_test_app("hi", &dir.path().join("p.json"));
        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.state, AppState::Results);

        let rendered = render(&app);
        assert!(rendered.contains("50% acc"));
        assert!(rendered.contains("saved"));
        assert!(rendered.contains("problem keys: i 1"));
        assert!(rendered.contains("(r)etry / (n)ew / (esc)ape"));
    }

    #[test]
    fn test_results_screen_offers_retry_after_failed_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();
        let mut app = create_test_app("hi", &path);
        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Char('i'));

        assert!(matches!(app.save_status, Some(SaveStatus::Failed(_))));
        let rendered = render(&app);
        assert!(rendered.contains("not saved"));
        assert!(rendered.contains("(s)ave again"));
    }

    #[test]
    fn test_results_screen_shows_backspace_adjusted_figures() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = create_test_app("hi", &dir.path().join("p.json"));
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Char('i'));

        let rendered = render(&app);
        assert!(rendered.contains("1 backspaces"));
        assert!(rendered.contains("adjusted"));
    }

    #[test]
    fn test_glyphs_for_whitespace() {
        assert_eq!(glyph('\n'), "⏎");
        assert_eq!(glyph('\t'), "→");
        assert_eq!(glyph(' '), " ");
        assert_eq!(visible(' '), "·");
        assert_eq!(visible('a'), "a");
    }
}
