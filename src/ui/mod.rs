pub mod home;
pub mod tabs;

use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::App;
use crate::games::hud::HudSnapshot;
use crate::games::registry::GameInfo;

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
        ])
        .split(frame.area());

    tabs::render_tabs(frame, app, chunks[0]);

    let Some(info) = app.session.as_ref().map(|s| s.info) else {
        home::render_home(frame, chunks[1], app.selected);
        return;
    };

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(chunks[1]);
    frame.render_widget(Paragraph::new(hud_line(info, &app.hud)), parts[0]);

    let play = parts[1];
    app.resize_play_area(play.width, play.height);
    frame.render_widget(Paragraph::new(app.surface.to_lines()), play);

    if app.hud.game_over {
        render_game_over(frame, play, info, app.hud.score);
    } else if app.paused {
        render_paused(frame, play);
    }
}

fn hud_line(info: &GameInfo, hud: &HudSnapshot) -> Line<'static> {
    let label = Style::default().fg(Color::Rgb(100, 100, 130));
    let value = Style::default().fg(Color::Rgb(255, 220, 80)).add_modifier(Modifier::BOLD);
    let lives = hud.lives.map_or_else(|| "—".to_string(), |l| l.to_string());
    Line::from(vec![
        Span::styled(format!(" {} {}  ", info.icon, info.name), Style::default().fg(info.accent).add_modifier(Modifier::BOLD)),
        Span::styled("SCORE ", label),
        Span::styled(format!("{:06}", hud.score), value),
        Span::styled("   LIVES ", label),
        Span::styled(lives, value),
        Span::styled("   LEVEL ", label),
        Span::styled(hud.level.to_string(), value),
    ])
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    let w = w.min(area.width.saturating_sub(4));
    let h = h.min(area.height.saturating_sub(2));
    Rect::new(area.x + area.width.saturating_sub(w) / 2, area.y + area.height.saturating_sub(h) / 2, w, h)
}

fn overlay_block(title: &'static str, color: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(color))
        .title(title)
        .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .style(Style::default().bg(Color::Rgb(15, 15, 25)))
}

fn hint(key: &'static str, label: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(Color::Rgb(80, 200, 255)).add_modifier(Modifier::BOLD)),
        Span::styled(label, Style::default().fg(Color::Rgb(100, 100, 130))),
    ]
}

fn render_game_over(frame: &mut Frame, area: Rect, info: &GameInfo, score: u32) {
    let overlay_area = centered(area, 40, 9);
    frame.render_widget(Clear, overlay_area);
    let block = overlay_block(" GAME OVER ", Color::Rgb(255, 90, 90));
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let mut keys = Vec::new();
    keys.extend(hint("  Enter/R", " play again  "));
    keys.extend(hint("Esc", " picker"));
    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("  {} ", info.icon), Style::default()),
            Span::styled(info.name, Style::default().fg(info.accent).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("  Final score: {score}"),
            Style::default().fg(Color::Rgb(255, 215, 0)).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(keys),
    ];
    frame.render_widget(Paragraph::new(lines).style(Style::default().bg(Color::Rgb(15, 15, 25))), inner);
}

fn render_paused(frame: &mut Frame, area: Rect) {
    let overlay_area = centered(area, 30, 5);
    frame.render_widget(Clear, overlay_area);
    let block = overlay_block(" PAUSED ", Color::Rgb(255, 220, 80));
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let mut keys = Vec::new();
    keys.extend(hint("  P", " resume  "));
    keys.extend(hint("Esc", " picker"));
    let lines = vec![Line::from(""), Line::from(keys)];
    frame.render_widget(Paragraph::new(lines).style(Style::default().bg(Color::Rgb(15, 15, 25))), inner);
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::config::ArcadeConfig;
    use crate::games::registry;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal.backend().buffer().content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn picker_lists_every_game() {
        let mut app = App::new(&ArcadeConfig::default());
        let mut terminal = Terminal::new(TestBackend::new(160, 50)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = screen_text(&terminal);
        for info in registry::all() {
            assert!(text.contains(info.name), "missing {}", info.name);
        }
        assert!(text.contains("Navigation Control"));
    }

    #[test]
    fn playing_shows_hud_and_fits_surface() {
        let mut app = App::new(&ArcadeConfig { seed: Some(5), ..ArcadeConfig::default() });
        app.launch(registry::index_of("breakout").unwrap());
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("SCORE"));
        assert!(text.contains("LEVEL"));
        assert_eq!((app.surface.width(), app.surface.height()), (100, 36));

        app.on_key(KeyEvent::new(KeyCode::Char('p'), KeyModifiers::NONE), Instant::now());
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("PAUSED"));
    }

    #[test]
    fn game_over_overlay() {
        let mut app = App::new(&ArcadeConfig { seed: Some(5), ..ArcadeConfig::default() });
        app.launch(registry::index_of("snake").unwrap());
        let t0 = Instant::now();
        for i in 0..200 {
            app.on_tick(t0 + Duration::from_millis(50 * i));
        }
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("GAME OVER"));
        assert!(text.contains("play again"));
    }
}
