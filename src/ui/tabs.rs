use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::App;
use crate::games::registry;

const ACTIVE: Color = Color::Rgb(255, 220, 80);
const IDLE: Color = Color::Rgb(120, 120, 140);

/// Title bar: "Home" followed by one tab per cabinet, the running one lit.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let lit = app.session.as_ref().map_or(0, |s| s.index + 1);
    let mut titles = vec![" Home ".to_string()];
    titles.extend(
        registry::all()
            .iter()
            .enumerate()
            .map(|(i, g)| format!(" {}{} ", registry::hotkey(i).map(|k| format!("{k}·")).unwrap_or_default(), g.name)),
    );
    let titles: Vec<Line> = titles
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let fg = if i == lit { ACTIVE } else { IDLE };
            Line::from(Span::styled(t, Style::default().fg(fg)))
        })
        .collect();

    let frame_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(60, 150, 200)))
        .title(" 🕹 RustCade ")
        .title_style(Style::default().fg(Color::Rgb(200, 120, 255)).add_modifier(Modifier::BOLD));

    let tabs = Tabs::new(titles)
        .block(frame_block)
        .select(lit)
        .highlight_style(Style::default().fg(ACTIVE).add_modifier(Modifier::BOLD))
        .divider(Span::styled("│", Style::default().fg(Color::Rgb(60, 60, 80))));

    frame.render_widget(tabs, area);
}
