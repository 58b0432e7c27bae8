use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::PICKER_COLUMNS;
use crate::games::registry::{self, GameInfo};

const BANNER: &str = r#"
 ╔═════════════════════════════════════════════════════════════════════════════╗
 ║  ██████╗ ██╗   ██╗███████╗████████╗         ██████╗ █████╗ ██████╗ ███████╗ ║
 ║  ██╔══██╗██║   ██║██╔════╝╚══██╔══╝         ██╔════╝██╔══██╗██╔══██╗██╔════╝ ║
 ║  ██████╔╝██║   ██║███████╗   ██║   ███████╗ ██║     ███████║██║  ██║█████╗   ║
 ║  ██╔══██╗██║   ██║╚════██║   ██║   ╚══════╝ ██║     ██╔══██║██║  ██║██╔══╝   ║
 ║  ██║  ██║╚██████╔╝███████║   ██║            ╚██████╗██║  ██║██████╔╝███████╗ ║
 ║  ╚═╝  ╚═╝ ╚═════╝ ╚══════╝   ╚═╝             ╚═════╝╚═╝  ╚═╝╚═════╝ ╚══════╝ ║
 ╚═════════════════════════════════════════════════════════════════════════════╝"#;

const KEY_COLOR: Color = Color::Rgb(80, 200, 255);
const LABEL_COLOR: Color = Color::Rgb(140, 140, 140);

pub fn key_label(code: KeyCode) -> String {
    match code {
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_ascii_uppercase().to_string(),
        other => format!("{other:?}"),
    }
}

fn dim(color: Color) -> Color {
    match color {
        Color::Rgb(r, g, b) => Color::Rgb(r / 2, g / 2, b / 2),
        other => other,
    }
}

fn render_game_tile(frame: &mut Frame, area: Rect, index: usize, info: &GameInfo, selected: bool) {
    let border_color = if selected { Color::Rgb(255, 220, 80) } else { dim(info.accent) };
    let border_type = if selected { BorderType::Double } else { BorderType::Rounded };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let hotkey = registry::hotkey(index).map(String::from).unwrap_or_default();
    let name_color = if selected { Color::Rgb(255, 255, 255) } else { info.accent };
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("[{hotkey}] "), Style::default().fg(Color::Rgb(255, 220, 80)).add_modifier(Modifier::BOLD)),
        Span::styled(format!("{} ", info.icon), Style::default()),
        Span::styled(info.name, Style::default().fg(name_color).add_modifier(Modifier::BOLD)),
    ])];
    let desc_color = if selected { Color::Rgb(180, 180, 200) } else { Color::Rgb(120, 120, 140) };
    lines.push(Line::from(Span::styled(info.description, Style::default().fg(desc_color))));

    if selected {
        lines.push(Line::from(Span::styled(
            "▶ Enter to play",
            Style::default().fg(Color::Rgb(255, 220, 80)).add_modifier(Modifier::BOLD),
        )));
    }

    let p = Paragraph::new(lines).alignment(Alignment::Center).wrap(Wrap { trim: true });
    frame.render_widget(p, inner);
}

fn binding(keys: &str, label: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("    {keys:<17}"), Style::default().fg(KEY_COLOR)),
        Span::styled(label.to_string(), Style::default().fg(LABEL_COLOR)),
    ])
}

/// Controls panel lines built from the game's keymap.
pub fn game_controls(info: &GameInfo) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {} {}", info.icon, info.name),
            Style::default().fg(info.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(format!("  {}", info.description), Style::default().fg(Color::Rgb(100, 100, 120)))),
        Line::from(""),
    ];
    for action in info.controls {
        let keys: Vec<String> = info.keys_for(*action).into_iter().map(key_label).collect();
        lines.push(binding(&keys.join(" / "), action.label()));
    }
    lines.push(binding("P", "Pause"));
    lines.push(binding("Esc", "Back to picker"));
    lines
}

pub fn render_home(frame: &mut Frame, area: Rect, selected: usize) {
    let games = registry::all();
    let rows = games.len().div_ceil(PICKER_COLUMNS).max(1);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10),
            Constraint::Length(2),
            Constraint::Length(12),
            Constraint::Min(10),
            Constraint::Length(2),
        ])
        .split(area);

    let banner = Paragraph::new(BANNER)
        .style(Style::default().fg(Color::Rgb(80, 200, 255)))
        .alignment(Alignment::Center);
    frame.render_widget(banner, chunks[0]);

    let subtitle = Paragraph::new(Line::from(Span::styled(
        "  ⚡ Your Terminal Arcade ⚡  ",
        Style::default().fg(Color::Rgb(255, 220, 80)).add_modifier(Modifier::BOLD | Modifier::ITALIC),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(subtitle, chunks[1]);

    let games_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(60, 150, 200)))
        .title(" 🎮 Games: ↑↓←→ Select, Enter to Play ")
        .title_style(Style::default().fg(Color::Rgb(200, 120, 255)).add_modifier(Modifier::BOLD));
    let games_inner = games_block.inner(chunks[2]);
    frame.render_widget(games_block, chunks[2]);

    let tile_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(games_inner);
    for (row, row_area) in tile_rows.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, PICKER_COLUMNS as u32); PICKER_COLUMNS])
            .split(*row_area);
        for (col, tile_area) in cols.iter().enumerate() {
            let index = row * PICKER_COLUMNS + col;
            if let Some(info) = games.get(index) {
                render_game_tile(frame, *tile_area, index, info, selected == index);
            }
        }
    }

    let ctrl_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[3]);

    let last_hotkey = registry::hotkey(games.len().saturating_sub(1)).unwrap_or('0');
    let controls = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "  🔧 Navigation",
            Style::default().fg(Color::Rgb(255, 220, 80)).add_modifier(Modifier::BOLD),
        )),
        binding(&format!("1-9, {last_hotkey}"), "Launch game"),
        binding("↑ ↓ ← → / Tab", "Select game"),
        binding("Enter", "Play selected"),
        binding("Esc", "Return to picker"),
        binding("q / Ctrl+C", "Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "  🎮 In game",
            Style::default().fg(Color::Rgb(255, 220, 80)).add_modifier(Modifier::BOLD),
        )),
        binding("P", "Pause / Unpause"),
        binding("R / Enter", "Play again after game over"),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Rgb(60, 150, 200)))
            .title(" ⌨ Navigation Control ")
            .title_style(Style::default().fg(Color::Rgb(200, 120, 255)).add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(controls, ctrl_cols[0]);

    if let Some(info) = games.get(selected) {
        let game_ctrl = Paragraph::new(game_controls(info)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(dim(info.accent)))
                .title(format!(" 🎮 {} Control ", info.name))
                .title_style(Style::default().fg(info.accent).add_modifier(Modifier::BOLD)),
        );
        frame.render_widget(game_ctrl, ctrl_cols[1]);
    }

    let footer = Paragraph::new(Line::from(vec![
        Span::styled("  🦀 ", Style::default().fg(Color::Rgb(255, 100, 50))),
        Span::styled(concat!("v", env!("CARGO_PKG_VERSION")), Style::default().fg(Color::Rgb(80, 80, 100))),
        Span::styled("  │  ", Style::default().fg(Color::Rgb(40, 40, 60))),
        Span::styled(format!("{} games", games.len()), Style::default().fg(Color::Rgb(100, 100, 130))),
    ]))
    .alignment(Alignment::Center);
    frame.render_widget(footer, chunks[4]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::Action;

    #[test]
    fn key_labels() {
        assert_eq!(key_label(KeyCode::Left), "←");
        assert_eq!(key_label(KeyCode::Char(' ')), "Space");
        assert_eq!(key_label(KeyCode::Char('x')), "X");
    }

    #[test]
    fn controls_list_every_action() {
        let info = registry::find("stacker").unwrap();
        let text: Vec<String> = game_controls(info)
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        for action in [Action::Rotate, Action::Drop, Action::Down] {
            assert!(text.iter().any(|l| l.contains(action.label())), "{action:?}");
        }
        assert!(text.iter().any(|l| l.contains("Space") && l.contains("Drop")));
    }
}
