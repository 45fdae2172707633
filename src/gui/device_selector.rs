use std::{io::stdout, path::PathBuf, time::Duration};

use crate::{channel::LineSettings, gui::error::SonarGuiError};

use crossterm::{
    event::{self, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

/// Where the cursor lands after a key press, or whether the user is done.
#[derive(Debug, PartialEq, Eq)]
enum Selection {
    Moved(usize),
    Chosen(usize),
    Quit,
    Ignored,
}

fn handle_key(code: KeyCode, cursor: usize, n_ports: usize) -> Selection {
    match code {
        KeyCode::Down => Selection::Moved((cursor + 1) % n_ports),
        KeyCode::Up => Selection::Moved((cursor + n_ports - 1) % n_ports),
        KeyCode::Enter => Selection::Chosen(cursor),
        KeyCode::Char('q') | KeyCode::Esc => Selection::Quit,
        _ => Selection::Ignored,
    }
}

/// Asks the user which serial device the controller hangs off. Blocks until
/// they pick one (`Some`) or quit (`None`). `line` is only shown, so the
/// user can tell whether the framing matches their controller before it is
/// opened.
pub fn device_selector(
    mut available_ports: Vec<PathBuf>,
    line: &LineSettings,
) -> Result<Option<PathBuf>, SonarGuiError> {
    if available_ports.is_empty() {
        return Ok(None);
    }

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut cursor = 0;
    let mut list_state = ListState::default().with_selected(Some(cursor));
    let n_ports = available_ports.len();
    let mut selected_port = None;
    let framing = format!(" {} ", line);
    loop {
        let title = Title::from(Line::from(vec![
            " Sonar controller port at ".cyan().bold(),
            framing.as_str().yellow().bold(),
        ]));
        let instructions = Title::from(Line::from(vec![
            " Move ".into(),
            "<Up>/<Down>".cyan().bold(),
            " Open port and start ranging ".into(),
            "<Enter>".cyan().bold(),
            " Quit ".into(),
            "<Q> ".cyan().bold(),
        ]));
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL);
        let port_names = available_ports.iter().map(|p| p.to_string_lossy());
        let list = List::new(port_names)
            .style(Style::default().fg(Color::White))
            .highlight_symbol(">>")
            .highlight_style(Style::default().fg(Color::Cyan))
            .block(block);
        list_state.select(Some(cursor));
        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_stateful_widget(list, area, &mut list_state);
        })?;
        if event::poll(Duration::from_millis(16))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match handle_key(key.code, cursor, n_ports) {
                        Selection::Moved(c) => cursor = c,
                        Selection::Chosen(c) => {
                            selected_port = Some(c);
                            break;
                        }
                        Selection::Quit => break,
                        Selection::Ignored => {}
                    }
                }
            }
        }
    }

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(selected_port.map(|i| available_ports.swap_remove(i)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps_both_ways() {
        assert_eq!(handle_key(KeyCode::Down, 2, 3), Selection::Moved(0));
        assert_eq!(handle_key(KeyCode::Up, 0, 3), Selection::Moved(2));
        assert_eq!(handle_key(KeyCode::Down, 0, 3), Selection::Moved(1));
    }

    #[test]
    fn enter_and_quit() {
        assert_eq!(handle_key(KeyCode::Enter, 1, 3), Selection::Chosen(1));
        assert_eq!(handle_key(KeyCode::Char('q'), 1, 3), Selection::Quit);
        assert_eq!(handle_key(KeyCode::Char('x'), 1, 3), Selection::Ignored);
    }

    #[test]
    fn no_ports_means_no_choice() {
        assert!(device_selector(vec![], &LineSettings::default())
            .unwrap()
            .is_none());
    }
}
