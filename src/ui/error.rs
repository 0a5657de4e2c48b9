//! Full-screen error display for failures that stop the recorder from starting.

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::time::Duration;

const ERROR_BG: Color = Color::Rgb(160, 20, 20);

/// Error screen shown on the alternate screen until a key is pressed.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl ErrorScreen {
    /// Creates a new error screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(ErrorScreen {
            terminal,
            active: true,
        })
    }

    /// Shows `heading` and `message` and waits for any key press.
    pub fn show_error(&mut self, heading: &str, message: &str) -> anyhow::Result<()> {
        loop {
            self.terminal
                .draw(|frame| render_error(frame, heading, message))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Cleans up terminal state and exits alternate screen mode.
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Shows an error screen, logging instead if the terminal itself is unusable.
pub fn report_fatal(heading: &str, message: &str) {
    let shown = ErrorScreen::new().and_then(|mut screen| {
        screen.show_error(heading, message)?;
        screen.cleanup()
    });
    if let Err(e) = shown {
        tracing::error!("Could not display error screen: {}", e);
    }
}

/// Draws the message centered on a red background, wrapped to 80% of the width.
fn render_error(frame: &mut Frame, heading: &str, message: &str) {
    let area = frame.area();
    let style = Style::default().fg(Color::White).bg(ERROR_BG);
    frame.render_widget(Block::default().style(style), area);

    let mut lines = vec![Line::from(heading.bold()), Line::default()];
    lines.extend(message.lines().map(Line::from));
    lines.push(Line::default());
    lines.push(Line::from("Press any key to exit".italic()));

    let text_height = (lines.len() as u16).min(area.height);
    let text_area = Rect {
        x: area.x + area.width / 10,
        y: area.y + area.height.saturating_sub(text_height) / 2,
        width: area.width * 8 / 10,
        height: area.height - area.height.saturating_sub(text_height) / 2,
    };

    frame.render_widget(
        Paragraph::new(lines)
            .style(style)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        text_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_render_error_centers_message() {
        let mut terminal = Terminal::new(TestBackend::new(50, 12)).unwrap();
        terminal
            .draw(|frame| render_error(frame, "Configuration Error", "bad toml"))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let rows: Vec<String> = (0..12)
            .map(|y| (0..50).map(|x| buffer[(x, y)].symbol().to_string()).collect())
            .collect();
        let heading_row = rows
            .iter()
            .position(|row| row.contains("Configuration Error"))
            .unwrap();
        assert!(heading_row >= 2);
        assert!(rows.iter().any(|row| row.contains("bad toml")));
        assert_eq!(buffer[(0, 0)].bg, ERROR_BG);
    }
}
