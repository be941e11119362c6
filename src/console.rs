//! # Console Interface Module
//!
//! Interactive terminal monitor for a PHROM speech bus. The operator plays
//! the speech processor: load an address, clock bytes out and watch every
//! device's protocol state change.
//!
//! ## Keys
//! - hex digits then Enter: LOAD ADDRESS
//! - `n` or Enter on an empty line: read the next byte
//! - `w`: read a full dump row
//! - `r`: dummy read (reset), `p`: power-on reset
//! - `h`: help, `q`/Esc: quit

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;

use crate::components::memory::tms6100::LineMode;
use crate::systems::speech_system::SpeechSystem;
use crate::types::ADDRESS_MASK;

/// Console configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub refresh_rate_ms: u64,
    /// Bytes per row of the read log
    pub dump_width: usize,
    /// Rows of the read log kept on screen
    pub max_dump_rows: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 100,
            dump_width: 16,
            max_dump_rows: 16,
        }
    }
}

/// Console UI application state
pub struct ConsoleApp {
    system: SpeechSystem,
    config: ConsoleConfig,
    running: bool,
    command_buffer: String,
    show_help: bool,
    /// Address the next byte will come from, as far as the host knows
    cursor: Option<u32>,
    read_log: Vec<(u32, u8)>,
    message: String,
}

impl ConsoleApp {
    pub fn new(system: SpeechSystem, config: ConsoleConfig) -> Self {
        Self {
            system,
            config,
            running: false,
            command_buffer: String::new(),
            show_help: false,
            cursor: None,
            read_log: Vec::new(),
            message: String::from("Type a hex address and press Enter"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {}", e))?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)
            .map_err(|e| format!("Failed to enter alternate screen: {}", e))?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.running = true;
        let refresh = Duration::from_millis(self.config.refresh_rate_ms.max(1));
        let mut result = Ok(());

        while self.running {
            if let Err(e) = terminal.draw(|f| self.draw_ui(f)) {
                log::error!("Failed to draw UI: {}", e);
                result = Err(e.into());
                break;
            }

            // Nothing changes on the bus without a key press, so the refresh
            // interval only bounds input latency
            if event::poll(refresh)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key.code);
                    }
                }
            }
        }

        disable_raw_mode().map_err(|e| format!("Failed to disable raw mode: {}", e))?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| format!("Failed to leave alternate screen: {}", e))?;
        terminal
            .show_cursor()
            .map_err(|e| format!("Failed to show cursor: {}", e))?;

        result
    }

    pub fn handle_key_event(&mut self, key: KeyCode) {
        if self.show_help {
            self.show_help = false;
            return;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('h') | KeyCode::Char('H') => {
                self.show_help = true;
            }
            KeyCode::Char('n') | KeyCode::Char('N') => self.read_next(1),
            KeyCode::Char('w') | KeyCode::Char('W') => self.read_next(self.config.dump_width),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.system.reset();
                self.cursor = None;
                self.message = String::from("Dummy read issued, address registers cleared");
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.system.power_on_reset();
                self.cursor = None;
                self.read_log.clear();
                self.message = String::from("Power-on reset");
            }
            KeyCode::Char(c) if c.is_ascii_hexdigit() => {
                if self.command_buffer.len() < 5 {
                    self.command_buffer.push(c.to_ascii_uppercase());
                }
            }
            KeyCode::Backspace => {
                self.command_buffer.pop();
            }
            KeyCode::Enter => {
                if self.command_buffer.is_empty() {
                    self.read_next(1);
                } else {
                    self.execute_load();
                }
            }
            _ => {}
        }
    }

    fn execute_load(&mut self) {
        match u32::from_str_radix(&self.command_buffer, 16) {
            Ok(address) => {
                self.system.load_address(address);
                self.cursor = Some(address & ADDRESS_MASK);
                self.message = format!("Loaded address 0x{:05X}", address & ADDRESS_MASK);
            }
            Err(e) => {
                self.message = format!("Bad address '{}': {}", self.command_buffer, e);
            }
        }
        self.command_buffer.clear();
    }

    fn read_next(&mut self, count: usize) {
        let Some(start) = self.cursor else {
            self.message = String::from("Load an address first");
            return;
        };

        for (i, byte) in self.system.read_bytes(count).into_iter().enumerate() {
            self.read_log.push((start.wrapping_add(i as u32), byte));
        }
        self.cursor = Some(start.wrapping_add(count as u32));

        let keep = self.config.dump_width.max(1) * self.config.max_dump_rows.max(1);
        if self.read_log.len() > keep {
            self.read_log.drain(..self.read_log.len() - keep);
        }
        self.message = format!("Read {} byte(s) from 0x{:05X}", count, start);
    }

    /// Read log formatted as hex dump rows
    pub fn dump_lines(&self) -> Vec<String> {
        self.read_log
            .chunks(self.config.dump_width.max(1))
            .map(|row| {
                let bytes: Vec<String> = row.iter().map(|(_, b)| format!("{:02X}", b)).collect();
                format!("{:05X}: {}", row[0].0, bytes.join(" "))
            })
            .collect()
    }

    fn draw_ui(&self, f: &mut Frame) {
        let size = f.size();

        if self.show_help {
            self.draw_help_screen(f);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Title bar
                Constraint::Min(8),    // Main content
                Constraint::Length(3), // Command bar
            ])
            .split(size);

        let title_text = vec![
            Line::from(vec![Span::styled(
                format!("TMS6100 PHROM Monitor: {}", self.system.name()),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(vec![
                Span::styled("hex+Enter", Style::default().fg(Color::Yellow)),
                Span::raw("=load, "),
                Span::styled("n", Style::default().fg(Color::Yellow)),
                Span::raw("=next byte, "),
                Span::styled("w", Style::default().fg(Color::Yellow)),
                Span::raw("=row, "),
                Span::styled("r", Style::default().fg(Color::Yellow)),
                Span::raw("=reset, "),
                Span::styled("q", Style::default().fg(Color::Yellow)),
                Span::raw("=quit, "),
                Span::styled("h", Style::default().fg(Color::Yellow)),
                Span::raw("=help"),
            ]),
        ];

        let title = Paragraph::new(title_text)
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .wrap(Wrap { trim: true });
        f.render_widget(title, chunks[0]);

        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        self.draw_devices(f, content_chunks[0]);
        self.draw_read_log(f, content_chunks[1]);

        let command_text = if self.command_buffer.is_empty() {
            self.message.clone()
        } else {
            format!("Address: {}", self.command_buffer)
        };
        let command_bar = Paragraph::new(command_text)
            .style(Style::default().fg(Color::White))
            .block(Block::default().borders(Borders::ALL).title("Command"));
        f.render_widget(command_bar, chunks[2]);
    }

    fn draw_help_screen(&self, f: &mut Frame) {
        let size = f.size();
        let key = |k: &'static str, text: &'static str| {
            Line::from(vec![
                Span::styled(k, Style::default().fg(Color::Yellow)),
                Span::raw(text),
            ])
        };
        let help_text = vec![
            Line::from(vec![Span::styled(
                "TMS6100 PHROM Monitor Help",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            key("  0-9 A-F, Enter", " - Load an address (five nibbles on M1)"),
            key("  n, Enter", " - Clock out the next byte (eight M0 pulses)"),
            key("  w", " - Clock out one dump row"),
            key("  r", " - Dummy read: clears the address of every PHROM"),
            key("  p", " - Power-on reset"),
            key("  q, Esc", " - Exit"),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Indicators:",
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from("  V = valid address, R = read active, B = bank owns the bus"),
            Line::from(""),
            Line::from(vec![Span::raw("Press any key to return to main view...")]),
        ];

        let help = Paragraph::new(help_text)
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Help"));
        f.render_widget(help, size);
    }

    fn draw_devices(&self, f: &mut Frame, area: Rect) {
        let info = self.system.get_system_info();
        let mut lines = vec![
            Line::from(format!("System: {}", info.name)),
            Line::from(format!("Description: {}", info.description)),
            Line::from(format!(
                "PHROMs: {}   ADD8 drivers: {}   Contention: {}",
                info.device_count,
                self.system.bus().data_drivers().join(","),
                self.system.contention_events()
            )),
            Line::from(""),
        ];

        let flag = |on: bool, c: char| if on { c } else { '.' };
        for status in self.system.device_status() {
            let state = &status.state;
            let style = if status.indicators.bank_active {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![Span::styled(
                format!(
                    "{:<10} bank {}  [{}{}{}]  addr {:05X}  nib {}  bit {}  byte {:02X}  ADD8 {}",
                    status.name,
                    status.bank,
                    flag(status.indicators.valid_address, 'V'),
                    flag(status.indicators.read_active, 'R'),
                    flag(status.indicators.bank_active, 'B'),
                    state.address,
                    state.load_nibble,
                    state.bit_cursor,
                    state.current_byte,
                    match state.data_line {
                        LineMode::Driven => "out",
                        LineMode::Released => "in",
                    }
                ),
                style,
            )]));
        }

        let widget = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Devices"))
            .wrap(Wrap { trim: true });
        f.render_widget(widget, area);
    }

    fn draw_read_log(&self, f: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = self.dump_lines().into_iter().map(Line::from).collect();
        if lines.is_empty() {
            lines.push(Line::from("Nothing read yet"));
        }

        let widget = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Bytes Read"))
            .wrap(Wrap { trim: true });
        f.render_widget(widget, area);
    }
}

/// Public interface for launching the console
pub fn run_console(
    system: SpeechSystem,
    config: ConsoleConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = ConsoleApp::new(system, config);
    app.run()
}
