use std::{
    io::stdout,
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, spawn},
    time::{Duration, Instant},
};

use crate::{
    channel::ByteChannel,
    config::DisplaySettings,
    gui::error::SonarGuiError,
    reading::Reading,
    session::SonarSession,
    sink::{pump, PumpError, ReadingSink},
};

use crossterm::{
    event::{self, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use log::warn;
use ratatui::{
    prelude::*,
    widgets::{block::Title, *},
    Terminal,
};

/// How long we give the polling thread to notice it should stop before we
/// stop waiting for it.
const WORKER_GRACE: Duration = Duration::from_secs(2);

enum ThreadMessage {
    Stop,
}

/// What the polling thread tells the display.
#[derive(Debug, Clone, PartialEq)]
enum WorkerUpdate {
    Reading(Reading),
    LinkLost(String),
}

/// Forwards readings to the display and checks for a stop request between
/// sweeps.
struct DisplayFeed {
    tx: Sender<WorkerUpdate>,
    stop_rx: Receiver<ThreadMessage>,
}

impl ReadingSink for DisplayFeed {
    fn accept(&mut self, reading: Reading) -> std::io::Result<()> {
        if let Ok(ThreadMessage::Stop) = self.stop_rx.try_recv() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Interrupted,
                "display closed",
            ));
        }
        self.tx
            .send(WorkerUpdate::Reading(reading))
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "display gone"))
    }
}

/// Length of the bar drawn for `distance`. Negative distances draw nothing,
/// and bars never exceed `display.max`.
fn scaled(distance: i32, display: &DisplaySettings) -> u64 {
    let scale = display.scale.max(1);
    (u64::try_from(distance).unwrap_or(0) / scale).min(display.max)
}

struct App {
    display: DisplaySettings,
    latest: Reading,
    received: usize,
    link_lost: Option<String>,
}

impl App {
    fn new(display: DisplaySettings) -> App {
        App {
            display,
            latest: Reading::default(),
            received: 0,
            link_lost: None,
        }
    }

    fn on_update(&mut self, update: WorkerUpdate) {
        match update {
            WorkerUpdate::Reading(reading) => {
                self.latest = reading;
                self.received += 1;
            }
            WorkerUpdate::LinkLost(why) => self.link_lost = Some(why),
        }
    }

    fn bars(&self) -> Vec<Bar<'static>> {
        self.latest
            .samples
            .iter()
            .map(|s| {
                Bar::default()
                    .label(format!("ch{}", s.channel).into())
                    .value(scaled(s.distance, &self.display))
                    .text_value(s.distance.to_string())
            })
            .collect()
    }

    fn status_line(&self) -> Line<'static> {
        match &self.link_lost {
            Some(why) => Line::from(vec![
                " Link lost: ".red().bold(),
                why.clone().into(),
                " Press any key to quit ".into(),
            ]),
            None => Line::from(vec![
                format!(" {} readings ", self.received).into(),
                " Press any key to stop ".cyan().bold(),
            ]),
        }
    }
}

/// Polls `session` on its own thread and draws each reading as a bar per
/// channel until the user presses a key. Returns the number of readings
/// drawn.
pub fn bar_graph<C>(
    mut session: SonarSession<C>,
    display: DisplaySettings,
) -> Result<usize, SonarGuiError>
where
    C: ByteChannel + Send + 'static,
{
    let (stop_tx, stop_rx) = mpsc::channel();
    let (update_tx, update_rx) = mpsc::channel();

    let th = spawn(move || {
        let mut feed = DisplayFeed {
            tx: update_tx,
            stop_rx,
        };
        let res = pump(&mut session, &mut feed, None);
        if let Err(PumpError::Sonar(e)) = &res {
            let _ = feed.tx.send(WorkerUpdate::LinkLost(e.to_string()));
        }
        res
    });

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut app = App::new(display);
    let res = run_app(&mut terminal, &mut app, &update_rx);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    res?;

    // the worker only sees the stop request between sweeps
    let _ = stop_tx.send(ThreadMessage::Stop);
    let started = Instant::now();
    while !th.is_finished() && started.elapsed() < WORKER_GRACE {
        thread::sleep(Duration::from_millis(10));
    }
    if !th.is_finished() {
        warn!("Sonar worker is still blocked on the controller, leaving it behind");
        return Ok(app.received);
    }

    match th.join().map_err(|_| SonarGuiError::JoinError)? {
        Ok(_) => {}
        Err(PumpError::Sink(e)) if e.kind() == std::io::ErrorKind::Interrupted => {}
        Err(e) => return Err(e.into()),
    }

    Ok(app.received)
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    updates: &Receiver<WorkerUpdate>,
) -> Result<(), SonarGuiError> {
    loop {
        for update in updates.try_iter() {
            app.on_update(update);
        }

        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(16))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(());
                }
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(f.size());

    let bars = app.bars();
    let chart = BarChart::default()
        .block(
            Block::default()
                .title(Title::from(" Sonar Readings ".cyan().bold()).alignment(Alignment::Center))
                .borders(Borders::ALL),
        )
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::White))
        .value_style(Style::default().fg(Color::Black).bg(Color::White))
        .data(BarGroup::default().bars(&bars))
        .max(app.display.max);

    let status = Paragraph::new(app.status_line()).block(Block::default().borders(Borders::ALL));

    f.render_widget(chart, chunks[0]);
    f.render_widget(status, chunks[1]);
}
