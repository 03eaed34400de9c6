use crate::app::{apply_effects, update, AppMsg, AppState};
use crate::widgets::form::FormState;
use crate::widgets::form_widget::FormWidget;
use crate::widgets::status_bar::draw_status;
use crate::widgets::Widget;
use anyhow::{Context, Result};
use chi_form::logging::{init_logging, LogConfig};
use chi_form::services::loader::{load_script, load_spec, resolve_spec_path, ScriptAction};
use chi_form::{FormController, OutputRecord};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

fn ui(f: &mut Frame, state: &mut AppState) {
    let screen = f.area();
    let theme = crate::theme::Theme::default();
    f.render_widget(
        Block::default().style(Style::default().bg(theme.bg)),
        screen,
    );
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(screen);
    let tick = state.tick;
    state.form.render(f, rows[0], true, tick);
    draw_status(f, rows[1], state);
}

fn drain_submissions(state: &mut AppState, rx: &mpsc::Receiver<OutputRecord>) {
    while let Ok(rec) = rx.try_recv() {
        let effs = update(state, AppMsg::Submitted(rec));
        apply_effects(state, effs);
    }
}

pub fn run() -> Result<()> {
    let headless = env_flag("CHI_FORM_HEADLESS");
    init_logging(LogConfig {
        tui_mode: !headless,
    })?;

    let path = resolve_spec_path(std::env::args().nth(1))?;
    let spec = load_spec(&path)?;
    let (title, schema, initial) = spec
        .into_parts()
        .with_context(|| format!("invalid schema in {path:?}"))?;
    info!(path = %path.display(), fields = schema.len(), "loaded form schema");

    let (tx, rx) = mpsc::channel::<OutputRecord>();
    let controller = FormController::new(schema, &initial).on_submit(move |rec| {
        if tx.send(rec.clone()).is_err() {
            warn!("submission receiver dropped");
        }
    });
    let title = title.unwrap_or_else(|| "Form".to_string());
    let mut state = AppState::new(FormWidget::new(FormState::new(title, controller)));

    if headless {
        return run_headless(&mut state, &rx);
    }

    // Setup terminal (interactive)
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let res = event_loop(&mut terminal, &mut state, &rx);
    // Restore
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res?;

    if let Some(rec) = &state.output {
        println!("{}", serde_json::to_string_pretty(&rec.to_json())?);
    }
    Ok(())
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    state: &mut AppState,
    rx: &mpsc::Receiver<OutputRecord>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    while !state.should_quit {
        terminal.draw(|f| ui(f, state))?;
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let effs = update(state, AppMsg::Key(key));
                    apply_effects(state, effs);
                }
            }
        }
        drain_submissions(state, rx);
        if last_tick.elapsed() >= tick_rate {
            let effs = update(state, AppMsg::Tick);
            apply_effects(state, effs);
            last_tick = Instant::now();
        }
    }
    Ok(())
}

/// Replay `CHI_FORM_SCRIPT` against an off-screen terminal, one step per
/// tick, then print a JSON summary.
fn run_headless(state: &mut AppState, rx: &mpsc::Receiver<OutputRecord>) -> Result<()> {
    let mut script: VecDeque<ScriptAction> = match std::env::var("CHI_FORM_SCRIPT") {
        Ok(p) => load_script(&PathBuf::from(p))?.into(),
        Err(_) => VecDeque::new(),
    };
    let ticks: u64 = std::env::var("CHI_FORM_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(3)
        .max(script.len() as u64 + 1);
    let backend = ratatui::backend::TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend)?;
    for _ in 0..ticks {
        if let Some(action) = script.pop_front() {
            let effs = update(state, AppMsg::Script(action));
            apply_effects(state, effs);
        }
        terminal.draw(|f| ui(f, state))?;
        drain_submissions(state, rx);
        let effs = update(state, AppMsg::Tick);
        apply_effects(state, effs);
        if state.should_quit {
            break;
        }
    }
    let controller = &state.form.form.controller;
    let summary = serde_json::json!({
        "ok": state.last_error.is_none() || state.output.is_some(),
        "submitted": state.output.is_some(),
        "errors": controller.errors(),
        "output": state.output.as_ref().map(OutputRecord::to_json),
        "ticks": state.tick,
    });
    println!("{summary}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chi_form::{FieldDescriptor, Schema};
    use ratatui::backend::TestBackend;

    #[test]
    fn screen_shows_form_and_help() {
        let schema = Schema::new(vec![FieldDescriptor::text("name", "Name")]).unwrap();
        let ctl = FormController::new(schema, &Default::default());
        let mut st = AppState::new(FormWidget::new(FormState::new("Profile", ctl)));
        let mut terminal = Terminal::new(TestBackend::new(100, 10)).unwrap();
        terminal.draw(|f| ui(f, &mut st)).unwrap();
        let buf = terminal.backend().buffer().clone();
        let text: String = (0..buf.area.height)
            .flat_map(|y| (0..buf.area.width).map(move |x| (x, y)))
            .map(|p| buf[p].symbol().to_string())
            .collect();
        assert!(text.contains("Profile"));
        assert!(text.contains("Ctrl+S submit"));
    }
}
