use crate::widgets::form_widget::FormWidget;
use crate::widgets::Widget;
use chi_form::services::loader::ScriptAction;
use chi_form::OutputRecord;
use crossterm::event::KeyEvent;

pub enum AppMsg {
    Key(KeyEvent),
    Script(ScriptAction),
    Submitted(OutputRecord),
    Tick,
}

#[derive(Debug)]
pub enum Effect {
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

pub struct AppState {
    pub form: FormWidget,
    pub toast: Option<Toast>,
    pub tick: u64,
    pub output: Option<OutputRecord>,
    pub should_quit: bool,
    pub last_error: Option<String>,
}

impl AppState {
    pub fn new(form: FormWidget) -> Self {
        Self {
            form,
            toast: None,
            tick: 0,
            output: None,
            should_quit: false,
            last_error: None,
        }
    }
}

/// Ticks per second at the 200ms loop rate.
pub const TICKS_PER_SEC: u64 = 5;

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    match msg {
        Key(key) => state.form.on_key(key),
        Script(ScriptAction::Edit { field, input }) => state.form.apply(&field, input),
        Script(ScriptAction::Submit) => state.form.submit(),
        Submitted(rec) => {
            state.output = Some(rec);
            vec![Effect::Quit]
        }
        Tick => {
            state.tick = state.tick.wrapping_add(1);
            if let Some(t) = &state.toast {
                if state.tick >= t.expires_at_tick {
                    state.toast = None;
                }
            }
            Vec::new()
        }
    }
}

/// Apply side effects that only touch app state.
pub fn apply_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                if level == ToastLevel::Error {
                    state.last_error = Some(text.clone());
                }
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: state.tick + seconds * TICKS_PER_SEC,
                });
            }
            Effect::Quit => state.should_quit = true,
        }
    }
}

#[cfg(test)]
mod tests;
