use crate::app::{Effect, ToastLevel};
use crate::widgets::form::{draw_form, EditBuffer, FormState};
use chi_form::{FieldInput, FieldKind, RangePart, SubmitOutcome, Value};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;

pub struct FormWidget {
    pub form: FormState,
}

impl FormWidget {
    pub fn new(form: FormState) -> Self {
        Self { form }
    }

    pub fn is_editing(&self) -> bool {
        self.form.editing.is_some()
    }

    /// Run the controller's submit and turn the outcome into a toast.
    pub fn submit(&mut self) -> Vec<Effect> {
        self.form.editing = None;
        let outcome = self.form.controller.submit();
        self.form.clamp_selection();
        match outcome {
            SubmitOutcome::Submitted(_) => {
                self.form.message = None;
                vec![Effect::ShowToast {
                    text: "Submitted".into(),
                    level: ToastLevel::Success,
                    seconds: 2,
                }]
            }
            SubmitOutcome::Rejected { errors } => {
                self.form.message = Some("Please fix the highlighted errors".into());
                vec![Effect::ShowToast {
                    text: format!(
                        "{errors} field{} need attention",
                        if errors == 1 { "" } else { "s" }
                    ),
                    level: ToastLevel::Error,
                    seconds: 3,
                }]
            }
        }
    }

    /// Apply an edit through the controller, reporting contract violations
    /// as a toast.
    pub fn apply(&mut self, field: &str, input: FieldInput) -> Vec<Effect> {
        let res = self.form.controller.edit(field, input);
        self.form.clamp_selection();
        match res {
            Ok(()) => Vec::new(),
            Err(e) => vec![Effect::ShowToast {
                text: e.to_string(),
                level: ToastLevel::Error,
                seconds: 3,
            }],
        }
    }

    fn begin_edit(&mut self) {
        let Some(fld) = self.form.selected_field() else {
            return;
        };
        let value = self.form.controller.value(&fld.name);
        let (part, text) = match &fld.kind {
            FieldKind::Range => (
                Some(RangePart::Start),
                value
                    .as_range()
                    .and_then(|r| r.start())
                    .unwrap_or("")
                    .to_string(),
            ),
            FieldKind::Text | FieldKind::Number { .. } => (None, value.to_string()),
            FieldKind::Select { .. } => return,
        };
        self.form.editing = Some(EditBuffer {
            field: fld.name.clone(),
            part,
            text,
        });
        self.form.message = None;
    }

    fn commit_edit(&mut self) -> Vec<Effect> {
        let Some(buf) = self.form.editing.take() else {
            return Vec::new();
        };
        let input = match buf.part {
            Some(part) => FieldInput::Part(part, buf.text),
            None => FieldInput::Raw(buf.text),
        };
        self.apply(&buf.field, input)
    }

    /// Commit the current range end and move the buffer to the other one.
    fn switch_range_part(&mut self) -> Vec<Effect> {
        let Some(buf) = self.form.editing.clone() else {
            return Vec::new();
        };
        let Some(part) = buf.part else {
            return Vec::new();
        };
        let effects = self.commit_edit();
        let other = match part {
            RangePart::Start => RangePart::End,
            RangePart::End => RangePart::Start,
        };
        let text = self
            .form
            .controller
            .value(&buf.field)
            .as_range()
            .and_then(|r| r.part(other))
            .unwrap_or("")
            .to_string();
        self.form.editing = Some(EditBuffer {
            field: buf.field,
            part: Some(other),
            text,
        });
        effects
    }

    fn cycle_option(&mut self, dir: i32) -> Vec<Effect> {
        let Some(fld) = self.form.selected_field() else {
            return Vec::new();
        };
        let FieldKind::Select { options } = &fld.kind else {
            return Vec::new();
        };
        if options.is_empty() {
            return Vec::new();
        }
        let cur = self.form.controller.value(&fld.name).to_string();
        let n = options.len() as i32;
        let next = match options.iter().position(|o| o.value.to_string() == cur) {
            Some(i) => (i as i32 + dir).rem_euclid(n),
            None if dir >= 0 => 0,
            None => n - 1,
        };
        let name = fld.name.clone();
        let raw = options[next as usize].value.to_string();
        self.apply(&name, FieldInput::Raw(raw))
    }

    fn step_number(&mut self, dir: i32) {
        let Some(fld) = self.form.selected_field() else {
            return;
        };
        let FieldKind::Number { min, max, step } = fld.kind else {
            return;
        };
        if let Some(buf) = self.form.editing.as_mut() {
            buf.text = step_number_value(&buf.text, dir, min, max, step);
        }
    }

    fn on_key_editing(&mut self, key: KeyEvent) -> Vec<Effect> {
        let is_range = self
            .form
            .editing
            .as_ref()
            .map(|b| b.part.is_some())
            .unwrap_or(false);
        match key.code {
            KeyCode::Esc => {
                self.form.editing = None;
                Vec::new()
            }
            KeyCode::Enter => {
                let at_start = self
                    .form
                    .editing
                    .as_ref()
                    .map(|b| b.part == Some(RangePart::Start))
                    .unwrap_or(false);
                if at_start {
                    self.switch_range_part()
                } else {
                    self.commit_edit()
                }
            }
            KeyCode::Tab if is_range => self.switch_range_part(),
            KeyCode::Up if !is_range => {
                self.step_number(1);
                Vec::new()
            }
            KeyCode::Down if !is_range => {
                self.step_number(-1);
                Vec::new()
            }
            KeyCode::Backspace => {
                if let Some(buf) = self.form.editing.as_mut() {
                    buf.text.pop();
                }
                Vec::new()
            }
            KeyCode::Char(c) => {
                if let Some(buf) = self.form.editing.as_mut() {
                    buf.text.push(c);
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}

impl crate::widgets::Widget for FormWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        let cursor_on = tick % 2 == 0;
        draw_form(f, area, &self.form, focused, cursor_on);
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            return self.submit();
        }
        if self.is_editing() {
            return self.on_key_editing(key);
        }
        match key.code {
            KeyCode::Up => {
                self.form.selected = self.form.selected.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Tab => {
                if self.form.selected + 1 < self.form.row_count() {
                    self.form.selected += 1;
                }
                Vec::new()
            }
            KeyCode::Left => self.cycle_option(-1),
            KeyCode::Right => self.cycle_option(1),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if self.form.on_submit_row() {
                    return self.submit();
                }
                if self.form.on_reset_row() {
                    self.form.controller.reset();
                    self.form.clamp_selection();
                    self.form.message = None;
                    return vec![Effect::ShowToast {
                        text: "Reset to defaults".into(),
                        level: ToastLevel::Info,
                        seconds: 2,
                    }];
                }
                let is_select = matches!(
                    self.form.selected_field().map(|f| &f.kind),
                    Some(FieldKind::Select { .. })
                );
                if is_select {
                    return self.cycle_option(1);
                }
                self.begin_edit();
                Vec::new()
            }
            KeyCode::Delete => {
                let Some(fld) = self.form.selected_field() else {
                    return Vec::new();
                };
                let name = fld.name.clone();
                let input = match fld.kind {
                    FieldKind::Range => FieldInput::Set(Value::Range(Default::default())),
                    _ => FieldInput::Set(Value::Unset),
                };
                self.apply(&name, input)
            }
            KeyCode::Esc | KeyCode::Char('q') => vec![Effect::Quit],
            _ => Vec::new(),
        }
    }
}

/// Step a number buffer by `step` (default 1), clamped to the bounds.
fn step_number_value(
    raw: &str,
    dir: i32,
    min: Option<f64>,
    max: Option<f64>,
    step: Option<f64>,
) -> String {
    let mut cur = raw.trim().parse::<f64>().unwrap_or(0.0);
    let step = step.filter(|s| *s > 0.0).unwrap_or(1.0);
    cur += step * (if dir >= 0 { 1.0 } else { -1.0 });
    if let Some(lo) = min {
        if cur < lo {
            cur = lo;
        }
    }
    if let Some(hi) = max {
        if cur > hi {
            cur = hi;
        }
    }
    trim_float(cur)
}

fn trim_float(v: f64) -> String {
    let mut s = format!("{v:.6}");
    while s.contains('.') && s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s.is_empty() {
        s.push('0');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::Widget;
    use chi_form::{FieldDescriptor, FormController, Schema, SelectOption};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(w: &mut FormWidget, s: &str) {
        for c in s.chars() {
            w.on_key(key(KeyCode::Char(c)));
        }
    }

    fn widget() -> FormWidget {
        let schema = Schema::new(vec![
            FieldDescriptor::text("name", "Name").required(true),
            FieldDescriptor::number("age", "Age")
                .bounds(Some(18.0), Some(30.0))
                .step(2.0),
            FieldDescriptor::select(
                "country",
                "Country",
                vec![
                    SelectOption::new("us", "United States"),
                    SelectOption::new("ca", "Canada"),
                ],
            ),
            FieldDescriptor::range("trip", "Trip"),
        ])
        .unwrap();
        FormWidget::new(FormState::new(
            "Form",
            FormController::new(schema, &Default::default()),
        ))
    }

    #[test]
    fn typing_commits_on_enter() {
        let mut w = widget();
        w.on_key(key(KeyCode::Enter));
        assert!(w.is_editing());
        type_str(&mut w, "Ada");
        w.on_key(key(KeyCode::Enter));
        assert!(!w.is_editing());
        assert_eq!(w.form.controller.value("name"), &Value::text("Ada"));
    }

    #[test]
    fn esc_cancels_without_edit() {
        let mut w = widget();
        w.on_key(key(KeyCode::Enter));
        type_str(&mut w, "x");
        w.on_key(key(KeyCode::Esc));
        assert!(!w.is_editing());
        assert_eq!(w.form.controller.value("name"), &Value::Unset);
    }

    #[test]
    fn number_steps_and_clamps() {
        let mut w = widget();
        w.on_key(key(KeyCode::Down));
        w.on_key(key(KeyCode::Enter));
        w.on_key(key(KeyCode::Up));
        assert_eq!(w.form.editing.as_ref().unwrap().text, "18");
        w.on_key(key(KeyCode::Up));
        assert_eq!(w.form.editing.as_ref().unwrap().text, "20");
        w.on_key(key(KeyCode::Enter));
        assert_eq!(w.form.controller.value("age"), &Value::Number(20.0));
    }

    #[test]
    fn select_cycles_with_arrows() {
        let mut w = widget();
        w.form.selected = 2;
        w.on_key(key(KeyCode::Right));
        assert_eq!(w.form.controller.value("country"), &Value::text("us"));
        w.on_key(key(KeyCode::Right));
        assert_eq!(w.form.controller.value("country"), &Value::text("ca"));
        w.on_key(key(KeyCode::Right));
        assert_eq!(w.form.controller.value("country"), &Value::text("us"));
        w.on_key(key(KeyCode::Left));
        assert_eq!(w.form.controller.value("country"), &Value::text("ca"));
    }

    #[test]
    fn range_enter_moves_from_start_to_end() {
        let mut w = widget();
        w.form.selected = 3;
        w.on_key(key(KeyCode::Enter));
        type_str(&mut w, "2024-09-10");
        w.on_key(key(KeyCode::Enter));
        assert_eq!(
            w.form.editing.as_ref().and_then(|b| b.part),
            Some(RangePart::End)
        );
        type_str(&mut w, "2024-09-05");
        w.on_key(key(KeyCode::Enter));
        assert!(!w.is_editing());
        let r = w.form.controller.value("trip").as_range().cloned().unwrap();
        assert_eq!(r.start(), Some("2024-09-10"));
        assert_eq!(r.end(), Some("2024-09-05"));
    }

    #[test]
    fn ctrl_s_submits_and_reports_errors() {
        let mut w = widget();
        let effects = w.on_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(matches!(
            effects.as_slice(),
            [Effect::ShowToast {
                level: ToastLevel::Error,
                ..
            }]
        ));
        assert_eq!(w.form.controller.error("name"), Some("Name is required."));
        assert_eq!(
            w.form.message.as_deref(),
            Some("Please fix the highlighted errors")
        );
    }

    #[test]
    fn submit_row_submits_clean_form() {
        let mut w = widget();
        w.apply("name", FieldInput::raw("Ada"));
        w.form.selected = w.form.row_count() - 2;
        let effects = w.on_key(key(KeyCode::Enter));
        assert!(matches!(
            effects.as_slice(),
            [Effect::ShowToast {
                level: ToastLevel::Success,
                ..
            }]
        ));
    }

    #[test]
    fn reset_row_restores_and_reports() {
        let mut w = widget();
        w.apply("name", FieldInput::raw("Ada"));
        w.form.selected = w.form.row_count() - 1;
        let effects = w.on_key(key(KeyCode::Enter));
        assert!(matches!(
            effects.as_slice(),
            [Effect::ShowToast {
                level: ToastLevel::Info,
                ..
            }]
        ));
        assert_eq!(w.form.controller.value("name"), &Value::Unset);
        assert!(!w.form.controller.is_dirty());
    }

    #[test]
    fn trim_float_drops_trailing_zeros() {
        assert_eq!(trim_float(2.50), "2.5");
        assert_eq!(trim_float(3.0), "3");
        assert_eq!(step_number_value("", 1, None, None, None), "1");
        assert_eq!(step_number_value("0.5", -1, Some(0.0), None, Some(0.25)), "0.25");
    }
}
