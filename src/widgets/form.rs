use chi_form::{FieldDescriptor, FieldKind, FieldView, FormController, RangePart, Value};
use ratatui::prelude::*;
use ratatui::widgets::*;

/// Text being typed into the selected control, committed on Enter.
#[derive(Clone, Debug, PartialEq)]
pub struct EditBuffer {
    pub field: String,
    pub part: Option<RangePart>,
    pub text: String,
}

pub struct FormState {
    pub title: String,
    pub controller: FormController,
    pub selected: usize,
    pub editing: Option<EditBuffer>,
    pub message: Option<String>,
}

pub enum Row<'a> {
    Field(FieldView<'a>),
    Submit,
    Reset,
}

impl FormState {
    pub fn new(title: impl Into<String>, controller: FormController) -> Self {
        Self {
            title: title.into(),
            controller,
            selected: 0,
            editing: None,
            message: None,
        }
    }

    /// Visible fields followed by the Submit and Reset buttons.
    pub fn rows(&self) -> Vec<Row<'_>> {
        let mut rows: Vec<Row> = self
            .controller
            .field_views()
            .into_iter()
            .map(Row::Field)
            .collect();
        rows.push(Row::Submit);
        rows.push(Row::Reset);
        rows
    }

    pub fn row_count(&self) -> usize {
        self.controller.field_views().len() + 2
    }

    /// Keep the cursor on a real row after visibility changes.
    pub fn clamp_selection(&mut self) {
        let n = self.row_count();
        if self.selected >= n {
            self.selected = n - 1;
        }
    }

    pub fn selected_field(&self) -> Option<&FieldDescriptor> {
        match self.rows().into_iter().nth(self.selected) {
            Some(Row::Field(v)) => Some(v.field),
            _ => None,
        }
    }

    pub fn on_submit_row(&self) -> bool {
        self.selected + 2 == self.row_count()
    }

    pub fn on_reset_row(&self) -> bool {
        self.selected + 1 == self.row_count()
    }
}

/// Text shown for a scalar value; select fields show the option label, or a
/// placeholder when nothing is chosen.
pub fn display_value(field: &FieldDescriptor, value: &Value) -> String {
    match (&field.kind, value) {
        (FieldKind::Select { .. }, v) if !v.is_present() => format!("Select {}...", field.label),
        (FieldKind::Select { .. }, v) => {
            let raw = v.to_string();
            field
                .option_label(&raw)
                .map(str::to_string)
                .unwrap_or(raw)
        }
        (_, v) => v.to_string(),
    }
}

fn part_text(value: &Value, part: RangePart) -> String {
    value
        .as_range()
        .and_then(|r| r.part(part))
        .unwrap_or("")
        .to_string()
}

fn button_line(sel: char, label: &'static str, is_sel: bool) -> Line<'static> {
    let style = if is_sel {
        crate::theme::list_cursor_style()
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(format!("{sel} ")),
        Span::styled(label, style),
    ])
}

fn form_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused {
        crate::theme::border_focused()
    } else {
        crate::theme::border_unfocused()
    };
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border)
}

pub fn draw_form(f: &mut Frame, area: Rect, form: &FormState, highlight: bool, cursor_on: bool) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, row) in form.rows().into_iter().enumerate() {
        let is_sel = i == form.selected;
        let sel = if is_sel { '›' } else { ' ' };
        match row {
            Row::Field(view) => {
                let fld = view.field;
                let editing = form
                    .editing
                    .as_ref()
                    .filter(|e| is_sel && e.field == fld.name);
                let value_style = if is_sel {
                    if editing.is_some() {
                        crate::theme::text_editing_bold()
                    } else {
                        crate::theme::text_active_bold()
                    }
                } else {
                    Style::default()
                };
                let mut head = vec![Span::raw(format!("{sel} {}", fld.label))];
                if view.required {
                    head.push(Span::styled(" *", crate::theme::required_marker()));
                }
                head.push(Span::raw(":"));
                match &fld.kind {
                    FieldKind::Range => {
                        lines.push(Line::from(head));
                        for part in [RangePart::Start, RangePart::End] {
                            let mut val = part_text(view.value, part);
                            let mut style = Style::default();
                            if let Some(e) = editing.filter(|e| e.part == Some(part)) {
                                val = e.text.clone();
                                if cursor_on {
                                    val.push('▏');
                                }
                                style = value_style;
                            }
                            let name = match part {
                                RangePart::Start => "Start Date",
                                RangePart::End => "End Date",
                            };
                            let mut spans =
                                vec![Span::raw(format!("    {name}: ")), Span::styled(val, style)];
                            if part == RangePart::End {
                                let start = part_text(view.value, RangePart::Start);
                                if !start.is_empty() {
                                    spans.push(Span::styled(
                                        format!("  (≥ {start})"),
                                        crate::theme::text_muted(),
                                    ));
                                }
                            }
                            lines.push(Line::from(spans));
                        }
                    }
                    FieldKind::Select { options } => {
                        let val = display_value(fld, view.value);
                        let val_style = if view.value.is_present() {
                            value_style
                        } else {
                            crate::theme::text_muted()
                        };
                        head.push(Span::raw(" "));
                        head.push(Span::styled(format!("‹ {val} ›"), val_style));
                        if is_sel && options.len() > 1 {
                            head.push(Span::styled(
                                format!("  ({} options)", options.len()),
                                crate::theme::text_muted(),
                            ));
                        }
                        lines.push(Line::from(head));
                    }
                    FieldKind::Text | FieldKind::Number { .. } => {
                        let mut val = match editing {
                            Some(e) => e.text.clone(),
                            None => display_value(fld, view.value),
                        };
                        if editing.is_some() && cursor_on {
                            val.push('▏');
                        }
                        head.push(Span::raw(" "));
                        head.push(Span::styled(val, value_style));
                        lines.push(Line::from(head));
                    }
                }
                if let Some(err) = view.error {
                    lines.push(Line::from(Span::styled(
                        format!("    {err}"),
                        crate::theme::text_error(),
                    )));
                }
            }
            Row::Submit => lines.push(button_line(sel, "[ Submit ]", is_sel)),
            Row::Reset => lines.push(button_line(sel, "[ Reset ]", is_sel)),
        }
    }
    if let Some(msg) = &form.message {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            msg.clone(),
            crate::theme::text_muted(),
        )));
    }
    let title = if form.controller.is_dirty() {
        format!("{} (modified)", form.title)
    } else {
        form.title.clone()
    };
    let p = Paragraph::new(lines)
        .block(form_block(&title, highlight))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chi_form::{FieldInput, Schema, SelectOption};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn state() -> FormState {
        let schema = Schema::new(vec![
            FieldDescriptor::text("name", "Name").required(true),
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
        FormState::new("Travel", FormController::new(schema, &Default::default()))
    }

    fn render(form: &FormState) -> String {
        let backend = TestBackend::new(60, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| draw_form(f, f.area(), form, true, false))
            .unwrap();
        let buf = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn rows_end_with_buttons() {
        let form = state();
        assert_eq!(form.row_count(), 5);
        assert!(form.selected_field().is_some());
        let mut form = form;
        form.selected = 3;
        assert!(form.on_submit_row());
        form.selected = 4;
        assert!(form.on_reset_row());
        assert!(form.selected_field().is_none());
    }

    #[test]
    fn select_shows_placeholder_then_label() {
        let mut form = state();
        let country = form.controller.schema().field("country").unwrap().clone();
        assert_eq!(
            display_value(&country, form.controller.value("country")),
            "Select Country..."
        );
        form.controller
            .edit("country", FieldInput::raw("ca"))
            .unwrap();
        assert_eq!(
            display_value(&country, form.controller.value("country")),
            "Canada"
        );
    }

    #[test]
    fn draws_required_marker_and_errors() {
        let mut form = state();
        form.controller.submit();
        let screen = render(&form);
        assert!(screen.contains("Name *:"));
        assert!(screen.contains("Name is required."));
        assert!(screen.contains("Start Date:"));
        assert!(screen.contains("[ Submit ]"));
    }

    #[test]
    fn end_date_shows_start_as_lower_bound() {
        let mut form = state();
        form.controller
            .edit("trip", FieldInput::start("2024-05-15"))
            .unwrap();
        let screen = render(&form);
        assert!(screen.contains("(≥ 2024-05-15)"));
    }
}
