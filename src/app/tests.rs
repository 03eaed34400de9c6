use super::*;
use crate::widgets::form::FormState;
use chi_form::services::loader::parse_script;
use chi_form::{FieldDescriptor, FieldInput, FormController, Schema, Value};
use crossterm::event::{KeyCode, KeyModifiers};
use std::sync::mpsc;

fn state_with_channel() -> (AppState, mpsc::Receiver<OutputRecord>) {
    let schema = Schema::new(vec![
        FieldDescriptor::text("name", "Name").required(true),
        FieldDescriptor::range("trip", "Trip"),
    ])
    .unwrap();
    let (tx, rx) = mpsc::channel();
    let ctl = FormController::new(schema, &Default::default()).on_submit(move |rec| {
        let _ = tx.send(rec.clone());
    });
    let st = AppState::new(FormWidget::new(FormState::new("T", ctl)));
    (st, rx)
}

fn pump(st: &mut AppState, msg: AppMsg) {
    let effs = update(st, msg);
    apply_effects(st, effs);
}

#[test]
fn rejected_submit_shows_error_toast() {
    let (mut st, rx) = state_with_channel();
    pump(
        &mut st,
        AppMsg::Key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)),
    );
    let toast = st.toast.as_ref().expect("toast");
    assert_eq!(toast.level, ToastLevel::Error);
    assert!(st.last_error.is_some());
    assert!(!st.should_quit);
    assert!(rx.try_recv().is_err());
}

#[test]
fn scripted_run_submits_and_quits() {
    let (mut st, rx) = state_with_channel();
    let script = parse_script(
        r#"
- { edit: name, value: Ada }
- { edit: trip, start: "2024-05-01" }
- { submit: true }
"#,
    )
    .unwrap();
    for action in script {
        pump(&mut st, AppMsg::Script(action));
    }
    let rec = rx.try_recv().expect("record sent");
    assert_eq!(rec.get("name"), Some(&Value::text("Ada")));
    pump(&mut st, AppMsg::Submitted(rec));
    assert!(st.should_quit);
    assert!(st.output.is_some());
    assert_eq!(st.toast.as_ref().map(|t| t.level), Some(ToastLevel::Success));
}

#[test]
fn toast_expires_after_its_ticks() {
    let (mut st, _rx) = state_with_channel();
    apply_effects(
        &mut st,
        vec![Effect::ShowToast {
            text: "hi".into(),
            level: ToastLevel::Info,
            seconds: 1,
        }],
    );
    for _ in 0..TICKS_PER_SEC - 1 {
        pump(&mut st, AppMsg::Tick);
    }
    assert!(st.toast.is_some());
    pump(&mut st, AppMsg::Tick);
    assert!(st.toast.is_none());
}

#[test]
fn bad_script_edit_surfaces_as_error() {
    let (mut st, _rx) = state_with_channel();
    pump(
        &mut st,
        AppMsg::Script(ScriptAction::Edit {
            field: "missing".into(),
            input: FieldInput::raw("x"),
        }),
    );
    assert_eq!(st.last_error.as_deref(), Some("unknown field: 'missing'"));
}

#[test]
fn quit_key_stops_the_loop() {
    let (mut st, _rx) = state_with_channel();
    pump(
        &mut st,
        AppMsg::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)),
    );
    assert!(st.should_quit);
}
