use std::time::Duration;

/// One user-facing shortcut of an application catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutEntry {
    pub name: String,
    pub action: EntryAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryAction {
    /// Lowercase `+`-joined combo, e.g. `ctrl+shift+p`.
    SingleCombo(String),
    /// Macro played back step by step.
    Sequence(Vec<Step>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    PressCombo(String),
    Sleep(Duration),
}

impl ShortcutEntry {
    pub fn combo(name: impl Into<String>, combo: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: EntryAction::SingleCombo(combo.into()),
        }
    }

    pub fn sequence(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            action: EntryAction::Sequence(steps),
        }
    }

    /// Short human description of the action, as shown next to the name.
    pub fn describe(&self) -> String {
        match &self.action {
            EntryAction::SingleCombo(combo) => combo.clone(),
            EntryAction::Sequence(steps) => steps
                .iter()
                .map(|step| match step {
                    Step::PressCombo(combo) => combo.clone(),
                    Step::Sleep(duration) => format!("{}ms", duration.as_millis()),
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
