use crate::domain::models::{Task, TaskDraft, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskState {
    pub items: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskIntent {
    Add(TaskDraft),
    Update { id: String, draft: TaskDraft },
    Toggle { id: String },
    Delete { id: String },
}

impl TaskIntent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "add_task",
            Self::Update { .. } => "update_task",
            Self::Toggle { .. } => "toggle_task",
            Self::Delete { .. } => "delete_task",
        }
    }
}

/// Ambient inputs a reducer step needs: the user's zone, the clock and the id for a new task.
#[derive(Debug, Clone)]
pub struct ReduceContext {
    pub time_zone: Tz,
    pub now: DateTime<Utc>,
    pub new_id: String,
}

impl ReduceContext {
    pub fn new(time_zone: Tz, now: DateTime<Utc>) -> Self {
        Self {
            time_zone,
            now,
            new_id: next_task_id(),
        }
    }
}

pub fn next_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Applies one intent. Unknown ids leave the state untouched.
pub fn reduce(
    mut state: TaskState,
    intent: TaskIntent,
    context: &ReduceContext,
) -> Result<TaskState, ValidationError> {
    match intent {
        TaskIntent::Add(draft) => {
            let task = Task::from_draft(
                context.new_id.clone(),
                &draft,
                context.now,
                context.time_zone,
            )?;
            state.items.push(task);
        }
        TaskIntent::Update { id, draft } => {
            if let Some(task) = state.items.iter_mut().find(|task| task.id == id) {
                draft.validate()?;
                task.apply_draft(&draft, context.time_zone);
            }
        }
        TaskIntent::Toggle { id } => {
            if let Some(task) = state.items.iter_mut().find(|task| task.id == id) {
                task.completed = !task.completed;
            }
        }
        TaskIntent::Delete { id } => {
            state.items.retain(|task| task.id != id);
        }
    }
    Ok(state)
}

impl TaskState {
    pub fn begin_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn finish_loading(&mut self, items: Vec<Task>) {
        self.items = items;
        self.loading = false;
    }

    /// The list is emptied; the message is kept for display.
    pub fn fail_loading(&mut self, message: impl Into<String>) {
        self.items.clear();
        self.loading = false;
        self.error = Some(message.into());
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.items.iter().find(|task| task.id == id)
    }

    pub fn tasks_for_date(&self, date: NaiveDate) -> Vec<&Task> {
        self.items
            .iter()
            .filter(|task| task.touches_date(date))
            .collect()
    }
}
