//! Reminder board: in-memory reminder list with monotonically increasing ids.
//! Lost on restart.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

fn default_category() -> String {
    "custom".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct Reminder {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// Client-supplied due time, stored as given.
    pub datetime: String,
    pub category: String,
    pub completed: bool,
    pub created_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Local>>,
}

/// POST body. `title` and `datetime` are required and must be non-empty.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReminder {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
}

/// PUT body. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReminderUpdate {
    pub completed: Option<bool>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub datetime: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug)]
struct BoardState {
    next_id: u64,
    items: Vec<Reminder>,
}

#[derive(Debug)]
pub struct ReminderBoard {
    state: RwLock<BoardState>,
}

impl Default for ReminderBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ReminderBoard {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BoardState {
                next_id: 1,
                items: Vec::new(),
            }),
        }
    }

    /// Reminders in insertion order.
    pub async fn list(&self) -> Vec<Reminder> {
        self.state.read().await.items.clone()
    }

    /// Add a reminder. `None` when title or datetime is missing or empty.
    pub async fn create(&self, req: NewReminder) -> Option<Reminder> {
        let title = req.title.filter(|t| !t.is_empty())?;
        let datetime = req.datetime.filter(|d| !d.is_empty())?;
        let mut state = self.state.write().await;
        let reminder = Reminder {
            id: state.next_id,
            title,
            description: req.description,
            datetime,
            category: req.category,
            completed: false,
            created_at: Local::now(),
            completed_at: None,
        };
        state.next_id += 1;
        state.items.push(reminder.clone());
        Some(reminder)
    }

    /// Apply a partial update. Completing stamps `completed_at`; un-completing clears it.
    pub async fn update(&self, id: u64, update: ReminderUpdate) -> Option<Reminder> {
        let mut state = self.state.write().await;
        let reminder = state.items.iter_mut().find(|r| r.id == id)?;
        if let Some(completed) = update.completed {
            reminder.completed = completed;
            reminder.completed_at = completed.then(Local::now);
        }
        if let Some(title) = update.title {
            reminder.title = title;
        }
        if let Some(description) = update.description {
            reminder.description = description;
        }
        if let Some(datetime) = update.datetime {
            reminder.datetime = datetime;
        }
        if let Some(category) = update.category {
            reminder.category = category;
        }
        Some(reminder.clone())
    }

    /// Remove by id. `false` when unknown.
    pub async fn delete(&self, id: u64) -> bool {
        let mut state = self.state.write().await;
        let before = state.items.len();
        state.items.retain(|r| r.id != id);
        state.items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_reminder(title: &str) -> NewReminder {
        NewReminder {
            title: Some(title.to_string()),
            datetime: Some("2026-10-17T09:00".to_string()),
            description: String::new(),
            category: default_category(),
        }
    }

    #[tokio::test]
    async fn ids_increase_and_survive_deletes() {
        let board = ReminderBoard::new();
        let a = board.create(new_reminder("Drink water")).await.unwrap();
        let b = board.create(new_reminder("Stretch")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert!(board.delete(b.id).await);
        let c = board.create(new_reminder("Meditate")).await.unwrap();
        assert_eq!(c.id, 3);
        assert_eq!(board.list().await.len(), 2);
        assert!(!board.delete(42).await);
    }

    #[tokio::test]
    async fn missing_title_or_datetime_is_rejected() {
        let board = ReminderBoard::new();
        let mut req = new_reminder("");
        assert!(board.create(req.clone()).await.is_none());
        req.title = Some("Walk".into());
        req.datetime = None;
        assert!(board.create(req).await.is_none());
        assert!(board.list().await.is_empty());
    }

    #[tokio::test]
    async fn completion_stamps_and_clears() {
        let board = ReminderBoard::new();
        let r = board.create(new_reminder("Journal")).await.unwrap();
        assert_eq!(r.category, "custom");

        let done = board
            .update(r.id, ReminderUpdate { completed: Some(true), ..Default::default() })
            .await
            .unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());

        let undone = board
            .update(
                r.id,
                ReminderUpdate {
                    completed: Some(false),
                    title: Some("Journal tonight".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!undone.completed);
        assert!(undone.completed_at.is_none());
        assert_eq!(undone.title, "Journal tonight");

        assert!(board.update(99, ReminderUpdate::default()).await.is_none());
    }
}
