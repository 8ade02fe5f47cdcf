//! Recorded pointer gestures, replayed against a board surface by hosts
//! that have no windowing toolkit (CLI, tests).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Kanban,
    Cra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GestureStep {
    /// `item` is a task id on the Kanban board, a time-entry id on the CRA
    /// calendar.
    PointerDown {
        item: i64,
        x: f64,
        y: f64,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp {
        x: f64,
        y: f64,
    },
    /// `target` is a task status (`en_cours`) or an ISO day (`2024-03-14`).
    DragOver {
        target: String,
    },
    DragLeave {
        target: String,
    },
    Drop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureScript {
    pub surface: Surface,
    /// Displayed month for CRA scripts, `YYYY-MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    pub steps: Vec<GestureStep>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;

    #[test]
    fn parses_kanban_script() {
        let raw = r#"{
            "surface": "kanban",
            "steps": [
                { "type": "pointer_down", "payload": { "item": 5, "x": 100.0, "y": 100.0 } },
                { "type": "pointer_move", "payload": { "x": 100.0, "y": 130.0 } },
                { "type": "drop", "payload": { "target": "en_cours" } }
            ]
        }"#;
        let script: GestureScript = serde_json::from_str(raw).expect("script");
        assert_eq!(script.surface, Surface::Kanban);
        assert_eq!(script.month, None);
        assert_eq!(script.steps.len(), 3);
        assert_eq!(
            script.steps[2],
            GestureStep::Drop {
                target: Some("en_cours".into())
            }
        );
    }

    #[test]
    fn task_status_accepts_every_spelling() {
        for raw in ["en_cours", "En cours", "EnCours", "encours"] {
            assert_eq!(raw.parse::<TaskStatus>().expect(raw), TaskStatus::EnCours);
        }
        assert_eq!("Terminé".parse::<TaskStatus>().expect("label"), TaskStatus::Termine);
        assert_eq!("À faire".parse::<TaskStatus>().expect("label"), TaskStatus::AFaire);
        assert!("archived".parse::<TaskStatus>().is_err());
    }
}
