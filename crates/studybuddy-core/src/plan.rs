//! Students and their ordered study topics.
//!
//! The planning flow hands the tracker one [`Student`] per kid, each with
//! exactly `num_sessions` [`StudySession`]s. During tracking only the
//! `completed` flags change.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::storage::Config;

/// Stable identity of a student (`kid-0`, `kid-1`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id assigned to the `index`-th student of a plan.
    pub fn for_index(index: usize) -> Self {
        Self(format!("kid-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StudentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StudentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: String,
    pub topic: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub sessions: Vec<StudySession>,
}

impl Student {
    /// Topic of the session at `index`, if the plan has one.
    pub fn topic(&self, index: usize) -> Option<&str> {
        self.sessions.get(index).map(|s| s.topic.as_str())
    }

    pub fn completed_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.completed).count()
    }

    /// Flag the session at `index` as completed.
    ///
    /// Returns `true` only the first time a session flips; completed
    /// sessions never revert.
    pub fn mark_completed(&mut self, index: usize) -> bool {
        match self.sessions.get_mut(index) {
            Some(session) if !session.completed => {
                session.completed = true;
                true
            }
            _ => false,
        }
    }
}

/// A student as written in a plan file: a name and one topic per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,
    pub topics: Vec<String>,
}

/// Every student's ordered topic list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub students: Vec<Student>,
}

impl SessionPlan {
    /// Blank plan shaped by the config, with ids filled in.
    pub fn skeleton(config: &Config) -> Self {
        let students = (0..config.num_kids as usize)
            .map(|i| Student {
                id: StudentId::for_index(i),
                name: String::new(),
                sessions: (0..config.num_sessions as usize)
                    .map(|j| StudySession {
                        id: format!("sess-{i}-{j}"),
                        topic: String::new(),
                        completed: false,
                    })
                    .collect(),
            })
            .collect();
        Self { students }
    }

    /// Build a plan from name/topic entries, assigning ids by position.
    pub fn from_entries(entries: impl IntoIterator<Item = PlanEntry>) -> Self {
        let students = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| Student {
                id: StudentId::for_index(i),
                name: entry.name.trim().to_string(),
                sessions: entry
                    .topics
                    .into_iter()
                    .enumerate()
                    .map(|(j, topic)| StudySession {
                        id: format!("sess-{i}-{j}"),
                        topic: topic.trim().to_string(),
                        completed: false,
                    })
                    .collect(),
            })
            .collect();
        Self { students }
    }

    /// Back to plain entries, e.g. for writing a template file.
    pub fn to_entries(&self) -> Vec<PlanEntry> {
        self.students
            .iter()
            .map(|s| PlanEntry {
                name: s.name.clone(),
                topics: s.sessions.iter().map(|t| t.topic.clone()).collect(),
            })
            .collect()
    }

    /// Check the plan is complete and matches the config's shape.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: wrong student or session counts,
    /// blank names or topics, or duplicate student ids.
    pub fn validate(&self, config: &Config) -> Result<(), ValidationError> {
        if self.students.is_empty() {
            return Err(ValidationError::EmptyCollection("students".into()));
        }
        if self.students.len() != config.num_kids as usize {
            return Err(ValidationError::CountMismatch {
                collection: "students".into(),
                expected: config.num_kids as usize,
                found: self.students.len(),
            });
        }

        let mut seen = HashSet::new();
        for (i, student) in self.students.iter().enumerate() {
            if !seen.insert(&student.id) {
                return Err(ValidationError::DuplicateId(student.id.to_string()));
            }
            if student.name.trim().is_empty() {
                return Err(ValidationError::BlankField {
                    field: format!("students[{i}].name"),
                });
            }
            if student.sessions.len() != config.num_sessions as usize {
                return Err(ValidationError::CountMismatch {
                    collection: format!("sessions for {}", student.name),
                    expected: config.num_sessions as usize,
                    found: student.sessions.len(),
                });
            }
            if let Some(j) = student
                .sessions
                .iter()
                .position(|s| s.topic.trim().is_empty())
            {
                return Err(ValidationError::BlankField {
                    field: format!("students[{i}].topics[{j}]"),
                });
            }
        }
        Ok(())
    }

    pub fn find(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id.as_str() == id)
    }

    /// Resolve a user-typed reference: an exact id, or a name (case-insensitive).
    pub fn resolve(&self, reference: &str) -> Option<&StudentId> {
        let reference = reference.trim();
        self.find(reference).map(|s| &s.id).or_else(|| {
            self.students
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(reference))
                .map(|s| &s.id)
        })
    }
}
