use crate::model::config::Settings;
use crate::model::document::Documents;
use crate::model::project::Project;
use crate::model::user::User;
use crate::ops::aggregate::{AllProjects, aggregate};
use crate::ops::reducer::{Op, OpContext, apply};
use crate::ops::user_ops::{self, UserError};
use crate::parse::project_parser::parse_document;

const UNDO_STACK_LIMIT: usize = 500;

/// Error type for session operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error(transparent)]
    User(#[from] UserError),
}

/// Everything an undo step restores
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    users: Vec<User>,
    docs: Documents,
}

/// The open plan: users, the live and archive documents, and UI settings.
///
/// Every change replaces the documents wholesale through [`apply`] and
/// bumps `version`. The parsed model is never stored; ask for it with
/// [`Session::projects`].
#[derive(Debug, Clone)]
pub struct Session {
    users: Vec<User>,
    docs: Documents,
    settings: Settings,
    version: u64,
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
}

impl Session {
    pub fn new(users: Vec<User>, docs: Documents, settings: Settings) -> Self {
        Session {
            users,
            docs,
            settings,
            version: 0,
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn documents(&self) -> &Documents {
        &self.docs
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Bumped on every change, including undo and redo
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Parse the live document
    pub fn projects(&self) -> Vec<Project> {
        parse_document(&self.docs.live, &self.users)
    }

    /// Parse the archive document
    pub fn archived_projects(&self) -> Vec<Project> {
        parse_document(&self.docs.archive, &self.users)
    }

    /// The cross-project view of the live document
    pub fn all_projects(&self) -> AllProjects {
        aggregate(&self.projects(), &self.users)
    }

    /// Apply an operation. Returns whether anything changed; a no-op leaves
    /// the history and version alone.
    pub fn apply(&mut self, op: &Op, ctx: &OpContext) -> bool {
        let docs = apply(&self.docs, op, ctx);
        let changed = self.commit(self.users.clone(), docs);
        if changed {
            tracing::debug!(op = op.name(), version = self.version, "applied");
        }
        changed
    }

    pub fn add_user(&mut self, user: User) -> Result<(), SessionError> {
        let users = user_ops::add_user(&self.users, user)?;
        self.commit(users, self.docs.clone());
        Ok(())
    }

    pub fn rename_user(&mut self, old: &str, new: &str) -> Result<(), SessionError> {
        let (users, docs) = user_ops::rename_user(&self.users, &self.docs, old, new)?;
        self.commit(users, docs);
        Ok(())
    }

    pub fn delete_user(&mut self, alias: &str) -> Result<(), SessionError> {
        let (users, docs) = user_ops::delete_user(&self.users, &self.docs, alias)?;
        self.commit(users, docs);
        Ok(())
    }

    pub fn undo(&mut self) -> Result<(), SessionError> {
        let snapshot = self.undo.pop().ok_or(SessionError::NothingToUndo)?;
        let current = self.swap_in(snapshot);
        self.redo.push(current);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), SessionError> {
        let snapshot = self.redo.pop().ok_or(SessionError::NothingToRedo)?;
        let current = self.swap_in(snapshot);
        self.undo.push(current);
        Ok(())
    }

    /// Replace the state with `snapshot`, returning what was there
    fn swap_in(&mut self, snapshot: Snapshot) -> Snapshot {
        let current = Snapshot {
            users: std::mem::replace(&mut self.users, snapshot.users),
            docs: std::mem::replace(&mut self.docs, snapshot.docs),
        };
        self.version += 1;
        current
    }

    fn commit(&mut self, users: Vec<User>, docs: Documents) -> bool {
        if users == self.users && docs == self.docs {
            return false;
        }
        let previous = Snapshot {
            users: std::mem::replace(&mut self.users, users),
            docs: std::mem::replace(&mut self.docs, docs),
        };
        self.undo.push(previous);
        if self.undo.len() > UNDO_STACK_LIMIT {
            self.undo.drain(..self.undo.len() - UNDO_STACK_LIMIT);
        }
        self.redo.clear();
        self.version += 1;
        true
    }
}
