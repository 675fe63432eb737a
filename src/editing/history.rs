//! Undo/redo log of reversible edit actions.

use crate::error::Result;

const DEFAULT_MAX_ENTRIES: usize = 100;

/// A reversible edit over a context `C` (for the engine, the working set).
///
/// `undo` must restore exactly the state `execute` started from. An action
/// that executed successfully is expected never to fail in `undo` or in a
/// repeated `execute`.
pub trait EditAction<C: ?Sized>: Send {
    fn description(&self) -> &str;
    fn execute(&mut self, context: &mut C) -> Result<()>;
    fn undo(&mut self, context: &mut C) -> Result<()>;
}

/// Several actions run as one step: executed in order, undone in reverse.
pub struct CompositeAction<C: ?Sized> {
    description: String,
    actions: Vec<Box<dyn EditAction<C>>>,
}

impl<C: ?Sized> CompositeAction<C> {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            actions: Vec::new(),
        }
    }

    pub fn push(&mut self, action: Box<dyn EditAction<C>>) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<C: ?Sized> EditAction<C> for CompositeAction<C> {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, context: &mut C) -> Result<()> {
        for index in 0..self.actions.len() {
            if let Err(err) = self.actions[index].execute(context) {
                // roll back what already ran so the group stays atomic
                for done in self.actions[..index].iter_mut().rev() {
                    if let Err(undo_err) = done.undo(context) {
                        log::error!("Rollback of '{}' failed: {undo_err}", done.description());
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn undo(&mut self, context: &mut C) -> Result<()> {
        for action in self.actions.iter_mut().rev() {
            action.undo(context)?;
        }
        Ok(())
    }
}

/// Snapshot handed to history listeners after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryState {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_description: Option<String>,
    pub redo_description: Option<String>,
}

type Listener = Box<dyn FnMut(&HistoryState) + Send>;

struct OpenBatch<C: ?Sized> {
    composite: CompositeAction<C>,
    depth: usize,
}

/// Undo and redo stacks plus an optional open batch.
///
/// Nested `begin_batch` calls flatten into the batch that is already open;
/// only the matching outermost `end_batch` commits it.
pub struct History<C: ?Sized> {
    undo_stack: Vec<Box<dyn EditAction<C>>>,
    redo_stack: Vec<Box<dyn EditAction<C>>>,
    batch: Option<OpenBatch<C>>,
    max_entries: usize,
    listeners: Vec<Listener>,
}

impl<C: ?Sized + 'static> Default for History<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized + 'static> History<C> {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            batch: None,
            max_entries: max_entries.max(1),
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&HistoryState) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn is_batching(&self) -> bool {
        self.batch.is_some()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|action| action.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|action| action.description())
    }

    pub fn state(&self) -> HistoryState {
        HistoryState {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            undo_description: self.undo_description().map(str::to_string),
            redo_description: self.redo_description().map(str::to_string),
        }
    }

    pub fn begin_batch(&mut self, description: impl Into<String>) {
        match &mut self.batch {
            Some(open) => {
                open.depth += 1;
                log::debug!("Nested batch folded into '{}'", open.composite.description);
            }
            None => {
                self.batch = Some(OpenBatch {
                    composite: CompositeAction::new(description),
                    depth: 1,
                });
            }
        }
    }

    pub fn end_batch(&mut self) {
        let Some(open) = &mut self.batch else {
            log::warn!("end_batch called without an open batch");
            return;
        };
        open.depth -= 1;
        if open.depth > 0 {
            return;
        }

        if let Some(open) = self.batch.take() {
            if open.composite.is_empty() {
                return;
            }
            self.record(Box::new(open.composite));
        }
    }

    /// Runs `action` and records it. A failed action is not recorded.
    pub fn execute(&mut self, context: &mut C, mut action: Box<dyn EditAction<C>>) -> Result<()> {
        action.execute(context)?;
        self.push_executed(action);
        Ok(())
    }

    /// Records an action whose effect has already been applied.
    pub fn push_executed(&mut self, action: Box<dyn EditAction<C>>) {
        match &mut self.batch {
            Some(open) => {
                open.composite.push(action);
                if !self.redo_stack.is_empty() {
                    self.redo_stack.clear();
                    self.notify();
                }
            }
            None => self.record(action),
        }
    }

    /// Steps back one entry. Refused while a batch is open.
    pub fn undo(&mut self, context: &mut C) -> bool {
        if self.refuse_while_batching("undo") {
            return false;
        }
        let Some(mut action) = self.undo_stack.pop() else {
            return false;
        };
        if let Err(err) = action.undo(context) {
            log::error!("Undo of '{}' failed: {err}", action.description());
            if cfg!(debug_assertions) {
                panic!("undo of '{}' failed: {err}", action.description());
            }
        }
        self.redo_stack.push(action);
        self.notify();
        true
    }

    pub fn redo(&mut self, context: &mut C) -> bool {
        if self.refuse_while_batching("redo") {
            return false;
        }
        let Some(mut action) = self.redo_stack.pop() else {
            return false;
        };
        if let Err(err) = action.execute(context) {
            log::error!("Redo of '{}' failed: {err}", action.description());
            if cfg!(debug_assertions) {
                panic!("redo of '{}' failed: {err}", action.description());
            }
        }
        self.undo_stack.push(action);
        self.notify();
        true
    }

    /// Drops both stacks and any open batch.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch = None;
        self.notify();
    }

    fn refuse_while_batching(&self, operation: &str) -> bool {
        match &self.batch {
            Some(open) => {
                log::warn!(
                    "Ignoring {operation} while batch '{}' is open",
                    open.composite.description
                );
                true
            }
            None => false,
        }
    }

    fn record(&mut self, action: Box<dyn EditAction<C>>) {
        self.undo_stack.push(action);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
        self.notify();
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let state = self.state();
        for listener in &mut self.listeners {
            listener(&state);
        }
    }
}
