use dicom::core::{Tag, VR};
use std::path::PathBuf;

use crate::editing::{
    bulk, AddTagAction, BulkOutcome, EditAction, History, HistoryState, RemoveTagAction,
    SetValueAction,
};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::model::loader::load_all;
use crate::model::{FileId, FileItem, TagItem, WorkingSet};
use crate::registry::extract_flat;
use crate::settings::Settings;
use crate::storage::{discover, save_modified, SaveReport};
use crate::task::{CancellationToken, Progress};
use crate::vr::{self, ValidationResult};

/// Notifications sent to observers registered with [`App::subscribe`].
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A long-running command started; cancelling the token stops it.
    OperationStarted(CancellationToken),
    Progress(Progress),
    WorkingSetReplaced { count: usize },
    RecordsChanged,
    SelectionChanged(Option<FileId>),
    HistoryChanged(HistoryState),
}

/// What a command produced, for callers that want more than the events.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done,
    Loaded { loaded: usize, errors: Vec<String> },
    Bulk(BulkOutcome),
    Saved(SaveReport),
    /// Whether undo or redo had anything to replay.
    Replayed(bool),
}

type Listener = Box<dyn FnMut(&AppEvent) + Send>;

/// Owns the working set, the edit history and the settings. Every mutation
/// goes through [`App::update`].
pub struct App {
    settings: Settings,
    items: WorkingSet,
    history: History<WorkingSet>,
    selected: Option<FileId>,
    cancel: CancellationToken,
    listeners: Vec<Listener>,
    last_error: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl App {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            items: WorkingSet::default(),
            history: History::new(),
            selected: None,
            cancel: CancellationToken::new(),
            listeners: Vec::new(),
            last_error: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn items(&self) -> &WorkingSet {
        &self.items
    }

    pub fn history(&self) -> &History<WorkingSet> {
        &self.history
    }

    pub fn selected(&self) -> Option<FileId> {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&FileItem> {
        self.selected.and_then(|id| self.items.get(id))
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&AppEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Replaces the working set with already loaded items.
    pub fn set_items(&mut self, items: Vec<FileItem>) {
        self.replace_items(items.into());
    }

    /// Display rows of the selected file, honoring `show_private_tags`.
    pub fn tag_items(&self) -> Vec<TagItem> {
        match self.selected_item() {
            Some(item) => extract_flat(&item.record, self.settings.show_private_tags).collect(),
            None => Vec::new(),
        }
    }

    /// Live validation of an edit in progress. Always passes when
    /// `validate_while_typing` is off; the commit path validates regardless.
    pub fn validate_input(&self, tag: Tag, vr: VR, text: &str) -> ValidationResult {
        if self.settings.validate_while_typing {
            vr::validate(tag, vr, text)
        } else {
            ValidationResult::ok()
        }
    }

    pub fn update(&mut self, message: Message) -> Result<Outcome> {
        let result = self.dispatch(message);
        match &result {
            Ok(_) => self.last_error = None,
            Err(err) => {
                log::warn!("{err}");
                self.last_error = Some(err.to_string());
            }
        }
        result
    }

    fn dispatch(&mut self, message: Message) -> Result<Outcome> {
        match message {
            Message::LoadFolder(root) => {
                let cancel = self.start_operation();
                let paths = discover(&root, &cancel)?;
                self.load(paths, cancel)
            }
            Message::LoadFiles(paths) => {
                let cancel = self.start_operation();
                self.load(paths, cancel)
            }
            Message::SelectFile(id) => {
                if id < self.items.len() {
                    self.selected = Some(id);
                    self.emit(AppEvent::SelectionChanged(self.selected));
                }
                Ok(Outcome::Done)
            }
            Message::EditTag { file, tag, value } => {
                self.execute(Box::new(SetValueAction::new(file, tag, value)))
            }
            Message::AddTag {
                file,
                tag,
                vr,
                value,
            } => self.execute(Box::new(AddTagAction::new(file, tag, vr, value))),
            Message::DeleteTag { file, tag } => {
                self.execute(Box::new(RemoveTagAction::new(file, tag)))
            }
            Message::ApplyToAll { tag, value } => {
                let cancel = self.start_operation();
                let listeners = &mut self.listeners;
                let outcome = bulk::apply_to_all(
                    &mut self.items,
                    &mut self.history,
                    tag,
                    &value,
                    &mut |progress| emit_to(listeners, &AppEvent::Progress(progress)),
                    &cancel,
                );
                self.after_bulk(outcome)
            }
            Message::DeleteFromAll { tag } => {
                let cancel = self.start_operation();
                let listeners = &mut self.listeners;
                let outcome = bulk::delete_from_all(
                    &mut self.items,
                    &mut self.history,
                    tag,
                    &mut |progress| emit_to(listeners, &AppEvent::Progress(progress)),
                    &cancel,
                );
                self.after_bulk(outcome)
            }
            Message::BeginBatch(description) => {
                self.history.begin_batch(description);
                Ok(Outcome::Done)
            }
            Message::EndBatch => {
                self.history.end_batch();
                self.emit_history();
                Ok(Outcome::Done)
            }
            Message::Undo => {
                let replayed = self.history.undo(&mut self.items);
                if replayed {
                    self.emit(AppEvent::RecordsChanged);
                    self.emit_history();
                }
                Ok(Outcome::Replayed(replayed))
            }
            Message::Redo => {
                let replayed = self.history.redo(&mut self.items);
                if replayed {
                    self.emit(AppEvent::RecordsChanged);
                    self.emit_history();
                }
                Ok(Outcome::Replayed(replayed))
            }
            Message::SaveModified => {
                let cancel = self.start_operation();
                let listeners = &mut self.listeners;
                let report = save_modified(
                    &mut self.items,
                    &self.settings,
                    &mut |progress| emit_to(listeners, &AppEvent::Progress(progress)),
                    &cancel,
                );
                self.emit(AppEvent::RecordsChanged);
                Ok(Outcome::Saved(report))
            }
            Message::Cancel => {
                self.cancel.cancel();
                Ok(Outcome::Done)
            }
        }
    }

    /// Cancels whatever command still holds the previous token and hands
    /// out a fresh one.
    fn start_operation(&mut self) -> CancellationToken {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.emit(AppEvent::OperationStarted(self.cancel.clone()));
        self.cancel.clone()
    }

    fn load(&mut self, paths: Vec<PathBuf>, cancel: CancellationToken) -> Result<Outcome> {
        let workers = self.settings.max_concurrent_loads;
        let listeners = &mut self.listeners;
        let report = load_all(
            &paths,
            workers,
            &mut |progress| emit_to(listeners, &AppEvent::Progress(progress)),
            &cancel,
        )?;
        let loaded = report.items.len();
        self.replace_items(report.items.into());
        Ok(Outcome::Loaded {
            loaded,
            errors: report.errors,
        })
    }

    fn replace_items(&mut self, items: WorkingSet) {
        self.items = items;
        self.history.clear();
        self.selected = (!self.items.is_empty()).then_some(0);
        self.emit(AppEvent::WorkingSetReplaced {
            count: self.items.len(),
        });
        self.emit(AppEvent::SelectionChanged(self.selected));
        self.emit_history();
    }

    fn execute(&mut self, action: Box<dyn EditAction<WorkingSet>>) -> Result<Outcome> {
        let description = action.description().to_string();
        self.history.execute(&mut self.items, action)?;
        log::debug!("{description}");
        self.emit(AppEvent::RecordsChanged);
        self.emit_history();
        Ok(Outcome::Done)
    }

    fn after_bulk(&mut self, outcome: BulkOutcome) -> Result<Outcome> {
        if outcome.changed > 0 {
            self.emit(AppEvent::RecordsChanged);
            self.emit_history();
        }
        if outcome.cancelled && outcome.changed == 0 {
            return Err(Error::Cancelled);
        }
        Ok(Outcome::Bulk(outcome))
    }

    fn emit_history(&mut self) {
        let state = self.history.state();
        self.emit(AppEvent::HistoryChanged(state));
    }

    fn emit(&mut self, event: AppEvent) {
        emit_to(&mut self.listeners, &event);
    }
}

fn emit_to(listeners: &mut [Listener], event: &AppEvent) {
    for listener in listeners.iter_mut() {
        listener(event);
    }
}
