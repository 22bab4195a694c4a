// View projection, render records and gesture dispatch

use crate::error::{RemoteError, TaskError};
use crate::filter::Filter;
use crate::store::{AddOutcome, CreatedTask, Pending, TaskStore};
use crate::task::{Task, TaskKey};
use tracing::debug;

/// Tasks of `tasks` matching `filter`, in list order
pub fn project(tasks: &[Task], filter: Filter) -> Vec<&Task> {
    tasks.iter().filter(|t| filter.matches(t)).collect()
}

/// Action bound to a rendered task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle(TaskKey),
    Remove(TaskKey),
}

/// Everything the presentation layer needs to draw one task
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRecord {
    pub key: TaskKey,
    pub text: String,
    pub completed: bool,
    pub on_toggle: Command,
    pub on_delete: Command,
}

impl RenderRecord {
    fn from_task(task: &Task) -> Self {
        let key = task.key();
        Self {
            key,
            text: task.text.clone(),
            completed: task.completed,
            on_toggle: Command::Toggle(key),
            on_delete: Command::Remove(key),
        }
    }
}

/// Render records for the visible tasks
pub fn records(tasks: &[Task], filter: Filter) -> Vec<RenderRecord> {
    project(tasks, filter).into_iter().map(RenderRecord::from_task).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MenuState {
    Open,
    #[default]
    Closed,
}

/// Open/closed state of the filter dropdown
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterMenu {
    state: MenuState,
}

impl FilterMenu {
    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == MenuState::Open
    }

    /// Trigger clicked: open if closed, close if open
    pub fn trigger(&mut self) -> MenuState {
        self.state = match self.state {
            MenuState::Open => MenuState::Closed,
            MenuState::Closed => MenuState::Open,
        };
        self.state
    }

    /// Option picked: the menu always ends up closed
    pub fn select(&mut self, filter: Filter) -> Filter {
        self.state = MenuState::Closed;
        filter
    }
}

/// One complete render of the list
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub records: Vec<RenderRecord>,
    pub filter: Filter,
    pub menu: MenuState,
}

/// Presentation layer that draws frames
pub trait Renderer {
    fn render(&mut self, frame: &Frame);
}

/// User intent coming back from the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Add(String),
    ToggleRequested(TaskKey),
    RemoveRequested(TaskKey),
    FilterSelected(Filter),
    MenuTriggerClicked,
}

impl From<Command> for Gesture {
    fn from(command: Command) -> Self {
        match command {
            Command::Toggle(key) => Gesture::ToggleRequested(key),
            Command::Remove(key) => Gesture::RemoveRequested(key),
        }
    }
}

/// Turns store state into frames and gestures into store calls
pub struct ViewProjector<R: Renderer> {
    renderer: R,
    menu: FilterMenu,
}

impl<R: Renderer> ViewProjector<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            menu: FilterMenu::default(),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn menu(&self) -> MenuState {
        self.menu.state()
    }

    /// Build a frame from scratch
    pub fn frame(&self, store: &TaskStore) -> Frame {
        Frame {
            records: records(store.tasks(), store.filter()),
            filter: store.filter(),
            menu: self.menu.state(),
        }
    }

    pub fn render(&mut self, store: &TaskStore) {
        let frame = self.frame(store);
        self.renderer.render(&frame);
    }

    /// Apply a gesture and re-render.
    ///
    /// Returns remote work the caller still has to drive. Local state and the
    /// rendered frame already reflect the gesture when this returns, except
    /// for a remote-backed add, which shows up once passed to `settle`.
    pub fn dispatch(&mut self, store: &mut TaskStore, gesture: Gesture) -> Option<Pending> {
        debug!(?gesture, "dispatch");
        match gesture {
            Gesture::Add(text) => match store.add(&text) {
                Ok(AddOutcome::Added(_)) => {
                    self.render(store);
                    None
                }
                Ok(AddOutcome::Pending(pending)) => Some(Pending::Create(pending)),
                Err(e) => {
                    Self::drop_error("add", e);
                    None
                }
            },
            Gesture::ToggleRequested(key) => {
                let pending = store.toggle(key).unwrap_or_else(|e| {
                    Self::drop_error("toggle", e);
                    None
                });
                self.render(store);
                pending.map(Pending::Update)
            }
            Gesture::RemoveRequested(key) => {
                if let Err(e) = store.remove(key) {
                    Self::drop_error("remove", e);
                }
                self.render(store);
                None
            }
            Gesture::FilterSelected(filter) => {
                let filter = self.menu.select(filter);
                store.set_filter(filter);
                self.render(store);
                None
            }
            Gesture::MenuTriggerClicked => {
                self.menu.trigger();
                self.render(store);
                None
            }
        }
    }

    /// Apply the outcome of a remote create and re-render when it landed
    pub fn settle(&mut self, store: &mut TaskStore, outcome: Result<CreatedTask, RemoteError>) -> Option<TaskKey> {
        let key = match outcome {
            Ok(created) => match store.apply_created(created) {
                Ok(key) => key,
                Err(e) => {
                    Self::drop_error("add", e);
                    return None;
                }
            },
            Err(e) => {
                Self::drop_error("add", e.into());
                return None;
            }
        };
        self.render(store);
        Some(key)
    }

    /// Dispatch a gesture and drive any remote work it started to completion
    pub async fn handle(&mut self, store: &mut TaskStore, gesture: Gesture) {
        match self.dispatch(store, gesture) {
            Some(Pending::Create(pending)) => {
                let outcome = pending.send().await;
                self.settle(store, outcome);
            }
            Some(Pending::Update(pending)) => {
                // Best effort; the local flip is already rendered
                let _ = pending.send().await;
            }
            None => {}
        }
    }

    fn drop_error(op: &str, error: TaskError) {
        // Nothing is surfaced to the user; the store has already logged the cause
        debug!(op, %error, "operation did not apply");
    }
}
