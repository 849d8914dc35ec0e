use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::Result;

use crate::event::{CancelArgs, DrawArgs, KeyArgs};
use crate::tui::{WindowHandler, WindowId, WindowTree};

pub(crate) type Log = Rc<RefCell<Vec<String>>>;

/// Logs every notification as "<event> <name>"
#[derive(Default)]
pub(crate) struct Recorder {
    pub name: String,
    pub log: Log,
    pub veto: Cell<bool>,
    /// Leave a status message when vetoing
    pub veto_message: Cell<bool>,
    pub claim_keys: Cell<bool>,
}

impl Recorder {
    fn push(&self, event: &str) {
        self.log.borrow_mut().push(format!("{event} {}", self.name));
    }
}

impl WindowHandler for Recorder {
    fn load(&self, _tree: &mut WindowTree, _window: WindowId) {
        self.push("load");
    }

    fn unload(&self, _tree: &mut WindowTree, _window: WindowId) {
        self.push("unload");
    }

    fn resize(&self, _tree: &mut WindowTree, _window: WindowId) {
        self.push("resize");
    }

    fn got_focus(&self, _tree: &mut WindowTree, _window: WindowId) {
        self.push("got_focus");
    }

    fn lost_focus(&self, _tree: &mut WindowTree, _window: WindowId) {
        self.push("lost_focus");
    }

    fn validating(&self, tree: &mut WindowTree, _window: WindowId, args: &mut CancelArgs) {
        self.push("validating");
        if self.veto.get() {
            args.cancel = true;
            if self.veto_message.get() {
                tree.set_status(format!("{} is invalid", self.name));
            }
        }
    }

    fn validated(&self, _tree: &mut WindowTree, _window: WindowId) {
        self.push("validated");
    }

    fn key_down(&self, _tree: &mut WindowTree, _window: WindowId, args: &mut KeyArgs) {
        self.push("key_down");
        if self.claim_keys.get() {
            args.handled = true;
        }
    }

    fn after_key_down(&self, _tree: &mut WindowTree, _window: WindowId, _args: &mut KeyArgs) {
        self.push("after_key_down");
    }

    fn draw_content(
        &self,
        _tree: &WindowTree,
        _window: WindowId,
        _args: &mut DrawArgs<'_>,
    ) -> Result<()> {
        self.push("draw");
        Ok(())
    }
}

pub(crate) fn tree_with_log() -> (WindowTree, Log) {
    (WindowTree::new(80, 24), Log::default())
}

/// Create a recorded window and attach it under `parent`
pub(crate) fn named(
    tree: &mut WindowTree,
    log: &Log,
    name: &str,
    parent: WindowId,
) -> (WindowId, Rc<Recorder>) {
    let recorder = Rc::new(Recorder {
        name: name.to_string(),
        log: log.clone(),
        ..Default::default()
    });
    let id = tree.create_with(recorder.clone());
    tree.set_parent(id, Some(parent))
        .expect("test windows attach cleanly");
    (id, recorder)
}
