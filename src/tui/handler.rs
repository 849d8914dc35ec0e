use anyhow::Result;

use crate::event::{CancelArgs, DrawArgs, KeyArgs};
use crate::tui::{WindowId, WindowTree};

/// Notifications a window raises, delivered in subscription order.
///
/// Handlers get the tree itself and may restructure it mid-notification.
pub trait WindowHandler {
    /// The window was attached to a parent
    fn load(&self, _tree: &mut WindowTree, _window: WindowId) {}

    /// The window was detached from its parent
    fn unload(&self, _tree: &mut WindowTree, _window: WindowId) {}

    fn resize(&self, _tree: &mut WindowTree, _window: WindowId) {}

    fn got_focus(&self, _tree: &mut WindowTree, _window: WindowId) {}

    /// Fired only after a focus change has been committed
    fn lost_focus(&self, _tree: &mut WindowTree, _window: WindowId) {}

    /// Asked before focus leaves the window; set `cancel` to keep it
    fn validating(&self, _tree: &mut WindowTree, _window: WindowId, _args: &mut CancelArgs) {}

    /// Every window on the departing path agreed to let focus go
    fn validated(&self, _tree: &mut WindowTree, _window: WindowId) {}

    fn key_down(&self, _tree: &mut WindowTree, _window: WindowId, _args: &mut KeyArgs) {}

    /// Only reached when no key-down subscriber handled the key
    fn after_key_down(&self, _tree: &mut WindowTree, _window: WindowId, _args: &mut KeyArgs) {}

    /// Called right before an invalidated window is redrawn
    fn auto_size(&self, _tree: &mut WindowTree, _window: WindowId) {}

    fn erase_background(
        &self,
        _tree: &WindowTree,
        _window: WindowId,
        _args: &mut DrawArgs<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn draw_content(
        &self,
        _tree: &WindowTree,
        _window: WindowId,
        _args: &mut DrawArgs<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn draw_border(
        &self,
        _tree: &WindowTree,
        _window: WindowId,
        _args: &mut DrawArgs<'_>,
    ) -> Result<()> {
        Ok(())
    }
}
