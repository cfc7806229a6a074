//! Events emitted by the controller

use presence_util::ProfileId;

/// Events emitted by the controller for the shell to render.
///
/// Fire-and-forget: the daemon fans these out to subscribed clients and
/// nobody acknowledges them.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Human-readable status line changed
    StatusChanged(String),

    /// A toast pop-up should be shown
    ToastRequested(String),

    /// Seconds remaining until the next probe
    CountdownTick(u32),

    /// Target confirmed running, presence published
    SessionAttached {
        profile_id: ProfileId,
        target: String,
    },

    /// Target gone or session stopped, presence withdrawn
    SessionDetached { profile_id: ProfileId },
}
