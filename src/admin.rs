//! Admin menu and privileged action flow.
//!
//! Authorization is re-checked at every step here: reaching the menu through
//! an already-gated pipeline does not exempt the privileged action itself
//! from validation, since the allow-list may have changed in between.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::event::Event;
use crate::gate::IdentityStore;
use crate::pipeline::FORBIDDEN_MESSAGE;
use crate::sink::NotificationSink;

/// Entry command that opens the admin menu.
pub const ADMIN_COMMAND: &str = "/admin";

/// Action identifier carried by the menu's single button.
pub const ADMIN_PANEL_ACTION: &str = "admin_panel";

/// A single-level inline menu presented to authorized principals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    /// Buttons in presentation order
    pub buttons: Vec<MenuButton>,
}

/// One button of an inline menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuButton {
    /// Text shown on the button
    pub label: String,
    /// Action identifier delivered back as an interaction payload
    pub action: String,
}

impl Menu {
    /// The admin menu: one button opening the admin panel.
    pub fn admin() -> Self {
        Self {
            buttons: vec![MenuButton {
                label: "Admin panel".to_string(),
                action: ADMIN_PANEL_ACTION.to_string(),
            }],
        }
    }

    /// Render the menu as a plain-text button list.
    fn render(&self) -> String {
        self.buttons
            .iter()
            .map(|button| format!("[{}]", button.label))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Presents the admin menu and executes its privileged action.
pub struct AdminPanel {
    identity: Arc<IdentityStore>,
    sink: Arc<dyn NotificationSink>,
}

impl AdminPanel {
    /// Create the panel over the given identity store and sink.
    pub fn new(identity: Arc<IdentityStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { identity, sink }
    }

    /// Handle the menu entry command.
    ///
    /// Presents the menu to an authorized principal and returns `true`;
    /// anyone else gets the forbidden notice.
    pub async fn present_menu(&self, event: &Event) -> bool {
        let Some(principal) = event.principal() else {
            return false;
        };

        if !self.identity.is_authorized(Some(principal)) {
            self.sink.notify(event.channel, FORBIDDEN_MESSAGE, false).await;
            return false;
        }

        debug!(principal = %principal, "Presenting admin menu");
        let message = format!(
            "Welcome, operator {}.\nYou are authorized as an administrator.\nChoose an action: {}",
            principal,
            Menu::admin().render()
        );
        self.sink.notify(event.channel, &message, false).await;
        true
    }

    /// Handle an interaction carrying a menu action.
    ///
    /// Authorization is re-validated here even though the entry path was
    /// already gated. Returns `true` only when the privileged action ran.
    pub async fn activate(&self, event: &Event, action: &str) -> bool {
        if action != ADMIN_PANEL_ACTION {
            debug!(action, "Ignoring unknown menu action");
            return false;
        }

        if !self.identity.is_authorized(event.principal()) {
            warn!(
                principal = ?event.principal(),
                "Privileged action attempted without authorization"
            );
            self.sink.notify(event.channel, FORBIDDEN_MESSAGE, true).await;
            return false;
        }

        self.sink
            .notify(event.channel, "Admin panel opened.", false)
            .await;
        true
    }
}
