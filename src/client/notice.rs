//! User-facing notices for client flows.

use crate::error::GalleryError;

/// Generic fallback when an error carries no message.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// The user actions that produce notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Register,
    Upload,
    Delete,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::Login => "Login",
            Action::Register => "Registration",
            Action::Upload => "Upload",
            Action::Delete => "Delete",
        }
    }

    fn fallback(self) -> &'static str {
        match self {
            Action::Login => "Invalid email or password.",
            _ => GENERIC_FAILURE,
        }
    }
}

/// A title/description pair shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub destructive: bool,
}

impl Notice {
    /// Notice for a completed action.
    pub fn success(action: Action) -> Self {
        let (title, description) = match action {
            Action::Login => ("Login successful", "You have been logged in successfully."),
            Action::Register => (
                "Registration successful",
                "Please check your email to confirm your account.",
            ),
            Action::Upload => (
                "Upload successful",
                "Your image has been uploaded successfully.",
            ),
            Action::Delete => ("Image deleted", "The image has been deleted successfully."),
        };
        Self {
            title: title.to_string(),
            description: description.to_string(),
            destructive: false,
        }
    }

    /// Notice for a failed action: the error's message, or a fallback when it has none.
    pub fn failure(action: Action, err: &GalleryError) -> Self {
        let message = err.to_string();
        let description = if message.trim().is_empty() {
            action.fallback().to_string()
        } else {
            message
        };
        Self {
            title: format!("{} failed", action.label()),
            description,
            destructive: true,
        }
    }
}
