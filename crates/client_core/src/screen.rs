//! Screens the desktop app can show and the actions that move between them.

use std::fmt;

use shared::domain::PostId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Home,
    CreatePost,
    EditPost(PostId),
    ListOwnedPosts,
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Home => "home",
            Screen::CreatePost => "create_post",
            Screen::EditPost(_) => "edit_post",
            Screen::ListOwnedPosts => "list_owned_posts",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::EditPost(post_id) => write!(f, "edit_post({post_id})"),
            other => f.write_str(other.name()),
        }
    }
}

/// A user-initiated action. Form-submitting actions read the controller's
/// current form; per-post actions carry the id they were built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    GoHome,
    GoCreate,
    GoList,
    Publish,
    Edit(PostId),
    Save,
    Delete(PostId),
}

impl UiAction {
    pub fn name(&self) -> &'static str {
        match self {
            UiAction::GoHome => "go_home",
            UiAction::GoCreate => "go_create",
            UiAction::GoList => "go_list",
            UiAction::Publish => "publish",
            UiAction::Edit(_) => "edit",
            UiAction::Save => "save",
            UiAction::Delete(_) => "delete",
        }
    }

    pub fn post_id(&self) -> Option<PostId> {
        match self {
            UiAction::Edit(post_id) | UiAction::Delete(post_id) => Some(*post_id),
            _ => None,
        }
    }
}
