//! What the GUI draws for each screen, built from the screen and store data
//! only.

use shared::domain::{parse_tags, Post, PostId};

use crate::screen::{Screen, UiAction};

const CREATED_AT_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Draft text of the create/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    /// Comma separated, only offered when creating.
    pub tags: String,
}

impl PostForm {
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            tags: post.tags.join(", "),
        }
    }

    pub fn parsed_tags(&self) -> Vec<String> {
        parse_tags(&self.tags)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub id: PostId,
    pub title: String,
    pub body: String,
    pub created_label: String,
    pub author: Option<String>,
    pub tags: Vec<String>,
}

impl PostCard {
    fn new(post: Post, body: String) -> Self {
        let created_label = post.created_at.format(CREATED_AT_DISPLAY_FORMAT).to_string();
        let author = post.author.map(|author| author.username);
        Self {
            id: post.id,
            title: post.title,
            body,
            created_label,
            author,
            tags: post.tags,
        }
    }

    fn preview(post: Post) -> Self {
        let body = post.preview();
        Self::new(post, body)
    }

    fn full(post: Post) -> Self {
        let body = post.content.clone();
        Self::new(post, body)
    }
}

/// One entry of the "my posts" screen with its handlers bound to the entry's
/// post id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub card: PostCard,
    pub edit: UiAction,
    pub delete: UiAction,
}

impl PostRow {
    fn new(post: Post) -> Self {
        let post_id = post.id;
        Self {
            card: PostCard::full(post),
            edit: UiAction::Edit(post_id),
            delete: UiAction::Delete(post_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub heading: &'static str,
    pub submit_label: &'static str,
    pub submit: UiAction,
    pub show_tags: bool,
    pub editing: Option<PostId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Home { cards: Vec<PostCard> },
    Form(FormView),
    ListOwnedPosts { rows: Vec<PostRow> },
}

impl View {
    /// `posts` must already be in display order; it is ignored for form
    /// screens.
    pub fn compose(screen: Screen, posts: Vec<Post>) -> Self {
        match screen {
            Screen::Home => View::Home {
                cards: posts.into_iter().map(PostCard::preview).collect(),
            },
            Screen::CreatePost => View::Form(FormView {
                heading: "Create post",
                submit_label: "Publish",
                submit: UiAction::Publish,
                show_tags: true,
                editing: None,
            }),
            Screen::EditPost(post_id) => View::Form(FormView {
                heading: "Edit post",
                submit_label: "Save",
                submit: UiAction::Save,
                show_tags: false,
                editing: Some(post_id),
            }),
            Screen::ListOwnedPosts => View::ListOwnedPosts {
                rows: posts.into_iter().map(PostRow::new).collect(),
            },
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            View::Home { .. } => "Home",
            View::Form(form) => form.heading,
            View::ListOwnedPosts { .. } => "My posts",
        }
    }
}
