//! Screen state machine mediating between user actions and the post store.

use shared::{
    domain::{PostId, UserId},
    error::{BlogError, BlogResult, ErrorCode},
};
use storage::PostStore;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    screen::{Screen, UiAction},
    view::{PostForm, View},
};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Store(#[from] BlogError),
    #[error("{action} is not available on the {screen} screen")]
    Unavailable {
        action: &'static str,
        screen: Screen,
    },
}

impl ActionError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ActionError::Store(err) => Some(err.code()),
            ActionError::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Info,
    Error,
}

/// Status line shown after an action; replaced by the next action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub message: String,
    pub code: Option<ErrorCode>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Info,
            message: message.into(),
            code: None,
        }
    }

    pub fn error(err: &ActionError) -> Self {
        Self {
            severity: NoticeSeverity::Error,
            message: err.to_string(),
            code: err.code(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == NoticeSeverity::Error
    }
}

/// Owns the active [`Screen`] and the form draft. Post data is never kept
/// here: [`ViewController::render`] reads it from the store every time.
pub struct ViewController<S: PostStore> {
    store: S,
    author: Option<UserId>,
    screen: Screen,
    form: PostForm,
    notice: Option<Notice>,
}

impl<S: PostStore> ViewController<S> {
    pub fn new(store: S, author: Option<UserId>) -> Self {
        Self {
            store,
            author,
            screen: Screen::Home,
            form: PostForm::default(),
            notice: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn form(&self) -> &PostForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut PostForm {
        &mut self.form
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Applies one user action and returns the screen now active. Failures
    /// are also recorded as the current [`Notice`].
    pub async fn dispatch(&mut self, action: UiAction) -> Result<Screen, ActionError> {
        let from = self.screen;
        self.notice = None;

        let result = match action {
            UiAction::GoHome => Ok(self.navigate(Screen::Home)),
            UiAction::GoCreate => Ok(self.navigate(Screen::CreatePost)),
            UiAction::GoList => Ok(self.navigate(Screen::ListOwnedPosts)),
            UiAction::Publish => self.publish().await,
            UiAction::Edit(post_id) => self.edit(post_id).await,
            UiAction::Save => self.save().await,
            UiAction::Delete(post_id) => self.delete(post_id).await,
        };

        match &result {
            Ok(to) => debug!(
                action = action.name(),
                post_id = action.post_id().map(|id| id.0),
                from = %from,
                to = %to,
                "ui action applied"
            ),
            Err(err) => {
                warn!(
                    action = action.name(),
                    post_id = action.post_id().map(|id| id.0),
                    screen = %self.screen,
                    error = %err,
                    "ui action failed"
                );
                self.notice = Some(Notice::error(err));
            }
        }
        result
    }

    /// Loads whatever the active screen needs and composes it into a view.
    pub async fn render(&self) -> BlogResult<View> {
        let posts = match self.screen {
            Screen::Home => self.store.list_posts().await?,
            Screen::ListOwnedPosts => match self.author {
                Some(author) => self.store.list_posts_by_author(author).await?,
                None => self.store.list_posts().await?,
            },
            Screen::CreatePost | Screen::EditPost(_) => Vec::new(),
        };
        Ok(View::compose(self.screen, posts))
    }

    /// Direct navigation drops any unsaved draft.
    fn navigate(&mut self, to: Screen) -> Screen {
        self.form.clear();
        self.screen = to;
        to
    }

    fn require(&self, action: UiAction, allowed: bool) -> Result<(), ActionError> {
        if allowed {
            Ok(())
        } else {
            Err(ActionError::Unavailable {
                action: action.name(),
                screen: self.screen,
            })
        }
    }

    async fn publish(&mut self) -> Result<Screen, ActionError> {
        self.require(UiAction::Publish, self.screen == Screen::CreatePost)?;

        let tags = self.form.parsed_tags();
        let post = self
            .store
            .create_post(&self.form.title, &self.form.content, &tags, self.author)
            .await?;

        self.notice = Some(Notice::info(format!("Published \"{}\"", post.title)));
        Ok(self.navigate(Screen::Home))
    }

    async fn edit(&mut self, post_id: PostId) -> Result<Screen, ActionError> {
        self.require(UiAction::Edit(post_id), self.screen == Screen::ListOwnedPosts)?;

        let post = self.store.get_post(post_id).await?;
        self.form = PostForm::from_post(&post);
        self.screen = Screen::EditPost(post_id);
        Ok(self.screen)
    }

    async fn save(&mut self) -> Result<Screen, ActionError> {
        let Screen::EditPost(post_id) = self.screen else {
            return Err(ActionError::Unavailable {
                action: UiAction::Save.name(),
                screen: self.screen,
            });
        };

        match self
            .store
            .update_post(post_id, &self.form.title, &self.form.content)
            .await
        {
            Ok(post) => {
                self.notice = Some(Notice::info(format!("Saved \"{}\"", post.title)));
                Ok(self.navigate(Screen::ListOwnedPosts))
            }
            Err(err @ BlogError::NotFound(_)) => {
                self.navigate(Screen::ListOwnedPosts);
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&mut self, post_id: PostId) -> Result<Screen, ActionError> {
        self.require(
            UiAction::Delete(post_id),
            self.screen == Screen::ListOwnedPosts,
        )?;

        self.store.delete_post(post_id).await?;
        self.notice = Some(Notice::info(format!("Deleted post {post_id}")));
        Ok(self.screen)
    }
}
