//! Current-thread runtime that runs each controller call to completion on the
//! UI thread.

use anyhow::Context;
use client_core::{ActionError, Notice, PostForm, Screen, UiAction, View, ViewController};
use shared::error::BlogResult;
use storage::Storage;
use tokio::runtime::{Builder, Runtime};

pub struct BackendBridge {
    runtime: Runtime,
    controller: ViewController<Storage>,
}

impl BackendBridge {
    /// Opens the store (initializing its schema) and resolves the configured
    /// author, if any, to a user row.
    pub fn start(database_url: &str, author: Option<&str>) -> anyhow::Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build backend runtime")?;

        let (storage, author_id) = runtime.block_on(async {
            let storage = Storage::new(database_url)
                .await
                .with_context(|| format!("failed to open post store at '{database_url}'"))?;
            let author_id = match author {
                Some(username) => Some(
                    storage
                        .create_user(username)
                        .await
                        .with_context(|| format!("failed to register author '{username}'"))?,
                ),
                None => None,
            };
            anyhow::Ok((storage, author_id))
        })?;

        tracing::info!(
            database_url,
            author = author.unwrap_or("anonymous"),
            "backend bridge started"
        );
        Ok(Self {
            runtime,
            controller: ViewController::new(storage, author_id),
        })
    }

    pub fn dispatch(&mut self, action: UiAction) -> Result<Screen, ActionError> {
        self.runtime.block_on(self.controller.dispatch(action))
    }

    pub fn render(&self) -> BlogResult<View> {
        self.runtime.block_on(self.controller.render())
    }

    pub fn screen(&self) -> Screen {
        self.controller.screen()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.controller.notice()
    }

    pub fn form_mut(&mut self) -> &mut PostForm {
        self.controller.form_mut()
    }
}
