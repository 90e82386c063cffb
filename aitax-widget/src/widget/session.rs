//! Async driver for one widget instance
//!
//! Wraps [`IdentificationWidget`] behind a mutex and runs each submission
//! through the [`IdentifyDispatcher`]. The lock is released for the
//! duration of the network exchange, so other operations observe `Loading`
//! and are rejected by the in-flight guard.

use crate::config::WidgetConfig;
use crate::models::ImageAsset;
use crate::services::{IdentifyDispatcher, MetadataFetcher, Transport};
use crate::widget::machine::{IdentificationWidget, Submission};
use crate::widget::state::IdentifyState;
use aitax_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// One live widget instance
pub struct WidgetSession {
    widget: Arc<Mutex<IdentificationWidget>>,
    config: WidgetConfig,
    instance_id: Uuid,
    dispatcher: Arc<IdentifyDispatcher>,
    metadata: MetadataFetcher,
    lifetime: CancellationToken,
}

impl WidgetSession {
    /// Session over all built-in adapters
    pub fn new(config: WidgetConfig, transport: Arc<dyn Transport>, events: EventBus) -> Self {
        let dispatcher = IdentifyDispatcher::new(Arc::clone(&transport)).with_lang(config.lang.clone());
        Self::with_dispatcher(config, dispatcher, MetadataFetcher::new(transport), events)
    }

    pub fn with_dispatcher(
        config: WidgetConfig,
        dispatcher: IdentifyDispatcher,
        metadata: MetadataFetcher,
        events: EventBus,
    ) -> Self {
        let widget = IdentificationWidget::new(config.clone(), events);
        let instance_id = widget.instance_id();

        Self {
            widget: Arc::new(Mutex::new(widget)),
            config,
            instance_id,
            dispatcher: Arc::new(dispatcher),
            metadata,
            lifetime: CancellationToken::new(),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Replace the selection and identify it
    ///
    /// Returns the state after this call's own transition: the resolved
    /// state when this call submitted, the current state otherwise.
    pub async fn pick_images(&self, images: Vec<ImageAsset>) -> IdentifyState {
        self.transition(|widget| widget.pick_images(images)).await
    }

    pub async fn add_images(&self, images: Vec<ImageAsset>) -> IdentifyState {
        self.transition(|widget| widget.add_images(images)).await
    }

    pub async fn remove_image(&self, index: usize) -> IdentifyState {
        self.transition(|widget| widget.remove_image(index)).await
    }

    pub async fn reset(&self) {
        self.widget.lock().await.reset();
    }

    pub async fn state(&self) -> IdentifyState {
        self.widget.lock().await.state().clone()
    }

    pub async fn images(&self) -> Vec<ImageAsset> {
        self.widget.lock().await.images().to_vec()
    }

    /// Provenance link for the configured backend
    ///
    /// Yields `None` once the session is closed, even if the lookup
    /// completes afterwards.
    pub async fn load_provenance(&self) -> Option<String> {
        self.metadata
            .provenance_url_until_cancelled(
                &self.config.api_url,
                self.config.backend_format,
                &self.lifetime,
            )
            .await
    }

    /// End the session
    ///
    /// Outstanding identify and metadata calls are abandoned and their
    /// results discarded.
    pub async fn close(&self) {
        self.widget.lock().await.reset();
        self.lifetime.cancel();
        debug!(instance_id = %self.instance_id, "Widget session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    /// Apply a machine operation, then dispatch its submission if any
    ///
    /// A closed session accepts no further operations.
    async fn transition<F>(&self, operation: F) -> IdentifyState
    where
        F: FnOnce(&mut IdentificationWidget) -> Option<Submission>,
    {
        if self.is_closed() {
            debug!(instance_id = %self.instance_id, "Operation on closed session ignored");
            return self.state().await;
        }

        let submission = operation(&mut *self.widget.lock().await);
        self.run(submission).await
    }

    async fn run(&self, submission: Option<Submission>) -> IdentifyState {
        let Some(submission) = submission else {
            return self.state().await;
        };

        let identify = self.dispatcher.identify(
            &submission.images,
            &self.config.api_url,
            self.config.api_key.as_deref(),
            self.config.backend_format,
        );

        let outcome = tokio::select! {
            _ = self.lifetime.cancelled() => {
                debug!(instance_id = %self.instance_id, "Identify abandoned on close");
                return self.state().await;
            }
            outcome = identify => outcome,
        };

        let mut widget = self.widget.lock().await;
        widget.resolve(submission.ticket, outcome);
        widget.state().clone()
    }
}

impl Drop for WidgetSession {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}
