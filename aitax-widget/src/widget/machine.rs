//! Identification state machine
//!
//! Owns the image selection and the identify lifecycle of one widget
//! instance. Transitions are synchronous: an operation that needs a network
//! exchange returns a [`Submission`] for the caller to dispatch, and the
//! outcome comes back through [`IdentificationWidget::resolve`].
//!
//! At most one submission is in flight. Every submission (and every reset)
//! advances a generation counter, so an outcome carrying an older ticket is
//! discarded instead of overwriting newer state.

use crate::config::WidgetConfig;
use crate::models::ImageAsset;
use crate::services::IdentifyOutcome;
use crate::widget::state::IdentifyState;
use aitax_common::events::{EventBus, WidgetEvent};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity of one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionTicket(u64);

impl SubmissionTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Identify request the caller must dispatch
#[derive(Debug, Clone)]
pub struct Submission {
    pub ticket: SubmissionTicket,
    /// Images in submission order
    pub images: Vec<ImageAsset>,
}

/// State machine of one widget instance
pub struct IdentificationWidget {
    instance_id: Uuid,
    config: WidgetConfig,
    images: Vec<ImageAsset>,
    state: IdentifyState,
    generation: u64,
    in_flight: Option<SubmissionTicket>,
    events: EventBus,
}

impl IdentificationWidget {
    pub fn new(config: WidgetConfig, events: EventBus) -> Self {
        let instance_id = Uuid::new_v4();
        debug!(
            instance_id = %instance_id,
            backend = %config.backend_format,
            max_images = config.max_images,
            "Widget created"
        );

        Self {
            instance_id,
            config,
            images: Vec::new(),
            state: IdentifyState::initial(),
            generation: 0,
            in_flight: None,
            events,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn images(&self) -> &[ImageAsset] {
        &self.images
    }

    pub fn state(&self) -> &IdentifyState {
        &self.state
    }

    /// Whether more images may be added
    pub fn can_add_images(&self) -> bool {
        self.images.len() < self.config.max_images
    }

    pub fn in_flight(&self) -> Option<SubmissionTicket> {
        self.in_flight
    }

    /// Replace the selection with a freshly picked set and submit it
    ///
    /// Images beyond `max_images` are dropped, keeping the earliest.
    /// An empty pick changes nothing.
    pub fn pick_images(&mut self, images: Vec<ImageAsset>) -> Option<Submission> {
        if self.reject_while_loading("pick images") {
            return None;
        }
        if images.is_empty() {
            debug!(instance_id = %self.instance_id, "Empty pick ignored");
            return None;
        }

        self.images = images;
        self.clamp_images();
        self.submit()
    }

    /// Append images to the selection and re-run identification
    pub fn add_images(&mut self, images: Vec<ImageAsset>) -> Option<Submission> {
        if self.reject_while_loading("add images") {
            return None;
        }
        if images.is_empty() {
            return None;
        }
        if !self.can_add_images() {
            debug!(
                instance_id = %self.instance_id,
                max_images = self.config.max_images,
                "Image limit reached, add ignored"
            );
            return None;
        }

        self.images.extend(images);
        self.clamp_images();
        self.submit()
    }

    /// Remove the image at `index`
    ///
    /// Removing the last remaining image resets the widget instead of
    /// submitting an empty set. Out-of-range indices are ignored.
    pub fn remove_image(&mut self, index: usize) -> Option<Submission> {
        if self.reject_while_loading("remove image") {
            return None;
        }
        if index >= self.images.len() {
            debug!(
                instance_id = %self.instance_id,
                index,
                image_count = self.images.len(),
                "Remove index out of range"
            );
            return None;
        }

        let removed = self.images.remove(index);
        debug!(instance_id = %self.instance_id, image = %removed.name(), "Image removed");

        if self.images.is_empty() {
            self.reset();
            None
        } else {
            self.submit()
        }
    }

    /// Return to the initial state
    ///
    /// Clears images and identify state. Any outstanding submission becomes
    /// stale. Calling it repeatedly is equivalent to calling it once.
    pub fn reset(&mut self) {
        let was_initial =
            self.state.is_idle() && self.images.is_empty() && self.in_flight.is_none();

        self.images = Vec::new();
        self.state = IdentifyState::initial();
        self.in_flight = None;
        self.generation += 1;

        if !was_initial {
            info!(instance_id = %self.instance_id, "Widget reset");
            self.events.emit_lossy(WidgetEvent::WidgetReset {
                instance_id: self.instance_id,
                timestamp: Utc::now(),
            });
        }
    }

    /// Apply the outcome of a submission
    ///
    /// Returns `false` (and changes nothing) when `ticket` is not the
    /// submission currently in flight.
    pub fn resolve(&mut self, ticket: SubmissionTicket, outcome: IdentifyOutcome) -> bool {
        if self.in_flight != Some(ticket) {
            debug!(
                instance_id = %self.instance_id,
                ticket = ticket.generation(),
                current = self.generation,
                "Discarding stale identify outcome"
            );
            return false;
        }
        self.in_flight = None;

        self.state = match outcome {
            Ok(batch) => {
                info!(
                    instance_id = %self.instance_id,
                    results = batch.len(),
                    "Identification loaded"
                );
                self.events.emit_lossy(WidgetEvent::IdentificationCompleted {
                    instance_id: self.instance_id,
                    result_count: batch.len(),
                    timestamp: Utc::now(),
                });
                IdentifyState::Loaded(batch)
            }
            Err(message) => {
                warn!(instance_id = %self.instance_id, error = %message, "Identification failed");
                self.events.emit_lossy(WidgetEvent::IdentificationFailed {
                    instance_id: self.instance_id,
                    message: message.clone(),
                    timestamp: Utc::now(),
                });
                IdentifyState::Error(message)
            }
        };
        true
    }

    fn reject_while_loading(&self, action: &str) -> bool {
        if self.in_flight.is_some() {
            warn!(
                instance_id = %self.instance_id,
                action,
                "Identification already in progress, request not re-issued"
            );
            return true;
        }
        false
    }

    fn clamp_images(&mut self) {
        if self.images.len() > self.config.max_images {
            debug!(
                instance_id = %self.instance_id,
                dropped = self.images.len() - self.config.max_images,
                "Truncating selection to max_images"
            );
            self.images.truncate(self.config.max_images);
        }
    }

    fn submit(&mut self) -> Option<Submission> {
        self.generation += 1;
        let ticket = SubmissionTicket(self.generation);
        self.in_flight = Some(ticket);
        self.state = IdentifyState::Loading;

        info!(
            instance_id = %self.instance_id,
            image_count = self.images.len(),
            backend = %self.config.backend_format,
            "Identification started"
        );
        self.events.emit_lossy(WidgetEvent::IdentificationStarted {
            instance_id: self.instance_id,
            image_count: self.images.len(),
            backend: self.config.backend_format.as_str().to_string(),
            timestamp: Utc::now(),
        });

        Some(Submission {
            ticket,
            images: self.images.clone(),
        })
    }
}
