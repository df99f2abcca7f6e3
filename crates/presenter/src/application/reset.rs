//! Reset/Recovery Coordinator
//!
//! Brings the presenter back to the start chapter. Steps run in order and a
//! failing step is logged without stopping the sequence:
//!
//! 1. stop all media
//! 2. unload any minigame
//! 3. replace the game state with a fresh one awaiting proceed (keeping `connected`)
//! 4. reload the start chapter, rebuilding story content if resetting it fails
//! 5. publish `game_reset`, settle, then publish the fresh snapshot
//!
//! Only a start chapter that cannot be loaded at all is unrecoverable; it is
//! reported as `game_reset { success: false }`.

use thiserror::Error;
use tracing::{debug, error, info, warn};
use whiskers_domain::{Chapter, ChapterId};
use whiskers_protocol::OutboundMessage;

use super::context::PresenterContext;
use crate::ports::outbound::ContentError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResetError {
    #[error("Story content could not be rebuilt: {0}")]
    ContentUnavailable(#[source] ContentError),

    #[error("Start chapter '{chapter}' could not be loaded: {source}")]
    StartChapter {
        chapter: ChapterId,
        #[source]
        source: ContentError,
    },
}

#[derive(Debug, Default)]
pub struct ResetCoordinator;

impl ResetCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Runs the full reset and reports the outcome to the orchestrator.
    pub async fn run(&self, ctx: &mut PresenterContext) -> Result<(), ResetError> {
        info!("Resetting game");
        match self.reset(ctx).await {
            Ok(start) => {
                ctx.publish(OutboundMessage::reset_succeeded());
                tokio::time::sleep(ctx.settings.reset_settle).await;
                ctx.announce(&start);
                ctx.start_media(&start);
                info!(chapter = %start.id, "Game reset complete");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Game reset failed");
                ctx.publish(OutboundMessage::reset_failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn reset(&self, ctx: &mut PresenterContext) -> Result<Chapter, ResetError> {
        ctx.media.stop().await;
        if !ctx.media.is_fully_stopped() {
            warn!("Media still active after stop, continuing reset");
        }

        if let Err(e) = ctx.media.unload_minigame() {
            warn!(error = %e, "Minigame unload failed, continuing reset");
        }

        let fresh = ctx.store.reset();
        debug!(connected = fresh.connected(), "Game state replaced");

        // the fresh state waits for proceed with no choices, whatever the start chapter offers
        let start = self.reload_start(ctx)?;
        ctx.viewport.reset_to_top();
        Ok(start)
    }

    fn reload_start(&self, ctx: &mut PresenterContext) -> Result<Chapter, ResetError> {
        let start = ctx.settings.start_chapter.clone();
        match ctx.content.reset() {
            Ok(()) => match ctx.content.chapter(&start) {
                Ok(chapter) => return Ok(chapter),
                Err(e) => {
                    warn!(chapter = %start, error = %e, "Start chapter missing after content reset, rebuilding")
                }
            },
            Err(e) => warn!(error = %e, "Story content reset failed, rebuilding"),
        }

        ctx.content = ctx
            .factory
            .build()
            .map_err(ResetError::ContentUnavailable)?;
        ctx.content
            .chapter(&start)
            .map_err(|source| ResetError::StartChapter {
                chapter: start,
                source,
            })
    }
}
