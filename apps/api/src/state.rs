use std::sync::Arc;

use tracing::info;

use booking_flow_cell::{
    BookingFlowService, CheckoutService, PricingCatalog, RestPaymentCollaborator,
    RestSchedulingCollaborator,
};
use presence_cell::{
    LocalPresenceChannel, PresenceChannel, PresenceError, PresenceFeed, RedisPresenceChannel,
};
use session_feedback_cell::{FeedbackService, RestSessionCollaborator};
use shared_config::AppConfig;

/// Long-lived services shared by every request.
#[derive(Clone)]
pub struct AppServices {
    pub presence: Arc<PresenceFeed>,
    pub booking: Arc<BookingFlowService>,
    pub feedback: Arc<FeedbackService>,
}

impl AppServices {
    /// Uses Redis for presence when it is configured, otherwise the
    /// in-process channel.
    pub fn from_config(config: &AppConfig) -> Result<Self, PresenceError> {
        let channel: Arc<dyn PresenceChannel> = if config.is_presence_configured() {
            Arc::new(RedisPresenceChannel::new(config)?)
        } else {
            Arc::new(LocalPresenceChannel::new())
        };
        info!("Presence feed using the {} channel", channel.name());

        Ok(Self::with_channel(config, channel))
    }

    pub fn with_channel(config: &AppConfig, channel: Arc<dyn PresenceChannel>) -> Self {
        let presence = Arc::new(PresenceFeed::new(channel));

        let checkout = CheckoutService::new(
            Arc::new(RestPaymentCollaborator::new(config)),
            &config.payment_currency,
        );
        let booking = BookingFlowService::new(
            Arc::clone(&presence),
            PricingCatalog::standard(),
            checkout,
            Arc::new(RestSchedulingCollaborator::new(config)),
        );
        let feedback = FeedbackService::new(Arc::new(RestSessionCollaborator::new(config)));

        Self {
            presence,
            booking: Arc::new(booking),
            feedback: Arc::new(feedback),
        }
    }
}
