use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use presence_cell::{FirstAvailable, PresenceFeed, SelectionPolicy};

use crate::services::checkout::CheckoutService;
use crate::services::pricing::PricingCatalog;
use crate::services::scheduling::SchedulingCollaborator;
use crate::services::selector::BookingSelector;
use crate::{
    AcknowledgmentGate, BookingFlowError, BookingState, BookingView, CheckoutRequest,
    PaymentInitiation, PlanSelectionRequest, PlanTerms, PricingView, SchedulingHandoff,
    SchedulingRequest, Transition,
};

/// One user's selector, tagged so a late payment outcome can tell whether
/// the attempt it paid for is still the current one.
struct Attempt {
    id: u64,
    selector: BookingSelector,
}

type Attempts = Arc<RwLock<HashMap<String, Attempt>>>;

/// Per-user booking attempts backed by the shared presence feed.
///
/// Each user owns at most one `BookingSelector`; attempts never share state.
pub struct BookingFlowService {
    presence: Arc<PresenceFeed>,
    catalog: PricingCatalog,
    checkout: CheckoutService,
    scheduling: Arc<dyn SchedulingCollaborator>,
    policy: Arc<dyn SelectionPolicy>,
    attempts: Attempts,
    next_attempt: AtomicU64,
}

impl BookingFlowService {
    pub fn new(
        presence: Arc<PresenceFeed>,
        catalog: PricingCatalog,
        checkout: CheckoutService,
        scheduling: Arc<dyn SchedulingCollaborator>,
    ) -> Self {
        Self {
            presence,
            catalog,
            checkout,
            scheduling,
            policy: Arc::new(FirstAvailable),
            attempts: Arc::new(RwLock::new(HashMap::new())),
            next_attempt: AtomicU64::new(1),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn SelectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn catalog(&self) -> &PricingCatalog {
        &self.catalog
    }

    pub async fn active_attempts(&self) -> usize {
        self.attempts.read().await.len()
    }

    pub async fn view(&self, user_id: &str) -> BookingView {
        let attempts = self.attempts.read().await;
        self.render(attempts.get(user_id).map(|attempt| &attempt.selector))
    }

    #[instrument(skip(self))]
    pub async fn select_category(
        &self,
        user_id: &str,
        category: &str,
    ) -> Result<BookingView, BookingFlowError> {
        let snapshot = self.presence.snapshot();
        if self.presence.state().is_stale() {
            warn!("Selecting {} against a stale presence snapshot", category);
        }

        let mut attempts = self.attempts.write().await;
        let attempt = attempts.entry(user_id.to_string()).or_insert_with(|| Attempt {
            id: self.next_attempt.fetch_add(1, Ordering::Relaxed),
            selector: BookingSelector::with_policy(Arc::clone(&self.policy)),
        });
        attempt.selector.select_category(category, &snapshot)?;

        Ok(self.render(Some(&attempt.selector)))
    }

    pub async fn present_pricing(&self, user_id: &str) -> Result<PricingView, BookingFlowError> {
        let mut attempts = self.attempts.write().await;
        let selector = Self::selector_mut(&mut attempts, user_id)?;
        selector.present_pricing()?;

        let specialist = selector
            .selection()
            .and_then(|selection| selection.specialist.clone())
            .ok_or(BookingFlowError::NoSpecialistBound)?;

        Ok(PricingView {
            state: selector.state(),
            specialist,
            plans: self.catalog.plans().to_vec(),
        })
    }

    /// Chooses a plan. Besides being numeric, the terms must be ones the
    /// catalog offers; the catalog's own price and duration are bound.
    #[instrument(skip(self, request))]
    pub async fn select_plan(
        &self,
        user_id: &str,
        request: &PlanSelectionRequest,
    ) -> Result<AcknowledgmentGate, BookingFlowError> {
        let mut attempts = self.attempts.write().await;
        let selector = Self::selector_mut(&mut attempts, user_id)?;
        selector.ensure_accepts_plan()?;

        let terms = PlanTerms::try_from(request).map_err(|e| {
            warn!("Rejected plan selection for {}: {}", user_id, e);
            e
        })?;
        let plan = self.catalog.find(&terms).ok_or_else(|| {
            warn!(
                "Rejected plan {} for {}s: not in the catalog",
                terms.price_major_units, terms.duration_seconds
            );
            BookingFlowError::InvalidPlan(
                "the selected terms do not match any offered plan".to_string(),
            )
        })?;

        selector.select_plan(&PlanSelectionRequest::from(plan))
    }

    pub async fn confirm(&self, user_id: &str) -> Result<CheckoutRequest, BookingFlowError> {
        let mut attempts = self.attempts.write().await;
        Self::selector_mut(&mut attempts, user_id)?.confirm()
    }

    pub async fn cancel(&self, user_id: &str) -> Result<BookingView, BookingFlowError> {
        let mut attempts = self.attempts.write().await;
        let selector = Self::selector_mut(&mut attempts, user_id)?;
        selector.cancel()?;

        Ok(self.render(Some(&*selector)))
    }

    /// Initiates payment for a presented checkout. The attempt ends on
    /// success; on failure it stays at checkout so the user can retry.
    ///
    /// Only one payment call per attempt runs at a time. The call and its
    /// bookkeeping run on their own task, so the claim is settled even when
    /// the caller goes away mid-request.
    #[instrument(skip(self, payer_email, auth_token))]
    pub async fn checkout(
        &self,
        user_id: &str,
        payer_email: &str,
        auth_token: &str,
    ) -> Result<PaymentInitiation, BookingFlowError> {
        let (attempt_id, checkout) = {
            let mut attempts = self.attempts.write().await;
            let attempt = attempts
                .get_mut(user_id)
                .ok_or(BookingFlowError::NoActiveAttempt)?;
            (attempt.id, attempt.selector.begin_checkout()?)
        };

        let payments = self.checkout.clone();
        let attempts = Arc::clone(&self.attempts);
        let user = user_id.to_string();
        let payer_email = payer_email.to_string();
        let auth_token = auth_token.to_string();

        tokio::spawn(async move {
            let result = payments
                .initiate_payment(&checkout, &payer_email, &auth_token)
                .await;
            settle_checkout(&attempts, &user, attempt_id, result.is_ok()).await;

            if result.is_ok() {
                info!(
                    "User {} handed to payment for specialist {}",
                    user, checkout.specialist.id
                );
            }
            result
        })
        .await
        .map_err(|e| BookingFlowError::PaymentError(format!("payment task failed: {}", e)))?
    }

    /// Hands a fallback attempt to scheduling. The attempt ends on success.
    #[instrument(skip(self, auth_token))]
    pub async fn book_appointment_instead(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<SchedulingHandoff, BookingFlowError> {
        let category = {
            let attempts = self.attempts.read().await;
            attempts
                .get(user_id)
                .ok_or(BookingFlowError::NoActiveAttempt)?
                .selector
                .fallback_category()?
        };

        let handoff = self
            .scheduling
            .request_appointment(
                SchedulingRequest {
                    category: category.clone(),
                    patient_id: user_id.to_string(),
                },
                auth_token,
            )
            .await?;

        let mut attempts = self.attempts.write().await;
        if let Some(attempt) = attempts.get_mut(user_id) {
            if attempt.selector.fallback_category().ok().as_deref() == Some(category.as_str()) {
                attempt.selector.book_appointment_instead()?;
                attempts.remove(user_id);
            }
        }

        info!("User {} handed to scheduling for {}", user_id, category);
        Ok(handoff)
    }

    pub async fn close(&self, user_id: &str) -> Transition {
        let mut attempts = self.attempts.write().await;
        match attempts.remove(user_id) {
            Some(mut attempt) => attempt.selector.close(),
            None => Transition {
                from: BookingState::Idle,
                to: BookingState::Closed,
            },
        }
    }

    fn selector_mut<'a>(
        attempts: &'a mut HashMap<String, Attempt>,
        user_id: &str,
    ) -> Result<&'a mut BookingSelector, BookingFlowError> {
        attempts
            .get_mut(user_id)
            .map(|attempt| &mut attempt.selector)
            .ok_or(BookingFlowError::NoActiveAttempt)
    }

    fn render(&self, selector: Option<&BookingSelector>) -> BookingView {
        let presence = self.presence.state();
        let state = selector
            .map(|selector| selector.state())
            .unwrap_or(BookingState::Idle);
        let selection = selector.and_then(|selector| selector.selection().cloned());

        let message = match (&state, &selection) {
            (BookingState::NoSpecialistAvailable, Some(selection)) => Some(format!(
                "Sorry, no {} specialist is available right now. You can book an appointment instead.",
                selection.category
            )),
            (BookingState::PlanAcknowledged, _) => Some(crate::ACKNOWLEDGMENT_TERMS.to_string()),
            _ => None,
        };

        BookingView {
            state,
            selection,
            message,
            presence_status: presence.status,
            presence_stale: presence.is_stale(),
        }
    }
}

/// Applies a payment outcome to the attempt that claimed it. A closed or
/// restarted attempt is left alone.
async fn settle_checkout(attempts: &Attempts, user_id: &str, attempt_id: u64, paid: bool) {
    let mut attempts = attempts.write().await;
    let claimed = matches!(
        attempts.get(user_id),
        Some(attempt) if attempt.id == attempt_id && attempt.selector.payment_pending()
    );
    if !claimed {
        debug!("Attempt {} for user {} ended before payment settled", attempt_id, user_id);
        return;
    }

    if paid {
        attempts.remove(user_id);
    } else if let Some(attempt) = attempts.get_mut(user_id) {
        attempt.selector.abort_checkout();
    }
}
