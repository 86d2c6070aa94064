use std::sync::Arc;

use tracing::{debug, warn};

use presence_cell::{filter_by_category, FirstAvailable, PresenceSnapshot, SelectionPolicy};

use crate::{
    AcknowledgmentGate, BookingFlowError, BookingSelection, BookingState, CheckoutRequest,
    PlanSelectionRequest, PlanTerms, Transition,
};

/// State machine for a single user's booking attempt.
///
/// Holds at most one `BookingSelection`. Every rejected operation leaves both
/// the state and the selection untouched.
pub struct BookingSelector {
    state: BookingState,
    selection: Option<BookingSelection>,
    policy: Arc<dyn SelectionPolicy>,
    payment_pending: bool,
}

impl BookingSelector {
    pub fn new() -> Self {
        Self::with_policy(Arc::new(FirstAvailable))
    }

    pub fn with_policy(policy: Arc<dyn SelectionPolicy>) -> Self {
        Self {
            state: BookingState::Idle,
            selection: None,
            policy,
            payment_pending: false,
        }
    }

    pub fn state(&self) -> BookingState {
        self.state
    }

    pub fn selection(&self) -> Option<&BookingSelection> {
        self.selection.as_ref()
    }

    /// True between `begin_checkout` and the payment outcome.
    pub fn payment_pending(&self) -> bool {
        self.payment_pending
    }

    /// Starts a new attempt for `category`, discarding any attempt in
    /// progress, and binds a specialist from `snapshot` if one matches.
    pub fn select_category(
        &mut self,
        category: &str,
        snapshot: &PresenceSnapshot,
    ) -> Result<BookingState, BookingFlowError> {
        let category = category.trim();
        if category.is_empty() {
            return Err(BookingFlowError::ValidationError(
                "category must not be empty".to_string(),
            ));
        }
        if self.payment_pending {
            return Err(BookingFlowError::CheckoutInProgress);
        }

        if let Some(previous) = self.selection.take() {
            debug!(
                "Discarding {} booking in state {} for new category {}",
                previous.category, self.state, category
            );
        }

        let mut selection = BookingSelection::new(category);
        self.state = BookingState::CategorySelected;

        let matches = filter_by_category(snapshot.specialists(), category);
        self.state = match self.policy.choose(&matches) {
            Some(specialist) => {
                debug!(
                    "Bound specialist {} for {} ({} online in category)",
                    specialist.id,
                    category,
                    matches.len()
                );
                selection.specialist = Some(specialist.clone());
                BookingState::SpecialistFound
            }
            None => {
                debug!("No {} specialist online", category);
                BookingState::NoSpecialistAvailable
            }
        };

        self.selection = Some(selection);
        Ok(self.state)
    }

    /// Moves to the pricing view. Also re-enters pricing after a `cancel`.
    pub fn present_pricing(&mut self) -> Result<(), BookingFlowError> {
        match self.state {
            BookingState::SpecialistFound | BookingState::PricingPresented => {}
            BookingState::CategorySelected if self.has_specialist() => {}
            BookingState::PlanAcknowledged | BookingState::CheckoutPresented => {
                return Err(self.invalid("present pricing"));
            }
            _ => return Err(BookingFlowError::NoSpecialistBound),
        }

        self.state = BookingState::PricingPresented;
        Ok(())
    }

    /// Binds price and duration from a plan and raises the acknowledgment
    /// gate. Invalid values abort the transition.
    pub fn select_plan(
        &mut self,
        request: &PlanSelectionRequest,
    ) -> Result<AcknowledgmentGate, BookingFlowError> {
        self.ensure_accepts_plan()?;

        let terms = PlanTerms::try_from(request).map_err(|e| {
            warn!("Rejected plan selection in state {}: {}", self.state, e);
            e
        })?;

        let selection = self
            .selection
            .as_mut()
            .ok_or(BookingFlowError::NoSpecialistBound)?;
        selection.price = Some(terms.price_major_units);
        selection.duration_seconds = Some(terms.duration_seconds);
        self.state = BookingState::PlanAcknowledged;

        debug!(
            "Plan chosen: {} for {}s, awaiting acknowledgment",
            terms.price_major_units, terms.duration_seconds
        );
        Ok(AcknowledgmentGate::new(terms))
    }

    /// Fails unless a specialist is bound and the attempt is at pricing.
    pub fn ensure_accepts_plan(&self) -> Result<(), BookingFlowError> {
        if !self.has_specialist() {
            warn!("Plan selected in state {} without a bound specialist", self.state);
            return Err(BookingFlowError::NoSpecialistBound);
        }
        if !self.state.accepts_plan() {
            return Err(self.invalid("select a plan"));
        }
        Ok(())
    }

    /// Accepts the session terms and presents checkout.
    pub fn confirm(&mut self) -> Result<CheckoutRequest, BookingFlowError> {
        match self.state {
            BookingState::PlanAcknowledged => {}
            BookingState::SpecialistFound | BookingState::PricingPresented => {
                return Err(BookingFlowError::AcknowledgmentRequired);
            }
            _ => return Err(self.invalid("confirm")),
        }

        let checkout = self.build_checkout()?;
        self.state = BookingState::CheckoutPresented;
        debug!("Checkout presented for specialist {}", checkout.specialist.id);
        Ok(checkout)
    }

    /// Backs out of the acknowledgment gate, clearing price and duration.
    pub fn cancel(&mut self) -> Result<(), BookingFlowError> {
        if self.state != BookingState::PlanAcknowledged {
            return Err(self.invalid("cancel the plan"));
        }

        if let Some(selection) = self.selection.as_mut() {
            selection.price = None;
            selection.duration_seconds = None;
        }
        self.state = BookingState::CategorySelected;
        Ok(())
    }

    /// The checkout being paid for; available until the attempt closes.
    pub fn checkout_request(&self) -> Result<CheckoutRequest, BookingFlowError> {
        if self.state != BookingState::CheckoutPresented {
            return Err(self.invalid("pay"));
        }
        self.build_checkout()
    }

    /// Claims the presented checkout for one payment call. A second claim
    /// fails until `abort_checkout` releases the first.
    pub fn begin_checkout(&mut self) -> Result<CheckoutRequest, BookingFlowError> {
        if self.payment_pending {
            return Err(BookingFlowError::CheckoutInProgress);
        }
        let checkout = self.checkout_request()?;
        self.payment_pending = true;
        Ok(checkout)
    }

    /// Releases a claim whose payment call failed; the checkout stays presented.
    pub fn abort_checkout(&mut self) {
        self.payment_pending = false;
    }

    /// Category to hand to scheduling when nobody is online.
    pub fn fallback_category(&self) -> Result<String, BookingFlowError> {
        match (&self.state, &self.selection) {
            (BookingState::NoSpecialistAvailable, Some(selection)) => Ok(selection.category.clone()),
            _ => Err(self.invalid("book an appointment")),
        }
    }

    /// Leaves the state machine for the scheduling flow.
    pub fn book_appointment_instead(&mut self) -> Result<String, BookingFlowError> {
        let category = self.fallback_category()?;
        self.selection = None;
        self.state = BookingState::Idle;
        debug!("Handing {} off to appointment scheduling", category);
        Ok(category)
    }

    /// Ends the attempt from any state. The selector is ready for a fresh
    /// `select_category` afterwards.
    pub fn close(&mut self) -> Transition {
        let from = self.state;
        self.selection = None;
        self.state = BookingState::Idle;
        self.payment_pending = false;
        debug!("Booking closed from state {}", from);

        Transition {
            from,
            to: BookingState::Closed,
        }
    }

    fn has_specialist(&self) -> bool {
        self.selection
            .as_ref()
            .map(|selection| selection.specialist.is_some())
            .unwrap_or(false)
    }

    fn build_checkout(&self) -> Result<CheckoutRequest, BookingFlowError> {
        let selection = self
            .selection
            .as_ref()
            .ok_or(BookingFlowError::NoActiveAttempt)?;
        let specialist = selection
            .specialist
            .clone()
            .ok_or(BookingFlowError::NoSpecialistBound)?;

        match (selection.price, selection.duration_seconds) {
            (Some(price_major_units), Some(duration_seconds)) => Ok(CheckoutRequest {
                category: selection.category.clone(),
                specialist,
                price_major_units,
                duration_seconds,
            }),
            _ => Err(BookingFlowError::AcknowledgmentRequired),
        }
    }

    fn invalid(&self, action: &'static str) -> BookingFlowError {
        BookingFlowError::InvalidTransition {
            from: self.state,
            action,
        }
    }
}

impl Default for BookingSelector {
    fn default() -> Self {
        Self::new()
    }
}
