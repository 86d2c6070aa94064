use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use mockall::mock;
use tokio::time::{sleep, Duration};
use tokio_test::assert_ok;

use booking_flow_cell::*;
use presence_cell::{
    FeedStatus, LocalPresenceChannel, OnlineSpecialist, PresenceFeed, PresenceHandle,
};

mock! {
    pub Payments {}

    #[async_trait]
    impl PaymentCollaborator for Payments {
        async fn initiate_payment(
            &self,
            request: PaymentRequest,
            auth_token: &str,
        ) -> Result<PaymentInitiation, BookingFlowError>;
    }
}

mock! {
    pub Scheduling {}

    #[async_trait]
    impl SchedulingCollaborator for Scheduling {
        async fn request_appointment(
            &self,
            request: SchedulingRequest,
            auth_token: &str,
        ) -> Result<SchedulingHandoff, BookingFlowError>;
    }
}

struct Harness {
    service: BookingFlowService,
    channel: LocalPresenceChannel,
    _handle: PresenceHandle,
}

async fn wait_until_live(handle: &PresenceHandle) {
    for _ in 0..50 {
        if handle.status() == FeedStatus::Live {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("presence feed never went live");
}

async fn harness(
    payments: impl PaymentCollaborator + 'static,
    scheduling: MockScheduling,
) -> Harness {
    let channel = LocalPresenceChannel::with_roster(vec![
        OnlineSpecialist::new("s1", "Cardiology", "Dr. One"),
        OnlineSpecialist::new("s2", "Cardiology", "Dr. Two"),
    ]);
    let feed = Arc::new(PresenceFeed::new(Arc::new(channel.clone())));
    let handle = feed.connect().await.unwrap();
    wait_until_live(&handle).await;

    let service = BookingFlowService::new(
        feed,
        PricingCatalog::standard(),
        CheckoutService::new(Arc::new(payments), "USD"),
        Arc::new(scheduling),
    );

    Harness {
        service,
        channel,
        _handle: handle,
    }
}

async fn to_checkout(service: &BookingFlowService, user: &str) {
    service.select_category(user, "Cardiology").await.unwrap();
    service.present_pricing(user).await.unwrap();
    service
        .select_plan(user, &PlanSelectionRequest::new(40, 2700))
        .await
        .unwrap();
    service.confirm(user).await.unwrap();
}

#[tokio::test]
async fn successful_payment_ends_the_attempt() {
    let mut payments = MockPayments::new();
    payments
        .expect_initiate_payment()
        .withf(|request, token| {
            request.amount == 40.0
                && request.currency == "USD"
                && request.payer_email == "patient@example.com"
                && request.product_description == "Cardiology consultation with Dr. One (45 min)"
                && token == "token-1"
        })
        .times(1)
        .returning(|_, _| {
            Ok(PaymentInitiation {
                redirect_url: "https://pay.example.com/abc".to_string(),
                reference: Some("ref-1".to_string()),
            })
        });

    let h = harness(payments, MockScheduling::new()).await;
    to_checkout(&h.service, "patient-1").await;

    let initiation = assert_ok!(
        h.service
            .checkout("patient-1", "patient@example.com", "token-1")
            .await
    );

    assert_eq!(initiation.redirect_url, "https://pay.example.com/abc");
    assert_eq!(h.service.active_attempts().await, 0);
    assert_eq!(h.service.view("patient-1").await.state, BookingState::Idle);
}

#[tokio::test]
async fn failed_payment_stays_at_checkout_for_retry() {
    let mut payments = MockPayments::new();
    let mut attempts = 0;
    payments
        .expect_initiate_payment()
        .times(2)
        .returning(move |_, _| {
            attempts += 1;
            if attempts == 1 {
                Err(BookingFlowError::PaymentError("gateway timeout".to_string()))
            } else {
                Ok(PaymentInitiation {
                    redirect_url: "https://pay.example.com/retry".to_string(),
                    reference: None,
                })
            }
        });

    let h = harness(payments, MockScheduling::new()).await;
    to_checkout(&h.service, "patient-1").await;

    assert_matches!(
        h.service.checkout("patient-1", "patient@example.com", "t").await,
        Err(BookingFlowError::PaymentError(_))
    );
    assert_eq!(
        h.service.view("patient-1").await.state,
        BookingState::CheckoutPresented
    );

    let retried = h
        .service
        .checkout("patient-1", "patient@example.com", "t")
        .await
        .unwrap();
    assert_eq!(retried.redirect_url, "https://pay.example.com/retry");
}

#[tokio::test]
async fn checkout_before_confirm_never_calls_payment() {
    let mut payments = MockPayments::new();
    payments.expect_initiate_payment().times(0);

    let h = harness(payments, MockScheduling::new()).await;
    h.service.select_category("patient-1", "Cardiology").await.unwrap();
    h.service
        .select_plan("patient-1", &PlanSelectionRequest::new(40, 2700))
        .await
        .unwrap();

    assert_matches!(
        h.service.checkout("patient-1", "patient@example.com", "t").await,
        Err(BookingFlowError::InvalidTransition { .. })
    );
    assert_matches!(
        h.service.checkout("nobody", "patient@example.com", "t").await,
        Err(BookingFlowError::NoActiveAttempt)
    );
}

#[tokio::test]
async fn plans_outside_the_catalog_are_rejected() {
    let h = harness(MockPayments::new(), MockScheduling::new()).await;
    h.service.select_category("patient-1", "Cardiology").await.unwrap();

    assert_matches!(
        h.service
            .select_plan("patient-1", &PlanSelectionRequest::new(1, 2700))
            .await,
        Err(BookingFlowError::InvalidPlan(_))
    );
    assert_matches!(
        h.service
            .select_plan("patient-1", &PlanSelectionRequest::new("abc", 900))
            .await,
        Err(BookingFlowError::InvalidPlan(_))
    );

    let view = h.service.view("patient-1").await;
    assert_eq!(view.state, BookingState::SpecialistFound);
    assert_eq!(view.selection.unwrap().price, None);
}

#[tokio::test]
async fn users_have_independent_attempts() {
    let h = harness(MockPayments::new(), MockScheduling::new()).await;

    h.service.select_category("patient-1", "Cardiology").await.unwrap();
    h.service.select_category("patient-2", "Urology").await.unwrap();
    h.service.select_category("patient-1", "Cardiology").await.unwrap();

    assert_eq!(h.service.active_attempts().await, 2);
    assert_eq!(
        h.service.view("patient-1").await.state,
        BookingState::SpecialistFound
    );
    assert_eq!(
        h.service.view("patient-2").await.state,
        BookingState::NoSpecialistAvailable
    );

    let transition = h.service.close("patient-2").await;
    assert_eq!(transition.from, BookingState::NoSpecialistAvailable);
    assert_eq!(h.service.active_attempts().await, 1);
}

#[tokio::test]
async fn fallback_hands_off_to_scheduling() {
    let mut scheduling = MockScheduling::new();
    scheduling
        .expect_request_appointment()
        .withf(|request, token| {
            request.category == "Urology" && request.patient_id == "patient-1" && token == "tok"
        })
        .times(1)
        .returning(|request, _| {
            Ok(SchedulingHandoff {
                category: request.category,
                request_id: Some("apt-req-1".to_string()),
                next_step: SCHEDULING_NEXT_STEP.to_string(),
            })
        });

    let h = harness(MockPayments::new(), scheduling).await;
    let view = h.service.select_category("patient-1", "Urology").await.unwrap();
    assert_eq!(view.state, BookingState::NoSpecialistAvailable);
    assert!(view.message.unwrap().contains("Urology"));

    let handoff = assert_ok!(h.service.book_appointment_instead("patient-1", "tok").await);
    assert_eq!(handoff.request_id.as_deref(), Some("apt-req-1"));
    assert_eq!(h.service.active_attempts().await, 0);
}

#[tokio::test]
async fn scheduling_failure_keeps_the_fallback() {
    let mut scheduling = MockScheduling::new();
    scheduling
        .expect_request_appointment()
        .returning(|_, _| Err(BookingFlowError::SchedulingError("backend down".to_string())));

    let h = harness(MockPayments::new(), scheduling).await;
    h.service.select_category("patient-1", "Urology").await.unwrap();

    assert_matches!(
        h.service.book_appointment_instead("patient-1", "tok").await,
        Err(BookingFlowError::SchedulingError(_))
    );
    assert_eq!(
        h.service.view("patient-1").await.state,
        BookingState::NoSpecialistAvailable
    );
}

#[tokio::test]
async fn selection_uses_latest_presence_and_reports_staleness() {
    let h = harness(MockPayments::new(), MockScheduling::new()).await;

    h.channel
        .set_online(vec![OnlineSpecialist::new("u1", "Urology", "Dr. Uro")])
        .await
        .unwrap();
    for _ in 0..50 {
        let view = h.service.select_category("patient-1", "Urology").await.unwrap();
        if view.state == BookingState::SpecialistFound {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    let view = h.service.view("patient-1").await;
    assert_eq!(view.state, BookingState::SpecialistFound);
    assert_eq!(view.selection.unwrap().specialist.unwrap().id, "u1");
    assert!(!view.presence_stale);

    h.channel.simulate_disconnect();
    for _ in 0..50 {
        if h.service.view("patient-1").await.presence_stale {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    let view = h.service.view("patient-1").await;
    assert!(view.presence_stale);
    assert_eq!(view.presence_status, FeedStatus::Disconnected);
}

/// Gateway that takes a while to answer and counts its calls.
struct SlowPayments {
    calls: Arc<AtomicUsize>,
}

impl SlowPayments {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl PaymentCollaborator for SlowPayments {
    async fn initiate_payment(
        &self,
        request: PaymentRequest,
        _auth_token: &str,
    ) -> Result<PaymentInitiation, BookingFlowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sleep(Duration::from_millis(200)).await;
        Ok(PaymentInitiation {
            redirect_url: format!("https://pay.example.com/{}", request.amount),
            reference: None,
        })
    }
}

#[tokio::test]
async fn concurrent_checkouts_pay_once() {
    let (payments, calls) = SlowPayments::new();
    let h = harness(payments, MockScheduling::new()).await;
    to_checkout(&h.service, "patient-1").await;

    let (first, second) = tokio::join!(
        h.service.checkout("patient-1", "patient@example.com", "t"),
        h.service.checkout("patient-1", "patient@example.com", "t"),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let (paid, rejected) = if first.is_ok() { (first, second) } else { (second, first) };
    assert_ok!(paid);
    assert_matches!(rejected, Err(BookingFlowError::CheckoutInProgress));
    assert_eq!(h.service.active_attempts().await, 0);
}

#[tokio::test]
async fn restarted_attempt_survives_a_late_payment() {
    let (payments, _) = SlowPayments::new();
    let h = harness(payments, MockScheduling::new()).await;
    let service = Arc::new(h.service);
    to_checkout(&service, "patient-1").await;

    let pending = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .checkout("patient-1", "patient@example.com", "t")
                .await
        })
    };
    sleep(Duration::from_millis(50)).await;

    service.close("patient-1").await;
    to_checkout(&service, "patient-1").await;

    assert_ok!(pending.await.unwrap());
    assert_eq!(
        service.view("patient-1").await.state,
        BookingState::CheckoutPresented
    );
}

#[tokio::test]
async fn abandoned_checkout_releases_the_attempt() {
    let (payments, calls) = SlowPayments::new();
    let h = harness(payments, MockScheduling::new()).await;
    let service = Arc::new(h.service);
    to_checkout(&service, "patient-2").await;
    let pending = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .checkout("patient-2", "patient@example.com", "t")
                .await
        })
    };
    sleep(Duration::from_millis(50)).await;
    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());

    for _ in 0..50 {
        if service.active_attempts().await == 0 {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.active_attempts().await, 0);
}

#[tokio::test]
async fn catalog_terms_are_bound_not_client_terms() {
    let mut payments = MockPayments::new();
    payments
        .expect_initiate_payment()
        .withf(|request, _| request.amount == 40.0)
        .times(1)
        .returning(|_, _| {
            Ok(PaymentInitiation {
                redirect_url: "https://pay.example.com/ok".to_string(),
                reference: None,
            })
        });

    let h = harness(payments, MockScheduling::new()).await;
    h.service.select_category("patient-1", "Cardiology").await.unwrap();
    h.service.present_pricing("patient-1").await.unwrap();

    let gate = h
        .service
        .select_plan("patient-1", &PlanSelectionRequest::new(39.996, 2700))
        .await
        .unwrap();
    assert_eq!(gate.price_major_units, 40.0);

    let checkout = h.service.confirm("patient-1").await.unwrap();
    assert_eq!(checkout.price_major_units, 40.0);
    assert_ok!(
        h.service
            .checkout("patient-1", "patient@example.com", "t")
            .await
    );
}

#[tokio::test]
async fn plan_guards_run_before_the_catalog() {
    let h = harness(MockPayments::new(), MockScheduling::new()).await;

    assert_matches!(
        h.service
            .select_plan("patient-1", &PlanSelectionRequest::new(1, 2700))
            .await,
        Err(BookingFlowError::NoActiveAttempt)
    );

    h.service.select_category("patient-1", "Urology").await.unwrap();
    assert_matches!(
        h.service
            .select_plan("patient-1", &PlanSelectionRequest::new(1, 2700))
            .await,
        Err(BookingFlowError::NoSpecialistBound)
    );

    h.service.select_category("patient-1", "Cardiology").await.unwrap();
    h.service
        .select_plan("patient-1", &PlanSelectionRequest::new(40, 2700))
        .await
        .unwrap();
    assert_matches!(
        h.service
            .select_plan("patient-1", &PlanSelectionRequest::new(1, 2700))
            .await,
        Err(BookingFlowError::InvalidTransition { .. })
    );
}
