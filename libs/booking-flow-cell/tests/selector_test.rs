use assert_matches::assert_matches;

use booking_flow_cell::*;
use presence_cell::{OnlineSpecialist, PresenceSnapshot};

fn cardiology_only() -> PresenceSnapshot {
    PresenceSnapshot::new(vec![OnlineSpecialist::new("s1", "Cardiology", "Dr. One")])
}

fn mixed_roster() -> PresenceSnapshot {
    PresenceSnapshot::new(vec![
        OnlineSpecialist::new("d1", "Dermatology", "Dr. Derm"),
        OnlineSpecialist::new("s1", "Cardiology", "Dr. One"),
        OnlineSpecialist::new("s2", "Cardiology", "Dr. Two"),
    ])
}

/// Drives a selector into each reachable state.
fn selector_in(state: BookingState) -> BookingSelector {
    let mut selector = BookingSelector::new();
    match state {
        BookingState::Idle => {}
        BookingState::NoSpecialistAvailable => {
            selector.select_category("Urology", &cardiology_only()).unwrap();
        }
        BookingState::SpecialistFound => {
            selector.select_category("Cardiology", &cardiology_only()).unwrap();
        }
        BookingState::PricingPresented => {
            selector.select_category("Cardiology", &cardiology_only()).unwrap();
            selector.present_pricing().unwrap();
        }
        BookingState::PlanAcknowledged => {
            selector.select_category("Cardiology", &cardiology_only()).unwrap();
            selector.select_plan(&PlanSelectionRequest::new(40, 2700)).unwrap();
        }
        BookingState::CheckoutPresented => {
            selector.select_category("Cardiology", &cardiology_only()).unwrap();
            selector.select_plan(&PlanSelectionRequest::new(40, 2700)).unwrap();
            selector.confirm().unwrap();
        }
        BookingState::CategorySelected => {
            selector.select_category("Cardiology", &cardiology_only()).unwrap();
            selector.select_plan(&PlanSelectionRequest::new(40, 2700)).unwrap();
            selector.cancel().unwrap();
        }
        BookingState::Closed => unreachable!("closed is not a resting state"),
    }
    assert_eq!(selector.state(), state);
    selector
}

const RESTING_STATES: [BookingState; 7] = [
    BookingState::Idle,
    BookingState::CategorySelected,
    BookingState::SpecialistFound,
    BookingState::NoSpecialistAvailable,
    BookingState::PricingPresented,
    BookingState::PlanAcknowledged,
    BookingState::CheckoutPresented,
];

#[test]
fn happy_path_reaches_checkout() {
    let mut selector = BookingSelector::new();

    let state = selector.select_category("Cardiology", &cardiology_only()).unwrap();
    assert_eq!(state, BookingState::SpecialistFound);
    assert_eq!(
        selector.selection().unwrap().specialist.as_ref().unwrap().id,
        "s1"
    );

    let gate = selector.select_plan(&PlanSelectionRequest::new(40, 2700)).unwrap();
    assert_eq!(selector.state(), BookingState::PlanAcknowledged);
    assert_eq!(gate.terms, ACKNOWLEDGMENT_TERMS);
    assert_eq!(gate.price_major_units, 40.0);
    assert_eq!(gate.duration_seconds, 2700);

    let checkout = selector.confirm().unwrap();
    assert_eq!(selector.state(), BookingState::CheckoutPresented);
    assert_eq!(checkout.specialist.id, "s1");

    let selection = selector.selection().unwrap();
    assert_eq!(selection.category, "Cardiology");
    assert_eq!(selection.specialist.as_ref().unwrap().id, "s1");
    assert_eq!(selection.price, Some(40.0));
    assert_eq!(selection.duration_seconds, Some(2700));
    assert_eq!(selector.checkout_request().unwrap(), checkout);
}

#[test]
fn no_match_then_close_returns_to_idle() {
    let mut selector = BookingSelector::new();

    let state = selector
        .select_category("Urology", &PresenceSnapshot::empty())
        .unwrap();
    assert_eq!(state, BookingState::NoSpecialistAvailable);
    assert!(selector.selection().unwrap().specialist.is_none());

    let transition = selector.close();
    assert_eq!(transition.from, BookingState::NoSpecialistAvailable);
    assert_eq!(transition.to, BookingState::Closed);
    assert_eq!(selector.state(), BookingState::Idle);
    assert!(selector.selection().is_none());
}

#[test]
fn invalid_plan_leaves_state_unchanged() {
    let mut selector = selector_in(BookingState::SpecialistFound);

    assert_matches!(
        selector.select_plan(&PlanSelectionRequest::new("abc", 900)),
        Err(BookingFlowError::InvalidPlan(_))
    );
    assert_eq!(selector.state(), BookingState::SpecialistFound);
    assert_eq!(selector.selection().unwrap().price, None);
    assert_eq!(selector.selection().unwrap().duration_seconds, None);
}

#[test]
fn second_category_replaces_the_first() {
    let mut selector = BookingSelector::new();
    selector.select_category("Dermatology", &mixed_roster()).unwrap();
    selector.select_plan(&PlanSelectionRequest::new(15, 900)).unwrap();

    selector.select_category("Cardiology", &mixed_roster()).unwrap();

    let selection = selector.selection().unwrap();
    assert_eq!(selection.category, "Cardiology");
    assert_eq!(selection.specialist.as_ref().unwrap().id, "s1");
    assert_eq!(selection.price, None);
    assert_eq!(selector.state(), BookingState::SpecialistFound);
}

#[test]
fn empty_match_always_falls_back() {
    for snapshot in [PresenceSnapshot::empty(), mixed_roster()] {
        for category in ["Urology", "cardiology", "Neurology"] {
            let mut selector = BookingSelector::new();
            assert_eq!(
                selector.select_category(category, &snapshot).unwrap(),
                BookingState::NoSpecialistAvailable
            );
        }
    }
}

#[test]
fn first_match_in_feed_order_is_bound() {
    let mut selector = BookingSelector::new();
    selector.select_category("Cardiology", &mixed_roster()).unwrap();
    assert_eq!(
        selector.selection().unwrap().specialist.as_ref().unwrap().id,
        "s1"
    );
}

#[test]
fn checkout_requires_acknowledgment() {
    for state in [BookingState::SpecialistFound, BookingState::PricingPresented] {
        let mut selector = selector_in(state);
        assert_matches!(selector.confirm(), Err(BookingFlowError::AcknowledgmentRequired));
        assert_eq!(selector.state(), state);
    }

    for state in [
        BookingState::Idle,
        BookingState::CategorySelected,
        BookingState::NoSpecialistAvailable,
        BookingState::CheckoutPresented,
    ] {
        let mut selector = selector_in(state);
        assert!(selector.confirm().is_err());
        assert_eq!(selector.state(), state);
    }
}

#[test]
fn close_resets_from_every_state() {
    for state in RESTING_STATES {
        let mut selector = selector_in(state);
        let transition = selector.close();

        assert_eq!(transition.from, state);
        assert_eq!(selector.state(), BookingState::Idle);
        assert!(selector.selection().is_none());

        let restarted = selector.select_category("Cardiology", &cardiology_only()).unwrap();
        assert_eq!(restarted, BookingState::SpecialistFound);
    }
}

#[test]
fn plan_guards() {
    let mut selector = selector_in(BookingState::NoSpecialistAvailable);
    assert_matches!(
        selector.select_plan(&PlanSelectionRequest::new(40, 2700)),
        Err(BookingFlowError::NoSpecialistBound)
    );
    assert_matches!(selector.present_pricing(), Err(BookingFlowError::NoSpecialistBound));

    let mut selector = selector_in(BookingState::PlanAcknowledged);
    assert_matches!(
        selector.select_plan(&PlanSelectionRequest::new(25, 1800)),
        Err(BookingFlowError::InvalidTransition { from: BookingState::PlanAcknowledged, .. })
    );
    assert_eq!(selector.selection().unwrap().price, Some(40.0));

    let mut selector = selector_in(BookingState::CheckoutPresented);
    assert_matches!(
        selector.select_plan(&PlanSelectionRequest::new(25, 1800)),
        Err(BookingFlowError::InvalidTransition { .. })
    );
    assert_matches!(selector.cancel(), Err(BookingFlowError::InvalidTransition { .. }));
}

#[test]
fn cancel_keeps_category_and_specialist() {
    let mut selector = selector_in(BookingState::PlanAcknowledged);
    selector.cancel().unwrap();

    let selection = selector.selection().unwrap();
    assert_eq!(selector.state(), BookingState::CategorySelected);
    assert_eq!(selection.category, "Cardiology");
    assert_eq!(selection.specialist.as_ref().unwrap().id, "s1");
    assert_eq!(selection.price, None);
    assert_eq!(selection.duration_seconds, None);
}

#[test]
fn fallback_hands_off_category_once() {
    let mut selector = selector_in(BookingState::NoSpecialistAvailable);
    assert_eq!(selector.fallback_category().unwrap(), "Urology");

    assert_eq!(selector.book_appointment_instead().unwrap(), "Urology");
    assert_eq!(selector.state(), BookingState::Idle);
    assert!(selector.selection().is_none());
    assert!(selector.book_appointment_instead().is_err());

    let mut selector = selector_in(BookingState::SpecialistFound);
    assert_matches!(
        selector.book_appointment_instead(),
        Err(BookingFlowError::InvalidTransition { .. })
    );
}
