use crate::OnlineSpecialist;

/// Online specialists whose category equals `category` exactly, in feed order.
pub fn filter_by_category(specialists: &[OnlineSpecialist], category: &str) -> Vec<OnlineSpecialist> {
    specialists
        .iter()
        .filter(|specialist| specialist.category == category)
        .cloned()
        .collect()
}

/// Picks the specialist a booking attempt is bound to.
pub trait SelectionPolicy: Send + Sync {
    fn choose<'a>(&self, matches: &'a [OnlineSpecialist]) -> Option<&'a OnlineSpecialist>;
}

/// First available specialist in stable feed order. No ranking or load
/// balancing is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAvailable;

impl SelectionPolicy for FirstAvailable {
    fn choose<'a>(&self, matches: &'a [OnlineSpecialist]) -> Option<&'a OnlineSpecialist> {
        matches.first()
    }
}
