//! Predicate filtering over collected cards.

use crate::types::Card;

/// Keep the cards that satisfy every predicate, in their original order.
///
/// Predicates are checked in order and stop at the first one that rejects a
/// card. An empty predicate list keeps everything.
pub fn filter(cards: &[Card], predicates: &[&dyn Fn(&Card) -> bool]) -> Vec<Card> {
    cards
        .iter()
        .filter(|card| predicates.iter().all(|p| p(card)))
        .cloned()
        .collect()
}

pub fn rarity_is(rarity: impl Into<String>) -> impl Fn(&Card) -> bool {
    let rarity = rarity.into();
    move |card| card.rarity() == rarity
}

/// Strictly greater than `value`
pub fn price_above(value: f64) -> impl Fn(&Card) -> bool {
    move |card| card.price().value > value
}

pub fn price_at_most(value: f64) -> impl Fn(&Card) -> bool {
    move |card| card.price().value <= value
}

pub fn in_set(set: impl Into<String>) -> impl Fn(&Card) -> bool {
    let set = set.into();
    move |card| card.set().eq_ignore_ascii_case(&set)
}

pub fn is_foil(card: &Card) -> bool {
    card.foil()
}

pub fn is_regular(card: &Card) -> bool {
    !card.foil()
}

/// Case-insensitive substring match on the card name
pub fn name_contains(needle: impl Into<String>) -> impl Fn(&Card) -> bool {
    let needle = needle.into().to_lowercase();
    move |card| card.name().to_lowercase().contains(&needle)
}
