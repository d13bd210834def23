use std::time::Instant;

use vitrine_core::EntryLocation;

use crate::controller::{NavigationController, Transition};
use crate::deep_link::DeepLink;

/// Every navigation input (keys, wheel, scroll, links, deck buttons) ends up
/// as one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum NavCommand {
    Next,
    Previous,
    First,
    Last,
    JumpTo(usize),
    /// Toggle the spotlight on a slot (0-based).
    Spotlight(usize),
    ClearSpotlight,
    /// Close the deck if open, otherwise clear the spotlight.
    Escape,
    ToggleDeck,
    /// Favorite the spotlighted card.
    ToggleFavorite,
    FocusSearch,
    Wheel(f32),
    /// Scroll fraction in `[0, 1]`, used in reduced-motion mode.
    ScrollPosition(f32),
    SetReducedMotion(bool),
    /// Back/forward or initial-load link.
    OpenLink(String),
}

/// What the rest of the session has to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum NavEffect {
    Transitioned(Transition),
    SpotlightChanged(Option<usize>),
    DeckChanged(bool),
    /// Favorite toggle requested for the card at this location.
    ToggleFavorite(EntryLocation),
    FocusSearch,
    LinkApplied,
    /// Accepted, but nothing changed (guarded, below threshold, no target).
    Unchanged,
}

/// Apply a command to the controller.
pub fn apply_command(nav: &mut NavigationController, cmd: NavCommand, now: Instant) -> NavEffect {
    let transition = |t: Option<Transition>| t.map_or(NavEffect::Unchanged, NavEffect::Transitioned);
    match cmd {
        NavCommand::Next => transition(nav.trigger_transition(1, now)),
        NavCommand::Previous => transition(nav.trigger_transition(-1, now)),
        NavCommand::First => transition(nav.jump_to_section(0, now)),
        NavCommand::Last => {
            let last = nav.section_count() - 1;
            transition(nav.jump_to_section(last, now))
        }
        NavCommand::JumpTo(index) => transition(nav.jump_to_section(index, now)),
        NavCommand::Spotlight(slot) => NavEffect::SpotlightChanged(nav.toggle_spotlight(slot)),
        NavCommand::ClearSpotlight => {
            if nav.spotlight().is_none() {
                return NavEffect::Unchanged;
            }
            nav.clear_spotlight();
            NavEffect::SpotlightChanged(None)
        }
        NavCommand::Escape => {
            if nav.deck_open() {
                nav.set_deck_open(false);
                NavEffect::DeckChanged(false)
            } else {
                apply_command(nav, NavCommand::ClearSpotlight, now)
            }
        }
        NavCommand::ToggleDeck => {
            let open = !nav.deck_open();
            nav.set_deck_open(open);
            NavEffect::DeckChanged(open)
        }
        NavCommand::ToggleFavorite => match nav.spotlight() {
            Some(slot) => NavEffect::ToggleFavorite(EntryLocation {
                section: nav.current_section(),
                slot,
            }),
            None => NavEffect::Unchanged,
        },
        NavCommand::FocusSearch => NavEffect::FocusSearch,
        NavCommand::Wheel(delta) => transition(nav.on_wheel(delta, now)),
        NavCommand::ScrollPosition(fraction) => transition(nav.on_scroll_position(fraction)),
        NavCommand::SetReducedMotion(reduced) => {
            nav.set_reduced_motion(reduced);
            NavEffect::Unchanged
        }
        NavCommand::OpenLink(link) => {
            if nav.apply_link(&DeepLink::parse(&link)) {
                NavEffect::LinkApplied
            } else {
                NavEffect::Unchanged
            }
        }
    }
}
