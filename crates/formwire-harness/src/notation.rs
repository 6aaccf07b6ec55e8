//! Marble-style timeline notation.
//!
//! Every character is one tick. `-` is a tick with nothing on it; any other
//! run of characters is a single token placed at the tick of its first
//! character, so `e---u1--x` puts `e` at 0, `u1` at 4 and `x` at 8.
//!
//! Tokens are looked up in a value table. Tokens starting with `#` are looked
//! up in an error table and `|` completes the stream. An unknown token, or any
//! token after `|` or an error, is a bug in the test and panics.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use formwire_core::{Event, StreamError, Tick};

use crate::recorder::Recorded;

pub fn parse_timeline<K1, K2, T, E>(
    timeline: &str,
    values: &HashMap<K1, T>,
    errors: &HashMap<K2, E>,
) -> Vec<Recorded<Event<T, E>>>
where
    K1: Borrow<str> + Hash + Eq + Debug,
    K2: Borrow<str> + Hash + Eq + Debug,
    T: Clone,
    E: Clone,
{
    let chars: Vec<char> = timeline.chars().collect();
    let mut events: Vec<Recorded<Event<T, E>>> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '-' {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i] != '-' {
            i += 1;
        }
        let token: String = chars[start..i].iter().collect();
        let time = start as Tick;

        if let Some(last) = events.last()
            && last.value.is_terminal()
        {
            panic!(
                "timeline {timeline:?}: token {token:?} at tick {time} follows a terminal event"
            );
        }

        let event = if token == "|" {
            Event::Completed
        } else if token.starts_with('#') {
            match errors.get(token.as_str()) {
                Some(e) => Event::Error(e.clone()),
                None => panic!(
                    "timeline {timeline:?}: error {token:?} is not registered; known errors: {:?}",
                    errors.keys().collect::<Vec<_>>()
                ),
            }
        } else {
            match values.get(token.as_str()) {
                Some(v) => Event::Next(v.clone()),
                None => panic!(
                    "timeline {timeline:?}: value {token:?} is not registered; known values: {:?}",
                    values.keys().collect::<Vec<_>>()
                ),
            }
        };
        events.push(Recorded::new(time, event));
    }

    events
}

/// [`parse_timeline`] for streams that carry no errors of their own.
pub fn parse_values<K, T>(timeline: &str, values: &HashMap<K, T>) -> Vec<Recorded<Event<T>>>
where
    K: Borrow<str> + Hash + Eq + Debug,
    T: Clone,
{
    parse_timeline(timeline, values, &HashMap::<&str, StreamError>::new())
}
