//! Typed result of a controller invocation.

use shared::Route;

/// What the hosting shell should do after a controller ran: go to another
/// page, or render the returned state on the current one.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Navigate(Route),
    Render(T),
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Navigate(route) => Outcome::Navigate(route),
            Outcome::Render(state) => Outcome::Render(f(state)),
        }
    }

    pub fn navigation(&self) -> Option<&Route> {
        match self {
            Outcome::Navigate(route) => Some(route),
            Outcome::Render(_) => None,
        }
    }

    pub fn rendered(&self) -> Option<&T> {
        match self {
            Outcome::Navigate(_) => None,
            Outcome::Render(state) => Some(state),
        }
    }
}
