/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

//! The PAMPAC pattern matching engine: [`Parser`] combinators are evaluated at a [`Location`] within a
//! [`Context`] and produce [`MatchResult`]s with their [`Bindings`]. A [`Pampac`] matcher applies a list
//! of [`Rule`]s over a document and carries out their [`Action`]s.

mod action;
mod location;
mod modifiers;
mod parser;
mod primitives;
mod result;
mod rule;

pub use action::*;
pub use location::*;
pub use modifiers::*;
pub use parser::*;
pub use primitives::*;
pub use result::*;
pub use rule::*;
