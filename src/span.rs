/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::annotation::AnnotationHandle;
use crate::error::PampacError;

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(try_from = "SpanBuilder")]
/// Corresponds to a slice of the text. This only contains minimal
/// information; i.e. the start offset and end offset (non-inclusive), in unicode codepoints.
///
/// The invariant `start <= end` is enforced by [`Span::new()`]. Zero-length spans are valid and
/// are used to express points in the text.
pub struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl Ord for Span {
    // this determines the canonical ordering for spans
    fn cmp(&self, other: &Self) -> Ordering {
        let ord = self.start.cmp(&other.start);
        if ord != Ordering::Equal {
            ord
        } else {
            self.end.cmp(&other.end)
        }
    }
}

impl PartialOrd for Span {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.start, self.end)
    }
}

/// Unvalidated offsets as read from JSON, only turned into a [`Span`] through [`Span::new()`]
#[derive(Deserialize)]
struct SpanBuilder {
    start: usize,
    end: usize,
}

impl TryFrom<SpanBuilder> for Span {
    type Error = PampacError;

    fn try_from(builder: SpanBuilder) -> Result<Self, Self::Error> {
        Self::new(builder.start, builder.end)
    }
}

impl TryFrom<(usize, usize)> for Span {
    type Error = PampacError;

    fn try_from((start, end): (usize, usize)) -> Result<Self, Self::Error> {
        Self::new(start, end)
    }
}

impl Span {
    /// Creates a new span, returns [`PampacError::InvalidSpan`] if `start > end`
    pub fn new(start: usize, end: usize) -> Result<Self, PampacError> {
        if start > end {
            Err(PampacError::InvalidSpan(
                start,
                end,
                end,
                "Start must not be greater than end",
            ))
        } else {
            Ok(Self { start, end })
        }
    }

    /// Creates a zero-length span at the given offset
    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Only for internal use where the invariant is guaranteed by construction
    pub(crate) fn new_unchecked(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Return the start offset (unicode points)
    pub fn start(&self) -> usize {
        self.start
    }

    /// Return the end offset (non-inclusive) in unicode points
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn length(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Tests whether the offset falls inside this span (start inclusive, end exclusive)
    pub fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Returns the smallest span covering both spans
    pub fn union(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Checks whether this span lies within a text of the given length
    pub fn check_bounds(&self, textlen: usize) -> Result<(), PampacError> {
        if self.end > textlen {
            Err(PampacError::InvalidSpan(
                self.start,
                self.end,
                textlen,
                "Span exceeds the length of the text",
            ))
        } else {
            Ok(())
        }
    }
}

/// This trait is implemented by everything that occupies a span of text: spans themselves and annotations.
/// It provides all the relation predicates between two spans.
pub trait HasSpan {
    fn span(&self) -> Span;

    /// Identity of the item, if it is an annotation. Used to exclude an annotation from queries relative to itself.
    fn identity(&self) -> Option<AnnotationHandle> {
        None
    }

    fn start(&self) -> usize {
        self.span().start
    }

    fn end(&self) -> usize {
        self.span().end
    }

    fn length(&self) -> usize {
        self.span().length()
    }

    /// Both spans share at least one codepoint. Zero-length spans only overlap with spans that strictly contain their offset.
    fn overlapping<S: HasSpan + ?Sized>(&self, other: &S) -> bool {
        let (a, b) = (self.span(), other.span());
        !(a.end <= b.start || b.end <= a.start)
    }

    /// This span lies completely within the other
    fn within<S: HasSpan + ?Sized>(&self, other: &S) -> bool {
        let (a, b) = (self.span(), other.span());
        a.start >= b.start && a.end <= b.end
    }

    /// The other span lies completely within this one
    fn covering<S: HasSpan + ?Sized>(&self, other: &S) -> bool {
        let (a, b) = (self.span(), other.span());
        b.start >= a.start && b.end <= a.end
    }

    fn coextensive<S: HasSpan + ?Sized>(&self, other: &S) -> bool {
        let (a, b) = (self.span(), other.span());
        a.start == b.start && a.end == b.end
    }

    /// This span ends before (or where, if `immediately`, exactly where) the other starts
    fn isbefore<S: HasSpan + ?Sized>(&self, other: &S, immediately: bool) -> bool {
        let (a, b) = (self.span(), other.span());
        a.end <= b.start && (!immediately || a.end == b.start)
    }

    /// This span starts after (or, if `immediately`, exactly where) the other ends
    fn isafter<S: HasSpan + ?Sized>(&self, other: &S, immediately: bool) -> bool {
        other.isbefore(self, immediately)
    }

    fn startsat<S: HasSpan + ?Sized>(&self, other: &S) -> bool {
        self.span().start == other.span().start
    }

    fn endsat<S: HasSpan + ?Sized>(&self, other: &S) -> bool {
        self.span().end == other.span().end
    }

    /// Number of codepoints between two non-overlapping spans, irrespective of their order.
    /// Returns [`PampacError::UndefinedRelation`] if the spans overlap.
    fn gap<S: HasSpan + ?Sized>(&self, other: &S) -> Result<usize, PampacError> {
        let (a, b) = (self.span(), other.span());
        if self.overlapping(other) {
            Err(PampacError::UndefinedRelation(
                a,
                b,
                "gap is only defined for non-overlapping spans",
            ))
        } else {
            Ok(a.start.max(b.start) - a.end.min(b.end))
        }
    }
}

impl HasSpan for Span {
    fn span(&self) -> Span {
        *self
    }
}

impl<T: HasSpan + ?Sized> HasSpan for &T {
    fn span(&self) -> Span {
        (**self).span()
    }
    fn identity(&self) -> Option<AnnotationHandle> {
        (**self).identity()
    }
}

impl<T: HasSpan + ?Sized> HasSpan for Arc<T> {
    fn span(&self) -> Span {
        (**self).span()
    }
    fn identity(&self) -> Option<AnnotationHandle> {
        (**self).identity()
    }
}

/// The SpanRelation, simply put, allows comparison of two spans. It
/// allows testing for all kinds of spatial relations (as embodied by this enum) in which two
/// spans can be. The relation is always read as "A *relation* B", e.g. "A within B".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanRelation {
    /// A lies completely within B
    Within,
    /// A and B share at least one codepoint, commutative
    Overlapping,
    /// B lies completely within A
    Covering,
    /// A and B have the exact same offsets, commutative
    Coextensive,
    /// A ends before B starts (with no gap if `immediately`)
    Before { immediately: bool },
    /// A starts after B ends (with no gap if `immediately`)
    After { immediately: bool },
    /// A starts where B starts
    StartsAt,
    /// A ends where B ends
    EndsAt,
}

impl SpanRelation {
    /// This method is called to test whether the relation holds between span `a` and span `b`
    pub fn test<A: HasSpan + ?Sized, B: HasSpan + ?Sized>(&self, a: &A, b: &B) -> bool {
        match self {
            Self::Within => a.within(b),
            Self::Overlapping => a.overlapping(b),
            Self::Covering => a.covering(b),
            Self::Coextensive => a.coextensive(b),
            Self::Before { immediately } => a.isbefore(b, *immediately),
            Self::After { immediately } => a.isafter(b, *immediately),
            Self::StartsAt => a.startsat(b),
            Self::EndsAt => a.endsat(b),
        }
    }

    /// Returns the relation with A and B swapped
    pub fn inverse(&self) -> Self {
        match self {
            Self::Within => Self::Covering,
            Self::Covering => Self::Within,
            Self::Before { immediately } => Self::After {
                immediately: *immediately,
            },
            Self::After { immediately } => Self::Before {
                immediately: *immediately,
            },
            other => *other,
        }
    }
}

impl fmt::Display for SpanRelation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Within => write!(f, "within"),
            Self::Overlapping => write!(f, "overlapping"),
            Self::Covering => write!(f, "covering"),
            Self::Coextensive => write!(f, "coextensive"),
            Self::Before { immediately: true } => write!(f, "immediately before"),
            Self::Before { immediately: false } => write!(f, "before"),
            Self::After { immediately: true } => write!(f, "immediately after"),
            Self::After { immediately: false } => write!(f, "after"),
            Self::StartsAt => write!(f, "starts at"),
            Self::EndsAt => write!(f, "ends at"),
        }
    }
}
