//! Speculative parsing with guaranteed commit or rollback

use std::ops::{Deref, DerefMut};

use log::debug;

use super::parser::Parser;
use super::token::{Mark, TokenSource};

/// A speculative region over a parser.
///
/// Created by [`Parser::tentative`]. Exactly one of [`commit`](Self::commit)
/// or [`rollback`](Self::rollback) must be called. A guard dropped without
/// either is a bug: debug builds abort, release builds roll back.
///
/// While the guard is alive the parser is reachable only through it, so
/// speculative regions nest strictly.
pub struct TentativeParse<'p, 'c, S: TokenSource> {
    parser: &'p mut Parser<'c, S>,
    mark: Option<Mark>,
}

impl<'p, 'c, S: TokenSource> TentativeParse<'p, 'c, S> {
    pub(super) fn new(parser: &'p mut Parser<'c, S>) -> Self {
        let mark = parser.tokens_mut().mark();
        Self {
            parser,
            mark: Some(mark),
        }
    }

    /// Keeps everything consumed since the guard was created.
    pub fn commit(mut self) {
        if let Some(mark) = self.mark.take() {
            self.parser.tokens_mut().commit(mark);
        }
    }

    /// Restores the token position captured when the guard was created.
    pub fn rollback(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if let Some(mark) = self.mark.take() {
            debug!(
                "tentative parse rolled back to token {}",
                mark.position()
            );
            self.parser.tokens_mut().reset(mark);
        }
    }
}

impl<'c, S: TokenSource> Deref for TentativeParse<'_, 'c, S> {
    type Target = Parser<'c, S>;

    fn deref(&self) -> &Self::Target {
        &*self.parser
    }
}

impl<'c, S: TokenSource> DerefMut for TentativeParse<'_, 'c, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.parser
    }
}

impl<S: TokenSource> Drop for TentativeParse<'_, '_, S> {
    fn drop(&mut self) {
        if self.mark.is_none() {
            return;
        }
        // don't turn an unwinding panic into an abort
        if !std::thread::panicking() {
            debug_assert!(
                false,
                "tentative parse was neither committed nor rolled back"
            );
        }
        self.restore();
    }
}
