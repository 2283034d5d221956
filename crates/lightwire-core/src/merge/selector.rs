//! Selection policies for merge chains
//!
//! A selector reduces the values currently held by a chain's producers to a
//! single value. Values arrive ordered most-recently-registered first and the
//! slice is never empty when a chain calls a selector.

use crate::dmx::DmxFrame;

/// Reduces the available values of a chain to one
pub trait Selector<T>: Send + Sync {
    fn select(&self, values: &[T]) -> Option<T>;
}

impl<T, F> Selector<T> for F
where
    F: Fn(&[T]) -> Option<T> + Send + Sync,
{
    fn select(&self, values: &[T]) -> Option<T> {
        self(values)
    }
}

/// Latest takes precedence: the newest registrant with a value wins
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestTakesPrecedence;

impl<T: Clone> Selector<T> for LatestTakesPrecedence {
    fn select(&self, values: &[T]) -> Option<T> {
        values.first().cloned()
    }
}

/// Highest takes precedence: the greatest value wins regardless of age
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestTakesPrecedence;

impl<T: Ord + Clone> Selector<T> for HighestTakesPrecedence {
    fn select(&self, values: &[T]) -> Option<T> {
        values.iter().max().cloned()
    }
}

/// Highest takes precedence per channel across whole frames
#[derive(Debug, Clone, Copy, Default)]
pub struct HtpFrames;

impl Selector<DmxFrame> for HtpFrames {
    fn select(&self, values: &[DmxFrame]) -> Option<DmxFrame> {
        let (first, rest) = values.split_first()?;
        Some(rest.iter().fold(first.clone(), |acc, f| acc.highest(f)))
    }
}
