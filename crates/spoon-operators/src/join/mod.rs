//! Natural joins on the columns both operands share.

pub mod hash;

pub use hash::HashJoin;

use crate::stream::RowStream;
use crate::traits::{OpError, Operator};

/// Join two or more streams left to right with the same flags.
pub fn join_all<I>(streams: I, join: &HashJoin) -> Result<RowStream, OpError>
where
    I: IntoIterator<Item = RowStream>,
{
    let mut streams = streams.into_iter();
    let first = streams
        .next()
        .ok_or_else(|| OpError::Plan("join needs at least one input".into()))?;
    streams.try_fold(first, |acc, next| join.execute(vec![acc, next]))
}
