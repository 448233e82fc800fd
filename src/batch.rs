//! Turns sampled transitions into rectangular training arrays.

use ndarray::{Array2, ArrayView2};
use std::borrow::Borrow;

use crate::error::{DeepQError, Result};
use crate::replay_buffer::Transition;

/// Terminal flag of a transition, in whatever representation the caller has.
///
/// Booleans are terminal when `true`; numeric flags are terminal when
/// non-zero. Everything that reaches target computation goes through
/// [`TerminalFlag::continuation`], so `1 - done` is always a clean `{0, 1}`
/// mask.
pub trait TerminalFlag: Copy {
    fn is_terminal(&self) -> bool;

    /// `0.0` for terminal flags, `1.0` otherwise.
    fn continuation(&self) -> f32 {
        if self.is_terminal() {
            0.0
        } else {
            1.0
        }
    }
}

impl TerminalFlag for bool {
    fn is_terminal(&self) -> bool {
        *self
    }
}

macro_rules! numeric_terminal_flag {
    ($($t:ty),*) => {
        $(
            impl TerminalFlag for $t {
                fn is_terminal(&self) -> bool {
                    *self != (0 as $t)
                }
            }
        )*
    };
}

numeric_terminal_flag!(u8, i32, i64, usize, f32, f64);

/// `(1 - done)` as a float column.
pub fn continuation_mask<D: TerminalFlag>(done: ArrayView2<D>) -> Array2<f32> {
    done.mapv(|d| d.continuation())
}

/// A batch of transitions laid out column-wise.
///
/// `state` and `next_state` are `(N, feature_dim)`; the other fields are
/// `(N, 1)` columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub state: Array2<f32>,
    pub action: Array2<usize>,
    pub reward: Array2<f32>,
    pub next_state: Array2<f32>,
    pub done: Array2<bool>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.state.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn feature_dim(&self) -> usize {
        self.state.ncols()
    }
}

/// Stack `transitions` into a [`Batch`], preserving their order.
///
/// Fails on an empty list and on transitions whose state or next state width
/// differs from the first transition's state width.
pub fn memory_to_input<T, I>(transitions: I) -> Result<Batch>
where
    T: Borrow<Transition>,
    I: IntoIterator<Item = T>,
{
    let transitions: Vec<T> = transitions.into_iter().collect();
    let first = transitions
        .first()
        .ok_or_else(|| DeepQError::EmptyBatch("cannot assemble a batch from zero transitions".to_string()))?;
    let batch_size = transitions.len();
    let feature_dim = first.borrow().state.len();

    let mut state = Array2::zeros((batch_size, feature_dim));
    let mut next_state = Array2::zeros((batch_size, feature_dim));
    let mut action = Array2::zeros((batch_size, 1));
    let mut reward = Array2::zeros((batch_size, 1));
    let mut done = Array2::from_elem((batch_size, 1), false);

    for (i, transition) in transitions.iter().enumerate() {
        let transition = transition.borrow();
        for (name, row) in [("state", &transition.state), ("next_state", &transition.next_state)] {
            if row.len() != feature_dim {
                return Err(DeepQError::dimension_mismatch(
                    format!("{} of width {}", name, feature_dim),
                    format!("{} of width {} at row {}", name, row.len(), i),
                ));
            }
        }
        state.row_mut(i).assign(&transition.state);
        next_state.row_mut(i).assign(&transition.next_state);
        action[[i, 0]] = transition.action;
        reward[[i, 0]] = transition.reward;
        done[[i, 0]] = transition.done;
    }

    Ok(Batch {
        state,
        action,
        reward,
        next_state,
        done,
    })
}
