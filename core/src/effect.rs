//! Side effect descriptions.
//!
//! Effects are values, not execution: reducers return them and the runtime
//! executes them, feeding any produced actions back through dispatch. The
//! busy-indication gate lives here as [`busy_gated_call`], which turns a
//! transport future into an action stream.

use crate::client::CrudError;
use futures::stream::BoxStream;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// A side effect to be executed by the store runtime.
///
/// # Type Parameters
///
/// - `Action`: the action type effects can produce (feedback loop)
pub enum Effect<Action> {
    /// No-op effect.
    None,

    /// Dispatch an action after a delay.
    Delay {
        /// How long to wait.
        duration: Duration,
        /// Action to dispatch after the delay.
        action: Box<Action>,
    },

    /// Arbitrary async computation; if it resolves to `Some`, the action is
    /// fed back into the reducer.
    Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

    /// Async computation producing a sequence of actions, each fed back into
    /// the reducer in order. Used by the busy-indication gate, which may
    /// emit a busy action followed by a terminal action.
    Stream(BoxStream<'static, Action>),
}

// Manual Debug since futures and streams don't implement it
impl<Action> fmt::Debug for Effect<Action>
where
    Action: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Delay { duration, action } => f
                .debug_struct("Effect::Delay")
                .field("duration", duration)
                .field("action", action)
                .finish(),
            Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            Effect::Stream(_) => write!(f, "Effect::Stream(<stream>)"),
        }
    }
}

/// Wrap a transport call in the busy-indication gate.
///
/// Races the call against the busy delay with first-writer-wins semantics:
///
/// - call resolves first: the timer is dropped and no busy action is ever
///   emitted;
/// - delay elapses first: `busy` is emitted exactly once, then the call is
///   awaited to completion.
///
/// Exactly one terminal action follows: `on_complete(response)` on success
/// or `on_error(error)` on failure. The select is biased toward the call so
/// a response that is already available never loses the race to the timer.
pub fn busy_gated_call<A, R, F, C, E>(
    busy_delay: Duration,
    call: F,
    busy: A,
    on_complete: C,
    on_error: E,
) -> Effect<A>
where
    A: Send + 'static,
    R: Send + 'static,
    F: Future<Output = Result<R, CrudError>> + Send + 'static,
    C: FnOnce(R) -> A + Send + 'static,
    E: FnOnce(CrudError) -> A + Send + 'static,
{
    Effect::Stream(Box::pin(async_stream::stream! {
        tokio::pin!(call);

        let raced = tokio::select! {
            biased;
            outcome = &mut call => Some(outcome),
            () = tokio::time::sleep(busy_delay) => None,
        };

        let outcome = match raced {
            Some(outcome) => outcome,
            None => {
                yield busy;
                call.await
            }
        };

        match outcome {
            Ok(response) => yield on_complete(response),
            Err(error) => yield on_error(error),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn drain<A>(effect: Effect<A>) -> Vec<A> {
        match effect {
            Effect::Stream(mut stream) => {
                let mut actions = Vec::new();
                while let Some(action) = stream.next().await {
                    actions.push(action);
                }
                actions
            }
            _ => Vec::new(),
        }
    }

    #[tokio::test]
    async fn fast_call_skips_busy() {
        let effect = busy_gated_call(
            Duration::from_millis(200),
            async { Ok::<_, CrudError>(42u32) },
            "busy".to_string(),
            |n| format!("done:{n}"),
            |e| format!("err:{e}"),
        );

        let actions = drain(effect).await;
        assert_eq!(actions, vec!["done:42".to_string()]);
    }

    #[tokio::test]
    async fn slow_call_emits_busy_then_terminal() {
        let effect = busy_gated_call(
            Duration::from_millis(20),
            async {
                tokio::time::sleep(Duration::from_millis(120)).await;
                Ok::<_, CrudError>(7u32)
            },
            "busy".to_string(),
            |n| format!("done:{n}"),
            |e| format!("err:{e}"),
        );

        let actions = drain(effect).await;
        assert_eq!(actions, vec!["busy".to_string(), "done:7".to_string()]);
    }

    #[tokio::test]
    async fn failure_emits_exactly_one_error() {
        let effect = busy_gated_call(
            Duration::from_millis(200),
            async { Err::<u32, _>(CrudError::Transport("down".to_string())) },
            "busy".to_string(),
            |n| format!("done:{n}"),
            |e| format!("err:{e}"),
        );

        let actions = drain(effect).await;
        assert_eq!(actions, vec!["err:transport error: down".to_string()]);
    }

    #[tokio::test]
    async fn slow_failure_still_shows_busy_first() {
        let effect = busy_gated_call(
            Duration::from_millis(20),
            async {
                tokio::time::sleep(Duration::from_millis(120)).await;
                Err::<u32, _>(CrudError::Transport("down".to_string()))
            },
            "busy".to_string(),
            |n| format!("done:{n}"),
            |_| "err".to_string(),
        );

        let actions = drain(effect).await;
        assert_eq!(actions, vec!["busy".to_string(), "err".to_string()]);
    }
}
